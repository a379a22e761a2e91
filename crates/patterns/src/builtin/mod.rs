//! Patterns compiled into the binary.
//!
//! Each entry pairs a kind name with a constructor. Manifests refer to these
//! kinds by name and the library registers every kind under its own name at
//! startup.

mod rainbow;
mod solid;
mod spin;
mod twinkle;

use crate::params::PatternParams;
use crate::Animation;

pub use rainbow::Rainbow;
pub use solid::Solid;
pub use spin::Spin;
pub use twinkle::Twinkle;

#[derive(Debug, Clone, Copy)]
pub struct BuiltinPattern {
    pub kind: &'static str,
    pub author: &'static str,
    pub description: &'static str,
    pub build: fn(&PatternParams) -> Animation,
}

const CATALOG: &[BuiltinPattern] = &[
    BuiltinPattern {
        kind: "rainbow",
        author: "gridmas",
        description: "Hue wheel wrapped around the trunk, climbing the tree.",
        build: |params| Animation::stepped(Rainbow::from_params(params)),
    },
    BuiltinPattern {
        kind: "solid",
        author: "gridmas",
        description: "Eases every pixel to a single color and holds it.",
        build: |params| Animation::stepped(Solid::from_params(params)),
    },
    BuiltinPattern {
        kind: "spin",
        author: "Ciaran",
        description: "Two colors split by a plane spinning through the tree.",
        build: |params| Animation::looping(Spin::from_params(params)),
    },
    BuiltinPattern {
        kind: "twinkle",
        author: "gridmas",
        description: "Random pixels flare up in random colors and fade out.",
        build: |params| Animation::looping(Twinkle::from_params(params)),
    },
];

pub fn catalog() -> &'static [BuiltinPattern] {
    CATALOG
}

pub fn lookup(kind: &str) -> Option<&'static BuiltinPattern> {
    CATALOG.iter().find(|entry| entry.kind == kind)
}

pub fn kinds() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|entry| entry.kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_builds_every_kind() {
        let styles: Vec<(&str, &str)> = catalog()
            .iter()
            .map(|entry| (entry.kind, (entry.build)(&PatternParams::new()).style()))
            .collect();
        assert_eq!(
            styles,
            vec![
                ("rainbow", "stepped"),
                ("solid", "stepped"),
                ("spin", "looping"),
                ("twinkle", "looping"),
            ]
        );
        assert!(lookup("spin").is_some());
        assert!(lookup("Spin").is_none());
    }
}
