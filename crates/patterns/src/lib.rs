//! Pattern library for the GRIDmas tree.
//!
//! A pattern is an animation that writes pixel colors through a
//! [`tree::Canvas`]. Two styles exist and each pattern picks one:
//!
//! - [`LoopingPattern`]s own their pacing. They run on a dedicated thread,
//!   call [`PatternContext::update`] between frames and return once the
//!   [`StopSignal`] fires.
//! - [`SteppedPattern`]s draw exactly one frame per call and are driven by the
//!   pipeline tick on the control thread.
//!
//! Patterns are registered explicitly: the built-in catalog is a static table
//! in [`builtin`], and [`PatternLibrary::discover`] adds variants described by
//! `*.toml` manifests that point at a built-in kind with tuned parameters.

pub mod builtin;
mod context;
mod library;
mod manifest;
mod params;
mod signal;

use thiserror::Error;
use tree::{Canvas, ColorError};

pub use context::PatternContext;
pub use library::{DiscoveryReport, PatternDescriptor, PatternFactory, PatternLibrary};
pub use manifest::{ManifestError, PatternManifest};
pub use params::{ParamValue, PatternParams};
pub use signal::{StopSignal, StopTrigger};

#[derive(Debug, Error)]
pub enum PatternError {
    /// The runner asked the pattern to stop. Not a fault.
    #[error("pattern cancelled")]
    Cancelled,
    #[error(transparent)]
    Color(#[from] ColorError),
    #[error("{0}")]
    Failed(String),
}

/// An animation that paces itself and runs until stopped.
pub trait LoopingPattern: Send {
    fn run(&mut self, ctx: &mut PatternContext<'_>) -> Result<(), PatternError>;
}

/// An animation that draws one frame per call.
pub trait SteppedPattern: Send {
    fn step(&mut self, canvas: &mut Canvas) -> Result<(), PatternError>;
}

/// A ready-to-run pattern instance.
pub enum Animation {
    Looping(Box<dyn LoopingPattern>),
    Stepped(Box<dyn SteppedPattern>),
}

impl Animation {
    pub fn looping(pattern: impl LoopingPattern + 'static) -> Self {
        Self::Looping(Box::new(pattern))
    }

    pub fn stepped(pattern: impl SteppedPattern + 'static) -> Self {
        Self::Stepped(Box::new(pattern))
    }

    pub fn style(&self) -> &'static str {
        match self {
            Self::Looping(_) => "looping",
            Self::Stepped(_) => "stepped",
        }
    }
}

impl std::fmt::Debug for Animation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Animation::{}", self.style())
    }
}
