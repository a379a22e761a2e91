use tree::{Canvas, Easing, Rgb};

use crate::params::PatternParams;
use crate::{PatternError, SteppedPattern};

/// Eases every pixel from whatever it showed to `color` over `steps` frames,
/// then holds. Stepped.
#[derive(Debug, Clone, Copy)]
pub struct Solid {
    color: Rgb,
    steps: u32,
    easing: Easing,
}

impl Solid {
    pub fn new(color: Rgb, steps: u32, easing: Easing) -> Self {
        Self {
            color,
            steps,
            easing,
        }
    }

    pub fn from_params(params: &PatternParams) -> Self {
        Self::new(
            params.color("color", Rgb::AMBER),
            params.count("steps", 30),
            params.easing("easing", Easing::Smoothstep),
        )
    }
}

impl SteppedPattern for Solid {
    fn step(&mut self, canvas: &mut Canvas) -> Result<(), PatternError> {
        for mut pixel in canvas.iter_mut() {
            pixel.lerp(self.color, self.steps, self.easing)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree::Topology;

    #[test]
    fn reaches_the_target_and_holds() {
        let mut canvas = Topology::from_coords(vec![[0.0, 0.0, 0.0]; 3]).unwrap();
        canvas.fill(Rgb::RED);
        let mut solid = Solid::new(Rgb::BLUE, 4, Easing::Linear);
        solid.step(&mut canvas).unwrap();
        assert_eq!(canvas.topology().color(1), Some(Rgb::new(191, 0, 64)));
        for _ in 0..5 {
            solid.step(&mut canvas).unwrap();
        }
        let frame = canvas.topology().snapshot_frame();
        assert!(frame.pixels().iter().all(|color| *color == Rgb::BLUE));
    }
}
