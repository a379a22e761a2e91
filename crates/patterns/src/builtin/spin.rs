use std::f64::consts::{FRAC_PI_2, PI, TAU};

use tracing::debug;
use tree::Rgb;

use crate::context::PatternContext;
use crate::params::PatternParams;
use crate::{LoopingPattern, PatternError};

/// A plane through the middle of the tree rotates about the horizontal axis;
/// pixels on one side take `color1`, the rest `color2`.
///
/// Looping: paces itself with [`PatternContext::update`].
#[derive(Debug, Clone)]
pub struct Spin {
    speed: f64,
    color1: Rgb,
    color2: Rgb,
    angle: f64,
    swapped: bool,
    passed_quarter: bool,
    passed_three_quarters: bool,
}

impl Spin {
    pub fn new(speed: f64, color1: Rgb, color2: Rgb) -> Self {
        Self {
            speed,
            color1,
            color2,
            angle: 0.0,
            swapped: false,
            passed_quarter: false,
            passed_three_quarters: false,
        }
    }

    pub fn from_params(params: &PatternParams) -> Self {
        Self::new(
            params.ranged("speed", 0.3, 0.02, 0.5),
            params.color("color1", Rgb::new(0, 50, 50)),
            params.color("color2", Rgb::new(50, 50, 0)),
        )
    }

    fn color_for(&self, slope: f64, offset: f64, y: f64, z: f64) -> Rgb {
        if (slope * y <= z + offset) ^ self.swapped {
            self.color1
        } else {
            self.color2
        }
    }

    /// Rotates the plane one step. The tangent flips sign each time the
    /// angle crosses a vertical, so the colors swap there to keep the same
    /// side lit.
    fn turn(&mut self) {
        self.angle += self.speed;
        if self.angle > TAU {
            self.angle -= TAU;
            self.passed_quarter = false;
            self.passed_three_quarters = false;
        }
        if self.angle >= FRAC_PI_2 && !self.passed_quarter {
            self.swapped = !self.swapped;
            self.passed_quarter = true;
        }
        if self.angle >= 1.5 * PI && !self.passed_three_quarters {
            self.swapped = !self.swapped;
            self.passed_three_quarters = true;
        }
    }
}

impl LoopingPattern for Spin {
    fn run(&mut self, ctx: &mut PatternContext<'_>) -> Result<(), PatternError> {
        let offset = -ctx.height() / 2.0;
        debug!(speed = self.speed, offset, "spin started");
        loop {
            let slope = self.angle.tan();
            let this = &*self;
            ctx.for_each_pixel(|pixel| {
                let color = this.color_for(slope, offset, pixel.y(), pixel.z());
                pixel.set(color);
                Ok(())
            })?;
            ctx.update()?;
            self.turn();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::signal::StopSignal;
    use tree::Topology;

    #[test]
    fn colors_swap_at_each_vertical_crossing() {
        let mut spin = Spin::new(0.5, Rgb::RED, Rgb::BLUE);
        let mut swaps = Vec::new();
        let mut last = spin.swapped;
        for step in 0..13 {
            spin.turn();
            if spin.swapped != last {
                swaps.push(step);
                last = spin.swapped;
            }
        }
        // 0.5 rad per step crosses pi/2 on step 3 and 3pi/2 on step 9.
        assert_eq!(swaps, vec![3, 9]);
        assert!(!spin.swapped);
        assert!(spin.angle < TAU);
    }

    #[test]
    fn splits_the_tree_and_stops_on_request() {
        let mut canvas =
            Topology::from_coords(vec![[0.0, 0.0, 0.0], [0.0, 0.0, 2.0]]).unwrap();
        let reader = std::sync::Arc::clone(canvas.topology());
        let (signal, trigger) = StopSignal::new();
        let handle = thread::spawn(move || {
            let mut spin = Spin::new(0.02, Rgb::RED, Rgb::BLUE);
            let mut ctx = PatternContext::new(&mut canvas, &signal, Duration::from_secs(60));
            spin.run(&mut ctx)
        });
        while reader.color(1) == Some(Rgb::BLACK) {
            thread::yield_now();
        }
        // Offset is -1: the bottom pixel sits above the plane, the top below.
        assert_eq!(reader.color(0), Some(Rgb::BLUE));
        assert_eq!(reader.color(1), Some(Rgb::RED));
        trigger.stop();
        assert!(matches!(handle.join().unwrap(), Err(PatternError::Cancelled)));
    }
}
