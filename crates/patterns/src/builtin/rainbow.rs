use std::f64::consts::TAU;

use tree::{Canvas, Rgb};

use crate::params::PatternParams;
use crate::{PatternError, SteppedPattern};

/// Hue follows the polar angle around the trunk plus height, drifting by
/// `speed` of a full turn each frame. Stepped.
#[derive(Debug, Clone)]
pub struct Rainbow {
    speed: f64,
    bands: f64,
    saturation: f64,
    value: f64,
    offset: f64,
}

impl Rainbow {
    pub fn from_params(params: &PatternParams) -> Self {
        Self {
            speed: params.ranged("speed", 0.01, -0.5, 0.5),
            bands: params.ranged("bands", 1.0, 0.0, 16.0),
            saturation: params.ranged("saturation", 1.0, 0.0, 1.0),
            value: params.ranged("value", 0.6, 0.0, 1.0),
            offset: 0.0,
        }
    }

    fn hue(&self, angle: f64, z: f64, height: f64) -> f64 {
        let climb = if height > 0.0 { z / height } else { 0.0 };
        (angle / TAU + climb * self.bands + self.offset).rem_euclid(1.0)
    }
}

impl SteppedPattern for Rainbow {
    fn step(&mut self, canvas: &mut Canvas) -> Result<(), PatternError> {
        let height = canvas.height();
        for mut pixel in canvas.iter_mut() {
            let hue = self.hue(pixel.angle(), pixel.z(), height);
            pixel.set(Rgb::from_hsv(hue, self.saturation, self.value));
        }
        self.offset = (self.offset + self.speed).rem_euclid(1.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use tree::Topology;

    #[test]
    fn hue_wraps_around_the_trunk() {
        let params = PatternParams::new()
            .with("bands", ParamValue::Number(0.0))
            .with("value", ParamValue::Number(1.0))
            .with("speed", ParamValue::Number(0.5));
        let mut rainbow = Rainbow::from_params(&params);
        // angle 0 is red, angle pi is cyan.
        let mut canvas =
            Topology::from_coords(vec![[1.0, 0.0, 0.0], [-1.0, 0.0, 1.0]]).unwrap();
        rainbow.step(&mut canvas).unwrap();
        let frame = canvas.topology().snapshot_frame();
        assert_eq!(frame.get(0), Some(Rgb::new(255, 0, 0)));
        assert_eq!(frame.get(1), Some(Rgb::new(0, 255, 255)));

        // Half a turn of drift swaps them.
        rainbow.step(&mut canvas).unwrap();
        let frame = canvas.topology().snapshot_frame();
        assert_eq!(frame.get(0), Some(Rgb::new(0, 255, 255)));
        assert_eq!(frame.get(1), Some(Rgb::new(255, 0, 0)));
    }
}
