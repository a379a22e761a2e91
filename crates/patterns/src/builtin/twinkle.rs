use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tree::{Easing, Rgb};

use crate::context::PatternContext;
use crate::params::PatternParams;
use crate::{LoopingPattern, PatternError};

/// Random pixels flare to a random hue and ease back to the background.
///
/// Looping. Parameters: `density` (chance per idle pixel per frame),
/// `steps` (frames per flare and per fade), `background`, `value`
/// (brightness of flares), `clear` (paint the background at once instead of
/// easing existing colors back to it) and an optional `seed`.
#[derive(Debug)]
pub struct Twinkle {
    density: f64,
    steps: u32,
    background: Rgb,
    value: f64,
    clear: bool,
    rng: StdRng,
}

impl Twinkle {
    pub fn from_params(params: &PatternParams) -> Self {
        let rng = match params.get("seed") {
            Some(_) => StdRng::seed_from_u64(params.number("seed", 0.0).abs() as u64),
            None => StdRng::from_entropy(),
        };
        Self {
            density: params.ranged("density", 0.02, 0.0, 1.0),
            steps: params.count("steps", 20),
            background: params.color("background", Rgb::BLACK),
            value: params.ranged("value", 0.8, 0.0, 1.0),
            clear: params.flag("clear", true),
            rng,
        }
    }
}

impl LoopingPattern for Twinkle {
    fn run(&mut self, ctx: &mut PatternContext<'_>) -> Result<(), PatternError> {
        let Self {
            density,
            steps,
            background,
            value,
            clear,
            rng,
        } = self;
        if *clear {
            ctx.for_each_pixel(|pixel| {
                pixel.set(*background);
                Ok(())
            })?;
        }
        loop {
            ctx.for_each_pixel(|pixel| {
                if pixel.state().is_settled() {
                    if pixel.color() != *background {
                        pixel.schedule(*background, *steps, Easing::InQuad, true)?;
                    } else if rng.gen_bool(*density) {
                        let flare = Rgb::random(&mut *rng, 1.0, *value);
                        pixel.schedule(flare, *steps, Easing::OutQuad, true)?;
                    }
                }
                pixel.advance();
                Ok(())
            })?;
            ctx.update()?;
        }
    }
}
