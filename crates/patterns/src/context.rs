use std::time::Duration;

use tree::{Canvas, PixelMut, Topology};

use crate::signal::StopSignal;
use crate::PatternError;

/// Everything a looping pattern may touch while it runs.
///
/// The context holds the canvas for the lifetime of the pattern thread; the
/// runner takes it back once [`crate::LoopingPattern::run`] returns.
pub struct PatternContext<'a> {
    canvas: &'a mut Canvas,
    stop: &'a StopSignal,
    frame_interval: Duration,
}

impl<'a> PatternContext<'a> {
    pub fn new(canvas: &'a mut Canvas, stop: &'a StopSignal, frame_interval: Duration) -> Self {
        Self {
            canvas,
            stop,
            frame_interval,
        }
    }

    pub fn canvas(&mut self) -> &mut Canvas {
        self.canvas
    }

    pub fn topology(&self) -> &Topology {
        self.canvas.topology()
    }

    pub fn height(&self) -> f64 {
        self.canvas.height()
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Returns [`PatternError::Cancelled`] once the runner asked to stop.
    pub fn checkpoint(&self) -> Result<(), PatternError> {
        if self.stop.is_stopped() {
            Err(PatternError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Ends the current animation frame: waits one frame interval, returning
    /// early with [`PatternError::Cancelled`] if the runner stops the pattern.
    pub fn update(&self) -> Result<(), PatternError> {
        if self.stop.wait_timeout(self.frame_interval) {
            Err(PatternError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Visits every pixel in wire order, checking for cancellation before
    /// each one.
    pub fn for_each_pixel<F>(&mut self, mut visit: F) -> Result<(), PatternError>
    where
        F: FnMut(&mut PixelMut<'_>) -> Result<(), PatternError>,
    {
        let stop = self.stop;
        for mut pixel in self.canvas.iter_mut() {
            if stop.is_stopped() {
                return Err(PatternError::Cancelled);
            }
            visit(&mut pixel)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree::Rgb;

    #[test]
    fn for_each_pixel_stops_mid_frame() {
        let mut canvas = Topology::from_coords(vec![[0.0, 0.0, 0.0]; 8]).unwrap();
        let (signal, trigger) = StopSignal::new();
        let mut ctx = PatternContext::new(&mut canvas, &signal, Duration::from_millis(1));
        let mut visited = 0;
        let result = ctx.for_each_pixel(|pixel| {
            pixel.set(Rgb::RED);
            visited += 1;
            if visited == 3 {
                trigger.stop();
            }
            Ok(())
        });
        assert!(matches!(result, Err(PatternError::Cancelled)));
        assert_eq!(visited, 3);
        let lit = canvas
            .topology()
            .snapshot_frame()
            .pixels()
            .iter()
            .filter(|color| **color == Rgb::RED)
            .count();
        assert_eq!(lit, 3);
    }

    #[test]
    fn update_reports_cancellation() {
        let mut canvas = Topology::from_coords(vec![[0.0, 0.0, 0.0]]).unwrap();
        let (signal, trigger) = StopSignal::new();
        let ctx = PatternContext::new(&mut canvas, &signal, Duration::from_millis(1));
        assert!(ctx.update().is_ok());
        trigger.stop();
        assert!(matches!(ctx.checkpoint(), Err(PatternError::Cancelled)));
        assert!(matches!(ctx.update(), Err(PatternError::Cancelled)));
    }
}
