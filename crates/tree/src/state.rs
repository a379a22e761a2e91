use crate::color::{ColorError, Rgb};
use crate::easing::Easing;

/// Mutable color of one pixel, including any scheduled transition.
///
/// A transition is described by an origin (the color at schedule time), a
/// target, a step count and an easing curve. Each [`ColorState::advance`]
/// moves one step; once `completed == total` the state is terminal and
/// further advances leave the color alone.
#[derive(Debug, Clone)]
pub struct ColorState {
    current: Rgb,
    origin: Rgb,
    target: Rgb,
    total: u32,
    completed: u32,
    easing: Easing,
}

impl Default for ColorState {
    fn default() -> Self {
        Self::new(Rgb::BLACK)
    }
}

impl ColorState {
    pub fn new(color: Rgb) -> Self {
        Self {
            current: color,
            origin: color,
            target: color,
            total: 1,
            completed: 1,
            easing: Easing::Linear,
        }
    }

    pub fn color(&self) -> Rgb {
        self.current
    }

    pub fn target(&self) -> Rgb {
        self.target
    }

    /// `(completed, total)` steps of the current transition.
    pub fn progress(&self) -> (u32, u32) {
        (self.completed, self.total)
    }

    pub fn is_settled(&self) -> bool {
        self.completed == self.total
    }

    /// Assigns the color immediately and cancels any running transition.
    ///
    /// The state becomes terminal at `color`, so the next schedule towards
    /// any other color starts from here.
    pub fn set_instant(&mut self, color: Rgb) {
        self.current = color;
        self.origin = color;
        self.target = color;
        self.completed = self.total;
    }

    /// Same as [`ColorState::set_instant`] for unchecked integer channels.
    pub fn set_rgb(&mut self, r: i64, g: i64, b: i64) {
        self.set_instant(Rgb::from_clamped(r, g, b));
    }

    /// Schedules a transition from the current color towards `target`.
    ///
    /// Restarts only when forced or when the target or step count differ from
    /// the scheduled ones, so calling this every frame with the same arguments
    /// keeps an in-flight transition going.
    pub fn schedule_interpolation(
        &mut self,
        target: Rgb,
        total_steps: u32,
        easing: Easing,
        force_restart: bool,
    ) -> Result<(), ColorError> {
        if total_steps == 0 {
            return Err(ColorError::ZeroSteps);
        }
        if force_restart || target != self.target || total_steps != self.total {
            self.origin = self.current;
            self.completed = 0;
            self.target = target;
            self.total = total_steps;
            self.easing = easing;
        }
        Ok(())
    }

    /// Moves the scheduled transition forward by one step.
    pub fn advance(&mut self) -> Rgb {
        if self.completed == self.total {
            return self.current;
        }
        self.completed = (self.completed + 1).min(self.total);
        let progress = (f64::from(self.completed) / f64::from(self.total)).clamp(0.0, 1.0);
        let d = self.easing.sample(progress);
        let mix = |from: u8, to: u8| {
            (f64::from(from) * (1.0 - d) + f64::from(to) * d)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        self.current = Rgb::new(
            mix(self.origin.r, self.target.r),
            mix(self.origin.g, self.target.g),
            mix(self.origin.b, self.target.b),
        );
        self.current
    }

    /// Schedules (if needed) and advances in one call.
    pub fn lerp(&mut self, target: Rgb, total_steps: u32, easing: Easing) -> Result<Rgb, ColorError> {
        self.schedule_interpolation(target, total_steps, easing, false)?;
        Ok(self.advance())
    }

    /// Divides each channel by `factor`; values below 1 brighten towards white.
    ///
    /// A running transition restarts from the faded color; a settled pixel
    /// stays settled at it. Non-positive or non-finite factors are ignored.
    pub fn fade(&mut self, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let settled = self.is_settled();
        self.current = self.current.scaled_down(factor);
        self.origin = self.current;
        if settled {
            self.target = self.current;
        } else {
            self.completed = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reds(state: &mut ColorState, count: usize) -> Vec<u8> {
        (0..count).map(|_| state.advance().r).collect()
    }

    #[test]
    fn linear_fade_to_black_in_five_steps() {
        let mut state = ColorState::new(Rgb::RED);
        state
            .schedule_interpolation(Rgb::BLACK, 5, Easing::Linear, false)
            .unwrap();
        assert_eq!(reds(&mut state, 5), vec![204, 153, 102, 51, 0]);
        assert_eq!(state.advance(), Rgb::BLACK);
        assert!(state.is_settled());
    }

    #[test]
    fn lerp_with_same_arguments_continues() {
        let mut state = ColorState::new(Rgb::RED);
        let seen: Vec<u8> = (0..6)
            .map(|_| state.lerp(Rgb::BLACK, 5, Easing::Linear).unwrap().r)
            .collect();
        assert_eq!(seen, vec![204, 153, 102, 51, 0, 0]);
    }

    #[test]
    fn retarget_snapshots_current_color() {
        let mut state = ColorState::new(Rgb::RED);
        state.lerp(Rgb::BLACK, 5, Easing::Linear).unwrap();
        state.lerp(Rgb::BLACK, 5, Easing::Linear).unwrap();
        assert_eq!(state.color(), Rgb::new(153, 0, 0));

        state
            .schedule_interpolation(Rgb::BLUE, 3, Easing::Linear, false)
            .unwrap();
        assert_eq!(state.progress(), (0, 3));
        assert_eq!(state.advance(), Rgb::new(102, 0, 85));
        assert_eq!(state.advance(), Rgb::new(51, 0, 170));
        assert_eq!(state.advance(), Rgb::BLUE);
    }

    #[test]
    fn changing_step_count_restarts() {
        let mut state = ColorState::new(Rgb::WHITE);
        state.lerp(Rgb::BLACK, 4, Easing::Linear).unwrap();
        state
            .schedule_interpolation(Rgb::BLACK, 2, Easing::Linear, false)
            .unwrap();
        assert_eq!(state.progress(), (0, 2));
    }

    #[test]
    fn forced_restart_rewinds_identical_schedule() {
        let mut state = ColorState::new(Rgb::RED);
        state.lerp(Rgb::BLACK, 5, Easing::Linear).unwrap();
        state
            .schedule_interpolation(Rgb::BLACK, 5, Easing::Linear, true)
            .unwrap();
        assert_eq!(state.progress(), (0, 5));
        assert_eq!(state.advance().r, 163);
    }

    #[test]
    fn zero_steps_is_rejected() {
        let mut state = ColorState::default();
        assert_eq!(
            state.schedule_interpolation(Rgb::WHITE, 0, Easing::Linear, false),
            Err(ColorError::ZeroSteps)
        );
        assert_eq!(state.color(), Rgb::BLACK);
    }

    #[test]
    fn set_instant_cancels_transition() {
        let mut state = ColorState::new(Rgb::RED);
        state.lerp(Rgb::BLACK, 5, Easing::Linear).unwrap();
        state.set_instant(Rgb::GREEN);
        assert!(state.is_settled());
        assert_eq!(state.advance(), Rgb::GREEN);
    }

    #[test]
    fn lerp_after_set_instant_eases_from_the_new_color() {
        let mut state = ColorState::new(Rgb::BLACK);
        for _ in 0..5 {
            state.lerp(Rgb::RED, 5, Easing::Linear).unwrap();
        }
        assert_eq!(state.color(), Rgb::RED);

        state.set_instant(Rgb::BLUE);
        assert_eq!(state.target(), Rgb::BLUE);
        let seen: Vec<Rgb> = (0..5)
            .map(|_| state.lerp(Rgb::RED, 5, Easing::Linear).unwrap())
            .collect();
        assert_eq!(seen[0], Rgb::new(51, 0, 204));
        assert_eq!(seen[4], Rgb::RED);
    }

    #[test]
    fn fading_a_settled_pixel_stays_put() {
        let mut state = ColorState::new(Rgb::RED);
        state.set_instant(Rgb::new(0, 200, 0));
        state.fade(2.0);
        assert_eq!(state.color(), Rgb::new(0, 100, 0));
        assert!(state.is_settled());
        assert_eq!(state.advance(), Rgb::new(0, 100, 0));

        let mut finished = ColorState::new(Rgb::WHITE);
        for _ in 0..2 {
            finished.lerp(Rgb::new(200, 0, 0), 2, Easing::Linear).unwrap();
        }
        finished.fade(4.0);
        assert_eq!(finished.advance(), Rgb::new(50, 0, 0));
    }

    #[test]
    fn fade_restarts_from_faded_color() {
        let mut state = ColorState::new(Rgb::new(200, 100, 0));
        state
            .schedule_interpolation(Rgb::BLACK, 2, Easing::Linear, false)
            .unwrap();
        state.fade(2.0);
        assert_eq!(state.color(), Rgb::new(100, 50, 0));
        assert_eq!(state.progress(), (0, 2));
        assert_eq!(state.advance(), Rgb::new(50, 25, 0));
    }

    #[test]
    fn fresh_state_is_black_and_settled() {
        let mut state = ColorState::default();
        assert_eq!(state.advance(), Rgb::BLACK);
        assert!(state.is_settled());
    }
}
