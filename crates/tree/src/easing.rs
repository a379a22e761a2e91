use std::fmt;

/// Shapes the progress of a color transition.
///
/// Every curve maps `0.0..=1.0` onto `0.0..=1.0`; inputs outside the range
/// are clamped first and custom curves are clamped on the way out.
#[derive(Clone, Copy, Default)]
pub enum Easing {
    #[default]
    Linear,
    Smoothstep,
    EaseInOut,
    InQuad,
    OutQuad,
    InCubic,
    OutCubic,
    Custom(fn(f64) -> f64),
}

impl Easing {
    pub fn sample(self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Easing::Linear => t,
            Easing::Smoothstep => t * t * (3.0 - 2.0 * t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::InQuad => t * t,
            Easing::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::InCubic => t * t * t,
            Easing::OutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::Custom(curve) => {
                let eased = curve(t);
                if eased.is_nan() {
                    0.0
                } else {
                    eased.clamp(0.0, 1.0)
                }
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let easing = match name.trim().to_ascii_lowercase().as_str() {
            "linear" => Easing::Linear,
            "smoothstep" => Easing::Smoothstep,
            "ease-in-out" | "easeinout" => Easing::EaseInOut,
            "in-quad" => Easing::InQuad,
            "out-quad" => Easing::OutQuad,
            "in-cubic" => Easing::InCubic,
            "out-cubic" => Easing::OutCubic,
            _ => return None,
        };
        Some(easing)
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Easing::Linear => "Linear",
            Easing::Smoothstep => "Smoothstep",
            Easing::EaseInOut => "EaseInOut",
            Easing::InQuad => "InQuad",
            Easing::OutQuad => "OutQuad",
            Easing::InCubic => "InCubic",
            Easing::OutCubic => "OutCubic",
            Easing::Custom(_) => "Custom",
        };
        f.write_str(name)
    }
}
