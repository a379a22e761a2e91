/// Immutable geometry of one light on the tree.
///
/// Coordinates follow the GIFT layout: `x` and `y` span roughly `-1..=1`
/// around the trunk, `z` runs from `0` at the base to the tree height.
#[derive(Debug, Clone, PartialEq)]
pub struct Pixel {
    id: usize,
    x: f64,
    y: f64,
    z: f64,
    angle: f64,
    radius: f64,
}

impl Pixel {
    pub fn new(id: usize, [x, y, z]: [f64; 3]) -> Self {
        Self {
            id,
            x,
            y,
            z,
            angle: y.atan2(x),
            radius: x.hypot(y),
        }
    }

    /// Position in the LED string; this is the wire order.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn xyz(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Polar angle around the trunk in radians, measured from +x.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Distance from the trunk.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn distance_to(&self, other: &Pixel) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}
