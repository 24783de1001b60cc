/// Weight given to the raw pointer on each smoothing step.
pub const SMOOTHING_FACTOR: f32 = 0.1;

/// A position in surface pixels, bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Moves `alpha` of the way toward `target` on each axis.
    ///
    /// Written as `self + (target - self) * alpha`, algebraically equal to
    /// `self * (1 - alpha) + target * alpha`; this form cannot round past the
    /// target.
    pub fn lerp(self, target: Point, alpha: f32) -> Point {
        Point {
            x: self.x + (target.x - self.x) * alpha,
            y: self.y + (target.y - self.y) * alpha,
        }
    }

    pub fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }
}

/// Raw pointer position plus its exponentially lagged companion.
///
/// `raw` changes whenever the host reports pointer motion; `smoothed` only
/// moves when a frame calls [`PointerState::advance`], so a motion event is
/// first seen by the frame after it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    raw: Point,
    smoothed: Point,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds both positions, mostly useful for tests and restored hosts.
    pub fn with_positions(raw: Point, smoothed: Point) -> Self {
        Self { raw, smoothed }
    }

    pub fn raw(&self) -> Point {
        self.raw
    }

    pub fn smoothed(&self) -> Point {
        self.smoothed
    }

    /// Records a pointer event given in top-left-origin surface pixels.
    pub fn record_move(&mut self, x: f64, y: f64, surface_height: u32) {
        self.raw = Point::new(x as f32, surface_height as f32 - y as f32);
    }

    /// One smoothing step toward the raw position.
    pub fn advance(&mut self) {
        self.smoothed = self.smoothed.lerp(self.raw, SMOOTHING_FACTOR);
    }
}
