use crate::Vec3;

/// Linear interpolation of `y` at `x` on the segment `(x1, y1)`–`(x2, y2)`.
///
/// `x` is clamped into `[x1, x2]`, so the result always lies between `y1`
/// and `y2`. A degenerate segment (`x1 >= x2`) yields `y2`.
pub fn interpolate(x: f64, x1: f64, x2: f64, y1: f64, y2: f64) -> f64 {
    if x2 <= x1 {
        return y2;
    }
    let t = ((x - x1) / (x2 - x1)).clamp(0.0, 1.0);
    (y1 + (y2 - y1) * t).max(y1.min(y2)).min(y1.max(y2))
}

/// Componentwise [`interpolate`] for vectors.
pub fn interpolate_vec(x: f64, x1: f64, x2: f64, y1: &Vec3, y2: &Vec3) -> Vec3 {
    Vec3::new(
        interpolate(x, x1, x2, y1.x, y2.x),
        interpolate(x, x1, x2, y1.y, y2.y),
        interpolate(x, x1, x2, y1.z, y2.z),
    )
}

/// Values a sampler can interpolate between two physics steps.
pub trait Interpolate: Copy {
    fn interpolate(x: f64, x1: f64, x2: f64, y1: &Self, y2: &Self) -> Self;
}

impl Interpolate for f64 {
    fn interpolate(x: f64, x1: f64, x2: f64, y1: &f64, y2: &f64) -> f64 {
        interpolate(x, x1, x2, *y1, *y2)
    }
}

impl Interpolate for Vec3 {
    fn interpolate(x: f64, x1: f64, x2: f64, y1: &Vec3, y2: &Vec3) -> Vec3 {
        interpolate_vec(x, x1, x2, y1, y2)
    }
}
