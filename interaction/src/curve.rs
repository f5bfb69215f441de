//! Sample generation for pointer and arc curves.
//!
//! Every sampler is pure: identical inputs produce bit-identical points. Samplers are
//! finite iterators of `segments + 1` points and can be restarted or cloned.

use std::str::FromStr;

use crate::{
    error::InteractionError,
    types::{Point3, Vec3},
};

/// The three curve families a pointer can draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CurveKind {
    /// Straight segment from the hand to the forward hit.
    Linear,
    /// Quadratic Bezier through the forward hit, landing on the floor below it.
    #[default]
    Bezier,
    /// Projectile arc from the hand, cut at the floor plane.
    Parabolic,
}

impl CurveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurveKind::Linear => "linear",
            CurveKind::Bezier => "bezier",
            CurveKind::Parabolic => "parabolic",
        }
    }
}

impl FromStr for CurveKind {
    type Err = InteractionError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "linear" | "line" => Ok(CurveKind::Linear),
            "bezier" | "quadratic" => Ok(CurveKind::Bezier),
            "parabolic" | "parabola" | "arc" => Ok(CurveKind::Parabolic),
            _ => Err(InteractionError::UnknownCurveKind(name.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Shape {
    Linear {
        p0: Point3,
        p1: Point3,
    },
    Bezier {
        p0: Point3,
        p1: Point3,
        p2: Point3,
    },
    /// `p(s) = origin + velocity*s + 0.5*gravity*s^2` with `s = t * duration`.
    /// `landing` replaces the final sample when the arc ends on a known surface.
    Ballistic {
        origin: Point3,
        velocity: Vec3,
        gravity: Vec3,
        duration: f32,
        landing: Option<Point3>,
    },
}

impl Shape {
    #[inline]
    fn eval(&self, t: f32) -> Point3 {
        match *self {
            Shape::Linear { p0, p1 } => p0 + (p1 - p0) * t,
            Shape::Bezier { p0, p1, p2 } => quadratic_bezier_point(p0, p1, p2, t),
            Shape::Ballistic {
                origin,
                velocity,
                gravity,
                duration,
                ..
            } => {
                let s = t * duration;
                origin + velocity * s + gravity * (0.5 * s * s)
            }
        }
    }

    #[inline]
    fn end(&self) -> Point3 {
        match *self {
            Shape::Linear { p1, .. } => p1,
            Shape::Bezier { p2, .. } => p2,
            Shape::Ballistic { landing, .. } => landing.unwrap_or_else(|| self.eval(1.0)),
        }
    }
}

/// Restartable iterator over `segments + 1` curve samples.
///
/// Sample `i` is the curve evaluated at `t = i / segments`. The last sample is the
/// curve's end control point exactly, not a floating-point approximation of it.
#[derive(Clone, Debug)]
pub struct CurveSampler {
    shape: Shape,
    segments: usize,
    start: usize,
    next: usize,
}

impl CurveSampler {
    fn new(shape: Shape, segments: usize, start: usize) -> Self {
        let segments = segments.max(1);
        let start = start.min(segments + 1);
        Self {
            shape,
            segments,
            start,
            next: start,
        }
    }

    /// Rewind to the first sample.
    pub fn restart(&mut self) {
        self.next = self.start;
    }

    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Sample `i` regardless of the iterator position. Returns `None` past the end.
    pub fn sample(&self, i: usize) -> Option<Point3> {
        if i > self.segments {
            return None;
        }
        if i == self.segments {
            return Some(self.shape.end());
        }
        let t = i as f32 / self.segments as f32;
        Some(self.shape.eval(t))
    }
}

impl Iterator for CurveSampler {
    type Item = Point3;

    fn next(&mut self) -> Option<Point3> {
        let point = self.sample(self.next)?;
        self.next += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.segments + 1).saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for CurveSampler {}

/// Evenly spaced samples on the segment `p0 → p1`.
pub fn linear(p0: Point3, p1: Point3, segments: usize) -> CurveSampler {
    linear_from(p0, p1, segments, 0)
}

/// Like [`linear`], skipping the first `start_index` samples.
pub fn linear_from(p0: Point3, p1: Point3, segments: usize, start_index: usize) -> CurveSampler {
    CurveSampler::new(Shape::Linear { p0, p1 }, segments, start_index)
}

/// Samples of the quadratic Bezier with control points `p0, p1, p2`.
pub fn quadratic_bezier(p0: Point3, p1: Point3, p2: Point3, segments: usize) -> CurveSampler {
    CurveSampler::new(Shape::Bezier { p0, p1, p2 }, segments, 0)
}

/// `(1−t)²·p0 + 2(1−t)t·p1 + t²·p2`
#[inline]
pub fn quadratic_bezier_point(p0: Point3, p1: Point3, p2: Point3, t: f32) -> Point3 {
    let u = 1.0 - t;
    let a = u * u;
    let b = 2.0 * u * t;
    let c = t * t;
    Point3::from(p0.coords * a + p1.coords * b + p2.coords * c)
}

/// Projectile arc from `origin` launched with `velocity` under `gravity`, ending where it
/// first crosses the plane `y = floor_y`, or at `max_time` if it never does. When the
/// floor is reached the last sample lies exactly on it.
pub fn parabolic(
    origin: Point3,
    velocity: Vec3,
    gravity: Vec3,
    floor_y: f32,
    segments: usize,
    max_time: f32,
) -> CurveSampler {
    let max_time = max_time.max(0.0);
    let (duration, landing) = match floor_crossing_time(origin.y, velocity.y, gravity.y, floor_y) {
        Some(t) if t <= max_time => {
            let mut landing = ballistic_point(origin, velocity, gravity, t);
            landing.y = floor_y;
            (t, Some(landing))
        }
        _ => (max_time, None),
    };

    CurveSampler::new(
        Shape::Ballistic {
            origin,
            velocity,
            gravity,
            duration,
            landing,
        },
        segments,
        0,
    )
}

/// Projectile arc flown for exactly `duration` seconds and ending on `landing`.
pub fn parabolic_to(
    origin: Point3,
    velocity: Vec3,
    gravity: Vec3,
    duration: f32,
    landing: Point3,
    segments: usize,
) -> CurveSampler {
    CurveSampler::new(
        Shape::Ballistic {
            origin,
            velocity,
            gravity,
            duration: duration.max(0.0),
            landing: Some(landing),
        },
        segments,
        0,
    )
}

/// How long [`parabolic`] flies before it stops.
pub fn parabolic_flight_time(
    origin: Point3,
    velocity: Vec3,
    gravity: Vec3,
    floor_y: f32,
    max_time: f32,
) -> f32 {
    let max_time = max_time.max(0.0);
    floor_crossing_time(origin.y, velocity.y, gravity.y, floor_y)
        .map_or(max_time, |t| t.min(max_time))
}

/// Time in `[from, to]` at which the arc passes height `y`, preferring the later
/// (descending) crossing when both fall in the window.
pub fn crossing_time_within(
    origin: Point3,
    velocity: Vec3,
    gravity: Vec3,
    y: f32,
    from: f32,
    to: f32,
) -> Option<f32> {
    let (lo, hi) = crossing_times(origin.y, velocity.y, gravity.y, y)?;
    [hi, lo].into_iter().find(|t| (from..=to).contains(t))
}

#[inline]
fn ballistic_point(origin: Point3, velocity: Vec3, gravity: Vec3, t: f32) -> Point3 {
    origin + velocity * t + gravity * (0.5 * t * t)
}

/// Both solutions of `y0 + vy*t + 0.5*gy*t^2 == y`, ascending. A linear path yields the
/// same root twice.
fn crossing_times(y0: f32, vy: f32, gy: f32, y: f32) -> Option<(f32, f32)> {
    let a = 0.5 * gy;
    let b = vy;
    let c = y0 - y;

    if a.abs() <= f32::EPSILON {
        if b.abs() <= f32::EPSILON {
            return None;
        }
        let t = -c / b;
        return Some((t, t));
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let t0 = (-b - sq) / (2.0 * a);
    let t1 = (-b + sq) / (2.0 * a);
    Some(if t0 <= t1 { (t0, t1) } else { (t1, t0) })
}

/// Earliest positive time at which `y0 + vy*t + 0.5*gy*t^2 == floor_y`.
fn floor_crossing_time(y0: f32, vy: f32, gy: f32, floor_y: f32) -> Option<f32> {
    let (lo, hi) = crossing_times(y0, vy, gy, floor_y)?;
    if lo > 0.0 {
        Some(lo)
    } else if hi > 0.0 {
        Some(hi)
    } else {
        None
    }
}

/// Point where a parabolic arc lands, if it reaches the floor within `max_time`.
pub fn parabolic_landing(
    origin: Point3,
    velocity: Vec3,
    gravity: Vec3,
    floor_y: f32,
    max_time: f32,
) -> Option<Point3> {
    let t = floor_crossing_time(origin.y, velocity.y, gravity.y, floor_y)?;
    if t > max_time {
        return None;
    }
    let mut landing = ballistic_point(origin, velocity, gravity, t);
    landing.y = floor_y;
    Some(landing)
}
