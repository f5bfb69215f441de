use std::collections::VecDeque;

use nalgebra as na;

use crate::settings::{DIST_EPS, MovementSettings, VELOCITY_HISTORY};
use crate::types::{Pose, Quat, Vec2, Vec3};

/// Result of one [`smooth_damp`] step.
#[derive(Clone, Copy, Debug)]
pub struct SmoothDampResult {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Whether the step landed exactly on the target (overshoot was clamped).
    pub arrived: bool,
}

/// Critically damped spring toward `target`.
///
/// `smooth_time` is roughly the time to reach the target. The spring never overshoots:
/// when a step would pass the target, the result is clamped onto it with zero velocity.
#[inline]
pub fn smooth_damp(
    current: Vec3,
    target: Vec3,
    velocity: Vec3,
    smooth_time: f32,
    dt: f32,
) -> SmoothDampResult {
    let dt = dt.max(0.0);
    if dt <= 0.0 {
        return SmoothDampResult {
            position: current,
            velocity,
            arrived: false,
        };
    }

    let smooth_time = smooth_time.max(1.0e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    // Pade-style approximation of exp(-x).
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (velocity + change * omega) * dt;
    let mut new_velocity = (velocity - temp * omega) * decay;
    let mut position = target + (change + temp) * decay;

    let to_target = target - current;
    let past = position - target;
    let mut arrived = false;
    if to_target.dot(&past) > 0.0 {
        position = target;
        new_velocity = Vec3::zeros();
        arrived = true;
    }

    SmoothDampResult {
        position,
        velocity: new_velocity,
        arrived,
    }
}

/// Estimates a tracked pose's linear and angular velocity from its recent history.
///
/// Velocities are averaged over the window so a single jittery frame does not dominate
/// the release ("toss") velocity.
#[derive(Clone, Debug)]
pub struct VelocityTracker {
    samples: VecDeque<(f32, Pose)>,
    capacity: usize,
    clock: f32,
}

impl Default for VelocityTracker {
    fn default() -> Self {
        Self::new(VELOCITY_HISTORY)
    }
}

impl VelocityTracker {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            clock: 0.0,
        }
    }

    pub fn push(&mut self, pose: Pose, dt: f32) {
        self.clock += dt.max(0.0);
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((self.clock, pose));
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn linear(&self) -> Vec3 {
        let (Some((t0, first)), Some((t1, last))) = (self.samples.front(), self.samples.back())
        else {
            return Vec3::zeros();
        };
        let span = t1 - t0;
        if span <= DIST_EPS {
            return Vec3::zeros();
        }
        (last.translation - first.translation) / span
    }

    /// Angular velocity as axis * radians per second.
    pub fn angular(&self) -> Vec3 {
        let (Some((t0, first)), Some((t1, last))) = (self.samples.front(), self.samples.back())
        else {
            return Vec3::zeros();
        };
        let span = t1 - t0;
        if span <= DIST_EPS {
            return Vec3::zeros();
        }
        let delta = last.rotation * first.rotation.inverse();
        delta.scaled_axis() / span
    }
}

/// Thumbstick-driven walking and snap turning of the play-space rig.
///
/// Teleport preparation switches this off so the thumbstick can aim instead of walk.
#[derive(Clone, Debug)]
pub struct AmbientMovement {
    pub settings: MovementSettings,
    enabled: bool,
}

impl Default for AmbientMovement {
    fn default() -> Self {
        Self::new(MovementSettings::default())
    }
}

impl AmbientMovement {
    pub fn new(settings: MovementSettings) -> Self {
        Self {
            settings,
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::debug!("ambient movement {}", if enabled { "on" } else { "off" });
        }
        self.enabled = enabled;
    }

    /// Planar translation for this tick from a thumbstick value, relative to the heading of
    /// `head` (yaw only). `stick.y` forward, `stick.x` strafe right.
    pub fn walk(&self, head: &Pose, stick: Vec2, dt: f32) -> Vec3 {
        if !self.enabled || stick.norm_squared() <= DIST_EPS {
            return Vec3::zeros();
        }
        let forward = head.forward();
        let planar_fwd = Vec3::new(forward.x, 0.0, forward.z);
        let Some(planar_fwd) = planar_fwd.try_normalize(DIST_EPS) else {
            return Vec3::zeros();
        };
        let right = planar_fwd.cross(&Vec3::y());
        let stick = if stick.norm() > 1.0 {
            stick.normalize()
        } else {
            stick
        };
        (planar_fwd * stick.y + right * stick.x) * self.settings.walk_speed * dt.max(0.0)
    }

    /// Yaw rotation for one snap turn; positive `direction` turns right.
    pub fn snap_turn(&self, direction: f32) -> Option<Quat> {
        if !self.enabled || direction == 0.0 {
            return None;
        }
        let angle = -direction.signum() * self.settings.snap_turn_angle;
        Some(na::UnitQuaternion::from_axis_angle(&Vec3::y_axis(), angle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn smooth_damp_converges_without_overshoot() {
        let target = Vec3::new(3.0, 0.0, -4.0);
        let mut pos = Vec3::zeros();
        let mut vel = Vec3::zeros();
        let mut prev_dist = (target - pos).norm();

        for _ in 0..240 {
            let r = smooth_damp(pos, target, vel, 0.15, 1.0 / 90.0);
            pos = r.position;
            vel = r.velocity;
            let dist = (target - pos).norm();
            assert!(dist <= prev_dist + 1.0e-5);
            prev_dist = dist;
        }
        assert!(prev_dist < 1.0e-3);
    }

    #[test]
    fn smooth_damp_zero_dt_is_noop() {
        let r = smooth_damp(Vec3::x(), Vec3::zeros(), Vec3::zeros(), 0.2, 0.0);
        assert_eq!(r.position, Vec3::x());
        assert!(!r.arrived);
    }

    #[test]
    fn velocity_tracker_averages_linear_motion() {
        let mut tracker = VelocityTracker::new(4);
        for i in 0..6 {
            tracker.push(Pose::from_translation(Vec3::new(i as f32 * 0.1, 0.0, 0.0)), 0.1);
        }
        assert_relative_eq!(tracker.linear(), Vec3::new(1.0, 0.0, 0.0), epsilon = 1.0e-4);
    }

    #[test]
    fn velocity_tracker_reports_angular_motion() {
        let mut tracker = VelocityTracker::new(2);
        tracker.push(Pose::identity(), 0.5);
        tracker.push(
            Pose::new(Vec3::zeros(), Quat::from_axis_angle(&Vec3::y_axis(), 0.5)),
            0.5,
        );
        assert_relative_eq!(tracker.angular(), Vec3::new(0.0, 1.0, 0.0), epsilon = 1.0e-4);
    }

    #[test]
    fn disabled_movement_does_not_walk_or_turn() {
        let mut movement = AmbientMovement::default();
        movement.set_enabled(false);
        assert_eq!(
            movement.walk(&Pose::identity(), Vec2::new(0.0, 1.0), 1.0),
            Vec3::zeros()
        );
        assert!(movement.snap_turn(1.0).is_none());
    }

    #[test]
    fn walking_follows_head_heading() {
        let movement = AmbientMovement::default();
        let step = movement.walk(&Pose::identity(), Vec2::new(0.0, 1.0), 0.5);
        assert_relative_eq!(step, Vec3::new(0.0, 0.0, -1.0), epsilon = 1.0e-5);
    }
}
