/*!
Core math aliases and small value types shared by the interaction modules.

This module intentionally contains no algorithms beyond pose composition. It defines
the data exchanged between:
- curve (pointer and arc sample generation)
- scene (physics queries and body control)
- targeting, grab, pointer and locomotion
*/

use nalgebra as na;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Vec2 = na::Vector2<f32>;
pub type Point3 = na::Point3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

/// World up axis. The rig, floors and headroom checks all assume +Y is up.
#[inline]
pub fn up() -> Vec3 {
    Vec3::y()
}

/// A rigid pose (position + orientation) in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    #[inline]
    pub fn identity() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }

    #[inline]
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::identity(),
        }
    }

    /// Convert to nalgebra `Isometry3` for use with rapier queries.
    #[inline]
    pub fn iso(&self) -> Iso {
        Iso::from_parts(
            na::Translation3::new(self.translation.x, self.translation.y, self.translation.z),
            self.rotation,
        )
    }

    #[inline]
    pub fn from_iso(iso: &Iso) -> Self {
        Self {
            translation: iso.translation.vector,
            rotation: iso.rotation,
        }
    }

    #[inline]
    pub fn point(&self) -> Point3 {
        Point3::from(self.translation)
    }

    /// Local -Z, the pointing direction of a tracked controller.
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::z()
    }

    #[inline]
    pub fn inverse(&self) -> Pose {
        let rotation = self.rotation.inverse();
        Pose {
            translation: rotation * -self.translation,
            rotation,
        }
    }

    /// `self * local`: place a pose expressed in this pose's frame into world space.
    #[inline]
    pub fn transform_pose(&self, local: &Pose) -> Pose {
        Pose {
            translation: self.translation + self.rotation * local.translation,
            rotation: self.rotation * local.rotation,
        }
    }

    /// Express `world` in this pose's local frame.
    #[inline]
    pub fn relative_to(&self, world: &Pose) -> Pose {
        self.inverse().transform_pose(world)
    }
}

/// Which hand a controller, grabber or pointer belongs to.
#[derive(Debug, PartialEq, Clone, Copy, Eq, PartialOrd, Ord, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Handedness::Left => "left",
            Handedness::Right => "right",
        }
    }
}

/// Per-hand pair of values, indexed by [`Handedness`].
#[derive(Clone, Debug, Default)]
pub struct Handed<T> {
    pub left: T,
    pub right: T,
}

impl<T> Handed<T> {
    pub fn get(&self, hand: Handedness) -> &T {
        match hand {
            Handedness::Left => &self.left,
            Handedness::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, hand: Handedness) -> &mut T {
        match hand {
            Handedness::Left => &mut self.left,
            Handedness::Right => &mut self.right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn relative_then_transform_is_identity() {
        let parent = Pose::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_axis_angle(&Vec3::y_axis(), 0.7),
        );
        let child = Pose::new(
            Vec3::new(-4.0, 0.5, 2.0),
            Quat::from_axis_angle(&Vec3::x_axis(), -0.3),
        );

        let local = parent.relative_to(&child);
        let back = parent.transform_pose(&local);

        assert_relative_eq!(back.translation, child.translation, epsilon = 1.0e-5);
        assert!(back.rotation.angle_to(&child.rotation) < 1.0e-5);
    }

    #[test]
    fn identity_forward_is_negative_z() {
        assert_relative_eq!(Pose::identity().forward(), -Vec3::z());
    }
}
