//! Conversions between Bevy's glam math and the nalgebra types of the interaction core.

use bevy::prelude::*;
use interaction::types as na;
use nalgebra::{Quaternion, UnitQuaternion};

pub fn to_bevy(v: &na::Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn point_to_bevy(p: &na::Point3) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

pub fn to_na(v: Vec3) -> na::Vec3 {
    na::Vec3::new(v.x, v.y, v.z)
}

pub fn quat_to_bevy(q: &na::Quat) -> Quat {
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

pub fn quat_to_na(q: Quat) -> na::Quat {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

pub fn pose_to_transform(pose: &na::Pose) -> Transform {
    Transform {
        translation: to_bevy(&pose.translation),
        rotation: quat_to_bevy(&pose.rotation),
        scale: Vec3::ONE,
    }
}

pub fn pose_from(translation: Vec3, rotation: Quat) -> na::Pose {
    na::Pose::new(to_na(translation), quat_to_na(rotation))
}
