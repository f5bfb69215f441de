//! Pointer target acquisition: a single ray first, then a volumetric scan.
//!
//! The volumetric fallback lays a row of probes end to end along the pointer range and
//! scores every overlapping body. Alignment is measured from each probe's own near end,
//! so a body deep in a far probe is judged against that probe rather than the hand.

use nalgebra as na;

use crate::scene::{BodyId, SceneQuery};
use crate::settings::DIST_EPS;
use crate::types::{Point3, Pose, Vec3};

/// How a target was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetSource {
    Ray,
    Volume,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub body: BodyId,
    /// Ray hit point, or the body's anchor for volumetric matches.
    pub point: Point3,
    /// Surface normal at `point`; volumetric matches have none.
    pub normal: Option<Vec3>,
    pub source: TargetSource,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProbeShape {
    /// Box with this half-width across the ray.
    Box { half_width: f32 },
    /// Cylinder with this radius around the ray.
    Cylinder { radius: f32 },
}

/// Volumetric fallback configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbeSet {
    pub shape: ProbeShape,
    pub segments: usize,
}

impl ProbeSet {
    pub fn boxes(half_width: f32, segments: usize) -> Self {
        Self {
            shape: ProbeShape::Box { half_width },
            segments,
        }
    }

    pub fn cylinders(radius: f32, segments: usize) -> Self {
        Self {
            shape: ProbeShape::Cylinder { radius },
            segments,
        }
    }
}

/// One probe volume: its near end on the ray, and its center pose.
#[derive(Clone, Copy, Debug)]
struct Probe {
    start: Point3,
    center: Pose,
    half_length: f32,
}

fn probes(origin: Point3, forward: Vec3, max_distance: f32, segments: usize) -> Vec<Probe> {
    let segments = segments.max(1);
    let length = max_distance / segments as f32;
    // Box probes extend along local +Z, cylinders along local +Y.
    let rotation = na::UnitQuaternion::face_towards(&forward, &any_perpendicular(&forward));

    (0..segments)
        .map(|i| {
            let start = origin + forward * (length * i as f32);
            let center = start + forward * (length * 0.5);
            Probe {
                start,
                center: Pose::new(center.coords, rotation),
                half_length: length * 0.5,
            }
        })
        .collect()
}

fn any_perpendicular(v: &Vec3) -> Vec3 {
    if v.y.abs() < 0.99 { Vec3::y() } else { Vec3::x() }
}

/// Alignment of `object` with the probe axis divided by its distance from the hand.
///
/// The alignment term is the sine of the object's elevation out of the plane
/// perpendicular to `forward` at `probe_origin`, i.e. `cos` of its angle to `forward`.
/// For equidistant objects the one closer to the axis scores higher. Objects behind the
/// probe start score negative.
///
/// Returns `None` for objects coincident with `origin` or `probe_origin`.
pub fn volumetric_score(
    origin: Point3,
    probe_origin: Point3,
    forward: Vec3,
    object: Point3,
) -> Option<f32> {
    let distance = (object - origin).norm();
    let to_object = object - probe_origin;
    let len = to_object.norm();
    let fwd_len = forward.norm();
    if distance <= DIST_EPS || len <= DIST_EPS || fwd_len <= DIST_EPS {
        return None;
    }
    let alignment = (to_object.dot(&forward) / (len * fwd_len)).clamp(-1.0, 1.0);
    Some(alignment / distance)
}

/// Find what the pointer is aiming at.
///
/// Ray first; on a miss, run the probe scan and keep the best-scoring body. `exclude`
/// bodies (e.g. the hand's own held object) are ignored by both phases. No match is
/// `None`, never an error.
pub fn acquire_target(
    scene: &impl SceneQuery,
    origin: Point3,
    forward: Vec3,
    max_distance: f32,
    probe_set: Option<ProbeSet>,
    exclude: &[BodyId],
) -> Option<Target> {
    let forward = forward.try_normalize(DIST_EPS)?;
    if max_distance <= 0.0 {
        return None;
    }

    if let Some(hit) = scene.cast_ray(origin, forward, max_distance, exclude) {
        return Some(Target {
            body: hit.body,
            point: hit.point,
            normal: Some(hit.normal),
            source: TargetSource::Ray,
        });
    }

    let probe_set = probe_set?;
    let mut best: Option<(f32, Target)> = None;

    for probe in probes(origin, forward, max_distance, probe_set.segments) {
        let overlaps = match probe_set.shape {
            ProbeShape::Box { half_width } => scene.overlap_box(
                &probe.center,
                Vec3::new(half_width, half_width, probe.half_length),
            ),
            ProbeShape::Cylinder { radius } => {
                // Rotate the cylinder's +Y axis onto the ray.
                let tilt = na::UnitQuaternion::from_axis_angle(
                    &Vec3::x_axis(),
                    std::f32::consts::FRAC_PI_2,
                );
                let pose = Pose::new(probe.center.translation, probe.center.rotation * tilt);
                scene.overlap_cylinder(&pose, radius, probe.half_length)
            }
        };

        for overlap in overlaps {
            if exclude.contains(&overlap.body) {
                continue;
            }
            let Some(score) = volumetric_score(origin, probe.start, forward, overlap.anchor)
            else {
                continue;
            };
            if best.as_ref().is_none_or(|(s, _)| score > *s) {
                best = Some((
                    score,
                    Target {
                        body: overlap.body,
                        point: overlap.anchor,
                        normal: None,
                        source: TargetSource::Volume,
                    },
                ));
            }
        }
    }

    if let Some((score, target)) = &best {
        log::trace!("volumetric target {:?} score {score}", target.body);
    }
    best.map(|(_, t)| t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::mock::MockScene;

    #[test]
    fn score_is_monotonic_in_angle_at_fixed_distance() {
        let origin = Point3::origin();
        let forward = -Vec3::z();
        let d = 5.0;
        let mut prev = None;
        // Equidistant candidates swept from 80° down to 0° off the axis.
        for deg in (0..=8).rev().map(|k| k as f32 * 10.0) {
            let a = deg.to_radians();
            let obj = Point3::new(d * a.sin(), 0.0, -d * a.cos());
            let s = volumetric_score(origin, origin, forward, obj).unwrap();
            if let Some(p) = prev {
                assert!(s > p, "score should rise as the angle narrows");
            }
            prev = Some(s);
        }
    }

    #[test]
    fn nearer_of_two_aligned_bodies_scores_higher() {
        let origin = Point3::origin();
        let forward = -Vec3::z();
        let near = volumetric_score(origin, origin, forward, Point3::new(0.0, 0.0, -2.0)).unwrap();
        let far = volumetric_score(origin, origin, forward, Point3::new(0.0, 0.0, -8.0)).unwrap();
        assert!(near > far);
    }

    #[test]
    fn ray_hit_wins_over_volume() {
        let mut scene = MockScene::default();
        let on_axis = scene.add_sphere(Vec3::new(0.0, 0.0, -4.0), 0.2, true);
        scene.add_sphere(Vec3::new(0.6, 0.0, -2.0), 0.2, true);

        let target = acquire_target(
            &scene,
            Point3::origin(),
            -Vec3::z(),
            10.0,
            Some(ProbeSet::boxes(1.0, 4)),
            &[],
        )
        .unwrap();
        assert_eq!(target.body, on_axis);
        assert_eq!(target.source, TargetSource::Ray);
    }

    #[test]
    fn volume_fallback_finds_off_axis_body() {
        let mut scene = MockScene::default();
        let near_miss = scene.add_sphere(Vec3::new(0.5, 0.0, -6.0), 0.1, true);

        let target = acquire_target(
            &scene,
            Point3::origin(),
            -Vec3::z(),
            10.0,
            Some(ProbeSet::cylinders(0.8, 5)),
            &[],
        )
        .unwrap();
        assert_eq!(target.body, near_miss);
        assert_eq!(target.source, TargetSource::Volume);
    }

    #[test]
    fn nothing_in_range_is_none() {
        let mut scene = MockScene::default();
        scene.add_sphere(Vec3::new(0.0, 0.0, 30.0), 0.5, true);
        assert!(
            acquire_target(
                &scene,
                Point3::origin(),
                -Vec3::z(),
                10.0,
                Some(ProbeSet::boxes(0.5, 4)),
                &[]
            )
            .is_none()
        );
    }

    #[test]
    fn excluded_bodies_are_ignored() {
        let mut scene = MockScene::default();
        let held = scene.add_sphere(Vec3::new(0.0, 0.0, -1.0), 0.2, true);
        assert!(
            acquire_target(&scene, Point3::origin(), -Vec3::z(), 10.0, None, &[held]).is_none()
        );
    }
}
