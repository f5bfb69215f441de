//! Per-hand pointer: forward target, floor probe and the rendered curve.

use crate::curve::{self, CurveKind};
use crate::error::Result;
use crate::scene::{BodyId, RayHit, SceneQuery};
use crate::settings::{DIST_EPS, GRAVITY_MPS2, PointerSettings, SURFACE_OFFSET};
use crate::targeting::{ProbeSet, Target, acquire_target};
use crate::types::{Point3, Pose, Vec3, up};

#[derive(Clone, Debug)]
pub struct Pointer {
    pub settings: PointerSettings,
    active: bool,
    origin: Pose,
    forward_hit: Option<Target>,
    floor_hit: Option<RayHit>,
    endpoint: Point3,
    samples: Vec<Point3>,
}

impl Default for Pointer {
    fn default() -> Self {
        Self::new(PointerSettings::default())
    }
}

impl Pointer {
    pub fn new(settings: PointerSettings) -> Self {
        Self {
            settings,
            active: true,
            origin: Pose::identity(),
            forward_hit: None,
            floor_hit: None,
            endpoint: Point3::origin(),
            samples: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// An inactive pointer keeps no results and renders nothing.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.clear();
        }
    }

    pub fn curve(&self) -> CurveKind {
        self.settings.curve
    }

    pub fn set_curve(&mut self, kind: CurveKind) {
        if self.settings.curve != kind {
            log::debug!("pointer curve -> {}", kind.as_str());
        }
        self.settings.curve = kind;
    }

    pub fn set_curve_by_name(&mut self, name: &str) -> Result<()> {
        self.set_curve(name.parse()?);
        Ok(())
    }

    pub fn origin(&self) -> Pose {
        self.origin
    }

    /// What the forward ray (or volumetric fallback) is aimed at.
    pub fn forward_hit(&self) -> Option<&Target> {
        self.forward_hit.as_ref()
    }

    /// Floor below the forward endpoint, or where the arc lands for parabolic pointers.
    pub fn floor_hit(&self) -> Option<&RayHit> {
        self.floor_hit.as_ref()
    }

    /// Forward hit point, or the max-range point along the pointer.
    pub fn endpoint(&self) -> Point3 {
        self.endpoint
    }

    /// Curve samples from the last update; `segments + 1` points, empty when inactive.
    pub fn samples(&self) -> &[Point3] {
        &self.samples
    }

    fn clear(&mut self) {
        self.forward_hit = None;
        self.floor_hit = None;
        self.samples.clear();
    }

    /// Recompute targets and curve from the hand's pointer pose. `exclude` keeps the
    /// hand's own held object out of every cast.
    pub fn update(&mut self, scene: &impl SceneQuery, pose: Pose, exclude: &[BodyId]) {
        self.origin = pose;
        if !self.active {
            self.clear();
            return;
        }

        let s = self.settings;
        let origin = pose.point();
        let forward = pose.forward();
        let probes = s
            .volumetric_fallback
            .then(|| ProbeSet::cylinders(s.probe_radius, s.probe_segments));

        self.forward_hit = acquire_target(scene, origin, forward, s.max_distance, probes, exclude);
        let max_range = origin + forward * s.max_distance;
        self.endpoint = self.forward_hit.map_or(max_range, |t| t.point);

        self.samples.clear();
        match s.curve {
            CurveKind::Linear => {
                self.floor_hit = self.probe_floor(scene, exclude);
                self.samples
                    .extend(curve::linear(origin, self.endpoint, s.segments));
            }
            CurveKind::Bezier => {
                self.floor_hit = self.probe_floor(scene, exclude);
                let end = self.floor_hit.map_or(max_range, |h| h.point);
                self.samples.extend(curve::quadratic_bezier(
                    origin,
                    self.endpoint,
                    end,
                    s.segments,
                ));
            }
            CurveKind::Parabolic => self.update_arc(scene, origin, forward, exclude),
        }
    }

    /// Ground under the forward endpoint. A forward hit on a surface level enough to
    /// stand on is the floor itself; otherwise a downward ray is cast from just off the
    /// hit surface, or from inside a volumetric match with that body skipped.
    fn probe_floor(&self, scene: &impl SceneQuery, exclude: &[BodyId]) -> Option<RayHit> {
        let mut skip = exclude.to_vec();
        let mut start = self.endpoint;
        match self.forward_hit {
            Some(Target {
                body,
                point,
                normal: Some(normal),
                ..
            }) => {
                if normal.dot(&up()) >= self.settings.floor_slope_cos {
                    return Some(RayHit {
                        body,
                        point,
                        normal,
                        distance: 0.0,
                    });
                }
                start += normal * SURFACE_OFFSET;
            }
            Some(target) => skip.push(target.body),
            None => {}
        }
        scene.cast_ray(start, -up(), self.settings.floor_probe_distance, &skip)
    }

    /// Walk the arc segment by segment and stop it at the first surface it meets.
    fn update_arc(
        &mut self,
        scene: &impl SceneQuery,
        origin: Point3,
        forward: Vec3,
        exclude: &[BodyId],
    ) {
        let s = self.settings;
        let velocity = forward * s.arc_launch_speed;
        let gravity = -up() * GRAVITY_MPS2;
        let lowest = origin.y - s.floor_probe_distance;
        let flight =
            curve::parabolic_flight_time(origin, velocity, gravity, lowest, s.arc_max_time);

        let arc: Vec<Point3> =
            curve::parabolic(origin, velocity, gravity, lowest, s.segments, s.arc_max_time)
                .collect();
        let dt = flight / (arc.len() - 1).max(1) as f32;

        let landing = arc.windows(2).enumerate().find_map(|(i, w)| {
            let step = w[1] - w[0];
            let len = step.norm();
            if len <= DIST_EPS {
                return None;
            }
            let mut hit = scene.cast_ray(w[0], step, len, exclude)?;
            let (from, to) = (i as f32 * dt, (i + 1) as f32 * dt);
            // Level surfaces get the exact parabola crossing, anything else the chord
            // estimate.
            let exact = (hit.normal.dot(&up()) >= s.floor_slope_cos)
                .then(|| {
                    curve::crossing_time_within(origin, velocity, gravity, hit.point.y, from, to)
                })
                .flatten();
            let time = match exact {
                Some(t) => {
                    let y = hit.point.y;
                    hit.point = origin + velocity * t + gravity * (0.5 * t * t);
                    hit.point.y = y;
                    t
                }
                None => from + dt * hit.distance / len,
            };
            Some((hit, time))
        });

        self.floor_hit = landing.map(|(hit, _)| hit);
        match landing {
            Some((hit, time)) => self.samples.extend(curve::parabolic_to(
                origin, velocity, gravity, time, hit.point, s.segments,
            )),
            None => self.samples.extend(arc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::mock::MockScene;
    use approx::assert_relative_eq;

    fn standing() -> Pose {
        Pose::from_translation(Vec3::new(0.0, 1.5, 0.0))
    }

    fn pitched(radians: f32) -> Pose {
        Pose::new(
            Vec3::new(0.0, 1.5, 0.0),
            crate::types::Quat::from_axis_angle(&Vec3::x_axis(), radians),
        )
    }

    #[test]
    fn bezier_ends_on_floor_below_max_range() {
        let mut scene = MockScene::default();
        let floor = scene.add_floor(0.0);
        let mut pointer = Pointer::default();
        pointer.update(&scene, standing(), &[]);

        assert!(pointer.forward_hit().is_none());
        assert_relative_eq!(pointer.endpoint(), Point3::new(0.0, 1.5, -10.0));
        let hit = pointer.floor_hit().unwrap();
        assert_eq!(hit.body, floor);

        let samples = pointer.samples();
        assert_eq!(samples.len(), pointer.settings.segments + 1);
        assert_eq!(samples[0], Point3::new(0.0, 1.5, 0.0));
        assert_relative_eq!(samples[samples.len() - 1], Point3::new(0.0, 0.0, -10.0));
    }

    #[test]
    fn aiming_down_at_the_floor_lands_where_it_points() {
        let mut scene = MockScene::default();
        let floor = scene.add_floor(0.0);
        let mut pointer = Pointer::default();
        pointer.update(&scene, pitched(-std::f32::consts::FRAC_PI_4), &[]);

        assert_eq!(pointer.forward_hit().map(|t| t.body), Some(floor));
        let hit = pointer.floor_hit().unwrap();
        assert_eq!(hit.body, floor);
        assert_relative_eq!(hit.point, Point3::new(0.0, 0.0, -1.5), epsilon = 1.0e-4);
        let last = *pointer.samples().last().unwrap();
        assert_relative_eq!(last, hit.point);

        pointer.set_curve(CurveKind::Linear);
        pointer.update(&scene, pitched(-std::f32::consts::FRAC_PI_4), &[]);
        assert_eq!(pointer.floor_hit().map(|h| h.body), Some(floor));
    }

    #[test]
    fn floor_probe_steps_off_a_steep_hit() {
        let mut scene = MockScene::default();
        let floor = scene.add_floor(0.0);
        scene.add_sphere(Vec3::new(0.0, 1.5, -3.0), 0.5, false);
        let mut pointer = Pointer::default();
        pointer.update(&scene, standing(), &[]);

        let hit = pointer.floor_hit().unwrap();
        assert_eq!(hit.body, floor);
        assert_relative_eq!(hit.point.z, -2.5 + SURFACE_OFFSET, epsilon = 1.0e-4);
    }

    #[test]
    fn linear_stops_at_forward_hit() {
        let mut scene = MockScene::default();
        let wall = scene.add_sphere(Vec3::new(0.0, 1.5, -3.0), 0.5, false);
        let mut pointer = Pointer::default();
        pointer.set_curve(CurveKind::Linear);
        pointer.update(&scene, standing(), &[]);

        assert_eq!(pointer.forward_hit().map(|t| t.body), Some(wall));
        let last = *pointer.samples().last().unwrap();
        assert_relative_eq!(last, Point3::new(0.0, 1.5, -2.5), epsilon = 1.0e-5);
    }

    #[test]
    fn parabolic_arc_lands_on_floor() {
        let mut scene = MockScene::default();
        scene.add_floor(0.0);
        let mut pointer = Pointer::default();
        pointer.set_curve_by_name("arc").unwrap();
        pointer.update(&scene, standing(), &[]);

        let hit = pointer.floor_hit().unwrap();
        assert!(hit.point.y.abs() < 1.0e-4);
        let last = *pointer.samples().last().unwrap();
        assert!(last.y.abs() < 1.0e-3);
        // 8 m/s horizontally for sqrt(2 * 1.5 / 9.81) seconds.
        assert!((last.z + 4.424).abs() < 0.01);
    }

    #[test]
    fn arc_onto_a_raised_surface_ends_on_the_way_down() {
        let mut scene = MockScene::default();
        let platform = scene.add_floor(2.0);
        let mut pointer = Pointer::default();
        pointer.set_curve(CurveKind::Parabolic);
        pointer.update(&scene, pitched(std::f32::consts::FRAC_PI_4), &[]);

        let hit = *pointer.floor_hit().unwrap();
        assert_eq!(hit.body, platform);
        assert_eq!(hit.point.y, 2.0);
        // Descending through 2 m after about 1.06 s at 5.66 m/s forward.
        assert!((hit.point.z + 5.979).abs() < 0.01, "{}", hit.point.z);
        let samples = pointer.samples();
        assert_eq!(*samples.last().unwrap(), hit.point);
        assert!(samples[samples.len() / 2].y > 2.0);
    }

    #[test]
    fn unknown_curve_name_is_an_error() {
        let mut pointer = Pointer::default();
        assert!(pointer.set_curve_by_name("spiral").is_err());
        assert_eq!(pointer.curve(), CurveKind::Bezier);
    }

    #[test]
    fn inactive_pointer_reports_nothing() {
        let mut scene = MockScene::default();
        scene.add_floor(0.0);
        let mut pointer = Pointer::default();
        pointer.set_active(false);
        pointer.update(&scene, standing(), &[]);
        assert!(pointer.floor_hit().is_none());
        assert!(pointer.samples().is_empty());
    }
}
