/*!
Teleport locomotion state machine.

`Idle → Preparing → Teleporting → Idle`. Preparation follows the pointer's floor hit
and validates headroom at the destination. Committing suspends the tracked bodies and
runs one of three transition strategies across ticks; every strategy restores the
tracked bodies and ambient movement when it completes.

A transition never aborts on its own. [`Locomotion::disable`] is the only way out of
`Teleporting` and it restores everything the commit changed.
*/

use std::str::FromStr;

use crate::error::InteractionError;
use crate::motion::{AmbientMovement, smooth_damp};
use crate::scene::{BodyFlags, BodyId, RayHit, Scene, SceneQuery};
use crate::settings::{DIST_EPS, LocomotionSettings};
use crate::types::{Point3, Pose, Vec3, up};

/// How the rig moves to a committed destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TeleportStrategy {
    /// Jump in a single tick.
    #[default]
    Instant,
    /// Fade out, swap the pose at the midpoint, fade back in.
    Fade,
    /// Critically damped glide until within the arrival epsilon.
    SmoothDamp,
}

impl TeleportStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeleportStrategy::Instant => "instant",
            TeleportStrategy::Fade => "fade",
            TeleportStrategy::SmoothDamp => "smooth_damp",
        }
    }
}

impl FromStr for TeleportStrategy {
    type Err = InteractionError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "instant" | "blink" => Ok(TeleportStrategy::Instant),
            "fade" => Ok(TeleportStrategy::Fade),
            "smooth_damp" | "smoothdamp" | "smooth-damp" | "smooth" => {
                Ok(TeleportStrategy::SmoothDamp)
            }
            _ => Err(InteractionError::UnknownTeleportStrategy(name.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LocomotionState {
    #[default]
    Idle,
    Preparing,
    Teleporting,
}

/// The destination marker. There is at most one per state machine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cursor {
    pub position: Point3,
    pub normal: Vec3,
    pub visible: bool,
    /// Headroom check passed; hosts color the cursor from this.
    pub valid: bool,
}

#[derive(Clone, Copy, Debug)]
enum Transition {
    Instant,
    Fade { elapsed: f32, swapped: bool },
    SmoothDamp { velocity: Vec3 },
}

/// Rig pose to apply this tick, produced while `Teleporting`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TeleportOutcome {
    pub rig: Pose,
    /// Screen fade, `0` clear to `1` black. Always `0` outside the fade strategy.
    pub fade_alpha: f32,
    /// The transition completed this tick and the machine is back in `Idle`.
    pub finished: bool,
}

#[derive(Debug, Default)]
pub struct Locomotion {
    pub settings: LocomotionSettings,
    state: LocomotionState,
    cursor: Option<Cursor>,
    destination: Option<Point3>,
    tracked: Vec<BodyId>,
    suspended: Vec<(BodyId, BodyFlags)>,
    transition: Option<Transition>,
    target: Pose,
}

impl Locomotion {
    pub fn new(settings: LocomotionSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn state(&self) -> LocomotionState {
        self.state
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Last valid destination recorded while preparing.
    pub fn destination(&self) -> Option<Point3> {
        self.destination
    }

    pub fn strategy(&self) -> TeleportStrategy {
        self.settings.strategy
    }

    /// Takes effect on the next commit; a running transition keeps its strategy.
    pub fn set_strategy(&mut self, strategy: TeleportStrategy) {
        self.settings.strategy = strategy;
    }

    pub fn set_strategy_by_name(&mut self, name: &str) -> crate::error::Result<()> {
        self.set_strategy(name.parse()?);
        Ok(())
    }

    /// Bodies whose simulation is suspended while a transition runs (e.g. held props
    /// that travel with the rig).
    pub fn track(&mut self, body: BodyId) {
        if !self.tracked.contains(&body) {
            self.tracked.push(body);
        }
    }

    /// Stop tracking `body`. A running transition no longer restores its flags, so a
    /// body released mid-teleport keeps the flags its release put back.
    pub fn untrack(&mut self, body: BodyId) {
        self.tracked.retain(|b| *b != body);
        self.suspended.retain(|(b, _)| *b != body);
    }

    /// Enter `Preparing`. Only from `Idle`, and only with a pointer to aim with.
    pub fn start_selection(
        &mut self,
        pointer_present: bool,
        movement: &mut AmbientMovement,
    ) -> bool {
        if self.state != LocomotionState::Idle || !pointer_present {
            return false;
        }
        self.state = LocomotionState::Preparing;
        self.destination = None;
        movement.set_enabled(false);
        self.cursor.get_or_insert(Cursor {
            position: Point3::origin(),
            normal: up(),
            visible: true,
            valid: false,
        });
        log::debug!("teleport selection started");
        true
    }

    /// Track the pointer's floor hit while preparing.
    ///
    /// No hit hides the cursor and keeps the last valid destination. A hit with blocked
    /// headroom shows an invalid cursor and clears the destination.
    pub fn update_preparing(&mut self, scene: &impl SceneQuery, floor_hit: Option<&RayHit>) {
        if self.state != LocomotionState::Preparing {
            return;
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return;
        };
        let Some(hit) = floor_hit else {
            cursor.visible = false;
            return;
        };

        let lift = up() * self.settings.arrival_eps.max(DIST_EPS);
        let blocked = scene
            .cast_ray(
                hit.point + lift,
                up(),
                self.settings.player_height,
                &[hit.body],
            )
            .is_some();

        cursor.position = hit.point;
        cursor.normal = hit.normal;
        cursor.visible = true;
        cursor.valid = !blocked;
        self.destination = (!blocked).then_some(hit.point);
    }

    pub fn cancel_selection(&mut self, movement: &mut AmbientMovement) {
        if self.state != LocomotionState::Preparing {
            return;
        }
        self.state = LocomotionState::Idle;
        self.cursor = None;
        self.destination = None;
        movement.set_enabled(true);
        log::debug!("teleport selection cancelled");
    }

    /// Start the transition toward the recorded destination.
    ///
    /// `rig` is the current play-space origin and `head` the tracked head in world space;
    /// the rig lands so the head ends up above the destination. No-op unless preparing
    /// with a valid destination.
    pub fn commit(&mut self, scene: &mut impl Scene, rig: Pose, head: Pose) -> bool {
        if self.state != LocomotionState::Preparing {
            return false;
        }
        let Some(destination) = self.destination else {
            return false;
        };

        let head_offset = head.translation - rig.translation;
        let planar = Vec3::new(head_offset.x, 0.0, head_offset.z);
        self.target = Pose::new(destination.coords - planar, rig.rotation);

        self.suspended.clear();
        for &body in &self.tracked {
            if let Some(flags) = scene.flags(body) {
                self.suspended.push((body, flags));
                scene.set_flags(
                    body,
                    BodyFlags {
                        kinematic: false,
                        ..flags
                    },
                );
            }
        }

        self.cursor = None;
        self.state = LocomotionState::Teleporting;
        self.transition = Some(match self.settings.strategy {
            TeleportStrategy::Instant => Transition::Instant,
            TeleportStrategy::Fade => Transition::Fade {
                elapsed: 0.0,
                swapped: false,
            },
            TeleportStrategy::SmoothDamp => Transition::SmoothDamp {
                velocity: Vec3::zeros(),
            },
        });
        log::info!(
            "teleporting to ({:.2}, {:.2}, {:.2}) via {}",
            destination.x,
            destination.y,
            destination.z,
            self.settings.strategy.as_str()
        );
        true
    }

    /// Advance a running transition by one tick. `None` unless `Teleporting`.
    pub fn tick(
        &mut self,
        scene: &mut impl Scene,
        rig: Pose,
        dt: f32,
        movement: &mut AmbientMovement,
    ) -> Option<TeleportOutcome> {
        if self.state != LocomotionState::Teleporting {
            return None;
        }
        let transition = self.transition.as_mut()?;
        let dt = dt.max(0.0);

        let (pose, fade_alpha, finished) = match transition {
            Transition::Instant => (self.target, 0.0, true),
            Transition::Fade { elapsed, swapped } => {
                let duration = self.settings.fade_duration.max(DIST_EPS);
                let half = duration * 0.5;
                *elapsed += dt;
                if *elapsed >= half {
                    *swapped = true;
                }
                let alpha = if *elapsed < half {
                    *elapsed / half
                } else {
                    1.0 - (*elapsed - half) / half
                };
                let pose = if *swapped { self.target } else { rig };
                let finished = *elapsed >= duration;
                (pose, alpha.clamp(0.0, 1.0), finished)
            }
            Transition::SmoothDamp { velocity } => {
                let step = smooth_damp(
                    rig.translation,
                    self.target.translation,
                    *velocity,
                    self.settings.smooth_time,
                    dt,
                );
                *velocity = step.velocity;
                let close = (self.target.translation - step.position).norm()
                    <= self.settings.arrival_eps;
                if step.arrived || close {
                    (self.target, 0.0, true)
                } else {
                    (Pose::new(step.position, rig.rotation), 0.0, false)
                }
            }
        };

        if finished {
            self.finish(scene, movement);
        }
        Some(TeleportOutcome {
            rig: pose,
            fade_alpha: if finished { 0.0 } else { fade_alpha },
            finished,
        })
    }

    /// Abandon whatever is in progress and put everything back.
    pub fn disable(&mut self, scene: &mut impl Scene, movement: &mut AmbientMovement) {
        if self.state == LocomotionState::Idle {
            return;
        }
        log::debug!("locomotion disabled in {:?}", self.state);
        self.finish(scene, movement);
    }

    fn finish(&mut self, scene: &mut impl Scene, movement: &mut AmbientMovement) {
        for (body, flags) in self.suspended.drain(..) {
            scene.set_flags(body, flags);
        }
        self.transition = None;
        self.destination = None;
        self.cursor = None;
        self.state = LocomotionState::Idle;
        movement.set_enabled(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::BodyControl;
    use crate::scene::mock::MockScene;
    use approx::assert_relative_eq;

    fn floor_hit(floor: BodyId, x: f32, z: f32) -> RayHit {
        RayHit {
            body: floor,
            point: Point3::new(x, 0.0, z),
            normal: up(),
            distance: 1.0,
        }
    }

    fn prepared(strategy: TeleportStrategy) -> (Locomotion, MockScene, AmbientMovement, BodyId) {
        let mut scene = MockScene::default();
        let floor = scene.add_floor(0.0);
        let prop = scene.add_sphere(Vec3::new(0.0, 1.0, 0.0), 0.1, true);
        scene.bodies[prop.0 as usize].flags.kinematic = true;

        let mut loco = Locomotion::new(LocomotionSettings {
            strategy,
            ..Default::default()
        });
        loco.track(prop);
        let mut movement = AmbientMovement::default();
        assert!(loco.start_selection(true, &mut movement));
        let hit = floor_hit(floor, 3.0, -4.0);
        loco.update_preparing(&scene, Some(&hit));
        assert!(loco.commit(&mut scene, Pose::identity(), Pose::identity()));
        (loco, scene, movement, prop)
    }

    #[test]
    fn commit_in_idle_is_noop() {
        let mut scene = MockScene::default();
        let mut loco = Locomotion::default();
        assert!(!loco.commit(&mut scene, Pose::identity(), Pose::identity()));
        assert_eq!(loco.state(), LocomotionState::Idle);
    }

    #[test]
    fn double_start_keeps_one_cursor() {
        let mut loco = Locomotion::default();
        let mut movement = AmbientMovement::default();
        assert!(loco.start_selection(true, &mut movement));
        assert!(!loco.start_selection(true, &mut movement));
        assert!(loco.cursor().is_some());
        assert_eq!(loco.state(), LocomotionState::Preparing);
        assert!(!movement.is_enabled());
    }

    #[test]
    fn start_requires_pointer() {
        let mut loco = Locomotion::default();
        let mut movement = AmbientMovement::default();
        assert!(!loco.start_selection(false, &mut movement));
        assert_eq!(loco.state(), LocomotionState::Idle);
        assert!(movement.is_enabled());
    }

    #[test]
    fn missing_floor_hides_cursor_and_keeps_state() {
        let scene = MockScene::default();
        let mut loco = Locomotion::default();
        let mut movement = AmbientMovement::default();
        loco.start_selection(true, &mut movement);
        loco.update_preparing(&scene, None);
        assert_eq!(loco.state(), LocomotionState::Preparing);
        assert!(!loco.cursor().unwrap().visible);
    }

    #[test]
    fn blocked_headroom_is_invalid_and_cannot_commit() {
        let mut scene = MockScene::default();
        let floor = scene.add_floor(0.0);
        scene.add_sphere(Vec3::new(2.0, 1.0, 0.0), 0.3, false);
        let mut loco = Locomotion::default();
        let mut movement = AmbientMovement::default();
        loco.start_selection(true, &mut movement);

        let hit = floor_hit(floor, 2.0, 0.0);
        loco.update_preparing(&scene, Some(&hit));
        let cursor = loco.cursor().unwrap();
        assert!(cursor.visible && !cursor.valid);
        assert!(!loco.commit(&mut scene, Pose::identity(), Pose::identity()));
        assert_eq!(loco.state(), LocomotionState::Preparing);
    }

    #[test]
    fn instant_completes_in_one_tick_and_restores_flags() {
        let (mut loco, mut scene, mut movement, prop) = prepared(TeleportStrategy::Instant);
        assert!(!scene.body(prop).flags.kinematic);
        assert!(loco.cursor().is_none());

        let out = loco
            .tick(&mut scene, Pose::identity(), 1.0 / 90.0, &mut movement)
            .unwrap();
        assert!(out.finished);
        assert_relative_eq!(out.rig.translation, Vec3::new(3.0, 0.0, -4.0));
        assert!(scene.body(prop).flags.kinematic);
        assert!(movement.is_enabled());
        assert_eq!(loco.state(), LocomotionState::Idle);
    }

    #[test]
    fn fade_swaps_at_midpoint() {
        let (mut loco, mut scene, mut movement, prop) = prepared(TeleportStrategy::Fade);
        loco.settings.fade_duration = 0.5;
        let rig = Pose::identity();

        let first = loco.tick(&mut scene, rig, 0.125, &mut movement).unwrap();
        assert_eq!(first.rig, rig);
        assert_relative_eq!(first.fade_alpha, 0.5);

        let mid = loco.tick(&mut scene, first.rig, 0.125, &mut movement).unwrap();
        assert_relative_eq!(mid.fade_alpha, 1.0);
        assert_relative_eq!(mid.rig.translation, Vec3::new(3.0, 0.0, -4.0));
        assert!(!mid.finished);
        assert!(!scene.body(prop).flags.kinematic);

        loco.tick(&mut scene, mid.rig, 0.125, &mut movement);
        let last = loco.tick(&mut scene, mid.rig, 0.125, &mut movement).unwrap();
        assert!(last.finished);
        assert_eq!(last.fade_alpha, 0.0);
        assert!(scene.body(prop).flags.kinematic);
        assert_eq!(loco.state(), LocomotionState::Idle);
    }

    #[test]
    fn smooth_damp_glides_until_arrival() {
        let (mut loco, mut scene, mut movement, prop) = prepared(TeleportStrategy::SmoothDamp);
        let mut rig = Pose::identity();
        let mut ticks = 0;
        loop {
            let out = loco.tick(&mut scene, rig, 1.0 / 90.0, &mut movement).unwrap();
            ticks += 1;
            rig = out.rig;
            if out.finished {
                break;
            }
            assert!(!scene.body(prop).flags.kinematic);
            assert!(ticks < 1_000);
        }
        assert!(ticks > 1);
        assert_relative_eq!(rig.translation, Vec3::new(3.0, 0.0, -4.0));
        assert!(scene.body(prop).flags.kinematic);
    }

    #[test]
    fn disable_mid_teleport_restores_everything() {
        let (mut loco, mut scene, mut movement, prop) = prepared(TeleportStrategy::Fade);
        loco.tick(&mut scene, Pose::identity(), 0.05, &mut movement);
        loco.disable(&mut scene, &mut movement);
        assert_eq!(loco.state(), LocomotionState::Idle);
        assert!(scene.body(prop).flags.kinematic);
        assert!(movement.is_enabled());
    }

    #[test]
    fn body_untracked_mid_teleport_keeps_its_flags() {
        let (mut loco, mut scene, mut movement, prop) = prepared(TeleportStrategy::Fade);
        loco.tick(&mut scene, Pose::identity(), 0.125, &mut movement);

        // Released mid-fade: the release restores the body's own flags.
        let released = BodyFlags::default();
        scene.set_flags(prop, released);
        loco.untrack(prop);

        let mut finished = false;
        for _ in 0..8 {
            let out = loco.tick(&mut scene, Pose::identity(), 0.125, &mut movement);
            if out.is_some_and(|o| o.finished) {
                finished = true;
                break;
            }
        }
        assert!(finished);
        assert_eq!(scene.flags(prop), Some(released));
    }

    #[test]
    fn head_offset_lands_head_over_destination() {
        let mut scene = MockScene::default();
        let floor = scene.add_floor(0.0);
        let mut loco = Locomotion::default();
        let mut movement = AmbientMovement::default();
        loco.start_selection(true, &mut movement);
        let hit = floor_hit(floor, 5.0, 0.0);
        loco.update_preparing(&scene, Some(&hit));
        let head = Pose::from_translation(Vec3::new(0.5, 1.7, 0.0));
        loco.commit(&mut scene, Pose::identity(), head);
        let out = loco
            .tick(&mut scene, Pose::identity(), 0.01, &mut movement)
            .unwrap();
        assert_relative_eq!(out.rig.translation, Vec3::new(4.5, 0.0, 0.0));
    }

    #[test]
    fn strategy_names() {
        assert_eq!(
            "Smooth_Damp".parse::<TeleportStrategy>(),
            Ok(TeleportStrategy::SmoothDamp)
        );
        assert_eq!("fade".parse::<TeleportStrategy>(), Ok(TeleportStrategy::Fade));
        assert!("warp".parse::<TeleportStrategy>().is_err());
    }
}
