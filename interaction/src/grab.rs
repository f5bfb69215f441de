//! Grab arbitration: which object a hand attaches to, and how held objects follow hands.
//!
//! Every tick a [`Grabber`] reassesses the grabbable bodies overlapping its detection
//! sphere and picks one "current" candidate. A grip press then attaches to that
//! candidate. Holders are kept per grabbable in acquisition order: the first holder
//! drives position, a second one steers orientation.

use std::collections::{BTreeMap, HashMap};

use nalgebra as na;

use crate::scene::{BodyFlags, BodyId, Overlap, Scene, SceneQuery};
use crate::settings::{DEFAULT_MAX_HOLDERS, DIST_EPS, GrabberSettings};
use crate::targeting::Target;
use crate::types::{Handedness, Point3, Pose, Quat, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrabberId(pub u32);

impl From<Handedness> for GrabberId {
    fn from(hand: Handedness) -> Self {
        match hand {
            Handedness::Left => GrabberId(0),
            Handedness::Right => GrabberId(1),
        }
    }
}

/// Named attachment point on a grabbable.
#[derive(Clone, Debug, PartialEq)]
pub struct GrabTrigger {
    pub name: String,
    /// Pose of the attachment point in the object's local frame.
    pub local_pose: Pose,
    /// Align the object so this point sits exactly on the hand pivot.
    pub snap: bool,
}

impl GrabTrigger {
    pub fn new(name: impl Into<String>, local_pose: Pose, snap: bool) -> Self {
        Self {
            name: name.into(),
            local_pose,
            snap,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GrabbableConfig {
    pub max_holders: usize,
    /// Switch the body to kinematic while held, on top of disabling gravity.
    pub kinematic_while_held: bool,
    pub triggers: Vec<GrabTrigger>,
}

impl Default for GrabbableConfig {
    fn default() -> Self {
        Self {
            max_holders: DEFAULT_MAX_HOLDERS,
            kinematic_while_held: true,
            triggers: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Holder {
    grabber: GrabberId,
    /// Object pose expressed in the holder's pivot frame.
    offset: Pose,
}

#[derive(Clone, Debug)]
pub struct GrabbableState {
    pub body: BodyId,
    pub config: GrabbableConfig,
    holders: Vec<Holder>,
    saved_flags: Option<BodyFlags>,
    /// Object rotation relative to the primary→secondary look frame, captured when the
    /// second holder attached.
    two_hand_relative: Option<Quat>,
}

impl GrabbableState {
    fn new(body: BodyId, config: GrabbableConfig) -> Self {
        Self {
            body,
            config,
            holders: Vec::new(),
            saved_flags: None,
            two_hand_relative: None,
        }
    }

    /// Holders in acquisition order; the first is authoritative for position.
    pub fn holders(&self) -> Vec<GrabberId> {
        self.holders.iter().map(|h| h.grabber).collect()
    }

    pub fn is_held(&self) -> bool {
        !self.holders.is_empty()
    }

    fn holder_index(&self, grabber: GrabberId) -> Option<usize> {
        self.holders.iter().position(|h| h.grabber == grabber)
    }

    /// The trigger nearest to `hand` in world space, given the object pose.
    fn nearest_trigger(&self, object: &Pose, hand: &Pose) -> Option<&GrabTrigger> {
        let mut best: Option<(f32, &GrabTrigger)> = None;
        for trigger in &self.config.triggers {
            let world = object.transform_pose(&trigger.local_pose);
            let d = (world.translation - hand.translation).norm_squared();
            if best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, trigger));
            }
        }
        best.map(|(_, t)| t)
    }
}

/// Where a grab candidate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandidateSource {
    Proximity,
    Pointer,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub body: BodyId,
    pub anchor: Point3,
    pub source: CandidateSource,
}

/// Choose at most one body to attach to.
///
/// Nearest overlapping anchor by Euclidean distance to `origin`; ties keep the first
/// encountered. With no overlaps, a pointer target carrying the grabbable marker is used.
pub fn select_candidate(
    origin: Point3,
    overlaps: &[Overlap],
    pointer: Option<&Target>,
    is_grabbable: impl Fn(BodyId) -> bool,
) -> Option<Candidate> {
    let mut best: Option<(f32, &Overlap)> = None;
    for overlap in overlaps {
        let d = (overlap.anchor - origin).norm_squared();
        if best.is_none_or(|(bd, _)| d < bd) {
            best = Some((d, overlap));
        }
    }
    if let Some((_, overlap)) = best {
        return Some(Candidate {
            body: overlap.body,
            anchor: overlap.anchor,
            source: CandidateSource::Proximity,
        });
    }

    let target = pointer?;
    is_grabbable(target.body).then_some(Candidate {
        body: target.body,
        anchor: target.point,
        source: CandidateSource::Pointer,
    })
}

/// Detection volume attached to a hand.
#[derive(Clone, Debug)]
pub struct Grabber {
    pub id: GrabberId,
    pub settings: GrabberSettings,
    /// Hand pivot the held object is attached to.
    pivot: Pose,
    candidates: Vec<Overlap>,
    current: Option<Candidate>,
    held: Option<BodyId>,
}

impl Grabber {
    pub fn new(id: GrabberId, settings: GrabberSettings) -> Self {
        Self {
            id,
            settings,
            pivot: Pose::identity(),
            candidates: Vec::new(),
            current: None,
            held: None,
        }
    }

    pub fn pivot(&self) -> Pose {
        self.pivot
    }

    pub fn held(&self) -> Option<BodyId> {
        self.held
    }

    pub fn current(&self) -> Option<Candidate> {
        self.current
    }

    /// Grabbable bodies overlapping the detection sphere as of the last reassessment.
    pub fn candidates(&self) -> &[Overlap] {
        &self.candidates
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GrabEvent {
    Grabbed {
        grabber: GrabberId,
        body: BodyId,
        snapped: bool,
    },
    Released {
        grabber: GrabberId,
        body: BodyId,
        /// The object became free and received the hand's velocity.
        tossed: bool,
    },
    /// The remaining holder became primary after the first holder let go.
    Promoted { grabber: GrabberId, body: BodyId },
}

/// Owns every grabber and grabbable state and arbitrates between them.
#[derive(Debug, Default)]
pub struct GrabRegistry {
    grabbers: BTreeMap<GrabberId, Grabber>,
    grabbables: HashMap<BodyId, GrabbableState>,
}

/// Rotation of `object` relative to the look frame from the first holder to the second.
/// `None` with fewer than two holders.
fn blend_relative(
    grabbers: &BTreeMap<GrabberId, Grabber>,
    holders: &[Holder],
    object: &Pose,
) -> Option<Quat> {
    let [primary, secondary, ..] = holders else {
        return None;
    };
    let from = grabbers.get(&primary.grabber)?.pivot;
    let to = grabbers.get(&secondary.grabber)?.pivot;
    look_rotation(&from, &to).map(|look| look.inverse() * object.rotation)
}

fn look_rotation(from: &Pose, to: &Pose) -> Option<Quat> {
    let dir = to.translation - from.translation;
    if dir.norm_squared() <= DIST_EPS {
        return None;
    }
    let up = from.rotation * Vec3::y();
    let up = if dir.cross(&up).norm_squared() <= DIST_EPS {
        from.rotation * Vec3::z()
    } else {
        up
    };
    Some(na::UnitQuaternion::face_towards(&dir, &up))
}

impl GrabRegistry {
    pub fn add_grabber(&mut self, id: GrabberId, settings: GrabberSettings) {
        self.grabbers.insert(id, Grabber::new(id, settings));
    }

    pub fn grabber(&self, id: GrabberId) -> Option<&Grabber> {
        self.grabbers.get(&id)
    }

    pub fn grabbable(&self, body: BodyId) -> Option<&GrabbableState> {
        self.grabbables.get(&body)
    }

    /// Register or reconfigure a grabbable. Bodies that carry the grabbable marker but were
    /// never registered get [`GrabbableConfig::default`] on first grab.
    pub fn register(&mut self, body: BodyId, config: GrabbableConfig) {
        self.grabbables
            .entry(body)
            .and_modify(|s| s.config = config.clone())
            .or_insert_with(|| GrabbableState::new(body, config));
    }

    pub fn holders(&self, body: BodyId) -> Vec<GrabberId> {
        self.grabbables
            .get(&body)
            .map(|s| s.holders())
            .unwrap_or_default()
    }

    pub fn set_pivot(&mut self, id: GrabberId, pivot: Pose) {
        if let Some(grabber) = self.grabbers.get_mut(&id) {
            grabber.pivot = pivot;
        }
    }

    /// Refresh overlap candidates and the current pick for one grabber.
    pub fn reassess(&mut self, scene: &impl SceneQuery, id: GrabberId, pointer: Option<&Target>) {
        let Some(grabber) = self.grabbers.get_mut(&id) else {
            return;
        };
        let origin = grabber.pivot.point();
        grabber.candidates = scene
            .overlap_sphere(origin, grabber.settings.radius)
            .into_iter()
            .filter(|o| scene.is_grabbable(o.body))
            .collect();

        let pointer = pointer.filter(|_| grabber.settings.distance_grab);
        grabber.current = select_candidate(origin, &grabber.candidates, pointer, |b| {
            scene.is_grabbable(b)
        });
    }

    /// Attach the grabber to its current candidate, if any.
    pub fn begin_grab(&mut self, scene: &mut impl Scene, id: GrabberId) -> Option<GrabEvent> {
        let candidate = self.grabbers.get(&id)?.current?;
        self.attach(scene, id, candidate.body)
    }

    /// Attach `id` to `body`.
    ///
    /// No-op when the grabber already holds something (including this body), or the
    /// grabbable is at capacity.
    pub fn attach(
        &mut self,
        scene: &mut impl Scene,
        id: GrabberId,
        body: BodyId,
    ) -> Option<GrabEvent> {
        let grabber = self.grabbers.get(&id)?;
        if grabber.held.is_some() {
            return None;
        }
        let pivot = grabber.pivot;
        let object = scene.pose(body)?;

        let state = self
            .grabbables
            .entry(body)
            .or_insert_with(|| GrabbableState::new(body, GrabbableConfig::default()));
        if state.holder_index(id).is_some() || state.holders.len() >= state.config.max_holders {
            return None;
        }

        if state.holders.is_empty() {
            let flags = scene.flags(body).unwrap_or_default();
            state.saved_flags = Some(flags);
            scene.set_flags(
                body,
                BodyFlags {
                    gravity: false,
                    kinematic: flags.kinematic || state.config.kinematic_while_held,
                },
            );
            scene.set_velocity(body, Vec3::zeros(), Vec3::zeros());
        }

        // Only the primary holder snaps; later holders keep the object where it is.
        let snap_trigger = state
            .holders
            .is_empty()
            .then(|| state.nearest_trigger(&object, &pivot))
            .flatten()
            .filter(|t| t.snap)
            .cloned();
        let snapped = snap_trigger.is_some();
        let offset = match &snap_trigger {
            Some(trigger) => {
                let offset = trigger.local_pose.inverse();
                scene.set_pose(body, pivot.transform_pose(&offset));
                offset
            }
            None => pivot.relative_to(&object),
        };

        state.holders.push(Holder {
            grabber: id,
            offset,
        });

        // Holders past the second leave the blend frame untouched.
        if state.holders.len() == 2 {
            let object = scene.pose(body).unwrap_or(object);
            state.two_hand_relative = blend_relative(&self.grabbers, &state.holders, &object);
        }

        if let Some(grabber) = self.grabbers.get_mut(&id) {
            grabber.held = Some(body);
        }
        log::debug!("{id:?} grabbed {body:?} (snap: {snapped})");
        Some(GrabEvent::Grabbed {
            grabber: id,
            body,
            snapped,
        })
    }

    /// Release whatever `id` holds. `linear`/`angular` are the hand's velocities at release.
    ///
    /// No-op for a grabber that holds nothing.
    pub fn detach(
        &mut self,
        scene: &mut impl Scene,
        id: GrabberId,
        linear: Vec3,
        angular: Vec3,
    ) -> Vec<GrabEvent> {
        let mut events = Vec::new();
        let Some(body) = self.grabbers.get(&id).and_then(|g| g.held) else {
            return events;
        };
        if let Some(grabber) = self.grabbers.get_mut(&id) {
            grabber.held = None;
        }
        let Some(state) = self.grabbables.get_mut(&body) else {
            return events;
        };
        let Some(index) = state.holder_index(id) else {
            return events;
        };
        state.holders.remove(index);

        if state.holders.is_empty() {
            if let Some(flags) = state.saved_flags.take() {
                scene.set_flags(body, flags);
            }
            scene.set_velocity(body, linear, angular);
            log::debug!("{id:?} released {body:?}");
            events.push(GrabEvent::Released {
                grabber: id,
                body,
                tossed: true,
            });
            return events;
        }

        events.push(GrabEvent::Released {
            grabber: id,
            body,
            tossed: false,
        });

        // Re-anchor the remaining holders to where the object is now.
        let object = scene.pose(body);
        if let Some(object) = object {
            for holder in state.holders.iter_mut() {
                if let Some(g) = self.grabbers.get(&holder.grabber) {
                    holder.offset = g.pivot.relative_to(&object);
                }
            }
        }
        state.two_hand_relative =
            object.and_then(|object| blend_relative(&self.grabbers, &state.holders, &object));
        if index == 0 {
            let promoted = state.holders[0].grabber;
            log::debug!("{promoted:?} promoted to primary on {body:?}");
            events.push(GrabEvent::Promoted {
                grabber: promoted,
                body,
            });
        }
        events
    }

    /// Drive every held object from its holders' pivots. Runs once per tick after pivots
    /// are updated.
    pub fn update_held(&self, scene: &mut impl Scene) {
        for state in self.grabbables.values() {
            let Some(primary) = state.holders.first() else {
                continue;
            };
            let Some(primary_pivot) = self.grabbers.get(&primary.grabber).map(|g| g.pivot) else {
                continue;
            };
            let mut target = primary_pivot.transform_pose(&primary.offset);

            if let (Some(secondary), Some(relative)) =
                (state.holders.get(1), state.two_hand_relative)
            {
                let look = self
                    .grabbers
                    .get(&secondary.grabber)
                    .and_then(|g| look_rotation(&primary_pivot, &g.pivot));
                if let Some(look) = look {
                    target.rotation = look * relative;
                }
            }

            scene.set_pose(state.body, target);
            if !state.config.kinematic_while_held {
                scene.set_velocity(state.body, Vec3::zeros(), Vec3::zeros());
            }
        }
    }
}
