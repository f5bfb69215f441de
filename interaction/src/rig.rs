/*!
The play-space rig: two hands, their grabbers and pointers, locomotion and ambient
movement, advanced together once per fixed tick.

Within a tick the order is fixed:
1. hand poses and controller edges
2. pointers
3. grab candidates, then grip presses and releases
4. held objects
5. locomotion, consuming the pointers from step 2
6. ambient walking and snap turning

Default bindings: grip grabs; pushing the teleport hand's thumbstick up starts a
selection, letting it spring back commits, pulling it down cancels. The teleport hand's
stick left/right snap turns, the other hand's stick walks.
*/

use crate::error::{InteractionError, Result};
use crate::grab::{GrabEvent, GrabRegistry};
use crate::hand::{Hand, HandFrame};
use crate::input::{ControllerButton, HandRegistry, InputDispatcher, InputEvent, StickDirection};
use crate::locomotion::{LocomotionState, TeleportOutcome};
use crate::motion::AmbientMovement;
use crate::scene::{BodyId, Scene};
use crate::settings::RigSettings;
use crate::types::{Handed, Handedness, Pose};

/// Everything the host samples for one tick. Poses are relative to the rig origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RigInput {
    pub head: Pose,
    pub left: HandFrame,
    pub right: HandFrame,
}

impl RigInput {
    fn hand(&self, hand: Handedness) -> &HandFrame {
        match hand {
            Handedness::Left => &self.left,
            Handedness::Right => &self.right,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RigEvent {
    Grab(GrabEvent),
    TeleportStarted(Handedness),
    TeleportCancelled(Handedness),
    Teleport(Handedness, TeleportOutcome),
}

pub struct InteractionRig {
    pub settings: RigSettings,
    pub grabs: GrabRegistry,
    pub movement: AmbientMovement,
    pub dispatcher: InputDispatcher,
    /// Thumbstick of this hand drives teleport and snap turn.
    pub teleport_hand: Handedness,
    hands: Handed<Hand>,
    fingers: HandRegistry<f32>,
    origin: Pose,
    head: Pose,
}

const HANDS: [Handedness; 2] = [Handedness::Left, Handedness::Right];

impl Default for InteractionRig {
    fn default() -> Self {
        Self::new(RigSettings::default(), Pose::identity())
    }
}

impl InteractionRig {
    pub fn new(settings: RigSettings, origin: Pose) -> Self {
        let mut grabs = GrabRegistry::default();
        let hands = Handed {
            left: Hand::new(Handedness::Left, &settings),
            right: Hand::new(Handedness::Right, &settings),
        };
        for hand in [&hands.left, &hands.right] {
            grabs.add_grabber(hand.grabber_id(), settings.grabber);
        }

        Self {
            settings,
            grabs,
            movement: AmbientMovement::new(settings.movement),
            dispatcher: InputDispatcher::default(),
            teleport_hand: Handedness::Right,
            hands,
            fingers: HandRegistry::default(),
            origin,
            head: origin,
        }
    }

    /// Play-space origin in world space.
    pub fn origin(&self) -> Pose {
        self.origin
    }

    /// Tracked head in world space.
    pub fn head(&self) -> Pose {
        self.head
    }

    pub fn hand(&self, hand: Handedness) -> &Hand {
        self.hands.get(hand)
    }

    pub fn hand_mut(&mut self, hand: Handedness) -> &mut Hand {
        self.hands.get_mut(hand)
    }

    /// Hand by name (`"left"` or `"right"`).
    pub fn hand_named(&self, name: &str) -> Result<&Hand> {
        match name {
            "left" => Ok(&self.hands.left),
            "right" => Ok(&self.hands.right),
            _ => Err(InteractionError::UnknownHand(name.to_string())),
        }
    }

    /// Finger curl `0..=1` keyed like `"left_index"`; parts are `index`, `middle`, `thumb`.
    pub fn finger(&self, key: &str) -> Result<f32> {
        self.fingers.get(key).copied()
    }

    pub fn held(&self, hand: Handedness) -> Option<BodyId> {
        self.grabs
            .grabber(self.hands.get(hand).grabber_id())
            .and_then(|g| g.held())
    }

    /// Switch both pointers to the named curve.
    pub fn set_curve(&mut self, name: &str) -> Result<()> {
        let kind = name.parse()?;
        self.settings.pointer.curve = kind;
        for hand in HANDS {
            self.hands.get_mut(hand).pointer.set_curve(kind);
        }
        Ok(())
    }

    /// Select the transition used by future teleports.
    pub fn set_teleport_strategy(&mut self, name: &str) -> Result<()> {
        let strategy = name.parse()?;
        self.settings.locomotion.strategy = strategy;
        for hand in HANDS {
            self.hands.get_mut(hand).locomotion.set_strategy(strategy);
        }
        Ok(())
    }

    pub fn begin_grab(&mut self, scene: &mut impl Scene, hand: Handedness) -> Option<GrabEvent> {
        let id = self.hands.get(hand).grabber_id();
        let event = self.grabs.begin_grab(scene, id)?;
        if let GrabEvent::Grabbed { body, .. } = event {
            for h in HANDS {
                self.hands.get_mut(h).locomotion.track(body);
            }
        }
        Some(event)
    }

    pub fn end_grab(&mut self, scene: &mut impl Scene, hand: Handedness) -> Vec<GrabEvent> {
        let h = self.hands.get(hand);
        let events = self.grabs.detach(
            scene,
            h.grabber_id(),
            h.linear_velocity(),
            h.angular_velocity(),
        );
        for event in &events {
            if let GrabEvent::Released {
                body, tossed: true, ..
            } = *event
            {
                for h in HANDS {
                    self.hands.get_mut(h).locomotion.untrack(body);
                }
            }
        }
        events
    }

    /// Start aiming a teleport with `hand`'s pointer. Only one hand prepares at a time.
    pub fn begin_locomotion(&mut self, hand: Handedness) -> bool {
        let other = match hand {
            Handedness::Left => Handedness::Right,
            Handedness::Right => Handedness::Left,
        };
        if self.hands.get(other).locomotion.state() != LocomotionState::Idle {
            return false;
        }
        let h = self.hands.get_mut(hand);
        let present = h.pointer.is_active();
        h.locomotion.start_selection(present, &mut self.movement)
    }

    /// Commit the teleport `hand` is aiming. The transition then runs on later ticks.
    pub fn end_locomotion(&mut self, scene: &mut impl Scene, hand: Handedness) -> bool {
        let (origin, head) = (self.origin, self.head);
        self.hands
            .get_mut(hand)
            .locomotion
            .commit(scene, origin, head)
    }

    pub fn cancel_locomotion(&mut self, hand: Handedness) {
        self.hands
            .get_mut(hand)
            .locomotion
            .cancel_selection(&mut self.movement);
    }

    /// Abandon any teleport in progress, restoring suspended bodies and movement.
    pub fn disable(&mut self, scene: &mut impl Scene) {
        for hand in HANDS {
            self.hands
                .get_mut(hand)
                .locomotion
                .disable(scene, &mut self.movement);
        }
    }

    pub fn tick(&mut self, scene: &mut impl Scene, input: &RigInput, dt: f32) -> Vec<RigEvent> {
        let mut out = Vec::new();

        // 1. Poses and controller edges.
        self.head = self.origin.transform_pose(&input.head);
        let mut edges: [Vec<InputEvent>; 2] = Default::default();
        for (i, hand) in HANDS.into_iter().enumerate() {
            let frame = input.hand(hand);
            let world = self.origin.transform_pose(&frame.pose);
            edges[i] = self
                .hands
                .get_mut(hand)
                .track(world, &frame.controller, dt);
            self.record_fingers(hand, frame);
            self.dispatcher.dispatch(hand, &edges[i]);
        }

        // 2. Pointers.
        for hand in HANDS {
            let exclude: Vec<BodyId> = self.held(hand).into_iter().collect();
            let h = self.hands.get_mut(hand);
            let pose = h.pose();
            h.pointer.update(scene, pose, &exclude);
        }

        // 3. Candidates, then grab commits.
        for hand in HANDS {
            let h = self.hands.get(hand);
            let id = h.grabber_id();
            let target = h.pointer.forward_hit().copied();
            self.grabs.set_pivot(id, h.pose());
            self.grabs.reassess(scene, id, target.as_ref());
        }
        for (i, hand) in HANDS.into_iter().enumerate() {
            for event in &edges[i] {
                match event {
                    InputEvent::Pressed(ControllerButton::Grip) => {
                        out.extend(self.begin_grab(scene, hand).map(RigEvent::Grab));
                    }
                    InputEvent::Released(ControllerButton::Grip) => {
                        out.extend(self.end_grab(scene, hand).into_iter().map(RigEvent::Grab));
                    }
                    _ => {}
                }
            }
        }

        // 4. Held objects.
        self.grabs.update_held(scene);

        // 5. Locomotion.
        for (i, hand) in HANDS.into_iter().enumerate() {
            if hand == self.teleport_hand {
                for event in &edges[i] {
                    if let InputEvent::ThumbstickDirection { from, to } = *event {
                        self.on_teleport_stick(scene, hand, from, to, &mut out);
                    }
                }
            }

            let h = self.hands.get_mut(hand);
            let floor = h.pointer.floor_hit().copied();
            h.locomotion.update_preparing(scene, floor.as_ref());
            let outcome = h
                .locomotion
                .tick(scene, self.origin, dt, &mut self.movement);
            if let Some(outcome) = outcome {
                self.origin = outcome.rig;
                if outcome.finished {
                    for h in HANDS {
                        self.hands.get_mut(h).reset_velocity();
                    }
                }
                out.push(RigEvent::Teleport(hand, outcome));
            }
        }

        // 6. Ambient movement.
        self.apply_movement(&edges, dt);

        out
    }

    fn on_teleport_stick(
        &mut self,
        scene: &mut impl Scene,
        hand: Handedness,
        from: StickDirection,
        to: StickDirection,
        out: &mut Vec<RigEvent>,
    ) {
        match (from, to) {
            (_, StickDirection::Up) => {
                if self.begin_locomotion(hand) {
                    out.push(RigEvent::TeleportStarted(hand));
                }
            }
            (StickDirection::Up, StickDirection::Center) => {
                self.end_locomotion(scene, hand);
            }
            (_, StickDirection::Down) => {
                if self.hands.get(hand).locomotion.state() == LocomotionState::Preparing {
                    self.cancel_locomotion(hand);
                    out.push(RigEvent::TeleportCancelled(hand));
                }
            }
            _ => {}
        }
    }

    fn apply_movement(&mut self, edges: &[Vec<InputEvent>; 2], dt: f32) {
        if !self.movement.is_enabled() {
            return;
        }

        let walk_hand = match self.teleport_hand {
            Handedness::Left => Handedness::Right,
            Handedness::Right => Handedness::Left,
        };
        let stick = self.hands.get(walk_hand).input.thumbstick();
        let step = self.movement.walk(&self.head, stick, dt);
        self.origin.translation += step;
        self.head.translation += step;

        let turn_index = HANDS
            .iter()
            .position(|h| *h == self.teleport_hand)
            .unwrap_or(1);
        for event in &edges[turn_index] {
            let direction = match *event {
                InputEvent::ThumbstickDirection {
                    to: StickDirection::Right,
                    ..
                } => 1.0,
                InputEvent::ThumbstickDirection {
                    to: StickDirection::Left,
                    ..
                } => -1.0,
                _ => continue,
            };
            if let Some(turn) = self.movement.snap_turn(direction) {
                // Pivot around the head so it stays put.
                let pivot = self.head.translation;
                self.origin.translation = pivot + turn * (self.origin.translation - pivot);
                self.origin.rotation = turn * self.origin.rotation;
                self.head.rotation = turn * self.head.rotation;
            }
        }
    }

    fn record_fingers(&mut self, hand: Handedness, frame: &HandFrame) {
        let c = &frame.controller;
        let thumb = if c.buttons.has(ControllerButton::Primary)
            || c.buttons.has(ControllerButton::Secondary)
            || c.buttons.has(ControllerButton::ThumbstickClick)
        {
            1.0
        } else {
            0.0
        };
        for (part, value) in [("index", c.trigger), ("middle", c.grip), ("thumb", thumb)] {
            self.fingers
                .insert(HandRegistry::<f32>::key(hand, part), value.clamp(0.0, 1.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Buttons, ControllerSnapshot};
    use crate::scene::BodyFlags;
    use crate::scene::mock::MockScene;
    use crate::types::{Vec2, Vec3};
    use approx::assert_relative_eq;

    fn frame(pose: Pose, grip: f32, stick: Vec2) -> HandFrame {
        HandFrame {
            pose,
            controller: ControllerSnapshot {
                buttons: Buttons::default(),
                trigger: 0.0,
                grip,
                thumbstick: stick,
            },
        }
    }

    fn at(x: f32, y: f32, z: f32) -> Pose {
        Pose::from_translation(Vec3::new(x, y, z))
    }

    #[test]
    fn release_during_fade_keeps_restored_flags() {
        let mut scene = MockScene::default();
        scene.add_floor(0.0);
        let ball = scene.add_sphere(Vec3::new(0.3, 1.0, -0.3), 0.05, true);
        let mut rig = InteractionRig::default();
        rig.set_teleport_strategy("fade").unwrap();

        let mut input = RigInput {
            head: at(0.0, 1.7, 0.0),
            left: frame(at(-0.3, 1.0, -0.3), 0.0, Vec2::zeros()),
            right: frame(at(0.3, 1.0, -0.3), 1.0, Vec2::zeros()),
        };
        rig.tick(&mut scene, &input, 0.05);
        assert_eq!(rig.held(Handedness::Right), Some(ball));

        input.right.controller.thumbstick = Vec2::new(0.0, 1.0);
        rig.tick(&mut scene, &input, 0.05);
        input.right.controller.thumbstick = Vec2::zeros();
        rig.tick(&mut scene, &input, 0.05);
        assert_eq!(
            rig.hand(Handedness::Right).locomotion.state(),
            LocomotionState::Teleporting
        );

        input.right.controller.grip = 0.0;
        rig.tick(&mut scene, &input, 0.05);
        assert_eq!(scene.body(ball).flags, BodyFlags::default());

        for _ in 0..20 {
            rig.tick(&mut scene, &input, 0.05);
        }
        assert_eq!(
            rig.hand(Handedness::Right).locomotion.state(),
            LocomotionState::Idle
        );
        assert_eq!(scene.body(ball).flags, BodyFlags::default());
    }

    #[test]
    fn grip_edge_grabs_then_tosses() {
        let mut scene = MockScene::default();
        let ball = scene.add_sphere(Vec3::new(0.3, 1.0, -0.3), 0.05, true);
        let mut rig = InteractionRig::default();

        let mut input = RigInput {
            head: at(0.0, 1.7, 0.0),
            left: frame(at(-0.3, 1.0, -0.3), 0.0, Vec2::zeros()),
            right: frame(at(0.3, 1.0, -0.3), 1.0, Vec2::zeros()),
        };
        let events = rig.tick(&mut scene, &input, 0.1);
        assert!(events.iter().any(|e| matches!(
            e,
            RigEvent::Grab(GrabEvent::Grabbed { body, .. }) if *body == ball
        )));
        assert_eq!(rig.held(Handedness::Right), Some(ball));

        // Carry it up, then let go.
        input.right.pose = at(0.3, 1.5, -0.3);
        rig.tick(&mut scene, &input, 0.1);
        assert_relative_eq!(
            scene.body(ball).pose.translation,
            Vec3::new(0.3, 1.5, -0.3),
            epsilon = 1.0e-5
        );

        input.right.controller.grip = 0.0;
        let events = rig.tick(&mut scene, &input, 0.1);
        assert!(events.iter().any(|e| matches!(
            e,
            RigEvent::Grab(GrabEvent::Released { tossed: true, .. })
        )));
        assert_eq!(scene.body(ball).flags, BodyFlags::default());
        assert!(scene.body(ball).linear.y > 0.0);
        assert_eq!(rig.finger("right_middle"), Ok(0.0));
    }

    #[test]
    fn thumbstick_teleport_moves_rig() {
        let mut scene = MockScene::default();
        scene.add_floor(0.0);
        let mut rig = InteractionRig::default();
        let mut input = RigInput {
            head: at(0.0, 1.7, 0.0),
            left: frame(at(-0.3, 1.2, -0.3), 0.0, Vec2::zeros()),
            right: frame(at(0.3, 1.2, -0.3), 0.0, Vec2::new(0.0, 1.0)),
        };

        let events = rig.tick(&mut scene, &input, 0.1);
        assert!(events.contains(&RigEvent::TeleportStarted(Handedness::Right)));
        assert!(!rig.movement.is_enabled());
        let cursor = *rig.hand(Handedness::Right).locomotion.cursor().unwrap();
        assert!(cursor.visible && cursor.valid);

        input.right.controller.thumbstick = Vec2::zeros();
        let events = rig.tick(&mut scene, &input, 0.1);
        let outcome = events.iter().find_map(|e| match e {
            RigEvent::Teleport(_, outcome) => Some(*outcome),
            _ => None,
        });
        let outcome = outcome.unwrap();
        assert!(outcome.finished);
        assert_relative_eq!(rig.origin().translation, outcome.rig.translation);
        assert!(rig.origin().translation.z < -1.0);
        assert!(rig.movement.is_enabled());
    }

    #[test]
    fn walk_stick_moves_rig_along_head_heading() {
        let mut scene = MockScene::default();
        let mut rig = InteractionRig::default();
        let input = RigInput {
            head: at(0.0, 1.7, 0.0),
            left: frame(at(-0.3, 1.2, -0.3), 0.0, Vec2::new(0.0, 1.0)),
            right: frame(at(0.3, 1.2, -0.3), 0.0, Vec2::zeros()),
        };
        rig.tick(&mut scene, &input, 0.5);
        assert_relative_eq!(
            rig.origin().translation,
            Vec3::new(0.0, 0.0, -1.0),
            epsilon = 1.0e-5
        );
    }

    #[test]
    fn unknown_names_are_errors() {
        let mut rig = InteractionRig::default();
        assert!(rig.set_curve("spiral").is_err());
        assert!(rig.set_teleport_strategy("warp").is_err());
        assert!(rig.hand_named("middle").is_err());
        assert!(rig.finger("left_pinky").is_err());
        rig.set_curve("linear").unwrap();
        rig.set_teleport_strategy("fade").unwrap();
        assert_eq!(
            rig.hand(Handedness::Left).pointer.curve(),
            crate::curve::CurveKind::Linear
        );
    }
}
