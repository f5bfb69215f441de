//! One tracked hand: its pose, velocity history, controller and pointer.

use crate::grab::GrabberId;
use crate::input::{ControllerInput, ControllerSnapshot, InputEvent};
use crate::locomotion::Locomotion;
use crate::motion::VelocityTracker;
use crate::pointer::Pointer;
use crate::settings::RigSettings;
use crate::types::{Handedness, Pose, Vec3};

/// Per-tick tracking and controller state for one hand, in rig-local space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HandFrame {
    pub pose: Pose,
    pub controller: ControllerSnapshot,
}

#[derive(Debug)]
pub struct Hand {
    pub handedness: Handedness,
    pub input: ControllerInput,
    pub pointer: Pointer,
    pub locomotion: Locomotion,
    pose: Pose,
    velocity: VelocityTracker,
}

impl Hand {
    pub fn new(handedness: Handedness, settings: &RigSettings) -> Self {
        Self {
            handedness,
            input: ControllerInput::new(settings.input),
            pointer: Pointer::new(settings.pointer),
            locomotion: Locomotion::new(settings.locomotion),
            pose: Pose::identity(),
            velocity: VelocityTracker::default(),
        }
    }

    pub fn grabber_id(&self) -> GrabberId {
        self.handedness.into()
    }

    /// World-space pose as of the last [`Hand::track`].
    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn linear_velocity(&self) -> Vec3 {
        self.velocity.linear()
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.velocity.angular()
    }

    /// Place the hand in world space and feed its controller for this tick.
    pub fn track(
        &mut self,
        world: Pose,
        controller: &ControllerSnapshot,
        dt: f32,
    ) -> Vec<InputEvent> {
        self.pose = world;
        self.velocity.push(world, dt);
        self.input.update(controller, dt)
    }

    /// Forget velocity history, e.g. after the rig teleports.
    pub fn reset_velocity(&mut self) {
        self.velocity.clear();
    }
}
