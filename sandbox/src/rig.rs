use bevy::prelude::*;
use interaction::input::{ControllerButton, ControllerSnapshot, InputEvent};
use interaction::{
    CurveKind, GrabEvent, HandFrame, InteractionRig, RigEvent, RigInput, TeleportStrategy,
};
use leafwing_input_manager::prelude::ActionState;

use crate::convert::pose_from;
use crate::input::{HeadLook, InputAction, left_controller, right_controller};
use crate::physics::{Physics, SimSet};

/// Standing eye height above the rig origin.
const EYE_HEIGHT: f32 = 1.7;
/// Controller offsets from the head, in the head's yaw frame.
const LEFT_HAND_OFFSET: Vec3 = Vec3::new(-0.22, -0.45, -0.35);
const RIGHT_HAND_OFFSET: Vec3 = Vec3::new(0.22, -0.45, -0.35);

#[derive(Resource, Deref, DerefMut)]
pub struct Rig(pub InteractionRig);

impl Default for Rig {
    fn default() -> Self {
        let mut rig = InteractionRig::default();
        rig.dispatcher
            .on_button(ControllerButton::Grip, |hand, event| {
                if let InputEvent::Pressed(_) = event {
                    debug!("{} grip down", hand.as_str());
                }
            });
        Self(rig)
    }
}

/// Screen fade requested by the running teleport, 0 clear to 1 black.
#[derive(Resource, Debug, Default)]
pub struct Fade(pub f32);

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<Rig>();
    app.init_resource::<Fade>();
    app.add_systems(FixedUpdate, tick.in_set(SimSet::Rig));
    app.add_systems(Update, cycle_settings);
}

fn sample(actions: &ActionState<InputAction>, look: &HeadLook) -> RigInput {
    let yaw = Quat::from_rotation_y(look.yaw);
    let head_rotation = yaw * Quat::from_rotation_x(look.pitch);
    let head = Vec3::new(0.0, EYE_HEIGHT, 0.0);
    let hand = |offset: Vec3, controller: ControllerSnapshot| HandFrame {
        pose: pose_from(head + yaw * offset, head_rotation),
        controller,
    };

    RigInput {
        head: pose_from(head, head_rotation),
        left: hand(LEFT_HAND_OFFSET, left_controller(actions)),
        right: hand(RIGHT_HAND_OFFSET, right_controller(actions)),
    }
}

fn tick(
    mut rig: ResMut<Rig>,
    mut physics: ResMut<Physics>,
    mut fade: ResMut<Fade>,
    actions: Res<ActionState<InputAction>>,
    look: Res<HeadLook>,
    time: Res<Time<Fixed>>,
) {
    let input = sample(&actions, &look);
    let events = rig.tick(&mut physics.0, &input, time.delta_secs());

    for event in events {
        match event {
            RigEvent::Grab(GrabEvent::Grabbed {
                grabber,
                body,
                snapped,
            }) => info!("{grabber:?} grabbed {body:?} (snap: {snapped})"),
            RigEvent::Grab(GrabEvent::Released {
                grabber,
                body,
                tossed,
            }) => info!("{grabber:?} released {body:?} (tossed: {tossed})"),
            RigEvent::Grab(GrabEvent::Promoted { grabber, body }) => {
                info!("{grabber:?} now leads {body:?}")
            }
            RigEvent::TeleportStarted(hand) => debug!("{} hand aiming", hand.as_str()),
            RigEvent::TeleportCancelled(hand) => debug!("{} hand cancelled", hand.as_str()),
            RigEvent::Teleport(_, outcome) => {
                fade.0 = outcome.fade_alpha;
                if outcome.finished {
                    info!("teleport finished");
                }
            }
        }
    }
}

fn cycle_settings(actions: Res<ActionState<InputAction>>, mut rig: ResMut<Rig>) {
    if actions.just_pressed(&InputAction::CycleCurve) {
        let next = match rig.settings.pointer.curve {
            CurveKind::Linear => CurveKind::Bezier,
            CurveKind::Bezier => CurveKind::Parabolic,
            CurveKind::Parabolic => CurveKind::Linear,
        };
        match rig.set_curve(next.as_str()) {
            Ok(()) => info!("pointer curve: {}", next.as_str()),
            Err(err) => error!("{err}"),
        }
    }

    if actions.just_pressed(&InputAction::CycleStrategy) {
        let next = match rig.settings.locomotion.strategy {
            TeleportStrategy::Instant => TeleportStrategy::Fade,
            TeleportStrategy::Fade => TeleportStrategy::SmoothDamp,
            TeleportStrategy::SmoothDamp => TeleportStrategy::Instant,
        };
        match rig.set_teleport_strategy(next.as_str()) {
            Ok(()) => info!("teleport strategy: {}", next.as_str()),
            Err(err) => error!("{err}"),
        }
    }
}
