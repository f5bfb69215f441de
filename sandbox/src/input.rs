//! Keyboard and mouse stand-ins for two tracked controllers and a headset.

use bevy::prelude::*;
use interaction::input::{Buttons, ControllerButton, ControllerSnapshot};
use interaction::types::Vec2 as StickAxes;
use leafwing_input_manager::prelude::*;

#[derive(Reflect, Actionlike, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputAction {
    WalkForward,
    WalkBack,
    StrafeLeft,
    StrafeRight,
    LookLeft,
    LookRight,
    LookUp,
    LookDown,
    LeftGrip,
    RightGrip,
    LeftTrigger,
    RightTrigger,
    /// Right thumbstick up: aim a teleport, release to commit.
    Teleport,
    /// Right thumbstick down.
    CancelTeleport,
    SnapLeft,
    SnapRight,
    CycleCurve,
    CycleStrategy,
}

/// Simulated head orientation, radians.
#[derive(Resource, Debug, Default)]
pub struct HeadLook {
    pub yaw: f32,
    pub pitch: f32,
}

const LOOK_SPEED: f32 = 1.8;
const PITCH_LIMIT: f32 = 1.3;

pub(super) fn plugin(app: &mut App) {
    app.add_plugins(InputManagerPlugin::<InputAction>::default());

    app.register_type::<InputAction>();

    let mut input_map = InputMap::<InputAction>::default();
    input_map.insert(InputAction::WalkForward, KeyCode::KeyW);
    input_map.insert(InputAction::WalkBack, KeyCode::KeyS);
    input_map.insert(InputAction::StrafeLeft, KeyCode::KeyA);
    input_map.insert(InputAction::StrafeRight, KeyCode::KeyD);
    input_map.insert(InputAction::LookLeft, KeyCode::ArrowLeft);
    input_map.insert(InputAction::LookRight, KeyCode::ArrowRight);
    input_map.insert(InputAction::LookUp, KeyCode::ArrowUp);
    input_map.insert(InputAction::LookDown, KeyCode::ArrowDown);
    input_map.insert(InputAction::LeftGrip, MouseButton::Left);
    input_map.insert(InputAction::RightGrip, MouseButton::Right);
    input_map.insert(InputAction::LeftTrigger, KeyCode::KeyF);
    input_map.insert(InputAction::RightTrigger, KeyCode::KeyG);
    input_map.insert(InputAction::Teleport, KeyCode::Space);
    input_map.insert(InputAction::CancelTeleport, KeyCode::KeyX);
    input_map.insert(InputAction::SnapLeft, KeyCode::KeyQ);
    input_map.insert(InputAction::SnapRight, KeyCode::KeyE);
    input_map.insert(InputAction::CycleCurve, KeyCode::KeyC);
    input_map.insert(InputAction::CycleStrategy, KeyCode::KeyT);
    app.insert_resource(input_map);
    app.insert_resource(ActionState::<InputAction>::default());

    app.init_resource::<HeadLook>();
    app.add_systems(Update, look);
}

fn look(actions: Res<ActionState<InputAction>>, time: Res<Time>, mut head: ResMut<HeadLook>) {
    let dt = time.delta_secs();
    let turn = axis(&actions, InputAction::LookLeft, InputAction::LookRight);
    let tilt = axis(&actions, InputAction::LookDown, InputAction::LookUp);
    head.yaw -= turn * LOOK_SPEED * dt;
    head.pitch = (head.pitch + tilt * LOOK_SPEED * dt).clamp(-PITCH_LIMIT, PITCH_LIMIT);
}

fn axis(actions: &ActionState<InputAction>, neg: InputAction, pos: InputAction) -> f32 {
    (actions.pressed(&pos) as i8 - actions.pressed(&neg) as i8) as f32
}

fn level(actions: &ActionState<InputAction>, action: InputAction) -> f32 {
    if actions.pressed(&action) { 1.0 } else { 0.0 }
}

/// Left controller: WASD is the thumbstick, the left mouse button the grip.
pub fn left_controller(actions: &ActionState<InputAction>) -> ControllerSnapshot {
    ControllerSnapshot {
        buttons: Buttons::default(),
        trigger: level(actions, InputAction::LeftTrigger),
        grip: level(actions, InputAction::LeftGrip),
        thumbstick: StickAxes::new(
            axis(actions, InputAction::StrafeLeft, InputAction::StrafeRight),
            axis(actions, InputAction::WalkBack, InputAction::WalkForward),
        ),
    }
}

/// Right controller: space/X/Q/E push the thumbstick, the right mouse button is the grip.
pub fn right_controller(actions: &ActionState<InputAction>) -> ControllerSnapshot {
    let mut buttons = Buttons::default();
    buttons.set(
        ControllerButton::ThumbstickClick,
        actions.pressed(&InputAction::Teleport),
    );
    ControllerSnapshot {
        buttons,
        trigger: level(actions, InputAction::RightTrigger),
        grip: level(actions, InputAction::RightGrip),
        thumbstick: StickAxes::new(
            axis(actions, InputAction::SnapLeft, InputAction::SnapRight),
            axis(actions, InputAction::CancelTeleport, InputAction::Teleport),
        ),
    }
}
