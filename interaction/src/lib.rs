pub mod curve;
pub mod error;
pub mod grab;
pub mod hand;
pub mod input;
pub mod locomotion;
pub mod motion;
pub mod pointer;
pub mod rig;
pub mod scene;
pub mod settings;
pub mod targeting;
pub mod types;

pub use curve::{CurveKind, CurveSampler};
pub use error::{InteractionError, Result};
pub use grab::{GrabEvent, GrabRegistry, GrabTrigger, GrabbableConfig, GrabberId};
pub use hand::{Hand, HandFrame};
pub use input::{
    Buttons, ControllerButton, ControllerInput, ControllerSnapshot, InputEvent, StickDirection,
};
pub use locomotion::{Cursor, Locomotion, LocomotionState, TeleportOutcome, TeleportStrategy};
pub use pointer::Pointer;
pub use rig::{InteractionRig, RigEvent, RigInput};
pub use scene::{BodyDef, BodyFlags, BodyId, ColliderShapeDef, RapierScene, Scene};
pub use settings::RigSettings;
pub use types::{Handedness, Pose};
