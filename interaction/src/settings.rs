/*!
Interaction tunables and per-component settings.

These constants centralize the thresholds used by grabbing, pointing, locomotion and
controller input. The `*Settings` structs default to them; hosts override fields from
their own game data.

Notes
- Distances are in meters, time in seconds, angles in radians.
- Favor practical world-space tolerances over machine epsilon for robust behavior.
*/

use crate::curve::CurveKind;
use crate::locomotion::TeleportStrategy;

/// Radius of the grab detection sphere around a hand's collision origin (meters).
pub const GRAB_RADIUS: f32 = 0.12;

/// Number of hands that may hold a single grabbable at once.
pub const DEFAULT_MAX_HOLDERS: usize = 2;

/// Maximum reach of the forward pointer ray (meters).
pub const POINTER_MAX_DISTANCE: f32 = 10.0;

/// Length of the downward probe cast from the pointer endpoint (meters).
pub const FLOOR_PROBE_DISTANCE: f32 = 20.0;

/// Minimum `normal · up` for a forward hit to count as standing ground (cos 45°).
pub const FLOOR_SLOPE_COS: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Distance the floor probe starts off a steep surface the pointer hit (meters).
pub const SURFACE_OFFSET: f32 = 0.02;

/// Number of curve segments; the curve has one more sample than this.
pub const CURVE_SEGMENTS: usize = 20;

/// Launch speed of the parabolic pointer arc (meters per second).
pub const ARC_LAUNCH_SPEED: f32 = 8.0;

/// Upper bound on simulated flight time of the parabolic arc (seconds).
pub const ARC_MAX_TIME: f32 = 3.0;

/// Gravity magnitude in meters per second squared (positive value).
pub const GRAVITY_MPS2: f32 = 9.81;

/// Radius of one cylinder probe / half-width of one box probe in the volumetric
/// target fallback (meters).
pub const PROBE_RADIUS: f32 = 0.5;

/// Number of probes laid end to end along the pointer range.
pub const PROBE_SEGMENTS: usize = 4;

/// Required clearance above a teleport destination (meters).
pub const PLAYER_HEIGHT: f32 = 1.8;

/// Total duration of a fade teleport, out and back in (seconds).
pub const FADE_DURATION: f32 = 0.4;

/// Approximate time a smooth-damp teleport takes to reach its target (seconds).
pub const SMOOTH_TIME: f32 = 0.15;

/// Distance at which a smooth-damp teleport snaps onto its destination (meters).
pub const ARRIVAL_EPS: f32 = 0.01;

/// Number of pose samples kept for hand velocity estimation.
pub const VELOCITY_HISTORY: usize = 5;

/// Thumbstick magnitude below which it is considered centered.
pub const THUMBSTICK_DEAD_ZONE: f32 = 0.25;

/// Analog trigger/grip value treated as a digital press.
pub const ANALOG_PRESS_THRESHOLD: f32 = 0.55;

/// Analog trigger/grip value below which a digital press releases.
pub const ANALOG_RELEASE_THRESHOLD: f32 = 0.35;

/// Ambient walking speed driven by the thumbstick (meters per second).
pub const WALK_SPEED: f32 = 2.0;

/// Rotation applied per snap turn (radians).
pub const SNAP_TURN_ANGLE: f32 = std::f32::consts::FRAC_PI_4;

/// Practical small distance for comparisons (meters).
pub const DIST_EPS: f32 = 1.0e-6;

#[derive(Clone, Copy, Debug)]
pub struct GrabberSettings {
    pub radius: f32,
    /// Allow grabbing the pointer's target when nothing overlaps the grab volume.
    pub distance_grab: bool,
}

impl Default for GrabberSettings {
    fn default() -> Self {
        Self {
            radius: GRAB_RADIUS,
            distance_grab: true,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PointerSettings {
    pub max_distance: f32,
    pub floor_probe_distance: f32,
    /// Forward hits at least this level are used as the floor directly.
    pub floor_slope_cos: f32,
    pub segments: usize,
    pub curve: CurveKind,
    pub arc_launch_speed: f32,
    pub arc_max_time: f32,
    pub probe_radius: f32,
    pub probe_segments: usize,
    /// Run the volumetric scan when the forward ray misses.
    pub volumetric_fallback: bool,
}

impl Default for PointerSettings {
    fn default() -> Self {
        Self {
            max_distance: POINTER_MAX_DISTANCE,
            floor_probe_distance: FLOOR_PROBE_DISTANCE,
            floor_slope_cos: FLOOR_SLOPE_COS,
            segments: CURVE_SEGMENTS,
            curve: CurveKind::Bezier,
            arc_launch_speed: ARC_LAUNCH_SPEED,
            arc_max_time: ARC_MAX_TIME,
            probe_radius: PROBE_RADIUS,
            probe_segments: PROBE_SEGMENTS,
            volumetric_fallback: true,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LocomotionSettings {
    pub strategy: TeleportStrategy,
    pub player_height: f32,
    pub fade_duration: f32,
    pub smooth_time: f32,
    pub arrival_eps: f32,
}

impl Default for LocomotionSettings {
    fn default() -> Self {
        Self {
            strategy: TeleportStrategy::Instant,
            player_height: PLAYER_HEIGHT,
            fade_duration: FADE_DURATION,
            smooth_time: SMOOTH_TIME,
            arrival_eps: ARRIVAL_EPS,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct InputSettings {
    pub dead_zone: f32,
    pub press_threshold: f32,
    pub release_threshold: f32,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            dead_zone: THUMBSTICK_DEAD_ZONE,
            press_threshold: ANALOG_PRESS_THRESHOLD,
            release_threshold: ANALOG_RELEASE_THRESHOLD,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct MovementSettings {
    pub walk_speed: f32,
    pub snap_turn_angle: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            walk_speed: WALK_SPEED,
            snap_turn_angle: SNAP_TURN_ANGLE,
        }
    }
}

/// Everything an [`InteractionRig`](crate::rig::InteractionRig) needs, grouped.
#[derive(Clone, Copy, Debug, Default)]
pub struct RigSettings {
    pub grabber: GrabberSettings,
    pub pointer: PointerSettings,
    pub locomotion: LocomotionSettings,
    pub input: InputSettings,
    pub movement: MovementSettings,
}
