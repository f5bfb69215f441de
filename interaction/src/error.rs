use thiserror::Error;

/// Failures surfaced to callers. Most interaction paths short-circuit silently instead;
/// only lookups by name report an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InteractionError {
    #[error("no hand state registered under `{0}`")]
    UnknownHand(String),
    #[error("unknown curve kind `{0}` (expected linear, bezier or parabolic)")]
    UnknownCurveKind(String),
    #[error("unknown teleport strategy `{0}` (expected instant, fade or smooth_damp)")]
    UnknownTeleportStrategy(String),
}

pub type Result<T, E = InteractionError> = std::result::Result<T, E>;
