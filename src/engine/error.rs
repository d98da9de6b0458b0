use crate::auth::AuthError;
use crate::model::{DeskLabel, Scope, SlotType};
use crate::store::StoreError;

/// Everything a booking action can fail with. Handled at the point of the
/// triggering user action; nothing here is process-fatal.
#[derive(Debug)]
pub enum EngineError {
    /// Missing or inconsistent selection; message is shown to the user as-is.
    Validation(&'static str),
    /// Scope not served by the configured layout.
    UnknownScope(Scope),
    /// Desk outside the scope's static pool.
    UnknownDesk(DeskLabel),
    /// Auto-pick found no free desk for the requested slot.
    NoDeskAvailable,
    /// The requested desk is blocked for this slot by the slot policy.
    DeskUnavailable { desk: DeskLabel, slot: SlotType },
    /// Cancellation of a record owned by someone else.
    NotOwner { desk: DeskLabel, slot: SlotType },
    Auth(AuthError),
    Store(StoreError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => f.write_str(msg),
            EngineError::UnknownScope(scope) => write!(f, "unknown scope: {scope}"),
            EngineError::UnknownDesk(desk) => write!(f, "unknown desk: {desk}"),
            EngineError::NoDeskAvailable => f.write_str("No desks available for this slot."),
            EngineError::DeskUnavailable { desk, slot } => {
                write!(f, "desk {desk} is not available for the {slot} slot")
            }
            EngineError::NotOwner { desk, slot } => {
                write!(f, "the {slot} reservation on desk {desk} belongs to someone else")
            }
            EngineError::Auth(e) => write!(f, "{e}"),
            EngineError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Auth(e) => Some(e),
            EngineError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}

impl From<AuthError> for EngineError {
    fn from(e: AuthError) -> Self {
        EngineError::Auth(e)
    }
}
