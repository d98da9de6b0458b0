//! deskplace — desk-reservation engine over an injected real-time store.
//!
//! All durable state lives in the store/identity collaborators; this crate
//! owns the availability policy, the booking/cancel mutations, and the
//! derived live views.

pub mod auth;
pub mod datekey;
pub mod engine;
pub mod model;
pub mod notify;
pub mod observability;
pub mod prefs;
pub mod store;

pub use auth::{AuthError, Identity, IdentityProvider, MemoryIdentity};
pub use datekey::DateKey;
pub use engine::{Engine, EngineError};
pub use model::{
    BookingEntry, DayBookings, DeskPool, DeskStatus, Reservation, Scope, ScopeLayout, Selection,
    SlotType,
};
pub use store::{MemoryStore, ReservationStore, StoreError, StorePath};
