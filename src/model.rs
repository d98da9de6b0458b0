use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::datekey::DateKey;
use crate::engine::EngineError;
use crate::store::StorePath;

/// Desk labels are scope-scoped strings ("A1".."A100", "DE-1", ...).
pub type DeskLabel = String;

/// Booking granularity for one desk on one date.
///
/// A `Full` reservation blocks the whole day; `Morning` and `Afternoon`
/// block `Full` and themselves but admit the complementary half-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotType {
    Full,
    Morning,
    Afternoon,
}

impl SlotType {
    pub const ALL: [SlotType; 3] = [SlotType::Full, SlotType::Morning, SlotType::Afternoon];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotType::Full => "full",
            SlotType::Morning => "morning",
            SlotType::Afternoon => "afternoon",
        }
    }

    /// Parse a path segment. Unknown segments are ignored by snapshot walks.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(SlotType::Full),
            "morning" => Some(SlotType::Morning),
            "afternoon" => Some(SlotType::Afternoon),
            _ => None,
        }
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partition key for a pool of desks: one global pool, or one pool per country.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Global,
    Country(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("global"),
            Scope::Country(cc) => f.write_str(cc),
        }
    }
}

/// A stored reservation leaf: `{ "email": ..., "bookedAt": RFC 3339 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub email: String,
    #[serde(rename = "bookedAt")]
    pub booked_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            booked_at: Utc::now(),
        }
    }
}

/// Slot-type → reservation for a single desk.
pub type SlotMap = BTreeMap<SlotType, Reservation>;

/// Desk → slots for one (scope, date).
pub type DayBookings = BTreeMap<DeskLabel, SlotMap>;

/// The static, enumerable desk set for one scope. Desks are never created
/// or destroyed at runtime.
#[derive(Debug, Clone)]
pub struct DeskPool {
    labels: Vec<DeskLabel>,
}

impl DeskPool {
    /// Sequential labels `{prefix}1..{prefix}{count}`.
    pub fn sequential(prefix: &str, count: usize) -> Self {
        Self {
            labels: (1..=count).map(|i| format!("{prefix}{i}")).collect(),
        }
    }

    pub fn from_labels(labels: Vec<DeskLabel>) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &[DeskLabel] {
        &self.labels
    }

    pub fn contains(&self, desk: &str) -> bool {
        self.labels.iter().any(|l| l == desk)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for DeskPool {
    /// The flat deployment's pool: A1..A100.
    fn default() -> Self {
        Self::sequential("A", 100)
    }
}

/// Which deployment variant is in use, and the desk pool(s) behind it.
///
/// Flat:        `bookings/{date}/{desk}/{slot}`
/// PerCountry:  `bookings/{country}/{date}/{desk}/{slot}`
#[derive(Debug, Clone)]
pub enum ScopeLayout {
    Flat(DeskPool),
    PerCountry(BTreeMap<String, DeskPool>),
}

impl ScopeLayout {
    pub fn root_path() -> StorePath {
        StorePath::new(["bookings"])
    }

    pub fn pool(&self, scope: &Scope) -> Option<&DeskPool> {
        match (self, scope) {
            (ScopeLayout::Flat(pool), Scope::Global) => Some(pool),
            (ScopeLayout::PerCountry(pools), Scope::Country(cc)) => pools.get(cc),
            _ => None,
        }
    }

    /// Every scope this layout serves, in stable order.
    pub fn scopes(&self) -> Vec<Scope> {
        match self {
            ScopeLayout::Flat(_) => vec![Scope::Global],
            ScopeLayout::PerCountry(pools) => {
                pools.keys().map(|cc| Scope::Country(cc.clone())).collect()
            }
        }
    }

    /// Path of the full day subtree for one scope.
    pub fn day_path(&self, scope: &Scope, date: &DateKey) -> Option<StorePath> {
        let mut path = Self::root_path();
        match (self, scope) {
            (ScopeLayout::Flat(_), Scope::Global) => {}
            (ScopeLayout::PerCountry(pools), Scope::Country(cc)) => {
                pools.get(cc)?;
                path = path.child(cc);
            }
            _ => return None,
        }
        Some(path.child(date.as_str()))
    }

    /// Path of a single reservation leaf.
    pub fn slot_path(
        &self,
        scope: &Scope,
        date: &DateKey,
        desk: &str,
        slot: SlotType,
    ) -> Option<StorePath> {
        Some(self.day_path(scope, date)?.child(desk).child(slot.as_str()))
    }
}

/// One row of the "your bookings" view, derived from a full-tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingEntry {
    pub scope: Scope,
    pub date: DateKey,
    pub desk: DeskLabel,
    pub slot: SlotType,
    pub booked_at: DateTime<Utc>,
    pub email: String,
}

/// Per-desk status for the desk grid, relative to one viewer and slot type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeskStatus {
    Free,
    Mine,
    Booked,
}

/// The user's in-progress picks. All optional until a booking is attempted.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub scope: Option<Scope>,
    pub date: Option<DateKey>,
    pub slot: Option<SlotType>,
}

impl Selection {
    /// Resolve to a bookable triple, or the user-facing validation message.
    pub fn resolve(&self) -> Result<(Scope, DateKey, SlotType), EngineError> {
        let scope = self
            .scope
            .clone()
            .ok_or(EngineError::Validation("Please select a country before booking"))?;
        let date = self
            .date
            .clone()
            .ok_or(EngineError::Validation("Please select a date before booking"))?;
        let slot = self
            .slot
            .ok_or(EngineError::Validation("Please select a slot type before booking"))?;
        Ok((scope, date, slot))
    }
}
