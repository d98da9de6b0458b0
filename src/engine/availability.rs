use crate::model::{DayBookings, DeskLabel, DeskStatus, DeskPool, SlotMap, SlotType};

// ── Slot policy ──────────────────────────────────────────────────

/// Whether a desk with `existing` reservations admits `requested`.
///
/// Full admits nothing else on that date; Morning/Afternoon admit the
/// complementary half-day but not Full and not a duplicate of themselves.
pub fn slot_admits(existing: &SlotMap, requested: SlotType) -> bool {
    if existing.is_empty() {
        return true;
    }
    match requested {
        SlotType::Full => false,
        half => {
            !existing.contains_key(&SlotType::Full) && !existing.contains_key(&half)
        }
    }
}

/// Pool-ordered subset of desks free for `requested` on this day. Pure;
/// the available count is the subset's length.
pub fn available_desks(pool: &DeskPool, day: &DayBookings, requested: SlotType) -> Vec<DeskLabel> {
    pool.labels()
        .iter()
        .filter(|desk| {
            day.get(*desk)
                .map_or(true, |slots| slot_admits(slots, requested))
        })
        .cloned()
        .collect()
}

/// Grid status for one desk: mine if any slot on it is owned by the viewer,
/// otherwise booked if the slot policy blocks `requested`, otherwise free.
pub fn desk_status(slots: Option<&SlotMap>, requested: SlotType, viewer: &str) -> DeskStatus {
    let Some(slots) = slots else {
        return DeskStatus::Free;
    };
    if slots.values().any(|r| r.email == viewer) {
        return DeskStatus::Mine;
    }
    if slot_admits(slots, requested) {
        DeskStatus::Free
    } else {
        DeskStatus::Booked
    }
}

// ── Derived board view ───────────────────────────────────────────

/// What the presentation layer renders for one (scope, date, slot):
/// the free-desk subset plus a status per desk, in pool order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardView {
    pub available: Vec<DeskLabel>,
    pub statuses: Vec<(DeskLabel, DeskStatus)>,
}

impl BoardView {
    pub fn available_count(&self) -> usize {
        self.available.len()
    }
}

/// The reducer step: fold a fresh day snapshot into a new view. Pure and
/// re-derivable from any snapshot; no state carries over between calls.
pub fn board_view(
    pool: &DeskPool,
    day: &DayBookings,
    requested: SlotType,
    viewer: Option<&str>,
) -> BoardView {
    let available = available_desks(pool, day, requested);
    let statuses = pool
        .labels()
        .iter()
        .map(|desk| {
            let status = match viewer {
                Some(viewer) => desk_status(day.get(desk), requested, viewer),
                None => {
                    if day.get(desk).is_none_or(|slots| slot_admits(slots, requested)) {
                        DeskStatus::Free
                    } else {
                        DeskStatus::Booked
                    }
                }
            };
            (desk.clone(), status)
        })
        .collect();
    BoardView {
        available,
        statuses,
    }
}
