use serde_json::Value;

use crate::datekey::DateKey;
use crate::model::{BookingEntry, DayBookings, Reservation, Scope, ScopeLayout, SlotMap, SlotType};

/// Parse the day subtree `{desk: {slot: leaf}}` into typed records.
///
/// Tolerant by design: snapshots come from a shared store that other writers
/// may pollute, so malformed slot names or leaves are logged and skipped
/// rather than failing the whole snapshot.
pub fn parse_day(value: &Value) -> DayBookings {
    let mut day = DayBookings::new();
    let Some(desks) = value.as_object() else {
        return day;
    };
    for (desk, slots) in desks {
        let Some(slots) = slots.as_object() else {
            tracing::debug!("skipping non-object desk entry at {desk}");
            continue;
        };
        let mut slot_map = SlotMap::new();
        for (name, leaf) in slots {
            let Some(slot) = SlotType::parse(name) else {
                tracing::debug!("skipping unknown slot type {name} on desk {desk}");
                continue;
            };
            match serde_json::from_value::<Reservation>(leaf.clone()) {
                Ok(reservation) => {
                    slot_map.insert(slot, reservation);
                }
                Err(e) => {
                    tracing::debug!("skipping malformed reservation at {desk}/{name}: {e}");
                }
            }
        }
        if !slot_map.is_empty() {
            day.insert(desk.clone(), slot_map);
        }
    }
    day
}

/// Flatten a full-tree snapshot, keep records owned by `email`, sort by
/// `bookedAt` descending (stable sort breaks ties in tree order). An email
/// with no records yields an empty vec, never an error.
pub fn derive_user_bookings(layout: &ScopeLayout, root: &Value, email: &str) -> Vec<BookingEntry> {
    let mut entries = Vec::new();
    match layout {
        ScopeLayout::Flat(_) => {
            collect_scope(&Scope::Global, root, email, &mut entries);
        }
        ScopeLayout::PerCountry(pools) => {
            if let Some(countries) = root.as_object() {
                for (cc, subtree) in countries {
                    if pools.contains_key(cc) {
                        collect_scope(&Scope::Country(cc.clone()), subtree, email, &mut entries);
                    }
                }
            }
        }
    }
    entries.sort_by(|a, b| b.booked_at.cmp(&a.booked_at));
    entries
}

fn collect_scope(scope: &Scope, node: &Value, email: &str, out: &mut Vec<BookingEntry>) {
    let Some(dates) = node.as_object() else {
        return;
    };
    for (date, desks) in dates {
        let Some(date) = DateKey::parse(date) else {
            tracing::debug!("skipping non-date key {date} in scope {scope}");
            continue;
        };
        let day = parse_day(desks);
        for (desk, slots) in &day {
            for (slot, reservation) in slots {
                if reservation.email == email {
                    out.push(BookingEntry {
                        scope: scope.clone(),
                        date: date.clone(),
                        desk: desk.clone(),
                        slot: *slot,
                        booked_at: reservation.booked_at,
                        email: reservation.email.clone(),
                    });
                }
            }
        }
    }
}
