use crate::auth::Identity;
use crate::datekey::DateKey;
use crate::model::{DeskLabel, Reservation, Scope, SlotType};
use crate::observability;

use super::availability::{available_desks, slot_admits};
use super::{Engine, EngineError};

impl Engine {
    /// Reserve a specific desk for `owner`.
    ///
    /// The availability precondition is evaluated against a fresh snapshot,
    /// then the write is a plain upsert — last writer wins, no conditional
    /// check-then-write against the store. Two racing bookings of the same
    /// key both succeed at the store level and the later owner prevails.
    pub async fn book(
        &self,
        scope: &Scope,
        date: &DateKey,
        desk: &str,
        slot: SlotType,
        owner: &Identity,
    ) -> Result<(), EngineError> {
        let pool = self.pool(scope)?;
        if !pool.contains(desk) {
            return Err(EngineError::UnknownDesk(desk.to_string()));
        }

        let day = self.day_snapshot(scope, date).await?;
        let blocked = day
            .get(desk)
            .is_some_and(|slots| !slot_admits(slots, slot));
        if blocked {
            return Err(EngineError::DeskUnavailable {
                desk: desk.to_string(),
                slot,
            });
        }

        self.write_reservation(scope, date, desk, slot, owner).await
    }

    /// Reserve the first free desk in pool order and return its label.
    /// Fails with `NoDeskAvailable` when the filtered set is empty; the
    /// check happens before the write, not atomically with it.
    pub async fn book_first_available(
        &self,
        scope: &Scope,
        date: &DateKey,
        slot: SlotType,
        owner: &Identity,
    ) -> Result<DeskLabel, EngineError> {
        let pool = self.pool(scope)?;
        let day = self.day_snapshot(scope, date).await?;
        let free = available_desks(pool, &day, slot);
        let Some(desk) = free.first() else {
            return Err(EngineError::NoDeskAvailable);
        };
        let desk = desk.clone();
        self.write_reservation(scope, date, &desk, slot, owner)
            .await?;
        Ok(desk)
    }

    /// Remove a reservation. Absent records succeed (deletion is
    /// idempotent); a record owned by someone else is refused.
    pub async fn cancel(
        &self,
        scope: &Scope,
        date: &DateKey,
        desk: &str,
        slot: SlotType,
        caller: &Identity,
    ) -> Result<(), EngineError> {
        let path = self
            .layout()
            .slot_path(scope, date, desk, slot)
            .ok_or_else(|| EngineError::UnknownScope(scope.clone()))?;

        let day = self.day_snapshot(scope, date).await?;
        if let Some(existing) = day.get(desk).and_then(|slots| slots.get(&slot))
            && existing.email != caller.email
        {
            return Err(EngineError::NotOwner {
                desk: desk.to_string(),
                slot,
            });
        }

        if let Err(e) = self.store().delete(&path).await {
            metrics::counter!(observability::STORE_ERRORS_TOTAL).increment(1);
            tracing::warn!("cancel delete failed at {path}: {e}");
            return Err(e.into());
        }
        metrics::counter!(observability::CANCELLATIONS_TOTAL).increment(1);
        tracing::info!("cancelled {path} for {}", caller.email);
        Ok(())
    }

    async fn write_reservation(
        &self,
        scope: &Scope,
        date: &DateKey,
        desk: &str,
        slot: SlotType,
        owner: &Identity,
    ) -> Result<(), EngineError> {
        let path = self
            .layout()
            .slot_path(scope, date, desk, slot)
            .ok_or_else(|| EngineError::UnknownScope(scope.clone()))?;
        let leaf = serde_json::to_value(Reservation::new(owner.email.clone()))
            .map_err(|e| EngineError::Store(crate::store::StoreError(e.to_string())))?;

        if let Err(e) = self.store().write(&path, leaf).await {
            metrics::counter!(observability::STORE_ERRORS_TOTAL).increment(1);
            tracing::warn!("booking write failed at {path}: {e}");
            return Err(e.into());
        }
        metrics::counter!(observability::BOOKINGS_TOTAL).increment(1);
        tracing::info!("booked {path} for {}", owner.email);
        Ok(())
    }
}
