mod availability;
mod error;
mod mutations;
mod queries;

pub use availability::{BoardView, available_desks, board_view, desk_status, slot_admits};
pub use error::EngineError;
pub use queries::{derive_user_bookings, parse_day};

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::auth::Identity;
use crate::datekey::DateKey;
use crate::model::{BookingEntry, DayBookings, DeskLabel, DeskPool, Scope, ScopeLayout, SlotType};
use crate::observability;
use crate::store::ReservationStore;

/// The availability & booking engine. Holds no reservation state of its
/// own — every operation reads the latest snapshot from the injected store,
/// and live views are recomputed on every pushed snapshot.
pub struct Engine {
    store: Arc<dyn ReservationStore>,
    layout: ScopeLayout,
}

/// A live derived view plus the subscription task feeding it. Dropping the
/// watch tears the subscription down (the UI-context-exit unsubscribe).
pub struct LiveView<T> {
    pub rx: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> Drop for LiveView<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Engine {
    pub fn new(store: Arc<dyn ReservationStore>, layout: ScopeLayout) -> Self {
        Self { store, layout }
    }

    pub fn layout(&self) -> &ScopeLayout {
        &self.layout
    }

    pub(super) fn store(&self) -> &Arc<dyn ReservationStore> {
        &self.store
    }

    pub(super) fn pool(&self, scope: &Scope) -> Result<&DeskPool, EngineError> {
        self.layout
            .pool(scope)
            .ok_or_else(|| EngineError::UnknownScope(scope.clone()))
    }

    /// Latest reservation records for one (scope, date).
    pub async fn day_snapshot(
        &self,
        scope: &Scope,
        date: &DateKey,
    ) -> Result<DayBookings, EngineError> {
        let path = self
            .layout
            .day_path(scope, date)
            .ok_or_else(|| EngineError::UnknownScope(scope.clone()))?;
        let value = self.store.snapshot(&path).await?;
        Ok(parse_day(&value))
    }

    /// Free desks for the requested slot, in pool order.
    pub async fn availability(
        &self,
        scope: &Scope,
        date: &DateKey,
        slot: SlotType,
    ) -> Result<Vec<DeskLabel>, EngineError> {
        let pool = self.pool(scope)?;
        let day = self.day_snapshot(scope, date).await?;
        Ok(available_desks(pool, &day, slot))
    }

    /// All of `email`'s reservations across every scope and date, newest
    /// first.
    pub async fn my_bookings(&self, email: &str) -> Result<Vec<BookingEntry>, EngineError> {
        let root = self.store.snapshot(&ScopeLayout::root_path()).await?;
        Ok(derive_user_bookings(&self.layout, &root, email))
    }

    /// Live desk board for one (scope, date, slot), recomputed on every
    /// pushed snapshot.
    pub fn watch_board(
        &self,
        scope: &Scope,
        date: &DateKey,
        slot: SlotType,
        viewer: Option<Identity>,
    ) -> Result<LiveView<BoardView>, EngineError> {
        let pool = self.pool(scope)?.clone();
        let path = self
            .layout
            .day_path(scope, date)
            .ok_or_else(|| EngineError::UnknownScope(scope.clone()))?;
        let store = self.store.clone();
        let viewer = viewer.map(|i| i.email);

        let (tx, rx) = watch::channel(BoardView::default());
        let task = tokio::spawn(async move {
            // Subscribe before the initial read so no change falls between.
            let mut sub = store.subscribe(&path);
            match store.snapshot(&path).await {
                Ok(value) => {
                    let day = parse_day(&value);
                    let _ = tx.send(board_view(&pool, &day, slot, viewer.as_deref()));
                }
                Err(e) => tracing::warn!("initial board snapshot failed at {path}: {e}"),
            }
            loop {
                match sub.recv().await {
                    Ok(value) => {
                        metrics::counter!(observability::SNAPSHOTS_TOTAL).increment(1);
                        let day = parse_day(&value);
                        let view = board_view(&pool, &day, slot, viewer.as_deref());
                        if tx.send(view).is_err() {
                            break; // view dropped, stop recomputing
                        }
                    }
                    // Each snapshot is a full replacement, so a lagged
                    // receiver just waits for the next one.
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(LiveView { rx, task })
    }

    /// Live "your bookings" list for one user, newest first.
    pub fn watch_my_bookings(&self, viewer: Identity) -> LiveView<Vec<BookingEntry>> {
        let layout = self.layout.clone();
        let store = self.store.clone();
        let path = ScopeLayout::root_path();

        let (tx, rx) = watch::channel(Vec::new());
        let task = tokio::spawn(async move {
            let mut sub = store.subscribe(&path);
            match store.snapshot(&path).await {
                Ok(value) => {
                    let _ = tx.send(derive_user_bookings(&layout, &value, &viewer.email));
                }
                Err(e) => tracing::warn!("initial bookings snapshot failed: {e}"),
            }
            loop {
                match sub.recv().await {
                    Ok(value) => {
                        metrics::counter!(observability::SNAPSHOTS_TOTAL).increment(1);
                        let entries = derive_user_bookings(&layout, &value, &viewer.email);
                        if tx.send(entries).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        LiveView { rx, task }
    }
}
