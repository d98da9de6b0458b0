// ── Action counters ─────────────────────────────────────────────

/// Counter: reservation writes issued.
pub const BOOKINGS_TOTAL: &str = "deskplace_bookings_total";

/// Counter: cancellation deletes issued.
pub const CANCELLATIONS_TOTAL: &str = "deskplace_cancellations_total";

/// Counter: store read/write/delete failures surfaced to the user.
pub const STORE_ERRORS_TOTAL: &str = "deskplace_store_errors_total";

// ── Subscription flow ───────────────────────────────────────────

/// Counter: snapshots consumed by live-view recompute loops.
pub const SNAPSHOTS_TOTAL: &str = "deskplace_snapshots_total";

/// Install the fmt tracing subscriber. Call once from the host application;
/// metric counters record regardless of whether an exporter is installed.
pub fn init() {
    tracing_subscriber::fmt::init();
}
