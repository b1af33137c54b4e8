use std::cell::RefCell;

/// The three identifiers used to correlate log lines belonging to one
/// logical request: transaction id, correlator id and operation name.
///
/// Request-entry code sets them once per request, [`crate::filter::TrackingFilter`]
/// copies them onto every event emitted while handling that request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingId {
    Transaction,
    Correlator,
    Operation,
}

impl TrackingId {
    /// Wire name of the identifier as it appears in log output.
    pub fn key(self) -> &'static str {
        match self {
            TrackingId::Transaction => "trans",
            TrackingId::Correlator => "corr",
            TrackingId::Operation => "op",
        }
    }
}

#[derive(Debug, Default)]
struct TrackingValues {
    trans: Option<String>,
    corr: Option<String>,
    op: Option<String>,
}

thread_local! {
    // One store per thread. A value set on one thread is never visible to
    // another, so no locking is involved anywhere in the read/write path.
    static TRACKING: RefCell<TrackingValues> = RefCell::new(TrackingValues::default());
}

/// Store `value` for `id` on the calling thread only.
pub fn set(id: TrackingId, value: impl Into<String>) {
    let value = value.into();
    TRACKING.with(|cell| {
        let mut values = cell.borrow_mut();
        match id {
            TrackingId::Transaction => values.trans = Some(value),
            TrackingId::Correlator => values.corr = Some(value),
            TrackingId::Operation => values.op = Some(value),
        }
    });
}

/// Value previously set for `id` on the calling thread, or `None` when it
/// was never set here. A miss is not an error.
pub fn get(id: TrackingId) -> Option<String> {
    TRACKING.with(|cell| {
        let values = cell.borrow();
        match id {
            TrackingId::Transaction => values.trans.clone(),
            TrackingId::Correlator => values.corr.clone(),
            TrackingId::Operation => values.op.clone(),
        }
    })
}

/// Drop all identifiers stored on the calling thread.
///
/// The store never resets itself. When worker threads are pooled and reused
/// across requests, request-entry code must either overwrite all three
/// identifiers or call `clear`, otherwise values from the previous request
/// leak into unrelated log lines.
pub fn clear() {
    TRACKING.with(|cell| *cell.borrow_mut() = TrackingValues::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_unset_is_none() {
        clear();
        assert_eq!(get(TrackingId::Transaction), None);
        assert_eq!(get(TrackingId::Correlator), None);
        assert_eq!(get(TrackingId::Operation), None);
    }

    #[test]
    fn set_then_get_roundtrip() {
        clear();
        set(TrackingId::Transaction, "t-1");
        set(TrackingId::Correlator, "c-1");
        set(TrackingId::Operation, "CreateOrder");
        assert_eq!(get(TrackingId::Transaction).as_deref(), Some("t-1"));
        assert_eq!(get(TrackingId::Correlator).as_deref(), Some("c-1"));
        assert_eq!(get(TrackingId::Operation).as_deref(), Some("CreateOrder"));
        clear();
        assert_eq!(get(TrackingId::Operation), None);
    }

    #[test]
    fn values_are_isolated_per_thread() {
        clear();
        set(TrackingId::Transaction, "outer");

        let handle = std::thread::spawn(|| {
            // A fresh thread starts empty regardless of what the spawner set.
            assert_eq!(get(TrackingId::Transaction), None);
            set(TrackingId::Transaction, "inner");
            get(TrackingId::Transaction)
        });

        assert_eq!(handle.join().unwrap().as_deref(), Some("inner"));
        assert_eq!(get(TrackingId::Transaction).as_deref(), Some("outer"));
        clear();
    }

    #[test]
    fn keys_match_wire_names() {
        assert_eq!(TrackingId::Transaction.key(), "trans");
        assert_eq!(TrackingId::Correlator.key(), "corr");
        assert_eq!(TrackingId::Operation.key(), "op");
    }
}
