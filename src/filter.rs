use crate::context::{self, TrackingId};
use crate::record::LogEvent;

/// Pre-format hook that copies the tracking identifiers from the calling
/// thread's [`context`] onto a [`LogEvent`].
///
/// This is an enrichment step, not a gate: it always lets the event
/// proceed. Identifiers the context does not hold are assigned as `None`
/// and render as JSON `null` later.
///
/// ```
/// use json_track_log::context::{self, TrackingId};
/// use json_track_log::filter::TrackingFilter;
/// use json_track_log::record::LogEvent;
///
/// context::set(TrackingId::Transaction, "24ffdbb48ab942f09299b277e1b39e55");
/// let mut event = LogEvent::new("INFO", "middlewares", "Output message");
/// TrackingFilter.apply(&mut event);
/// assert_eq!(event.trans.as_deref(), Some("24ffdbb48ab942f09299b277e1b39e55"));
/// # context::clear();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackingFilter;

impl TrackingFilter {
    /// Enrich `event` with the current thread's identifiers; returns `true`
    /// so the host subsystem always dispatches the event.
    pub fn apply(&self, event: &mut LogEvent) -> bool {
        event.trans = context::get(TrackingId::Transaction);
        event.corr = context::get(TrackingId::Correlator);
        event.op = context::get(TrackingId::Operation);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_identifiers_onto_event() {
        context::clear();
        context::set(TrackingId::Transaction, "test_id");
        context::set(TrackingId::Correlator, "correlator_id");
        context::set(TrackingId::Operation, "op_type");

        let mut event = LogEvent::new("INFO", "tests", "msg");
        assert!(TrackingFilter.apply(&mut event));
        assert_eq!(event.trans.as_deref(), Some("test_id"));
        assert_eq!(event.corr.as_deref(), Some("correlator_id"));
        assert_eq!(event.op.as_deref(), Some("op_type"));
        context::clear();
    }

    #[test]
    fn unset_identifiers_become_none() {
        context::clear();
        let mut event = LogEvent::new("INFO", "tests", "msg");
        event.trans = Some("stale".to_string());
        assert!(TrackingFilter.apply(&mut event));
        // The filter assigns all three, overwriting whatever was there.
        assert_eq!(event.trans, None);
        assert_eq!(event.corr, None);
        assert_eq!(event.op, None);
    }
}
