use json_track_log::context::{self, TrackingId};
use json_track_log::init::init_tracking;
use tracing::{debug, error, info};

fn main() {
    init_tracking();

    // Request-entry code sets the identifiers once; every line emitted on
    // this thread carries them from here on.
    context::set(TrackingId::Transaction, "24ffdbb48ab942f09299b277e1b39e55");
    context::set(TrackingId::Correlator, "bf0fdcc352a94156a423ba152b634ae9");
    context::set(TrackingId::Operation, "AddAlarms");

    info!("handling request");
    debug!(user_id = 42, "loading alarms");
    error!(reason = "backend unavailable", "request failed");

    // Pooled threads must reset between requests or identifiers leak.
    context::clear();
    info!("idle");
}
