use json_track_log::context::{self, TrackingId};
use json_track_log::format::FieldMapping;
use json_track_log::init::{init_tracking_with_config, LayerConfig};
use tracing::info;

fn main() {
    let field_mapping = FieldMapping::new([
        ("ts", "utctime"),
        ("severity", "levelname"),
        ("operation", "op"),
        ("component", "module"),
        ("message", "message"),
    ])
    .expect("unique output keys");

    init_tracking_with_config(LayerConfig {
        field_mapping,
        suppress_blanks: true,
        use_local_time: true,
    });

    info!("no identifiers set, blank keys suppressed");

    context::set(TrackingId::Operation, "RenameUser");
    info!(user = "alice", "operation shows up once set");
}
