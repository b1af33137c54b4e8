use crate::format::{local_time, FieldMapping, JsonFormatter};
use crate::layer::TrackingJsonLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the global tracking layer.
///
/// **Fields**
/// - `field_mapping`: output layout; replacing it fully replaces the
///   default, no merge.
/// - `suppress_blanks`: drop keys whose rendered value is empty/null/zero.
/// - `use_local_time`: render the `time` field in the machine's local
///   timezone instead of UTC.
#[derive(Clone, Debug, Default)]
pub struct LayerConfig {
    pub field_mapping: FieldMapping,
    pub suppress_blanks: bool,
    pub use_local_time: bool,
}

/// Install the tracking layer as the global `tracing` subscriber, writing
/// JSON lines to stdout, configured by `config`.
///
/// This installs a [`Registry`] combined with [`TrackingJsonLayer`] as the
/// global default subscriber, so all `tracing` events in the process are
/// rendered by the layer. Panics if a global subscriber is already set,
/// like any double initialization of the logging facility.
pub fn init_tracking_with_config(config: LayerConfig) {
    let mut formatter = JsonFormatter::new()
        .with_mapping(config.field_mapping)
        .suppress_blanks(config.suppress_blanks);
    if config.use_local_time {
        formatter = formatter.with_time_converter(local_time);
    }

    let subscriber = Registry::default().with(TrackingJsonLayer::new(formatter));
    tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
}

/// Initialize with defaults: UTC timestamps, the default field mapping,
/// blanks kept. The recommended entrypoint for typical services.
pub fn init_tracking() {
    init_tracking_with_config(LayerConfig::default());
}
