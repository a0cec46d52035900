//! Process-wide logging setup for hosts embedding the engine.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::error::TelemetryError;

/// Installs a global tracing subscriber and bridges `log` records into it.
///
/// The filter comes from `RUST_LOG` when set, `default_filter` otherwise.
/// With `json` the output is one JSON object per line including span
/// fields. Calling this a second time returns an error.
pub fn init_logging(default_filter: &str, json: bool) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_target(true));
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer);

    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;

    log::debug!("Logging initialized (json={})", json);
    Ok(())
}
