use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::DTError;

/// Environment variable holding the log filter, e.g. `DFTABLE_LOG=dftable=trace`.
pub const LOG_ENV: &str = "DFTABLE_LOG";
const DEFAULT_FILTER: &str = "info";

/// Sends all tracing output to `log_file`. The terminal belongs to the UI.
pub fn init(log_file: &Path) -> Result<(), DTError> {
    let file = File::create(log_file)?;
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| DTError::Logging(e.to_string()))
}
