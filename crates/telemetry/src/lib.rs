//! Tracing bootstrap for Libris binaries.

use libris_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::{fmt, EnvFilter};

/// Build the event filter: `RUST_LOG` wins, then the configured directive.
pub fn env_filter(settings: &TelemetrySettings) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.log_filter).map_err(|e| {
            anyhow::anyhow!("invalid log filter '{}': {}", settings.log_filter, e)
        }),
    }
}

/// Install the global subscriber. Calling it twice keeps the first subscriber.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = env_filter(settings)?;

    let installed = match settings.log_format {
        LogFormat::Pretty => fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => fmt().json().with_env_filter(filter).try_init(),
    };

    if installed.is_ok() {
        tracing::info!(
            target: "libris-telemetry",
            format = ?settings.log_format,
            "telemetry initialized"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_filter_is_reported() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let settings = TelemetrySettings {
            log_format: LogFormat::Pretty,
            log_filter: "libris=notalevel".to_string(),
        };
        assert!(env_filter(&settings).is_err());
    }

    #[test]
    fn init_twice_is_harmless() {
        let settings = TelemetrySettings::default();
        init(&settings).unwrap();
        init(&settings).unwrap();
    }
}
