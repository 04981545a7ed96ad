use crate::config::{LogFormat, TelemetryConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber and, when enabled, the Prometheus exporter.
/// Fails if a subscriber is already installed.
pub fn init(config: &TelemetryConfig) -> anyhow::Result<()> {
    let output = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(log_filter(config))
        .with(output)
        .try_init()?;

    if let Some(addr) = metrics_listen_addr(config) {
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        tracing::info!(%addr, "Serving Prometheus metrics on /metrics");
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn log_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

fn metrics_listen_addr(config: &TelemetryConfig) -> Option<SocketAddr> {
    config
        .metrics_enabled
        .then(|| SocketAddr::from(([0, 0, 0, 0], config.metrics_port)))
}

pub fn shutdown() {
    tracing::info!("Shutting down telemetry");
}
