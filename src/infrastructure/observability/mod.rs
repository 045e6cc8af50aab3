use crate::config::Config;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

pub struct ObservabilityGuard;

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        shutdown();
    }
}

pub fn init(config: &Config) -> Result<ObservabilityGuard, Box<dyn std::error::Error>> {
    init_tracing(config)?;
    init_metrics(config)?;
    Ok(ObservabilityGuard)
}

fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    // Standard formatting layer (STDOUT)
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_thread_ids(true)
        .with_target(true);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,wadesk=debug,sqlx=warn".into());

    // Optional OTLP layer for distributed tracing
    if let Some(endpoint) = &config.otel_exporter_endpoint {
        let exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(endpoint);

        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", config.service_name.clone()),
            ])))
            .install_batch(runtime::Tokio)?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    } else {
        Registry::default().with(env_filter).with(fmt_layer).init();
    }

    Ok(())
}

fn init_metrics(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.metrics_port))
        .install()?;

    describe_counters();

    tracing::info!(
        "Metrics exporter (Prometheus) started on port {}",
        config.metrics_port
    );
    Ok(())
}

fn describe_counters() {
    metrics::describe_counter!(
        "wadesk_chats_distributed_total",
        "Chats placed with an attendant by distribution"
    );
    metrics::describe_counter!(
        "wadesk_distribution_no_capacity_total",
        "Distributions that left the chat queued for lack of capacity"
    );
    metrics::describe_counter!(
        "wadesk_capacity_races_total",
        "Capacity reservations lost to a concurrent distribution"
    );
    metrics::describe_counter!(
        "wadesk_chats_reassigned_total",
        "Stale chats moved to another attendant"
    );
    metrics::describe_counter!(
        "wadesk_chats_expired_total",
        "Chats whose 24-hour messaging window closed"
    );
    metrics::describe_counter!(
        "wadesk_attendants_demoted_total",
        "Attendants forced offline after inactivity"
    );
    metrics::describe_counter!(
        "wadesk_sweep_failures_total",
        "Sweep steps that failed, by step"
    );
}

pub fn shutdown() {
    global::shutdown_tracer_provider();
}
