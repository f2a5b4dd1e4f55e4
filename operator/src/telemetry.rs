use opentelemetry::trace::{TraceContextExt, TraceId};
use tracing_opentelemetry::OpenTelemetrySpanExt;

///  Fetch an opentelemetry::trace::TraceId as hex through the full tracing stack
pub fn get_trace_id() -> TraceId {
    tracing::Span::current()
        .context()
        .span()
        .span_context()
        .trace_id()
}

#[cfg(feature = "telemetry")]
pub async fn init_tracer() -> crate::Result<opentelemetry::sdk::trace::Tracer> {
    use opentelemetry::sdk::{trace, Resource};
    use opentelemetry::KeyValue;

    let otlp_endpoint =
        std::env::var("OPENTELEMETRY_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4317".to_string());
    let channel = tonic::transport::Channel::from_shared(otlp_endpoint)
        .unwrap_or_else(|_| tonic::transport::Channel::from_static("http://localhost:4317"))
        .connect_lazy();

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_channel(channel))
        .with_trace_config(trace::config().with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            "paper-operator",
        )])))
        .install_batch(opentelemetry::runtime::Tokio)
        .map_err(|e| crate::Error::Other(format!("cannot set up the otlp tracer: {e}")))
}
