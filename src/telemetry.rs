use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

/// JSON structured logging, `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();
}

/// Install the Prometheus recorder and register application metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    metrics::describe_counter!("song_jobs_submitted_total", "Song jobs accepted by the API");
    metrics::describe_counter!("song_jobs_completed_total", "Song jobs that reached completed");
    metrics::describe_counter!("song_jobs_failed_total", "Song jobs that reached failed");
    metrics::describe_counter!(
        "retrieval_tier_total",
        "Reference retrievals by the tier that answered"
    );
    metrics::describe_counter!(
        "audio_placeholder_jobs_total",
        "Submissions replaced by a placeholder task id"
    );
    metrics::describe_counter!(
        "drafting_fallback_total",
        "Drafts replaced by the fallback lyrics"
    );
    metrics::describe_histogram!(
        "song_generation_seconds",
        "Time from pipeline start to a terminal job state"
    );
    metrics::describe_gauge!("song_queue_depth", "Song jobs waiting in the queue");

    Ok(handle)
}
