use amor::{
    app_state::build_pipeline,
    config::AppConfig,
    db::{self, PgStore},
    ports::JobStore,
    services::{
        pipeline::{PipelineHandle, SongPipeline},
        queue::JobQueue,
    },
    telemetry,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const POLL_INTERVAL_MS: u64 = 1000;
const RESUME_BATCH: i64 = 500;

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    tracing::info!("Starting song generation worker");

    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Metrics are recorded but not scraped from this process
    let _prometheus = telemetry::init_metrics().expect("Failed to install metrics recorder");

    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    let store = PgStore::new(db_pool);
    let queue = JobQueue::new(&config.redis_url).expect("Failed to initialize job queue");
    let pipeline = Arc::new(
        build_pipeline(&config, store.clone()).expect("Failed to initialize song pipeline"),
    );

    let mut running: Vec<PipelineHandle> = Vec::new();

    match store.list_resumable_jobs(RESUME_BATCH).await {
        Ok(jobs) => {
            if !jobs.is_empty() {
                tracing::info!(count = jobs.len(), "Resuming unfinished jobs");
            }
            for job in jobs {
                running.push(pipeline.spawn(job.id));
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to load unfinished jobs"),
    }

    tracing::info!("Worker ready, starting job processing loop");

    loop {
        reap_finished(&mut running).await;

        match process_next_job(&queue, &pipeline, &mut running).await {
            Ok(true) => {
                tracing::debug!("Job dispatched, checking for next job");
            }
            Ok(false) => {
                tracing::trace!("No jobs available, sleeping");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Error dequeuing job, will retry");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }
    }
}

/// Spawn a pipeline for the next queued job.
/// Returns Ok(true) if a job was dispatched, Ok(false) if the queue is empty.
async fn process_next_job(
    queue: &JobQueue,
    pipeline: &Arc<SongPipeline>,
    running: &mut Vec<PipelineHandle>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let job = match queue.dequeue().await? {
        Some(j) => j,
        None => return Ok(false),
    };

    if running.iter().any(|h| h.job_id() == job.job_id) {
        tracing::warn!(job_id = %job.job_id, "Job already running, dropping duplicate");
    } else {
        tracing::info!(job_id = %job.job_id, "Dispatching song job");
        running.push(pipeline.spawn(job.job_id));
    }

    queue.complete(&job).await?;
    if let Ok(depth) = queue.queue_depth().await {
        metrics::gauge!("song_queue_depth").set(depth as f64);
    }

    Ok(true)
}

/// Await finished pipeline tasks and log how they ended.
async fn reap_finished(running: &mut Vec<PipelineHandle>) {
    let (finished, still_running): (Vec<_>, Vec<_>) =
        running.drain(..).partition(|h| h.is_finished());
    *running = still_running;

    for handle in finished {
        let job_id = handle.job_id();
        match handle.join().await {
            Ok(status) => tracing::info!(job_id = %job_id, status = %status, "Pipeline finished"),
            Err(e) => tracing::error!(job_id = %job_id, error = %e, "Pipeline ended with error"),
        }
    }
}
