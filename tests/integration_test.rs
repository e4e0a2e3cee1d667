use amor::{
    config::AppConfig,
    db::{self, corpus_queries, PgStore},
    models::{
        audio::SongArtifacts,
        job::{JobStatus, NewSongJob},
        reference::ReferenceEntry,
    },
    ports::{CorpusStore, JobStore},
    services::queue::{JobQueue, QueuedSong},
};
use uuid::Uuid;

/// Integration test: job lifecycle against real infrastructure
///
/// Covers:
/// 1. Database connection and schema
/// 2. Job creation, guarded transitions and terminal immutability
/// 3. Job queue (enqueue/dequeue/complete)
///
/// Note: This requires a running PostgreSQL and Redis instance
/// configured via environment variables.
#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_job_lifecycle() {
    let config = AppConfig::from_env().expect("Failed to load config");

    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run migrations");

    let store = PgStore::new(db_pool);
    let queue = JobQueue::new(&config.redis_url).expect("Failed to initialize queue");
    let user_id = Uuid::new_v4();

    // 1. Create
    let job = store
        .create_job(NewSongJob {
            user_id,
            title: "Integration Song".to_string(),
            theme: "monsoon romance".to_string(),
            style_tags: vec!["romantic".to_string()],
            lyrics: None,
        })
        .await
        .expect("Failed to create job");
    assert_eq!(job.status, JobStatus::Pending);

    // 2. Transitions
    assert!(store.mark_generating(job.id).await.expect("mark_generating"));
    assert!(!store.mark_generating(job.id).await.expect("mark_generating twice"));

    assert!(store
        .save_draft(job.id, "[Verse 1]\nBaarish", &["Yeh Dosti".to_string()])
        .await
        .expect("save_draft"));

    assert!(store.set_external_job_id(job.id, "task-it").await.expect("set id"));
    assert!(!store.set_external_job_id(job.id, "task-other").await.expect("set id again"));

    let resumable = store.list_resumable_jobs(1000).await.expect("list resumable");
    assert!(resumable.iter().any(|j| j.id == job.id));

    let artifacts = SongArtifacts {
        audio_url: Some("https://cdn.example/it.mp3".to_string()),
        video_url: None,
        image_url: None,
        duration: Some(200.0),
    };
    assert!(store.complete_job(job.id, &artifacts).await.expect("complete"));
    assert!(!store.fail_job(job.id, "late").await.expect("fail after complete"));

    let final_job = store
        .get_job(job.id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(final_job.status, JobStatus::Completed);
    assert_eq!(final_job.external_job_id.as_deref(), Some("task-it"));
    assert_eq!(final_job.reference_names, vec!["Yeh Dosti".to_string()]);
    assert_eq!(final_job.duration, Some(200.0));
    assert!(final_job.completed_at.is_some());
    assert!(final_job.error_message.is_none());

    let listed = store
        .list_jobs_for_user(user_id, 10)
        .await
        .expect("list jobs");
    assert_eq!(listed.len(), 1);

    // 3. Queue
    let queued = QueuedSong { job_id: job.id };
    queue.enqueue(&queued).await.expect("Failed to enqueue");
    let dequeued = queue
        .dequeue()
        .await
        .expect("Failed to dequeue")
        .expect("No job in queue");
    assert_eq!(dequeued, queued);
    queue
        .complete(&dequeued)
        .await
        .expect("Failed to complete job in queue");
}

/// Corpus insert and the three query tiers.
#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_corpus_queries() {
    let config = AppConfig::from_env().expect("Failed to load config");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run migrations");

    let marker = Uuid::new_v4().simple().to_string();
    let name = format!("Integration {marker}");
    let entry = ReferenceEntry::new(name.clone(), format!("Saawan {marker} aaya"));
    corpus_queries::insert_entry(&db_pool, &entry, Some(&[0.25f32, 0.5, 0.75][..]))
        .await
        .expect("insert entry");
    assert!(corpus_queries::count_entries(&db_pool).await.expect("count") >= 1);

    let store = PgStore::new(db_pool);

    let by_keyword = store
        .search_keywords(&[marker.clone()], 5)
        .await
        .expect("keyword search");
    assert_eq!(by_keyword, vec![entry.clone()]);

    let by_similarity = store
        .match_by_embedding(&[0.25, 0.5, 0.75], 0.99, 50)
        .await
        .expect("similarity search");
    assert!(by_similarity.iter().any(|m| m.entry.name == name));

    assert!(!store.sample(3).await.expect("sample").is_empty());
}
