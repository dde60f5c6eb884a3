use rowstream::application::ports::{JobRepository, RowErrorRepository};
use rowstream::domain::{
    Job, JobCompletion, JobCounters, JobRowError, JobStatus, SourcePath, StatusVocabulary,
};
use rowstream::infrastructure::persistence::PgJobRepository;
use serde_json::json;

use crate::helpers::TestPostgres;

fn new_job() -> Job {
    Job::new(
        "orders.csv".to_string(),
        SourcePath::from_raw("/uploads/orders.csv"),
    )
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_new_job_when_creating_and_retrieving_then_job_is_persisted() {
    let test_pg = TestPostgres::new().await;
    let job = new_job();

    test_pg.job_repository.create(&job).await.unwrap();
    let retrieved = test_pg
        .job_repository
        .get_by_id(job.id)
        .await
        .unwrap()
        .expect("Job not found");

    assert_eq!(retrieved.id, job.id);
    assert_eq!(retrieved.filename, "orders.csv");
    assert_eq!(retrieved.filepath, job.filepath);
    assert_eq!(retrieved.status, JobStatus::Pending);
    assert_eq!(retrieved.total_rows, None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_finalized_job_when_finalizing_again_then_nothing_changes() {
    let test_pg = TestPostgres::new().await;
    let repo = &test_pg.job_repository;
    let job = new_job();
    repo.create(&job).await.unwrap();
    repo.update_status(job.id, JobStatus::Processing).await.unwrap();
    repo.set_total_rows(job.id, 1000).await.unwrap();

    let completion = JobCompletion::new(
        JobStatus::CompletedWithErrors,
        JobCounters {
            total: Some(1000),
            processed: 998,
            errors: 2,
        },
        None,
    );
    let first = repo.finalize(job.id, &completion).await.unwrap();
    let second = repo
        .finalize(
            job.id,
            &JobCompletion::new(JobStatus::Failed, JobCounters::default(), None),
        )
        .await
        .unwrap();
    repo.update_progress(job.id, 1, 1).await.unwrap();

    assert!(first);
    assert!(!second);
    let stored = repo.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::CompletedWithErrors);
    assert_eq!(stored.processed_rows, 998);
    assert_eq!(stored.error_rows, 2);
    assert!(stored.finished_at.is_some());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_legacy_vocabulary_when_finalizing_then_legacy_label_is_stored_and_read_back() {
    let test_pg = TestPostgres::new().await;
    let repo = PgJobRepository::new(test_pg.pool.clone()).with_vocabulary(StatusVocabulary::Legacy);
    let job = new_job();
    repo.create(&job).await.unwrap();

    repo.finalize(
        job.id,
        &JobCompletion::new(JobStatus::Completed, JobCounters::default(), None),
    )
    .await
    .unwrap();

    let label: String = sqlx::query_scalar("SELECT status FROM jobs WHERE id = $1")
        .bind(job.id.as_uuid())
        .fetch_one(&test_pg.pool)
        .await
        .unwrap();
    assert_eq!(label, "DONE");
    let stored = repo.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_row_errors_when_listing_then_ordered_by_line_with_raw_row() {
    let test_pg = TestPostgres::new().await;
    let job = new_job();
    test_pg.job_repository.create(&job).await.unwrap();

    for line in [999, 501] {
        test_pg
            .row_error_repository
            .append(&JobRowError::new(
                job.id,
                line,
                "rejected",
                Some(json!({"id": line.to_string()})),
            ))
            .await
            .unwrap();
    }

    let errors = test_pg
        .row_error_repository
        .list_by_job(job.id, 10)
        .await
        .unwrap();

    let lines: Vec<u64> = errors.iter().map(|e| e.line_number).collect();
    assert_eq!(lines, vec![501, 999]);
    assert_eq!(errors[0].raw_row, Some(json!({"id": "501"})));
}
