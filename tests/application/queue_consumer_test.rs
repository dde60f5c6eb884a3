use std::sync::Arc;
use std::time::Duration;

use rowstream::application::ports::{JobQueue, JobRepository};
use rowstream::application::services::{
    RowOutcomeRecorder, StreamProcessor, StreamProcessorConfig, spawn_consumers,
};
use rowstream::domain::{Job, JobStatus, QueueMessage, SourcePath};
use rowstream::infrastructure::parsing::CsvRowSource;
use rowstream::infrastructure::persistence::{InMemoryJobRepository, InMemoryRowErrorRepository};
use rowstream::infrastructure::queue::InMemoryJobQueue;
use rowstream::infrastructure::validation::AcceptAllHook;
use tokio_util::sync::CancellationToken;

use crate::helpers::write_numbered_csv;

async fn wait_until_terminal(jobs: &InMemoryJobRepository, job: &Job) -> Job {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let current = jobs.get_by_id(job.id).await.unwrap().unwrap();
            if current.status.is_terminal() {
                return current;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job did not finish in time")
}

#[tokio::test]
async fn given_two_consumers_when_jobs_are_queued_then_each_job_is_finalized_once() {
    let dir = tempfile::tempdir().unwrap();
    let jobs = Arc::new(InMemoryJobRepository::new());
    let queue = InMemoryJobQueue::new();
    let processor = Arc::new(StreamProcessor::new(
        jobs.clone(),
        Arc::new(CsvRowSource::new()),
        RowOutcomeRecorder::new(
            Arc::new(AcceptAllHook),
            Arc::new(InMemoryRowErrorRepository::new()),
        ),
        StreamProcessorConfig::default(),
    ));

    let mut queued = Vec::new();
    for (name, rows) in [("a.csv", 30), ("b.csv", 45), ("c.csv", 0)] {
        let path = write_numbered_csv(dir.path(), name, rows);
        let job = Job::new(name.to_string(), SourcePath::from_raw(path));
        jobs.create(&job).await.unwrap();
        queue
            .publish(&QueueMessage::new(job.id, job.filepath.clone()))
            .await
            .unwrap();
        queued.push((job, rows));
    }

    let shutdown = CancellationToken::new();
    let handles = spawn_consumers(2, Arc::new(queue.clone()), processor, shutdown.clone());

    for (job, rows) in &queued {
        let finished = wait_until_terminal(&jobs, job).await;
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(finished.processed_rows, *rows);
    }

    shutdown.cancel();
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(queue.settled().len(), 3);
    assert_eq!(queue.in_flight(), 0);
}

#[tokio::test]
async fn given_closed_queue_when_consuming_then_consumers_stop() {
    let queue = InMemoryJobQueue::new();
    let processor = Arc::new(StreamProcessor::new(
        Arc::new(InMemoryJobRepository::new()),
        Arc::new(CsvRowSource::new()),
        RowOutcomeRecorder::new(
            Arc::new(AcceptAllHook),
            Arc::new(InMemoryRowErrorRepository::new()),
        ),
        StreamProcessorConfig::default(),
    ));
    let handles = spawn_consumers(
        3,
        Arc::new(queue.clone()),
        processor,
        CancellationToken::new(),
    );

    queue.close();

    for handle in handles {
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("consumer did not stop")
            .unwrap();
    }
}
