// End-to-end tests for the bounded queue and worker pool, with
// instrumented in-memory collaborators standing in for the analyzer and
// the archive.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_test::assert_ok;

use docmill::analyzer::DocumentAnalyzer;
use docmill::config::{QueueConfig, StorageFailurePolicy};
use docmill::error::{AnalyzerError, JobError, StorageError};
use docmill::models::{InvoiceRecord, UploadPayload};
use docmill::queue::WorkerPool;
use docmill::storage::ObjectStore;

/// Counting analyzer. Echoes the payload filename into the invoice number
/// so each result can be traced back to the job that produced it.
struct MockAnalyzer {
    calls: AtomicUsize,
    slow_prefix_delay: Duration,
    fail: bool,
}

impl MockAnalyzer {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            slow_prefix_delay: Duration::ZERO,
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Filenames starting with "slow" take this much longer to analyze.
    fn with_slow_prefix_delay(delay: Duration) -> Self {
        Self {
            slow_prefix_delay: delay,
            ..Self::new()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentAnalyzer for MockAnalyzer {
    async fn analyze(
        &self,
        payload: &UploadPayload,
        _instructions: &str,
    ) -> Result<InvoiceRecord, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if payload.filename.starts_with("slow") && !self.slow_prefix_delay.is_zero() {
            tokio::time::sleep(self.slow_prefix_delay).await;
        }

        if self.fail {
            return Err(AnalyzerError::Api {
                status: 500,
                message: "model unavailable".to_string(),
            });
        }

        Ok(InvoiceRecord {
            invoice_number: payload.filename.clone(),
            ..InvoiceRecord::default()
        })
    }
}

/// Analyzer that parks every call on a semaphore until the test releases
/// it. Used to hold workers busy deterministically.
struct GatedAnalyzer {
    calls: AtomicUsize,
    gate: Semaphore,
}

impl GatedAnalyzer {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        }
    }

    /// Lets `n` parked calls finish.
    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentAnalyzer for GatedAnalyzer {
    async fn analyze(
        &self,
        payload: &UploadPayload,
        _instructions: &str,
    ) -> Result<InvoiceRecord, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| AnalyzerError::Transport("gate closed".to_string()))?;
        // Consume the permit for good so each release lets exactly one
        // call through.
        permit.forget();

        Ok(InvoiceRecord {
            invoice_number: payload.filename.clone(),
            ..InvoiceRecord::default()
        })
    }
}

#[derive(Default)]
struct MockStore {
    puts: AtomicUsize,
    fail: bool,
    keys: StdMutex<Vec<String>>,
}

impl MockStore {
    fn new() -> Self {
        Self::default()
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn put(&self, key: &str, _data: &[u8], _content_type: &str) -> Result<(), StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(StorageError::Backend("bucket offline".to_string()));
        }

        self.keys.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!("https://archive.test/{key}?expires={}", expires.as_secs()))
    }
}

fn queue_config(workers: usize, capacity: usize) -> QueueConfig {
    QueueConfig {
        workers,
        capacity,
        job_timeout: None,
        storage_failure_policy: StorageFailurePolicy::Fail,
    }
}

fn payload(filename: &str) -> UploadPayload {
    UploadPayload::new(
        Bytes::from_static(b"%PDF-1.4 not really a pdf"),
        "application/pdf".to_string(),
        filename.to_string(),
    )
}

fn empty_payload() -> UploadPayload {
    UploadPayload::new(
        Bytes::new(),
        "application/pdf".to_string(),
        "empty.pdf".to_string(),
    )
}

/// Joins a spawned dispatch with a hang guard.
async fn finish<T>(handle: JoinHandle<T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("task did not finish in time")
        .expect("task panicked")
}

#[tokio::test]
async fn every_submitted_job_completes_with_its_own_result() {
    let analyzer = Arc::new(MockAnalyzer::new());
    let store = Arc::new(MockStore::new());
    let (pool, dispatcher) =
        WorkerPool::start(&queue_config(3, 50), analyzer.clone(), store.clone());

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                let filename = format!("invoice-{i}.pdf");
                let key = format!("invoices/test-{i}");
                let result = dispatcher.dispatch(payload(&filename), key).await;
                (filename, result)
            })
        })
        .collect();

    for handle in handles {
        let (filename, result) = finish(handle).await;
        let output = assert_ok!(result);
        // Results are never swapped between concurrent jobs
        assert_eq!(output.invoice.invoice_number, filename);
        assert!(output.archive_warning.is_none());
        assert!(!output.invoice.created_at.is_empty());
    }

    // Each job hit each collaborator exactly once
    assert_eq!(analyzer.calls(), 10);
    assert_eq!(store.puts(), 10);

    let mut keys = store.keys();
    keys.sort();
    let expected: Vec<String> = (0..10).map(|i| format!("invoices/test-{i}")).collect();
    assert_eq!(keys, expected);

    drop(dispatcher);
    assert_ok!(tokio::time::timeout(Duration::from_secs(1), pool.join()).await);
}

#[tokio::test]
async fn empty_payload_short_circuits_before_collaborators() {
    let analyzer = Arc::new(MockAnalyzer::new());
    let store = Arc::new(MockStore::new());
    let (_pool, dispatcher) =
        WorkerPool::start(&queue_config(2, 8), analyzer.clone(), store.clone());

    let result = dispatcher
        .dispatch(empty_payload(), "invoices/empty".to_string())
        .await;

    assert!(matches!(result, Err(JobError::MissingPayload)));
    assert_eq!(analyzer.calls(), 0);
    assert_eq!(store.puts(), 0);
}

#[tokio::test]
async fn storage_failure_fails_the_job_after_successful_analysis() {
    let analyzer = Arc::new(MockAnalyzer::new());
    let store = Arc::new(MockStore::failing());
    let (_pool, dispatcher) =
        WorkerPool::start(&queue_config(1, 4), analyzer.clone(), store.clone());

    let result = dispatcher
        .dispatch(payload("fatura.pdf"), "invoices/fatura".to_string())
        .await;

    // The analysis ran and the put was attempted, yet the caller sees only
    // a failure
    assert!(matches!(result, Err(JobError::Archive(_))));
    assert_eq!(analyzer.calls(), 1);
    assert_eq!(store.puts(), 1);
}

#[tokio::test]
async fn warn_policy_keeps_the_extraction_when_archival_fails() {
    let analyzer = Arc::new(MockAnalyzer::new());
    let store = Arc::new(MockStore::failing());
    let config = QueueConfig {
        storage_failure_policy: StorageFailurePolicy::Warn,
        ..queue_config(1, 4)
    };
    let (_pool, dispatcher) = WorkerPool::start(&config, analyzer.clone(), store.clone());

    let result = dispatcher
        .dispatch(payload("fatura.pdf"), "invoices/fatura".to_string())
        .await;

    let output = assert_ok!(result);
    assert_eq!(output.invoice.invoice_number, "fatura.pdf");
    let warning = output.archive_warning.expect("warning should be set");
    assert!(warning.contains("bucket offline"));
}

#[tokio::test]
async fn full_queue_blocks_submitters_until_capacity_frees() {
    let analyzer = Arc::new(GatedAnalyzer::new());
    let store = Arc::new(MockStore::new());
    // One worker, one buffer slot: the third submission has nowhere to go
    let (pool, dispatcher) =
        WorkerPool::start(&queue_config(1, 1), analyzer.clone(), store.clone());

    let mut handles = Vec::new();
    for name in ["job-a", "job-b", "job-c"] {
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(async move {
            dispatcher
                .dispatch(payload(name), format!("invoices/{name}"))
                .await
        }));
        // Keep submission order deterministic
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    tokio::time::sleep(Duration::from_millis(100)).await;

    // job-a is parked in the worker, job-b fills the only slot, job-c is
    // blocked in submit; nothing has failed and nothing was dropped
    assert_eq!(analyzer.calls(), 1);
    for handle in &handles {
        assert!(!handle.is_finished());
    }

    // Freeing job-a lets the worker pull job-b, which frees the slot for
    // job-c's pending submit
    analyzer.release(1);
    let first = finish(handles.remove(0)).await;
    assert_eq!(
        assert_ok!(first).invoice.invoice_number,
        "job-a"
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(analyzer.calls(), 2);

    analyzer.release(2);
    for (handle, name) in handles.into_iter().zip(["job-b", "job-c"]) {
        let result = finish(handle).await;
        assert_eq!(assert_ok!(result).invoice.invoice_number, name);
    }

    assert_eq!(analyzer.calls(), 3);
    drop(dispatcher);
    assert_ok!(tokio::time::timeout(Duration::from_secs(1), pool.join()).await);
}

#[tokio::test]
async fn completion_order_can_differ_from_submission_order() {
    let analyzer = Arc::new(MockAnalyzer::with_slow_prefix_delay(Duration::from_millis(
        300,
    )));
    let store = Arc::new(MockStore::new());
    let (_pool, dispatcher) =
        WorkerPool::start(&queue_config(2, 10), analyzer.clone(), store.clone());

    let completions: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));

    let mut handles = Vec::new();
    for name in ["slow-first.pdf", "fast-second.pdf"] {
        let dispatcher = dispatcher.clone();
        let completions = completions.clone();
        handles.push(tokio::spawn(async move {
            let result = dispatcher
                .dispatch(payload(name), format!("invoices/{name}"))
                .await;
            completions.lock().unwrap().push(name.to_string());
            result
        }));
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    for handle in handles {
        let result = finish(handle).await;
        assert_ok!(result);
    }

    // The job submitted second finished first
    let order = completions.lock().unwrap().clone();
    assert_eq!(order, vec!["fast-second.pdf", "slow-first.pdf"]);
}

#[tokio::test]
async fn dropping_all_dispatchers_drains_and_stops_the_pool() {
    let analyzer = Arc::new(MockAnalyzer::new());
    let store = Arc::new(MockStore::new());
    let (pool, dispatcher) =
        WorkerPool::start(&queue_config(2, 10), analyzer.clone(), store.clone());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .dispatch(
                        payload(&format!("doc-{i}.pdf")),
                        format!("invoices/doc-{i}"),
                    )
                    .await
            })
        })
        .collect();

    for handle in handles {
        let result = finish(handle).await;
        assert_ok!(result);
    }

    drop(dispatcher);
    assert_ok!(tokio::time::timeout(Duration::from_secs(1), pool.join()).await);
    assert_eq!(analyzer.calls(), 4);
}

#[tokio::test]
async fn shutdown_answers_in_flight_and_queued_jobs() {
    let analyzer = Arc::new(GatedAnalyzer::new());
    let store = Arc::new(MockStore::new());
    let (pool, dispatcher) =
        WorkerPool::start(&queue_config(1, 5), analyzer.clone(), store.clone());

    let first = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(
            async move { dispatcher.dispatch(payload("held.pdf"), "invoices/held".into()).await },
        )
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(analyzer.calls(), 1);

    let second = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            dispatcher
                .dispatch(payload("queued.pdf"), "invoices/queued".into())
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    pool.shutdown();

    // The in-flight job is interrupted but still answered; the queued job
    // is dropped with the queue and surfaces as closed
    assert!(matches!(finish(first).await, Err(JobError::Cancelled)));
    assert!(matches!(finish(second).await, Err(JobError::QueueClosed)));

    drop(dispatcher);
    assert_ok!(tokio::time::timeout(Duration::from_secs(1), pool.join()).await);
}

#[tokio::test]
async fn job_timeout_reports_timed_out_without_a_second_result() {
    let analyzer = Arc::new(GatedAnalyzer::new());
    let store = Arc::new(MockStore::new());
    let config = QueueConfig {
        job_timeout: Some(Duration::from_millis(100)),
        ..queue_config(1, 5)
    };
    let (pool, dispatcher) = WorkerPool::start(&config, analyzer.clone(), store.clone());

    let result = dispatcher
        .dispatch(payload("late.pdf"), "invoices/late".to_string())
        .await;
    assert!(matches!(result, Err(JobError::TimedOut(_))));
    assert_eq!(analyzer.calls(), 1);

    // The worker finishes the abandoned job eventually; its reply lands on
    // a dropped receiver and disappears without disturbing anything
    analyzer.release(1);
    drop(dispatcher);
    assert_ok!(tokio::time::timeout(Duration::from_secs(1), pool.join()).await);
    assert_eq!(store.puts(), 1);
}
