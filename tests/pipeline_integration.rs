//! End-to-end pipeline tests over scripted collaborators.
//!
//! The transport, module host, and runner are all fakes so the full
//! generate → extract → scan → install → execute flow can be asserted on
//! without a network, an interpreter, or a package manager.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use taskomat::deps::{InstallOutcome, ModuleHost, PackageInstaller};
use taskomat::gemini::{
    ChunkStream, GeminiError, GenerationClient, GenerationMode, GenerationRequest,
    GenerationTransport, PromptPart, RequestWindow,
};
use taskomat::pipeline::{Pipeline, PipelineError, PipelineEvent};
use taskomat::runner::{ExecutionReport, ScriptRunner};
use tokio::sync::Mutex;
use tokio::sync::mpsc;

/// Transport replaying a fixed chunk script.
struct ScriptedTransport {
    chunks: Vec<Result<String, GeminiError>>,
}

impl ScriptedTransport {
    fn ok(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| Ok(c.to_string())).collect(),
        }
    }
}

impl GenerationTransport for ScriptedTransport {
    fn start_stream(
        &self,
        _parts: Vec<PromptPart>,
    ) -> BoxFuture<'_, Result<ChunkStream, GeminiError>> {
        let chunks = self.chunks.clone();
        Box::pin(async move {
            let (tx, rx) = mpsc::unbounded_channel();
            for chunk in chunks {
                let _ = tx.send(chunk);
            }
            Ok(ChunkStream::new(rx))
        })
    }
}

/// Host with a fixed resolvable set; installs fail for broken names.
struct FakeHost {
    resolvable: HashSet<String>,
    broken: HashSet<String>,
    installs: Mutex<Vec<String>>,
}

impl FakeHost {
    fn new(resolvable: &[&str], broken: &[&str]) -> Self {
        Self {
            resolvable: resolvable.iter().map(|s| s.to_string()).collect(),
            broken: broken.iter().map(|s| s.to_string()).collect(),
            installs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ModuleHost for FakeHost {
    async fn is_resolvable(&self, module: &str) -> bool {
        self.resolvable.contains(module)
    }

    async fn install(&self, module: &str) -> Result<(), String> {
        self.installs.lock().await.push(module.to_string());
        if self.broken.contains(module) {
            Err(format!("no matching distribution found for {module}"))
        } else {
            Ok(())
        }
    }
}

/// Runner that records invocations instead of executing anything.
struct RecordingRunner {
    calls: AtomicUsize,
}

impl RecordingRunner {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ScriptRunner for RecordingRunner {
    async fn run(&self, code: &str) -> ExecutionReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ExecutionReport {
            succeeded: true,
            fault: None,
            duration: Duration::from_millis(5),
            stdout: format!("ran {} bytes", code.len()),
        }
    }
}

struct Harness {
    pipeline: Arc<Pipeline>,
    limiter: Arc<RequestWindow>,
    host: Arc<FakeHost>,
    runner: Arc<RecordingRunner>,
}

fn harness(transport: ScriptedTransport, host: FakeHost) -> Harness {
    let limiter = Arc::new(RequestWindow::new());
    let client = GenerationClient::new(Arc::new(transport), limiter.clone());
    let host = Arc::new(host);
    let runner = Arc::new(RecordingRunner::new());
    let pipeline = Arc::new(Pipeline::new(
        client,
        PackageInstaller::new(host.clone()),
        runner.clone(),
    ));
    Harness {
        pipeline,
        limiter,
        host,
        runner,
    }
}

#[tokio::test]
async fn automation_installs_missing_dependency_and_runs() {
    let transport = ScriptedTransport::ok(&[
        "```python\nimport requests\n",
        "print(requests.get('x'))\n```",
    ]);
    let h = harness(transport, FakeHost::new(&[], &[]));

    let request = GenerationRequest::new("fetch a url", GenerationMode::Automation);
    let mut handle = h.pipeline.spawn_automation(request);
    while handle.events.recv().await.is_some() {}
    let report = handle.outcome.await.unwrap().unwrap();

    assert_eq!(
        report.dependencies.get("requests"),
        Some(&InstallOutcome::Installed)
    );
    assert_eq!(*h.host.installs.lock().await, vec!["requests".to_string()]);
    assert_eq!(h.runner.calls.load(Ordering::SeqCst), 1);
    assert!(report.execution.succeeded);
    assert!(report.execution.duration > Duration::ZERO);
    assert!(
        report
            .generation
            .extracted_code
            .as_deref()
            .unwrap()
            .contains("import requests")
    );
}

#[tokio::test]
async fn failed_install_skips_execution_entirely() {
    let transport = ScriptedTransport::ok(&["```python\nimport definitely_not_real\n```"]);
    let h = harness(transport, FakeHost::new(&[], &["definitely_not_real"]));

    let request = GenerationRequest::new("use a ghost package", GenerationMode::Automation);
    let (tx, _rx) = mpsc::unbounded_channel();
    let result = h.pipeline.run_automation(request, &tx).await;

    match result {
        Err(PipelineError::Install { module, reason }) => {
            assert_eq!(module, "definitely_not_real");
            assert!(reason.contains("no matching distribution"));
        }
        other => panic!("expected install failure, got {other:?}"),
    }
    assert_eq!(h.runner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn already_present_dependencies_are_not_reinstalled() {
    let transport = ScriptedTransport::ok(&["```python\nimport os\nprint(os.getcwd())\n```"]);
    let h = harness(transport, FakeHost::new(&["os"], &[]));

    let request = GenerationRequest::new("print cwd", GenerationMode::Automation);
    let (tx, _rx) = mpsc::unbounded_channel();
    let report = h.pipeline.run_automation(request, &tx).await.unwrap();

    assert_eq!(
        report.dependencies.get("os"),
        Some(&InstallOutcome::AlreadyPresent)
    );
    assert!(h.host.installs.lock().await.is_empty());
    assert_eq!(h.runner.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn answer_path_skips_extraction_install_and_execution() {
    let transport = ScriptedTransport::ok(&["The answer ", "is 4."]);
    let h = harness(transport, FakeHost::new(&[], &[]));

    let request = GenerationRequest::new("what is 2+2", GenerationMode::Qa);
    let (tx, _rx) = mpsc::unbounded_channel();
    let result = h.pipeline.run_answer(request, &tx).await.unwrap();

    assert_eq!(result.raw_text, "The answer is 4.");
    assert!(result.extracted_code.is_none());
    assert!(h.host.installs.lock().await.is_empty());
    assert_eq!(h.runner.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.limiter.total_count().await, 1);
}

#[tokio::test]
async fn webdev_extracts_but_never_executes() {
    let transport = ScriptedTransport::ok(&["```html\n<p>hello</p>\n```"]);
    let h = harness(transport, FakeHost::new(&[], &[]));

    let request = GenerationRequest::new("a hello page", GenerationMode::WebDev);
    let (tx, _rx) = mpsc::unbounded_channel();
    let result = h.pipeline.run_webdev(request, &tx).await.unwrap();

    assert_eq!(result.extracted_code.as_deref(), Some("\n<p>hello</p>\n"));
    assert_eq!(h.runner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn each_invocation_admits_exactly_once() {
    let h = harness(
        ScriptedTransport::ok(&["```python\nprint(1)\n```"]),
        FakeHost::new(&[], &[]),
    );

    for _ in 0..3 {
        let request = GenerationRequest::new("print one", GenerationMode::Automation);
        let (tx, _rx) = mpsc::unbounded_channel();
        h.pipeline.run_automation(request, &tx).await.unwrap();
    }

    assert_eq!(h.limiter.total_count().await, 3);
}

#[tokio::test]
async fn events_carry_chunks_statuses_and_monotonic_progress() {
    let transport = ScriptedTransport::ok(&["```python\n", "print(1)\n", "```"]);
    let h = harness(transport, FakeHost::new(&[], &[]));

    let request = GenerationRequest::new("print one", GenerationMode::Automation);
    let mut handle = h.pipeline.spawn_automation(request);

    let mut streamed = String::new();
    let mut statuses = 0;
    let mut last_progress = 0u8;
    while let Some(event) = handle.events.recv().await {
        match event {
            PipelineEvent::Chunk(chunk) => streamed.push_str(&chunk),
            PipelineEvent::Status(_) => statuses += 1,
            PipelineEvent::Progress(percent) => {
                assert!(percent >= last_progress, "progress went backwards");
                last_progress = percent;
            }
        }
    }
    let report = handle.outcome.await.unwrap().unwrap();

    assert_eq!(streamed, report.generation.raw_text);
    assert!(statuses >= 2);
    assert_eq!(last_progress, 100);
}

#[tokio::test]
async fn terminal_stream_error_aborts_without_execution() {
    let transport = ScriptedTransport {
        chunks: vec![
            Ok("```python\nimport os\n".to_string()),
            Err(GeminiError::Network("connection reset".to_string())),
        ],
    };
    let h = harness(transport, FakeHost::new(&["os"], &[]));

    let request = GenerationRequest::new("doomed", GenerationMode::Automation);
    let (tx, _rx) = mpsc::unbounded_channel();
    let result = h.pipeline.run_automation(request, &tx).await;

    assert!(matches!(result, Err(PipelineError::Generation(_))));
    assert!(h.host.installs.lock().await.is_empty());
    assert_eq!(h.runner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn refused_transport_surfaces_a_generation_error() {
    struct RefusingTransport;
    impl GenerationTransport for RefusingTransport {
        fn start_stream(
            &self,
            _parts: Vec<PromptPart>,
        ) -> BoxFuture<'_, Result<ChunkStream, GeminiError>> {
            Box::pin(async {
                Err(GeminiError::Auth("service refused the API key".to_string()))
            })
        }
    }

    let limiter = Arc::new(RequestWindow::new());
    let client = GenerationClient::new(Arc::new(RefusingTransport), limiter.clone());
    let runner = Arc::new(RecordingRunner::new());
    let pipeline = Pipeline::new(
        client,
        PackageInstaller::new(Arc::new(FakeHost::new(&[], &[]))),
        runner.clone(),
    );

    let request = GenerationRequest::new("anything", GenerationMode::Automation);
    let (tx, _rx) = mpsc::unbounded_channel();
    let result = pipeline.run_automation(request, &tx).await;

    assert!(matches!(
        result,
        Err(PipelineError::Generation(GeminiError::Auth(_)))
    ));
    // The admission was still recorded at submission time.
    assert_eq!(limiter.total_count().await, 1);
    assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
}
