//! End-to-end pipeline orchestration.
//!
//! One invocation runs generate → extract → scan → install → execute on a
//! dedicated worker task, streaming [`PipelineEvent`]s back to the caller
//! so its control loop never blocks. Stages are strictly sequential
//! within an invocation; invocations are independent of each other and
//! share only the rate window behind its own mutex.
//!
//! Failure isolation follows the stage taxonomy: transport and install
//! failures abort the invocation, while a fault raised by the generated
//! script is absorbed into the report; the pipeline completes and still
//! carries the elapsed time.

use crate::deps::{InstallOutcome, PackageInstaller, scan};
use crate::extract::extract_code;
use crate::gemini::{GeminiError, GenerationClient, GenerationRequest, GenerationResult};
use crate::runner::{ExecutionReport, ScriptRunner};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Progress events emitted by a running invocation.
///
/// The worker produces; the caller's control loop consumes and owns all
/// presentation-layer mutation.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Human-readable phase description
    Status(String),
    /// Coarse progress on a 0-100 scale, monotonically advanced
    Progress(u8),
    /// A streamed chunk of model output
    Chunk(String),
}

/// Errors that abort an invocation.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("generation failed: {0}")]
    Generation(#[from] GeminiError),
    #[error("could not install '{module}': {reason}")]
    Install { module: String, reason: String },
}

/// Report returned by a completed automation invocation.
#[derive(Debug, Clone)]
pub struct AutomationReport {
    pub generation: GenerationResult,
    /// One outcome per scanned dependency; complete before execution ran
    pub dependencies: BTreeMap<String, InstallOutcome>,
    pub execution: ExecutionReport,
}

/// Handle to an invocation running on its own worker task.
pub struct PipelineHandle<T> {
    /// Progress feed; drained by the caller's control loop
    pub events: UnboundedReceiver<PipelineEvent>,
    /// Resolves once the worker finishes
    pub outcome: JoinHandle<Result<T, PipelineError>>,
}

/// Coordinates the generation, dependency, and execution stages.
///
/// Every collaborator is injected fully formed at construction.
pub struct Pipeline {
    client: GenerationClient,
    installer: PackageInstaller,
    runner: Arc<dyn ScriptRunner>,
}

impl Pipeline {
    pub fn new(
        client: GenerationClient,
        installer: PackageInstaller,
        runner: Arc<dyn ScriptRunner>,
    ) -> Self {
        Self {
            client,
            installer,
            runner,
        }
    }

    /// Start an automation invocation on a dedicated worker task.
    pub fn spawn_automation(
        self: &Arc<Self>,
        request: GenerationRequest,
    ) -> PipelineHandle<AutomationReport> {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = Arc::clone(self);
        let outcome = tokio::spawn(async move { pipeline.run_automation(request, &tx).await });
        PipelineHandle {
            events: rx,
            outcome,
        }
    }

    /// Start an answer invocation on a dedicated worker task.
    pub fn spawn_answer(
        self: &Arc<Self>,
        request: GenerationRequest,
    ) -> PipelineHandle<GenerationResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = Arc::clone(self);
        let outcome = tokio::spawn(async move { pipeline.run_answer(request, &tx).await });
        PipelineHandle {
            events: rx,
            outcome,
        }
    }

    /// Start a web-generation invocation on a dedicated worker task.
    pub fn spawn_webdev(
        self: &Arc<Self>,
        request: GenerationRequest,
    ) -> PipelineHandle<GenerationResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = Arc::clone(self);
        let outcome = tokio::spawn(async move { pipeline.run_webdev(request, &tx).await });
        PipelineHandle {
            events: rx,
            outcome,
        }
    }

    /// Full automation run: generate, extract, resolve, install, execute.
    pub async fn run_automation(
        &self,
        request: GenerationRequest,
        events: &UnboundedSender<PipelineEvent>,
    ) -> Result<AutomationReport, PipelineError> {
        let generation = self.generate(&request, events, true).await?;
        let code = generation
            .extracted_code
            .clone()
            .unwrap_or_default();

        emit(events, PipelineEvent::Status("Scanning dependencies".to_string()));
        let dependencies = scan(&code);
        info!(count = dependencies.len(), "scanned dependency surface");
        emit(events, PipelineEvent::Progress(85));

        let outcomes = if dependencies.is_empty() {
            BTreeMap::new()
        } else {
            emit(
                events,
                PipelineEvent::Status(format!(
                    "Resolving {} dependenc{}",
                    dependencies.len(),
                    if dependencies.len() == 1 { "y" } else { "ies" }
                )),
            );
            self.installer.ensure_all(&dependencies).await
        };

        // Fail-fast install policy: a single failed dependency skips
        // execution for the whole script.
        if let Some((module, reason)) = first_failure(&outcomes) {
            warn!(module, "aborting before execution, dependency failed");
            return Err(PipelineError::Install {
                module: module.to_string(),
                reason: reason.to_string(),
            });
        }

        emit(events, PipelineEvent::Status("Running script".to_string()));
        emit(events, PipelineEvent::Progress(90));
        let execution = self.runner.run(&code).await;
        emit(events, PipelineEvent::Progress(100));

        Ok(AutomationReport {
            generation,
            dependencies: outcomes,
            execution,
        })
    }

    /// Answer run: same generation path, no extraction and no execution.
    pub async fn run_answer(
        &self,
        request: GenerationRequest,
        events: &UnboundedSender<PipelineEvent>,
    ) -> Result<GenerationResult, PipelineError> {
        let result = self.generate(&request, events, false).await?;
        emit(events, PipelineEvent::Progress(100));
        Ok(result)
    }

    /// Web run: generation plus extraction, nothing is installed or run.
    pub async fn run_webdev(
        &self,
        request: GenerationRequest,
        events: &UnboundedSender<PipelineEvent>,
    ) -> Result<GenerationResult, PipelineError> {
        let result = self.generate(&request, events, true).await?;
        emit(events, PipelineEvent::Progress(100));
        Ok(result)
    }

    /// Stream one generation call to completion, accumulating chunks.
    ///
    /// A terminal stream error discards whatever was accumulated; there
    /// is no partial-result contract.
    async fn generate(
        &self,
        request: &GenerationRequest,
        events: &UnboundedSender<PipelineEvent>,
        extract: bool,
    ) -> Result<GenerationResult, PipelineError> {
        emit(events, PipelineEvent::Status("Contacting generation service".to_string()));
        emit(events, PipelineEvent::Progress(5));

        let started = Instant::now();
        let mut stream = self.client.generate(request).await?;
        emit(events, PipelineEvent::Progress(10));

        let mut raw_text = String::new();
        let mut progress = 10u8;
        while let Some(chunk) = stream.next_chunk().await {
            let chunk = chunk?;
            raw_text.push_str(&chunk);
            emit(events, PipelineEvent::Chunk(chunk));
            progress = (progress + 5).min(80);
            emit(events, PipelineEvent::Progress(progress));
        }
        let elapsed = started.elapsed();
        info!(request_id = %request.id, ?elapsed, chars = raw_text.len(), "generation stream completed");

        let extracted_code = extract.then(|| extract_code(&raw_text));
        Ok(GenerationResult {
            raw_text,
            extracted_code,
            elapsed,
        })
    }
}

fn first_failure(outcomes: &BTreeMap<String, InstallOutcome>) -> Option<(&str, &str)> {
    outcomes.iter().find_map(|(module, outcome)| match outcome {
        InstallOutcome::Failed(reason) => Some((module.as_str(), reason.as_str())),
        _ => None,
    })
}

/// Send an event; a dropped receiver is not an error for the worker.
fn emit(events: &UnboundedSender<PipelineEvent>, event: PipelineEvent) {
    let _ = events.send(event);
}
