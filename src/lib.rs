//! # Taskomat
//!
//! Turns a natural-language instruction into a generated Python script,
//! resolves the script's runtime dependencies, and runs it, while
//! keeping a sliding-window budget of requests against the generation
//! service.
//!
//! ## Architecture Overview
//!
//! One pipeline invocation flows through the stages strictly in order:
//!
//! ```text
//! instruction
//!      ↓
//! RequestWindow::admit ── GenerationClient::generate (streaming)
//!      ↓
//! extract_code ── deps::scan ── PackageInstaller::ensure_all
//!      ↓
//! ScriptRunner::run
//!      ↓
//! AutomationReport
//! ```
//!
//! The answer path shares the generation and rate-accounting stages and
//! skips everything after them. Each invocation runs on its own worker
//! task and streams [`pipeline::PipelineEvent`]s back to the caller.
//!
//! ## Modules
//!
//! - **[`gemini`]**: streaming generation client, request-rate window, wire types
//! - **[`extract`]**: markdown fence stripping for model output
//! - **[`deps`]**: static import scanning and package installation
//! - **[`runner`]**: script execution with timing and fault capture
//! - **[`store`]**: persistent library of named scripts
//! - **[`pipeline`]**: worker-task orchestration of the stages above
//! - **[`cli`]**: argument parsing and configuration discovery
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskomat::deps::{PackageInstaller, PipHost};
//! use taskomat::gemini::{
//!     GeminiTransport, GenerationClient, GenerationMode, GenerationRequest, RequestWindow,
//! };
//! use taskomat::pipeline::Pipeline;
//! use taskomat::runner::HostRunner;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let python = taskomat::deps::installer::discover_python()?;
//!     let limiter = Arc::new(RequestWindow::new());
//!     let client = GenerationClient::new(
//!         Arc::new(GeminiTransport::new("api-key", "gemini-1.5-flash")),
//!         limiter.clone(),
//!     );
//!     let pipeline = Arc::new(Pipeline::new(
//!         client,
//!         PackageInstaller::new(Arc::new(PipHost::new(python.clone()))),
//!         Arc::new(HostRunner::new(python)),
//!     ));
//!
//!     let request = GenerationRequest::new("print the current date", GenerationMode::Automation);
//!     let mut handle = pipeline.spawn_automation(request);
//!     while let Some(event) = handle.events.recv().await {
//!         println!("{event:?}");
//!     }
//!     let report = handle.outcome.await??;
//!     println!("ran in {:?}", report.execution.duration);
//!     Ok(())
//! }
//! ```

/// Gemini generation service integration.
///
/// Streaming client over an injected transport, sliding-window request
/// accounting, and the request/response wire types.
pub mod gemini;

/// Code block extraction from model output.
pub mod extract;

/// Dependency surface scanning and package installation.
pub mod deps;

/// Generated-script execution with timing and fault capture.
pub mod runner;

/// Persistent library of named scripts.
pub mod store;

/// End-to-end pipeline orchestration.
///
/// Runs the stages on a dedicated worker task per invocation and streams
/// progress events back to the caller.
pub mod pipeline;

/// Environment constants and path utilities.
pub mod env;

/// Command-line interface.
pub mod cli;

// Re-export the main generation types
pub use gemini::{
    Attachment, GeminiError, GeminiTransport, GenerationClient, GenerationMode, GenerationRequest,
    GenerationResult, GenerationTransport, RequestWindow,
};

// Re-export the dependency types
pub use deps::{InstallOutcome, ModuleHost, PackageInstaller, PipHost, scan};

// Re-export extraction
pub use extract::extract_code;

// Re-export execution types
pub use runner::{ExecutionReport, HostRunner, ScriptRunner};

// Re-export the script store
pub use store::{ScriptStore, StoreError};

// Re-export orchestration types
pub use pipeline::{AutomationReport, Pipeline, PipelineError, PipelineEvent, PipelineHandle};
