use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use taskomat::cli::{self, AppConfig, Args, Commands, ConfigDiscovery, ScriptsAction};
use taskomat::deps::installer::discover_python;
use taskomat::deps::{InstallOutcome, PackageInstaller, PipHost};
use taskomat::gemini::{
    GeminiTransport, GenerationClient, GenerationMode, GenerationRequest, RequestWindow,
};
use taskomat::pipeline::{AutomationReport, Pipeline, PipelineEvent};
use taskomat::runner::{HostRunner, ScriptRunner};
use taskomat::store::ScriptStore;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("taskomat=info")
        .init();

    let args = Args::parse();
    let config = ConfigDiscovery::discover_config()
        .map_err(|err| anyhow::anyhow!("configuration error: {err}"))?;

    match args.command {
        Commands::Run {
            instruction,
            attach,
            verbose,
        } => run_automation(&config, instruction.join(" "), attach, verbose).await,
        Commands::Ask { question, attach } => run_answer(&config, question.join(" "), attach).await,
        Commands::Web { instruction, out } => run_webdev(&config, instruction.join(" "), out).await,
        Commands::Interactive => run_interactive(&config).await,
        Commands::Scripts { action } => run_scripts(&config, action).await,
        Commands::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            Ok(())
        }
        Commands::InitConfig => {
            let path = ConfigDiscovery::create_default_user_config()
                .map_err(|err| anyhow::anyhow!("could not create configuration: {err}"))?;
            println!("✅ Configuration at {}", path.display());
            Ok(())
        }
    }
}

/// Components wired once per process, fully formed at construction.
struct App {
    pipeline: Arc<Pipeline>,
    limiter: Arc<RequestWindow>,
    store: ScriptStore,
    rate_budget: u32,
}

fn build_app(config: &AppConfig) -> Result<App> {
    let Some(api_key) = config.resolve_api_key() else {
        bail!(
            "no API key configured; set `api_key` in taskomat.toml or the API_KEY environment variable"
        );
    };
    let python = discover_python()?;

    let limiter = Arc::new(RequestWindow::new());
    let transport = Arc::new(GeminiTransport::new(api_key, config.model.clone()));
    let client = GenerationClient::new(transport, limiter.clone());
    let host = Arc::new(PipHost::new(python.clone()));
    let runner: Arc<dyn ScriptRunner> = Arc::new(HostRunner::new(python));
    let pipeline = Arc::new(Pipeline::new(
        client,
        PackageInstaller::new(host),
        runner,
    ));

    Ok(App {
        pipeline,
        limiter,
        store: ScriptStore::new(config.scripts_root()),
        rate_budget: config.requests_per_minute,
    })
}

async fn run_automation(
    config: &AppConfig,
    instruction: String,
    attach: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    if instruction.trim().is_empty() {
        bail!("no instruction given");
    }
    let app = build_app(config)?;
    warn_if_over_budget(&app).await;

    let mut request = GenerationRequest::new(instruction, GenerationMode::Automation);
    if let Some(path) = attach {
        let attachment = cli::load_attachment(&path)?;
        request = request.with_attachment(attachment.mime_type, attachment.data);
    }

    info!(request_id = %request.id, "starting automation pipeline");
    let mut handle = app.pipeline.spawn_automation(request);
    while let Some(event) = handle.events.recv().await {
        render_event(&event, verbose);
    }

    match handle.outcome.await? {
        Ok(report) => {
            print_report(&report, verbose);
            Ok(())
        }
        Err(err) => {
            error!("pipeline aborted: {err}");
            println!("❌ {err}");
            Err(err.into())
        }
    }
}

async fn run_answer(config: &AppConfig, question: String, attach: Option<PathBuf>) -> Result<()> {
    if question.trim().is_empty() {
        bail!("no question given");
    }
    let app = build_app(config)?;
    warn_if_over_budget(&app).await;

    let mut request = GenerationRequest::new(question, GenerationMode::Qa);
    if let Some(path) = attach {
        let attachment = cli::load_attachment(&path)?;
        request = request.with_attachment(attachment.mime_type, attachment.data);
    }

    let mut handle = app.pipeline.spawn_answer(request);
    while let Some(event) = handle.events.recv().await {
        if let PipelineEvent::Chunk(chunk) = event {
            print!("{chunk}");
            io::stdout().flush()?;
        }
    }
    println!();

    let result = handle.outcome.await??;
    info!(elapsed = ?result.elapsed, "answer completed");
    Ok(())
}

async fn run_webdev(
    config: &AppConfig,
    instruction: String,
    out: Option<PathBuf>,
) -> Result<()> {
    if instruction.trim().is_empty() {
        bail!("no instruction given");
    }
    let app = build_app(config)?;
    warn_if_over_budget(&app).await;

    let request = GenerationRequest::new(instruction, GenerationMode::WebDev);
    let mut handle = app.pipeline.spawn_webdev(request);
    while let Some(event) = handle.events.recv().await {
        render_event(&event, false);
    }

    let result = handle.outcome.await??;
    let page = result.extracted_code.unwrap_or(result.raw_text);
    match out {
        Some(path) => {
            std::fs::write(&path, &page)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("✅ Wrote page to {}", path.display());
        }
        None => println!("{page}"),
    }
    Ok(())
}

async fn run_scripts(config: &AppConfig, action: ScriptsAction) -> Result<()> {
    let store = ScriptStore::new(config.scripts_root());
    match action {
        ScriptsAction::List => {
            let names = store.list().await?;
            if names.is_empty() {
                println!("No saved scripts in {}", store.root().display());
            } else {
                for name in names {
                    println!("{name}");
                }
            }
        }
        ScriptsAction::Show { name } => {
            print!("{}", store.load(&name).await?);
        }
        ScriptsAction::Save { name, file } => {
            let body = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let path = store.save(&name, &body).await?;
            println!("✅ Saved to {}", path.display());
        }
        ScriptsAction::Delete { name } => {
            store.delete(&name).await?;
            println!("✅ Deleted '{name}'");
        }
        ScriptsAction::Run { name } => {
            let body = store.load(&name).await?;
            run_saved_script(&body).await?;
        }
    }
    Ok(())
}

/// Push a saved script through the dependency and execution stages.
async fn run_saved_script(body: &str) -> Result<()> {
    let python = discover_python()?;
    let installer = PackageInstaller::new(Arc::new(PipHost::new(python.clone())));
    let runner = HostRunner::new(python);

    let outcomes = installer.ensure_all(&taskomat::scan(body)).await;
    for (module, outcome) in &outcomes {
        if let InstallOutcome::Failed(reason) = outcome {
            bail!("could not install '{module}': {reason}");
        }
    }

    let report = runner.run(body).await;
    if !report.stdout.is_empty() {
        print!("{}", report.stdout);
    }
    print_execution_summary(&report);
    Ok(())
}

async fn run_interactive(config: &AppConfig) -> Result<()> {
    let app = build_app(config)?;
    println!("🤖 Interactive mode started. Type 'help' for commands.");

    let mut last_code: Option<String> = None;
    loop {
        print!("\n> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }
        if input == "help" {
            show_interactive_help(config);
            continue;
        }
        if input == "status" {
            show_status(&app).await;
            continue;
        }
        if input == "scripts" {
            for name in app.store.list().await? {
                println!("{name}");
            }
            continue;
        }
        if let Some(question) = input.strip_prefix("ask ") {
            answer_inline(&app, question).await;
            continue;
        }
        if let Some(name) = input.strip_prefix("save ") {
            match &last_code {
                Some(code) => match app.store.save(name, code).await {
                    Ok(path) => println!("✅ Saved to {}", path.display()),
                    Err(err) => println!("❌ {err}"),
                },
                None => println!("❌ Nothing generated yet"),
            }
            continue;
        }

        // Anything else is an automation instruction.
        warn_if_over_budget(&app).await;
        let request = GenerationRequest::new(input, GenerationMode::Automation);
        let mut handle = app.pipeline.spawn_automation(request);
        while let Some(event) = handle.events.recv().await {
            render_event(&event, false);
        }
        match handle.outcome.await? {
            Ok(report) => {
                last_code = report.generation.extracted_code.clone();
                print_report(&report, true);
            }
            Err(err) => {
                error!("pipeline failed: {err}");
                println!("❌ {err}");
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

async fn answer_inline(app: &App, question: &str) {
    warn_if_over_budget(app).await;
    let request = GenerationRequest::new(question, GenerationMode::Qa);
    let mut handle = app.pipeline.spawn_answer(request);
    while let Some(event) = handle.events.recv().await {
        if let PipelineEvent::Chunk(chunk) = event {
            print!("{chunk}");
            let _ = io::stdout().flush();
        }
    }
    println!();
    match handle.outcome.await {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => println!("❌ {err}"),
        Err(err) => println!("❌ worker failed: {err}"),
    }
}

async fn warn_if_over_budget(app: &App) {
    let load = app.limiter.current_load().await;
    if load >= app.rate_budget as usize {
        println!(
            "⚠️  {load} requests in the last minute (budget {}); proceeding anyway",
            app.rate_budget
        );
    }
}

async fn show_status(app: &App) {
    println!("\n📊 Status:");
    println!(
        "  Requests (last 60s): {} / {}",
        app.limiter.current_load().await,
        app.rate_budget
    );
    println!("  Requests (lifetime): {}", app.limiter.total_count().await);
    println!("  Script library:      {}", app.store.root().display());
}

fn show_interactive_help(config: &AppConfig) {
    println!("📖 Interactive Mode Commands:");
    println!("  ask <question>  - Answer a question in plain text");
    println!("  save <name>     - Save the last generated script");
    println!("  scripts         - List saved scripts");
    println!("  status          - Show request-rate status");
    println!("  help            - Show this help message");
    println!("  quit            - Exit");
    println!("\n💡 Enter any other text to generate and run a script for it.");
    if !config.keyboard_shortcuts.is_empty() {
        let bindings: Vec<String> = config
            .keyboard_shortcuts
            .iter()
            .map(|(action, key)| format!("{action}={key}"))
            .collect();
        println!("⌨️  Configured shortcuts: {}", bindings.join(", "));
    }
}

fn render_event(event: &PipelineEvent, verbose: bool) {
    match event {
        PipelineEvent::Status(status) => println!("⏳ {status}"),
        PipelineEvent::Progress(percent) if verbose => println!("   {percent}%"),
        PipelineEvent::Progress(_) => {}
        PipelineEvent::Chunk(_) => {}
    }
}

fn print_report(report: &AutomationReport, show_script: bool) {
    if show_script {
        if let Some(code) = &report.generation.extracted_code {
            println!("--- generated script ---");
            println!("{}", code.trim());
            println!("------------------------");
        }
    }
    for (module, outcome) in &report.dependencies {
        match outcome {
            InstallOutcome::Installed => println!("📦 Installed {module}"),
            InstallOutcome::AlreadyPresent => {}
            InstallOutcome::Failed(reason) => println!("❌ {module}: {reason}"),
        }
    }
    if !report.execution.stdout.is_empty() {
        print!("{}", report.execution.stdout);
    }
    print_execution_summary(&report.execution);
}

fn print_execution_summary(report: &taskomat::ExecutionReport) {
    match &report.fault {
        None => println!(
            "✅ Script finished in {:.2} seconds",
            report.duration.as_secs_f64()
        ),
        Some(fault) => println!(
            "❌ Script failed after {:.2} seconds: {fault}",
            report.duration.as_secs_f64()
        ),
    }
}
