//! Subcommand implementations
//!
//! Each handler returns the process exit code: 0 on success, 1 on errors and
//! 2 when a validation ran but ended `failed`.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::commands::{CliArgs, ListArgs, RunArgs, ValidateArgs};
use super::output::OutputFormatter;
use crate::article::Article;
use crate::config::VerifactConfig;
use crate::handlers::{llm_registry, llm_registry_with_directory};
use crate::llm::LLMClient;
use crate::news::SourceDirectory;
use crate::pipeline::{CancellationSignal, Executor, ValidationOrchestrator};
use crate::store::{
    ArticleStore, InMemoryCache, JsonDirStore, ValidationFilter, ValidationMemory,
    ValidationRepository,
};
use crate::validation::{ValidationOutcome, ValidationRequest, ValidationStatus};

const EXIT_OK: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_VALIDATION_FAILED: i32 = 2;

/// Environment configuration with the command-line overrides applied
pub fn effective_config(args: &CliArgs) -> Result<VerifactConfig> {
    let mut config = VerifactConfig::default();
    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = timeout;
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn open_store(config: &VerifactConfig) -> Result<Arc<JsonDirStore>> {
    let store = JsonDirStore::open(&config.data_dir)
        .await
        .with_context(|| format!("Failed to open data directory {}", config.data_dir.display()))?;
    Ok(Arc::new(store))
}

/// Wires the orchestrator over the on-disk store. The cache lives for this
/// process only.
pub fn build_orchestrator(
    config: &VerifactConfig,
    store: Arc<JsonDirStore>,
    client: Arc<dyn LLMClient>,
    directory: Option<Arc<dyn SourceDirectory>>,
) -> ValidationOrchestrator {
    let registry = match directory {
        Some(directory) => llm_registry_with_directory(client, directory),
        None => llm_registry(client),
    };
    let executor = Executor::new(Arc::new(registry)).with_config(config.executor_config());
    let memory = ValidationMemory::new(Arc::new(InMemoryCache::new()));
    ValidationOrchestrator::new(executor, store.clone(), store, memory)
}

async fn orchestrator_for(
    config: &VerifactConfig,
    store: Arc<JsonDirStore>,
) -> Result<ValidationOrchestrator> {
    let client = config
        .create_client()
        .await
        .context("Failed to initialize model client")?;
    debug!(
        backend = client.name(),
        model = ?client.model_info(),
        "Model client ready"
    );
    let directory = config
        .create_source_directory()
        .context("Failed to initialize NewsAPI client")?
        .map(|client| client as Arc<dyn SourceDirectory>);
    if directory.is_none() {
        debug!("No NewsAPI key configured, source directory disabled");
    }
    Ok(build_orchestrator(config, store, client, directory))
}

async fn read_article(path: &Path) -> Result<Article> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read article file {}", path.display()))?;
    let article: Article = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse article file {}", path.display()))?;
    if article.content.trim().is_empty() {
        anyhow::bail!("Article {} has no content", path.display());
    }
    Ok(article)
}

/// Cancels `signal` on Ctrl-C
fn cancel_on_interrupt(signal: &CancellationSignal) {
    let signal = signal.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling validation");
            signal.cancel();
        }
    });
}

fn print_outcome(formatter: &OutputFormatter, outcome: &ValidationOutcome) -> Result<i32> {
    println!("{}", formatter.format_outcome(outcome)?);
    Ok(match outcome.status {
        ValidationStatus::Failed => EXIT_VALIDATION_FAILED,
        _ => EXIT_OK,
    })
}

fn exit_code(result: Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    }
}

async fn validate(args: &CliArgs, validate_args: &ValidateArgs) -> Result<i32> {
    let config = effective_config(args)?;
    let article = read_article(&validate_args.article).await?;
    let request = ValidationRequest::parse(
        article.id,
        &validate_args.validation_type,
        validate_args.priority,
    )?
    .with_metadata("source_file", validate_args.article.display().to_string());

    let store = open_store(&config).await?;
    store
        .put_article(&article)
        .await
        .context("Failed to store article")?;
    let orchestrator = orchestrator_for(&config, store).await?;

    let cancel = CancellationSignal::new();
    cancel_on_interrupt(&cancel);
    let outcome = orchestrator.validate_with_cancel(request, &cancel).await?;

    print_outcome(&OutputFormatter::new(args.format.into()), &outcome)
}

async fn retry(args: &CliArgs, run_args: &RunArgs) -> Result<i32> {
    let config = effective_config(args)?;
    let store = open_store(&config).await?;
    let orchestrator = orchestrator_for(&config, store).await?;
    let outcome = orchestrator.retry_validation(run_args.run_id).await?;
    print_outcome(&OutputFormatter::new(args.format.into()), &outcome)
}

async fn show(args: &CliArgs, run_args: &RunArgs) -> Result<i32> {
    let config = effective_config(args)?;
    let store = open_store(&config).await?;
    let outcome = store
        .get_validation(run_args.run_id)
        .await?
        .with_context(|| format!("Validation not found: {}", run_args.run_id))?;
    println!(
        "{}",
        OutputFormatter::new(args.format.into()).format_outcome(&outcome)?
    );
    Ok(EXIT_OK)
}

async fn list(args: &CliArgs, list_args: &ListArgs) -> Result<i32> {
    let config = effective_config(args)?;
    let store = open_store(&config).await?;
    let filter = ValidationFilter {
        article_id: list_args.article,
        status: list_args.status,
        validation_type: list_args.validation_type,
        offset: list_args.offset,
        limit: list_args.limit,
    };
    let page = store.list_validations(&filter).await?;
    println!(
        "{}",
        OutputFormatter::new(args.format.into()).format_page(&page)?
    );
    Ok(EXIT_OK)
}

fn show_config(args: &CliArgs) -> Result<i32> {
    let config = effective_config(args)?;
    println!(
        "{}",
        OutputFormatter::new(args.format.into()).format_config(&config)?
    );
    Ok(EXIT_OK)
}

pub async fn handle_validate(args: &CliArgs, validate_args: &ValidateArgs) -> i32 {
    exit_code(validate(args, validate_args).await)
}

pub async fn handle_retry(args: &CliArgs, run_args: &RunArgs) -> i32 {
    exit_code(retry(args, run_args).await)
}

pub async fn handle_show(args: &CliArgs, run_args: &RunArgs) -> i32 {
    exit_code(show(args, run_args).await)
}

pub async fn handle_list(args: &CliArgs, list_args: &ListArgs) -> i32 {
    exit_code(list(args, list_args).await)
}

pub fn handle_config(args: &CliArgs) -> i32 {
    exit_code(show_config(args))
}
