use clap::{Parser, Subcommand, ValueEnum};
use genai::adapter::AdapterKind;
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::parse_provider;
use crate::store::DEFAULT_PAGE_SIZE;
use crate::validation::{ValidationStatus, ValidationType};

/// Credibility validation for news articles
#[derive(Parser, Debug)]
#[command(
    name = "verifact",
    about = "Credibility validation for news articles",
    version,
    author,
    long_about = "verifact runs an article through fact checking, source verification and \
                  bias analysis, then scores the results into a credibility verdict. Runs \
                  and articles are kept as JSON files in the data directory."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,

    #[arg(
        short = 'f',
        long,
        global = true,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        long,
        global = true,
        value_parser = parse_adapter_kind,
        help = "Model provider (overrides VERIFACT_PROVIDER)"
    )]
    pub provider: Option<AdapterKind>,

    #[arg(
        short = 'm',
        long,
        global = true,
        value_name = "MODEL",
        help = "Model name (overrides VERIFACT_MODEL)"
    )]
    pub model: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "SECONDS",
        help = "Model request timeout in seconds (overrides VERIFACT_REQUEST_TIMEOUT)"
    )]
    pub timeout: Option<u64>,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "State directory (overrides VERIFACT_DATA_DIR)"
    )]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Validate an article",
        long_about = "Stores the article and runs a validation of the requested type.\n\n\
                      Examples:\n  \
                      verifact validate --article story.json\n  \
                      verifact validate --article story.json --type bias_analysis --priority 3"
    )]
    Validate(ValidateArgs),

    #[command(about = "Re-run a failed validation under a new run id")]
    Retry(RunArgs),

    #[command(about = "Show a validation run")]
    Show(RunArgs),

    #[command(
        about = "List validation runs, newest first",
        long_about = "Lists stored validation runs.\n\n\
                      Examples:\n  \
                      verifact list --status failed\n  \
                      verifact list --article 6f1c... --limit 10"
    )]
    List(ListArgs),

    #[command(about = "Show the effective configuration")]
    Config,
}

#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(
        short = 'a',
        long,
        value_name = "FILE",
        help = "Article JSON file (title and content are required)"
    )]
    pub article: PathBuf,

    #[arg(
        short = 't',
        long = "type",
        value_name = "TYPE",
        default_value = "full_analysis",
        help = "fact_check, source_verification, bias_analysis or full_analysis"
    )]
    pub validation_type: String,

    #[arg(short = 'p', long, help = "Priority from 1 (lowest) to 5 (highest)")]
    pub priority: Option<u8>,
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(value_name = "RUN_ID")]
    pub run_id: Uuid,
}

#[derive(Parser, Debug, Clone)]
pub struct ListArgs {
    #[arg(long, value_name = "ARTICLE_ID", help = "Only runs of this article")]
    pub article: Option<Uuid>,

    #[arg(long, help = "pending, in_progress, completed or failed")]
    pub status: Option<ValidationStatus>,

    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub validation_type: Option<ValidationType>,

    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub limit: usize,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_adapter_kind(s: &str) -> Result<AdapterKind, String> {
    parse_provider(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_validate_defaults() {
        let args = CliArgs::parse_from(["verifact", "validate", "--article", "story.json"]);
        assert_eq!(args.format, OutputFormatArg::Human);
        assert!(args.provider.is_none());
        match args.command {
            Commands::Validate(validate) => {
                assert_eq!(validate.article, PathBuf::from("story.json"));
                assert_eq!(validate.validation_type, "full_analysis");
                assert!(validate.priority.is_none());
            }
            other => panic!("Expected Validate command, got {:?}", other),
        }
    }

    #[test]
    fn test_global_overrides_after_subcommand() {
        let args = CliArgs::parse_from([
            "verifact",
            "validate",
            "-a",
            "story.json",
            "--type",
            "bias_analysis",
            "--priority",
            "3",
            "--provider",
            "anthropic",
            "--model",
            "claude-sonnet",
            "--timeout",
            "90",
            "--format",
            "json",
        ]);

        assert_eq!(args.provider, Some(AdapterKind::Anthropic));
        assert_eq!(args.model.as_deref(), Some("claude-sonnet"));
        assert_eq!(args.timeout, Some(90));
        assert_eq!(args.format, OutputFormatArg::Json);
        match args.command {
            Commands::Validate(validate) => {
                assert_eq!(validate.validation_type, "bias_analysis");
                assert_eq!(validate.priority, Some(3));
            }
            other => panic!("Expected Validate command, got {:?}", other),
        }
    }

    #[test]
    fn test_list_filters() {
        let args = CliArgs::parse_from(["verifact", "list", "--status", "failed", "--limit", "5"]);
        match args.command {
            Commands::List(list) => {
                assert_eq!(list.status, Some(ValidationStatus::Failed));
                assert_eq!(list.limit, 5);
                assert_eq!(list.offset, 0);
                assert!(list.article.is_none());
            }
            other => panic!("Expected List command, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_run_id_rejected() {
        assert!(CliArgs::try_parse_from(["verifact", "show", "not-a-uuid"]).is_err());
        assert!(CliArgs::try_parse_from(["verifact", "validate", "-a", "x.json", "--provider", "pigeon"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(CliArgs::try_parse_from(["verifact", "-v", "-q", "config"]).is_err());
    }
}
