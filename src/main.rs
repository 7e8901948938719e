use verifact::cli::commands::{CliArgs, Commands};
use verifact::cli::handlers::{
    handle_config, handle_list, handle_retry, handle_show, handle_validate,
};
use verifact::util::logging::{init_logging, parse_level, LoggingConfig};
use verifact::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("verifact v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Validate(validate_args) => handle_validate(&args, validate_args).await,
        Commands::Retry(run_args) => handle_retry(&args, run_args).await,
        Commands::Show(run_args) => handle_show(&args, run_args).await,
        Commands::List(list_args) => handle_list(&args, list_args).await,
        Commands::Config => handle_config(&args),
    };

    std::process::exit(exit_code);
}

/// `--log-level` wins over `-v`/`-q`, which win over `VERIFACT_LOG_LEVEL`
fn init_logging_from_args(args: &CliArgs) {
    let mut config = LoggingConfig::from_env();

    if let Some(level_str) = &args.log_level {
        match parse_level(level_str) {
            Some(level) => config.level = level,
            None => eprintln!(
                "Invalid log level '{}', using {}. Valid levels: trace, debug, info, warn, error",
                level_str, config.level
            ),
        }
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }

    init_logging(config);
}
