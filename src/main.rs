use stackprobe::cli::commands::{CliArgs, Commands};
use stackprobe::cli::handlers::{handle_rules, handle_scan};
use stackprobe::util::logging::{init_from_env, init_logging, parse_level, LoggingConfig};
use stackprobe::VERSION;

use clap::Parser;
use tracing::{debug, Level};

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("stackprobe v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Scan(scan_args) => handle_scan(scan_args),
        Commands::Rules(rules_args) => handle_rules(rules_args),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = match (&args.log_level, args.verbose, args.quiet) {
        (Some(level), _, _) => parse_level(level),
        (None, true, _) => Level::DEBUG,
        (None, _, true) => Level::ERROR,
        (None, false, false) => return init_from_env(),
    };
    let mut config = LoggingConfig::from_env();
    config.level = level;
    init_logging(config);
}
