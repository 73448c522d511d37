use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Technology composition scanner for source trees
#[derive(Parser, Debug)]
#[command(
    name = "stackprobe",
    about = "Technology composition scanner for source trees",
    version,
    author,
    long_about = "stackprobe walks a source tree, identifies the components it contains \
                  (packages, modules, services) and the technologies each one uses, and \
                  reports them as a tree or as a flat, deduplicated summary."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only errors are logged"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Scan a source tree",
        long_about = "Walks the tree below PATH and reports every detected component with \
                      its technologies, dependencies, languages and licenses.\n\n\
                      Examples:\n  \
                      stackprobe scan\n  \
                      stackprobe scan /path/to/repo --format yaml\n  \
                      stackprobe scan . --subfolder api --subfolder web\n  \
                      stackprobe scan --aggregate --rules ./rules"
    )]
    Scan(ScanArgs),

    #[command(
        about = "List the loaded rule catalog",
        long_about = "Loads the builtin rules plus any rule directories and prints every \
                      technology they define. Rejected rules are reported on stderr.\n\n\
                      Examples:\n  \
                      stackprobe rules\n  \
                      stackprobe rules --rules ./rules --format json"
    )]
    Rules(RulesArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ScanArgs {
    #[arg(value_name = "PATH", help = "Root to scan (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(
        short = 's',
        long = "subfolder",
        value_name = "DIR",
        help = "Scan only this subfolder of PATH (repeatable)"
    )]
    pub subfolders: Vec<String>,

    #[arg(short = 'a', long, help = "Emit the flat aggregated summary instead of the tree")]
    pub aggregate: bool,

    #[arg(short = 'f', long, value_enum, default_value = "json", help = "Output format")]
    pub format: OutputFormatArg,

    #[arg(
        short = 'e',
        long = "exclude",
        value_name = "PATTERN",
        help = "Additional global exclude pattern (repeatable)"
    )]
    pub exclude: Vec<String>,

    #[arg(
        short = 'r',
        long = "rules",
        value_name = "DIR",
        help = "Load extra rule files from this directory (repeatable)"
    )]
    pub rules: Vec<PathBuf>,

    #[arg(long, help = "Do not load the builtin rule catalog")]
    pub no_builtin_rules: bool,

    #[arg(long, value_name = "DEPTH", help = "Maximum directory depth below PATH")]
    pub max_depth: Option<usize>,

    #[arg(long, value_name = "ID", help = "Use this id for the root component")]
    pub id: Option<String>,

    #[arg(short = 'c', long, value_name = "FILE", help = "Configuration file (TOML)")]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct RulesArgs {
    #[arg(
        short = 'r',
        long = "rules",
        value_name = "DIR",
        help = "Load extra rule files from this directory (repeatable)"
    )]
    pub rules: Vec<PathBuf>,

    #[arg(long, help = "Do not load the builtin rule catalog")]
    pub no_builtin_rules: bool,

    #[arg(short = 'c', long, value_name = "FILE", help = "Configuration file (TOML)")]
    pub config: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
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
