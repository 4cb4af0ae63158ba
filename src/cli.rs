//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, init, validate), and their associated argument
//! structs. Every `run` flag has an environment variable equivalent for
//! container deployments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "shadowtee",
    version,
    about = "HTTP reverse proxy that mirrors live traffic to shadow backends",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        shadowtee run -a localhost:8080 -b localhost:8081   Mirror everything to one shadow\n  \
        shadowtee init                                      Create a starter config\n  \
        shadowtee run -c shadowtee.yaml                     Start with a config file"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy server
    Run(Box<RunArgs>),

    /// Generate a starter config file
    Init(InitArgs),

    /// Validate a config file without starting
    Validate(ValidateArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        shadowtee run                                          Auto-detect config\n  \
        shadowtee run -a prod:8080 -b shadow:8080 -p 10        Mirror 10% of traffic\n  \
        shadowtee run -a prod:8080 -b s1:80 -b s2:80 --methods 'GET|HEAD'\n  \
        shadowtee run -c shadowtee.yaml --cert-file cert.pem --key-file key.pem")]
pub struct RunArgs {
    /// Config file path (.yaml, .json, .toml)
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long, env = "LISTEN", default_value = "0.0.0.0:8888")]
    pub listen: String,

    // -- Backends --
    /// Primary backend; its responses go back to the client
    #[arg(short = 'a', long, env = "PRIMARY", help_heading = "Backends")]
    pub primary: Option<String>,

    /// Primary timeout in milliseconds
    #[arg(long, env = "PRIMARY_TIMEOUT_MS", help_heading = "Backends")]
    pub primary_timeout: Option<u64>,

    /// Rewrite the Host header when proxying to the primary
    #[arg(long, env = "PRIMARY_REWRITE_HOST", help_heading = "Backends")]
    pub primary_rewrite_host: bool,

    /// Secondary backend; responses are logged and discarded (repeatable)
    #[arg(short = 'b', long, env = "SECONDARIES", value_delimiter = ',', help_heading = "Backends")]
    pub secondary: Vec<String>,

    /// Default secondary timeout in milliseconds
    #[arg(long, env = "SECONDARY_TIMEOUT_MS", help_heading = "Backends")]
    pub secondary_timeout: Option<u64>,

    /// Rewrite the Host header for secondaries given on the command line
    #[arg(long, env = "SECONDARY_REWRITE_HOST", help_heading = "Backends")]
    pub secondary_rewrite_host: bool,

    // -- Mirroring --
    /// Percentage of requests mirrored to secondaries (0.0-100.0)
    #[arg(short, long, env = "MIRROR_PERCENT", help_heading = "Mirroring")]
    pub percent: Option<f64>,

    /// Only mirror methods matching this pattern, e.g. 'GET|POST'
    #[arg(long, env = "MIRROR_METHODS", help_heading = "Mirroring")]
    pub methods: Option<String>,

    /// Append the client address to X-Forwarded-For and Forwarded
    #[arg(long, env = "FORWARD_CLIENT_IP", help_heading = "Mirroring")]
    pub forward_client_ip: bool,

    /// Close connections to clients and backends after every request
    #[arg(long, env = "CLOSE_CONNECTIONS", help_heading = "Mirroring")]
    pub close_connections: bool,

    // -- TLS --
    /// TLS certificate (PEM); enables HTTPS together with --key-file
    #[arg(long, env = "TLS_CERT_FILE", requires = "key_file", help_heading = "TLS")]
    pub cert_file: Option<PathBuf>,

    /// TLS private key (PEM)
    #[arg(long, env = "TLS_KEY_FILE", requires = "cert_file", help_heading = "TLS")]
    pub key_file: Option<PathBuf>,

    // -- Logging --
    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log failed secondary requests
    #[arg(long, env = "DEBUG")]
    pub debug: bool,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 10 * 1_048_576,
        help_heading = "Tuning"
    )]
    pub max_body: usize,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        shadowtee init                          Starter config (yaml)\n  \
        shadowtee init -f toml -o proxy.toml    TOML format, custom path")]
pub struct InitArgs {
    /// Output format
    #[arg(short, long, default_value = "yaml")]
    pub format: ConfigFormat,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Config file to validate
    #[arg(default_value = "shadowtee.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["shadowtee", "run"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Some(Commands::Run(args)) => *args,
            _ => panic!("expected run subcommand"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_repeated_secondaries() {
        let args = run_args(&["-a", "prod:8080", "-b", "s1:80", "-b", "s2:80", "-p", "12.5"]);
        assert_eq!(args.primary.as_deref(), Some("prod:8080"));
        assert_eq!(args.secondary, ["s1:80", "s2:80"]);
        assert_eq!(args.percent, Some(12.5));
        assert_eq!(args.listen, "0.0.0.0:8888");
    }

    #[test]
    fn tls_flags_require_each_other() {
        let result = Cli::try_parse_from(["shadowtee", "run", "--cert-file", "cert.pem"]);
        assert!(result.is_err());
    }
}
