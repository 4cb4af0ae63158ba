//! `shadowtee run`: start the mirroring proxy.
//!
//! Resolves the configuration from a file (explicit or auto-detected)
//! or from `--primary`, layers command-line overrides on top, builds
//! the [`MirrorEngine`] and serves plain HTTP or HTTPS until SIGTERM /
//! Ctrl+C. Request totals are logged on the way out.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::RunArgs;
use crate::config::model::{BackendConfig, Config};
use crate::config::{self, validation};
use crate::error::ShadowteeError;
use crate::logging;
use crate::proxy::sampling::SeededRandom;
use crate::proxy::MirrorEngine;
use crate::server::{self, AppState};

/// How long in-flight requests may take to drain once shutdown starts.
const TLS_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub async fn execute(args: RunArgs) -> Result<(), ShadowteeError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(
        logging::resolve_level(&args.log_level, args.debug),
        log_format,
    );

    let config = resolve_config(&args).await?;
    let addr: SocketAddr = args.listen.parse()?;

    let engine = MirrorEngine::from_config(&config, Arc::new(SeededRandom::from_entropy()))?;
    log_startup(&engine, &config, addr, args.cert_file.is_some());

    let state = Arc::new(AppState::new(engine));
    let router = server::build_router(state.clone(), args.max_body);

    match (&args.cert_file, &args.key_file) {
        (Some(cert), Some(key)) => {
            let tls = server::load_tls_config(cert, key).await?;
            server::serve_tls(
                addr,
                tls,
                router,
                server::shutdown_signal(),
                TLS_SHUTDOWN_GRACE,
            )
            .await?;
        }
        _ => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            server::serve_plain(listener, router, server::shutdown_signal()).await?;
        }
    }

    state.stats.log_summary(state.start_time.elapsed());
    tracing::info!("shadowtee stopped");
    Ok(())
}

/// Load the config file if one is found, otherwise start from `--primary`,
/// then apply command-line overrides and validate the result.
pub async fn resolve_config(args: &RunArgs) -> Result<Config, ShadowteeError> {
    let cwd = std::env::current_dir()?;

    let mut config = match config::locate(args.config.as_deref(), &cwd).await {
        Some(path) => config::load_file(&path).await?,
        None => match args.primary {
            Some(ref url) => Config::with_primary(url.clone()),
            None => {
                return Err(ShadowteeError::NoConfigSource {
                    hint: "Provide --config <file> or --primary <host:port>.\n  \
                           Run 'shadowtee init' to create a config file."
                        .into(),
                })
            }
        },
    };

    apply_overrides(&mut config, args);

    validation::validate(&config).map_err(|errors| ShadowteeError::ConfigValidation { errors })?;
    Ok(config)
}

/// Command-line values win over the config file. Secondaries given with
/// `-b` are appended to the ones from the file.
pub fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(ref url) = args.primary {
        config.primary.url.clone_from(url);
    }
    if let Some(ms) = args.primary_timeout {
        config.primary.timeout = Some(ms);
    }
    if args.primary_rewrite_host {
        config.primary.rewrite_host = true;
    }

    if let Some(ms) = args.secondary_timeout {
        config.defaults.secondary_timeout = ms;
    }
    config
        .secondaries
        .extend(args.secondary.iter().map(|url| BackendConfig {
            rewrite_host: args.secondary_rewrite_host,
            ..BackendConfig::new(url.clone())
        }));

    if let Some(percent) = args.percent {
        config.mirror.percent = percent;
    }
    if let Some(ref methods) = args.methods {
        config.mirror.methods = Some(methods.clone());
    }

    config.defaults.forward_client_ip |= args.forward_client_ip;
    config.defaults.close_connections |= args.close_connections;
    config.debug |= args.debug;
}

fn log_startup(engine: &MirrorEngine, config: &Config, addr: SocketAddr, tls: bool) {
    let primary = engine.primary();
    tracing::info!(
        addr = %addr,
        tls,
        revision = env!("SHADOWTEE_GIT_SHORT"),
        primary = %primary.origin(),
        primary_timeout = ?primary.timeout,
        secondaries = config.secondaries.len(),
        percent = engine.sampler().percent(),
        methods = config.mirror.methods.as_deref().unwrap_or("*"),
        "shadowtee started"
    );
    for secondary in engine.secondaries() {
        tracing::info!(
            secondary = %secondary.origin(),
            timeout = ?secondary.timeout,
            rewrite_host = secondary.rewrite_host,
            "mirroring to secondary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["shadowtee", "run"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Some(Commands::Run(args)) => *args,
            _ => panic!("expected run subcommand"),
        }
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = Config::with_primary("http://file-primary:8080");
        config.secondaries.push(BackendConfig::new("file-shadow:80"));

        let args = run_args(&[
            "-a",
            "cli-primary:9000",
            "--primary-timeout",
            "250",
            "-b",
            "cli-shadow:81",
            "--secondary-rewrite-host",
            "--secondary-timeout",
            "400",
            "-p",
            "25",
            "--methods",
            "GET",
            "--forward-client-ip",
        ]);
        apply_overrides(&mut config, &args);

        assert_eq!(config.primary.url, "cli-primary:9000");
        assert_eq!(config.primary_timeout(), 250);
        assert_eq!(config.secondaries.len(), 2);
        assert!(!config.secondaries[0].rewrite_host);
        assert!(config.secondaries[1].rewrite_host);
        assert_eq!(config.secondary_timeout(&config.secondaries[1]), 400);
        assert!((config.mirror.percent - 25.0).abs() < f64::EPSILON);
        assert_eq!(config.mirror.methods.as_deref(), Some("GET"));
        assert!(config.defaults.forward_client_ip);
        assert!(!config.defaults.close_connections);
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let mut config = Config::with_primary("http://file-primary:8080");
        config.mirror.percent = 10.0;
        config.defaults.close_connections = true;

        apply_overrides(&mut config, &run_args(&[]));

        assert_eq!(config.primary.url, "http://file-primary:8080");
        assert!((config.mirror.percent - 10.0).abs() < f64::EPSILON);
        assert!(config.defaults.close_connections);
    }

    #[cfg(feature = "yaml")]
    #[tokio::test]
    async fn file_values_are_validated_after_overrides() {
        let path = std::env::temp_dir().join(format!(
            "shadowtee-run-{}-override.yaml",
            std::process::id()
        ));
        tokio::fs::write(&path, "primary:\n  url: \"ftp://old:21\"\n")
            .await
            .unwrap();
        let path_arg = path.display().to_string();

        let config = resolve_config(&run_args(&["-c", &path_arg, "-a", "localhost:8080"]))
            .await
            .unwrap();
        assert_eq!(config.primary.url, "localhost:8080");

        let err = resolve_config(&run_args(&["-c", &path_arg]))
            .await
            .unwrap_err();
        assert!(matches!(err, ShadowteeError::ConfigValidation { .. }));

        let _ = tokio::fs::remove_file(&path).await;
    }
}
