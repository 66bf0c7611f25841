//! Main entry point for CLI command to start server.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::AppState;
use crate::Environment;
use crate::axum_factory::make_axum_router;
use crate::axum_factory::serve;
use crate::configuration::Configuration;
use crate::configuration::ConfigurationError;
use crate::configuration::generate_config_schema;
use crate::configuration::validate_configuration;
use crate::error::GatewayError;
use crate::store::PgStore;
use crate::store::SharedStore;

/// Options for the gateway
#[derive(Parser, Debug)]
#[command(
    name = "gateway",
    about = "REST and GraphQL gateway over a relational store",
    disable_version_flag = true
)]
pub(crate) struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[arg(long = "log", default_value = "info", env = "GATEWAY_LOG")]
    log_level: String,

    /// Configuration location relative to the project directory.
    #[arg(short, long = "config", env = "GATEWAY_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Mode to run in: development, testing or production. Defaults to the value of
    /// GATEWAY_ENV, then to development.
    #[arg(long = "env")]
    environment: Option<String>,

    /// Port to listen on, overriding `server.listen`.
    #[arg(short, long, env = "GATEWAY_PORT")]
    port: Option<u16>,

    /// Prints the configuration schema.
    #[arg(long)]
    schema: bool,

    /// Secret used to sign tokens, overriding `auth.secret`.
    #[arg(skip = std::env::var("GATEWAY_JWT_SECRET").ok())]
    jwt_secret: Option<String>,

    /// Display version and exit.
    #[arg(long, short = 'V')]
    version: bool,
}

/// This is the main gateway entrypoint.
pub fn main() -> Result<()> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(nb) = std::env::var("GATEWAY_NUM_CORES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        builder.worker_threads(nb);
    }
    let runtime = builder.build()?;
    runtime.block_on(Executable::builder().start())
}

/// Entry point into creating a gateway executable.
pub struct Executable {}

#[buildstructor::buildstructor]
impl Executable {
    /// Build an executable that will parse commandline options and set up logging.
    /// You may optionally supply a `store` to use instead of connecting to the configured
    /// database.
    ///
    /// Note that if you do not specify a runtime you must be in the context of an existing tokio runtime.
    #[builder(entry = "builder", exit = "start")]
    pub async fn start(store: Option<SharedStore>) -> Result<()> {
        let opt = Opt::parse();

        if opt.version {
            println!("{}", std::env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        if opt.schema {
            let schema = generate_config_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            return Ok(());
        }

        let builder = tracing_subscriber::fmt::fmt().with_env_filter(
            EnvFilter::try_new(&opt.log_level).context("could not parse log configuration")?,
        );
        let installed = if std::io::stdout().is_terminal() {
            builder.try_init()
        } else {
            builder.json().try_init()
        };
        installed.map_err(|error| anyhow!("could not set up logging: {error}"))?;
        setup_panic_handler();

        match Self::run(opt, store).await {
            Ok(()) => Ok(()),
            Err(error) => {
                tracing::error!("{}", error);
                Err(error.into())
            }
        }
    }

    async fn run(opt: Opt, store: Option<SharedStore>) -> Result<(), GatewayError> {
        let mut configuration = read_configuration(opt.config_path.as_ref())?;
        if let Some(port) = opt.port {
            configuration.set_listen_port(port);
        }
        if let Some(secret) = opt.jwt_secret {
            configuration.set_secret(secret);
        }

        let address = configuration.server().listen();
        let listener = TcpListener::bind(address)
            .await
            .map_err(|error| GatewayError::Bind { address, error })?;

        let environment = opt
            .environment
            .map(Environment::resolve)
            .unwrap_or_else(Environment::from_process);
        if environment.is_not_valid() {
            return Err(GatewayError::InvalidMode(environment.name().to_string()));
        }
        tracing::info!(
            "Gateway v{} starting in {environment} mode",
            std::env!("CARGO_PKG_VERSION")
        );

        let store = match store {
            Some(store) => store,
            None => connect(&configuration).await?,
        };
        let state = AppState::new(&configuration, &environment, store)?;
        let router = make_axum_router(&configuration, &environment, state)?;

        tracing::info!("GraphQL endpoint exposed at http://{address}{}", configuration.graphql.path);
        tracing::info!("REST endpoints exposed at http://{address}{}", configuration.rest.prefix);
        serve(listener, router).await?;
        tracing::info!("stopped");
        Ok(())
    }
}

async fn connect(configuration: &Configuration) -> Result<SharedStore, GatewayError> {
    let store = PgStore::connect(configuration.database()).await?;
    if configuration.database().migrate() {
        store.migrate().await?;
        tracing::info!("database migrated");
    }
    tracing::info!("connected to the database");
    Ok(Arc::new(store))
}

fn read_configuration(path: Option<&PathBuf>) -> Result<Configuration, ConfigurationError> {
    let Some(path) = path else {
        let configuration = Configuration::builder().build();
        configuration.validate()?;
        return Ok(configuration);
    };
    let path = if path.is_relative() {
        std::env::current_dir()
            .map_err(|error| ConfigurationError::CannotReadFile {
                path: path.display().to_string(),
                error,
            })?
            .join(path)
    } else {
        path.to_path_buf()
    };
    let raw_yaml =
        std::fs::read_to_string(&path).map_err(|error| ConfigurationError::CannotReadFile {
            path: path.display().to_string(),
            error,
        })?;
    validate_configuration(&raw_yaml)
}

fn setup_panic_handler() {
    // Redirect panics to the logs.
    let backtrace_env = std::env::var("RUST_BACKTRACE");
    let show_backtraces =
        backtrace_env.as_deref() == Ok("1") || backtrace_env.as_deref() == Ok("full");
    if show_backtraces {
        tracing::warn!(
            "RUST_BACKTRACE={} detected. This is useful for diagnostics but will have a performance impact and may leak sensitive information",
            backtrace_env.as_deref().unwrap_or_default()
        );
    }
    std::panic::set_hook(Box::new(move |e| {
        if show_backtraces {
            let backtrace = std::backtrace::Backtrace::capture();
            tracing::error!("{}\n{:?}", e, backtrace)
        } else {
            tracing::error!("{}", e)
        }
    }));
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::CommandFactory;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::store::MockStore;

    #[test]
    fn the_command_line_is_well_formed() {
        Opt::command().debug_assert();
    }

    #[test]
    fn it_reads_flags() {
        let opt = Opt::try_parse_from([
            "gateway",
            "--log",
            "debug",
            "--env",
            "production",
            "--port",
            "4000",
            "--config",
            "gateway.yaml",
        ])
        .unwrap();
        assert_eq!(opt.log_level, "debug");
        assert_eq!(opt.environment.as_deref(), Some("production"));
        assert_eq!(opt.port, Some(4000));
        assert_eq!(opt.config_path, Some(PathBuf::from("gateway.yaml")));
    }

    #[test]
    fn missing_configuration_files_are_reported() {
        let error = read_configuration(Some(&PathBuf::from("/does/not/exist.yaml"))).unwrap_err();
        assert!(matches!(error, ConfigurationError::CannotReadFile { .. }));
    }

    #[test]
    fn configuration_files_are_validated() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"rest:\n  prefix: /api\n").unwrap();
        let configuration = read_configuration(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(configuration.rest.prefix, "/api");
    }

    #[tokio::test]
    async fn unknown_modes_stop_startup() {
        let opt = Opt::try_parse_from(["gateway", "--env", "staging", "--port", "0"]).unwrap();
        let result = Executable::run(opt, Some(Arc::new(MockStore::new()))).await;
        assert!(
            matches!(&result, Err(GatewayError::InvalidMode(mode)) if mode == "staging"),
            "{result:?}"
        );
    }
}
