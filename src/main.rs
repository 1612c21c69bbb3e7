use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use charm_ringtone_server::composer::Composer;
use charm_ringtone_server::config;
use charm_ringtone_server::knowledge_base::KnowledgeBase;
use charm_ringtone_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use charm_ringtone_server::usage::UsageLimiter;

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Sound map JSON file. The bundled sound map is used when omitted.
    #[clap(long, value_parser = parse_path)]
    pub knowledge_base: Option<PathBuf>,

    /// API key for the prompt refinement LLM. Falls back to GEMINI_API_KEY.
    #[clap(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// API key for the text-to-audio service.
    #[clap(long, env = "STABILITY_API_KEY", hide_env_values = true)]
    pub audio_api_key: Option<String>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            knowledge_base: args.knowledge_base.clone(),
            llm_api_key: args
                .llm_api_key
                .clone()
                .or_else(|| std::env::var("GEMINI_API_KEY").ok()),
            audio_api_key: args.audio_api_key.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  port: {}", app_config.port);
    info!("  llm provider: {}", app_config.llm.provider.as_str());
    info!("  audio configured: {}", app_config.audio.is_configured());
    info!(
        "  usage: enabled={} max_uses={} reset_window={:?}",
        app_config.usage.policy.enabled,
        app_config.usage.policy.max_uses,
        app_config.usage.policy.reset_window
    );

    let knowledge_base = match &app_config.knowledge_base_path {
        Some(path) => {
            info!("Loading knowledge base from {:?}...", path);
            KnowledgeBase::load(path)?
        }
        None => KnowledgeBase::embedded()?,
    };
    info!(
        "Knowledge base ready: {} categories, {} charms",
        knowledge_base.category_count(),
        knowledge_base.charm_count()
    );

    // Initialize metrics system
    info!("Initializing metrics...");
    metrics::init_metrics();
    metrics::init_knowledge_base_metrics(
        knowledge_base.category_count(),
        knowledge_base.charm_count(),
    );

    let composer = Composer::new(Arc::new(knowledge_base))
        .with_default_duration(app_config.composer.default_duration_seconds);
    let refiner = app_config.llm.build_refiner();
    if !refiner.is_enabled() {
        info!("Prompt refinement disabled, draft prompts are used as is");
    }
    let audio = app_config.audio.build_generator();
    if !audio.is_configured() {
        warn!("No text-to-audio API key configured, /v1/generate will fail");
    }
    let usage = Arc::new(UsageLimiter::new(app_config.usage.policy.clone()));

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        frontend_dir_path: app_config.frontend_dir_path.clone(),
        max_duration_seconds: app_config.composer.max_duration_seconds,
        output_format: app_config.audio.output_format,
        usage_cleanup_interval: app_config.usage.cleanup_interval,
    };

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);
    run_server(server_config, composer, refiner, audio, usage).await
}
