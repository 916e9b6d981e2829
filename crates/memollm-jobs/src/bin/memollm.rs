//! memollm: operator tool for inspecting and exercising LLM providers.
//!
//! Provider settings come from a TOML file (`--config`) with environment
//! overrides applied on top.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memollm_core::{
    CompletionRequest, LlmProvider, Message, ProviderConfig, ProviderType, SummarizeRequest,
};
use memollm_crypto::{generate_key_id, mask_api_key, validate_api_key_format, KeyCrypto};
use memollm_inference::{ConfigManager, LlmService, LlmSettings, OllamaProvider};
use memollm_jobs::{TagService, TagServiceConfig};

#[derive(Parser)]
#[command(name = "memollm")]
#[command(author, version, about = "LLM provider tooling for memollm")]
#[command(propagate_version = true)]
struct Cli {
    /// Provider settings file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered providers and which one is active
    Providers,

    /// List models offered by the active provider
    Models,

    /// Send a single prompt to the active provider
    Complete {
        prompt: String,

        /// Optional system prompt
        #[arg(short, long)]
        system: Option<String>,

        #[arg(short, long)]
        model: Option<String>,

        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Suggest tags for a piece of content
    Tags {
        content: String,

        /// Tags already on the content, comma separated
        #[arg(short, long, value_delimiter = ',')]
        existing: Vec<String>,
    },

    /// Summarize a piece of content
    Summarize {
        content: String,

        /// brief, detailed or bullet
        #[arg(short, long)]
        style: Option<String>,

        /// Character budget for the summary
        #[arg(short = 'l', long)]
        max_length: Option<usize>,
    },

    /// Check that the configured Ollama host is reachable
    Health,

    /// Show the masked form and id of an API key
    Mask {
        key: String,

        /// Also validate the key format for this provider
        #[arg(short, long)]
        provider: Option<ProviderType>,
    },

    /// Encrypt an API key with the vault master key (MEMOLLM_MASTER_KEY)
    Encrypt { key: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logging to stderr so command output on stdout stays clean.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   RUST_LOG    - standard env filter (default: "memollm=info")
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "memollm=info,memollm_inference=info,memollm_jobs=info,memollm_crypto=info".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Mask { key, provider } => cmd_mask(&key, provider),
        Commands::Encrypt { key } => cmd_encrypt(&key),
        command => {
            let settings = LlmSettings::load(cli.config.as_deref())
                .context("failed to load provider settings")?;
            run_with_settings(command, &settings).await
        }
    }
}

async fn run_with_settings(command: Commands, settings: &LlmSettings) -> anyhow::Result<()> {
    if let Commands::Health = command {
        return cmd_health(settings).await;
    }

    let service = Arc::new(LlmService::new());
    let manager = ConfigManager::new(service.clone());
    manager.load_settings(settings)?;
    info!(
        active = ?service.active_provider_type(),
        registered = service.registered_types().len(),
        "Provider settings loaded"
    );

    match command {
        Commands::Providers => {
            let statuses = service.list_providers();
            if statuses.is_empty() {
                println!("No providers configured");
            }
            for status in statuses {
                println!(
                    "{} {:<10} {:<14} configured={:<5} model={}",
                    if status.active { "*" } else { " " },
                    status.provider_type,
                    status.name,
                    status.configured,
                    status.default_model
                );
            }
        }
        Commands::Models => {
            let provider = service
                .active_provider()
                .context("no active provider")?;
            for model in provider.available_models().await? {
                println!("{}", model);
            }
        }
        Commands::Complete {
            prompt,
            system,
            model,
            max_tokens,
        } => {
            let mut messages = Vec::new();
            if let Some(system) = system {
                messages.push(Message::system(system));
            }
            messages.push(Message::user(prompt));
            let mut req = CompletionRequest::new(messages);
            if let Some(model) = model {
                req = req.with_model(model);
            }
            if let Some(max_tokens) = max_tokens {
                req = req.with_max_tokens(max_tokens);
            }

            let resp = service.complete(&req).await?;
            println!("{}", resp.content);
            info!(
                model = %resp.model,
                prompt_tokens = resp.usage.prompt_tokens,
                completion_tokens = resp.usage.completion_tokens,
                finish_reason = %resp.finish_reason,
                "Completion finished"
            );
        }
        Commands::Tags { content, existing } => {
            let tags = TagService::new(service, TagServiceConfig::from_env().with_async(false));
            let result = tags.suggest_tags(0, &content, &existing).await;
            tags.stop().await;
            println!("{}", serde_json::to_string(&result?)?);
        }
        Commands::Summarize {
            content,
            style,
            max_length,
        } => {
            let mut req = SummarizeRequest::new(content);
            if let Some(style) = style {
                req = req.with_style(style);
            }
            if let Some(max_length) = max_length {
                req = req.with_max_length(max_length);
            }
            let resp = service.summarize(&req).await?;
            println!("{}", resp.summary);
            for point in resp.key_points {
                println!("- {}", point);
            }
        }
        Commands::Health | Commands::Mask { .. } | Commands::Encrypt { .. } => {}
    }
    Ok(())
}

async fn cmd_health(settings: &LlmSettings) -> anyhow::Result<()> {
    let config = settings
        .provider_configs()
        .into_iter()
        .find(|c| c.provider_type == ProviderType::Ollama)
        .unwrap_or_else(|| ProviderConfig::with_defaults(ProviderType::Ollama));
    let provider = OllamaProvider::new(config)?;
    let version = provider
        .check_health()
        .await
        .with_context(|| format!("ollama at {} is not reachable", provider.config().host))?;
    println!("ollama {} at {}", version, provider.config().host);
    Ok(())
}

fn cmd_mask(key: &str, provider: Option<ProviderType>) -> anyhow::Result<()> {
    if let Some(provider) = provider {
        validate_api_key_format(provider, key)?;
    }
    println!("masked: {}", mask_api_key(key));
    println!("key_id: {}", generate_key_id(key));
    Ok(())
}

fn cmd_encrypt(key: &str) -> anyhow::Result<()> {
    let crypto = KeyCrypto::from_env().context("vault master key unavailable")?;
    println!("{}", crypto.encrypt(key)?);
    Ok(())
}
