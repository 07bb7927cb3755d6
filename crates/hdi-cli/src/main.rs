use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::HdiConfig;
use hdi_core::media::{HuggingFaceImages, ImageGenerator, MediaService, OpenAiImages};
use hdi_core::providers::{GoogleProvider, OpenAiCompatProvider, OpenAiProvider};
use hdi_core::{ChatMessage, ChatService, Credential, LlmProvider, ModelRouter, ProviderKind};
use hdi_gateway::{GatewayServer, GatewayState};
use hdi_knowledge::{JsonFileStore, ReferenceData};

#[derive(Parser)]
#[command(name = "hdi")]
#[command(version)]
#[command(about = "ChatHDI gateway: AI chat for R&D engineering")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Override [server].bind
        #[arg(long)]
        bind: Option<String>,
        /// Override [server].port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send a one-shot message through the router
    Ask {
        /// The message to send
        message: String,
        /// Public model id
        #[arg(short, long, default_value = "hdi-4")]
        model: String,
    },

    /// Initialize config directory and default config
    Init,

    /// Show current configuration with secrets masked
    Config,

    /// List model ids and provider availability
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Keys may live in a .env next to the binary's working directory
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config),
        Commands::Models => cmd_models(&cli.config),
        Commands::Serve { bind, port } => cmd_serve(&cli.config, bind, port).await,
        Commands::Ask { message, model } => cmd_ask(&cli.config, &message, &model).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        tokio::fs::write(&config_path, config::DEFAULT_CONFIG).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600)).await?;
        }
        info!("Created default config at {}", config_path.display());
    }

    let data_dir = config_dir.join("data");
    tokio::fs::create_dir_all(&data_dir).await?;

    println!("ChatHDI initialized at {}", config_dir.display());
    println!("Edit {} or set GOOGLE_API_KEY / GROQ_API_KEY / OPENAI_API_KEY.", config_path.display());
    Ok(())
}

fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = HdiConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg.masked())?);
    Ok(())
}

fn cmd_models(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = HdiConfig::load(config_path)?;
    let router = build_router(&cfg)?;

    for kind in ProviderKind::ALL {
        let status = if router.is_available(kind) { "available" } else { "not configured" };
        println!("{:<8} {}", kind.as_str(), status);
    }
    println!();
    for (id, binding) in router.registry().iter() {
        let marker = if router.is_available(binding.provider) { " " } else { "!" };
        println!(
            "{} {:<16} {:<8} {:<28} {}",
            marker,
            id,
            binding.provider.as_str(),
            binding.model,
            binding.description
        );
    }
    Ok(())
}

async fn cmd_serve(config_path: &Option<PathBuf>, bind: Option<String>, port: Option<u16>) -> Result<()> {
    let cfg = HdiConfig::load(config_path)?;

    let chat = Arc::new(build_chat_service(&cfg)?);
    let reference = Arc::new(ReferenceData::load(cfg.reference_data_path().as_deref())?);
    let store = Arc::new(JsonFileStore::open(cfg.conversations_path()).await?);

    let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
    let port = port.unwrap_or(cfg.server.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let server = GatewayServer::new(addr, GatewayState::new(chat, reference, store));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    let serve = tokio::spawn(server.run_until(async move { shutdown.cancelled().await }));

    signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");
    cancel.cancel();

    serve.await??;
    println!("ChatHDI stopped.");
    Ok(())
}

async fn cmd_ask(config_path: &Option<PathBuf>, message: &str, model: &str) -> Result<()> {
    let cfg = HdiConfig::load(config_path)?;
    let service = build_chat_service(&cfg)?;

    let reply = service.handle(&[ChatMessage::user(message)], model).await;
    println!("{}", reply.response);

    if let (Some(provider), Some(model_used)) = (reply.provider_used, &reply.model_used) {
        info!("Answered by {} ({})", provider, model_used);
    }
    if let Some(media) = &reply.media_data {
        println!("[{} media item(s) generated with {}]", media.len(), reply.model);
    }
    Ok(())
}

fn build_providers(cfg: &HdiConfig) -> Vec<Arc<dyn LlmProvider>> {
    let p = &cfg.providers;
    vec![
        Arc::new(
            GoogleProvider::new(Credential::parse(&p.google.api_key), p.google.max_tokens)
                .with_base_url(p.google.base_url.clone()),
        ) as Arc<dyn LlmProvider>,
        Arc::new(OpenAiCompatProvider::new(
            ProviderKind::Groq,
            Credential::parse(&p.groq.api_key),
            p.groq.base_url.clone(),
            p.groq.max_tokens,
        )) as Arc<dyn LlmProvider>,
        Arc::new(OpenAiProvider::new(
            Credential::parse(&p.openai.api_key),
            p.openai.base_url.clone(),
            p.openai.max_tokens,
        )) as Arc<dyn LlmProvider>,
    ]
}

fn build_router(cfg: &HdiConfig) -> Result<ModelRouter> {
    let system_prompt = hdi_core::load_system_prompt(cfg.system_prompt_path().as_deref())?;
    ModelRouter::new(cfg.registry()?, build_providers(cfg), system_prompt)
}

fn build_chat_service(cfg: &HdiConfig) -> Result<ChatService> {
    let router = build_router(cfg)?;

    let huggingface = HuggingFaceImages::new(Credential::parse(&cfg.media.huggingface_api_key))
        .with_base_url(cfg.media.huggingface_base_url.clone());
    let openai = OpenAiImages::new(Credential::parse(&cfg.media.openai_api_key))
        .with_base_url(cfg.media.openai_base_url.clone());
    if !huggingface.is_configured() {
        warn!("Image generation unavailable (HUGGINGFACE_API_KEY not set or invalid)");
    }
    let media = MediaService::new(Arc::new(huggingface), Arc::new(openai));

    Ok(ChatService::new(Arc::new(router), Arc::new(media)))
}
