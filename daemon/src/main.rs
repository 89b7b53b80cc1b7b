//! POAP attendance daemon: entry point for running an attendance node.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use poap_attendance::ValidationPolicy;
use poap_node::{init_logging, AttendanceNode, LogFormat, NodeConfig};

#[derive(Parser)]
#[command(name = "poap-daemon", about = "POAP attendance node daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, global = true, env = "POAP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node.
    Run(RunArgs),
    /// Print a fresh Ed25519 key pair and the address it controls.
    Keygen {
        /// Also sign this login message with the new key.
        #[arg(long)]
        message: Option<String>,
    },
    /// Print the effective configuration as TOML.
    Config(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Directory for LMDB storage.
    #[arg(long, env = "POAP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Interface the HTTP API binds to.
    #[arg(long, env = "POAP_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// HTTP API port.
    #[arg(long, env = "POAP_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "POAP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "POAP_LOG_FORMAT")]
    log_format: Option<String>,

    /// HMAC secret for session tokens.
    #[arg(long, env = "POAP_SESSION_SECRET", hide_env_values = true)]
    session_secret: Option<String>,

    /// "require_mark" or "lecturer_initiated".
    #[arg(long, env = "POAP_VALIDATION_POLICY")]
    validation_policy: Option<ValidationPolicy>,

    /// Base URL of the badge mint service.
    #[arg(long, env = "POAP_BADGE_ENDPOINT")]
    badge_endpoint: Option<String>,

    /// Browser origin allowed to call the API with credentials.
    #[arg(long, env = "POAP_CORS_ORIGIN")]
    cors_origin: Option<String>,

    /// Mark the session cookie `Secure`.
    #[arg(long, env = "POAP_SECURE_COOKIES")]
    secure_cookies: bool,
}

impl RunArgs {
    fn apply(self, mut config: NodeConfig) -> NodeConfig {
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(bind_address) = self.bind_address {
            config.bind_address = bind_address;
        }
        if let Some(rpc_port) = self.rpc_port {
            config.rpc_port = rpc_port;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
        if let Some(log_format) = self.log_format {
            config.log_format = log_format;
        }
        if self.session_secret.is_some() {
            config.session_secret = self.session_secret;
        }
        if let Some(policy) = self.validation_policy {
            config.validation_policy = policy;
        }
        if self.badge_endpoint.is_some() {
            config.badge_endpoint = self.badge_endpoint;
        }
        if self.cors_origin.is_some() {
            config.cors_origin = self.cors_origin;
        }
        config.secure_cookies |= self.secure_cookies;
        config
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<NodeConfig> {
    match path {
        Some(path) => {
            let path = path.to_string_lossy();
            NodeConfig::from_toml_file(&path).with_context(|| format!("loading {path}"))
        }
        None => Ok(NodeConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let config = args.apply(load_config(cli.config.as_ref())?);
            let format: LogFormat = config.log_format.parse()?;
            init_logging(format, &config.log_level)?;
            if let Some(path) = &cli.config {
                tracing::info!(path = %path.display(), "loaded config");
            }

            let mut node = AttendanceNode::new(config).await?;
            node.start().await?;

            tracing::info!("shutdown signal received, stopping node");
            node.stop().await?;
            tracing::info!("poap daemon exited cleanly");
        }
        Command::Keygen { message } => {
            let keypair = poap_crypto::generate_keypair()?;
            let address = poap_crypto::derive_address(&keypair.public);
            println!("address:     {address}");
            println!("public key:  {}", hex::encode(keypair.public.as_bytes()));
            println!("private key: {}", hex::encode(keypair.private.0));
            if let Some(message) = message {
                let signature = poap_crypto::sign_message(message.as_bytes(), &keypair.private);
                println!("message:     {message}");
                println!("signature:   {}", hex::encode(signature.as_bytes()));
            }
        }
        Command::Config(args) => {
            let mut config = args.apply(load_config(cli.config.as_ref())?);
            if config.session_secret.is_some() {
                config.session_secret = Some("<redacted>".into());
            }
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}
