// model-registry/src/main.rs

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use model_registry::{config::Config, run_server};
#[cfg(feature = "cli")]
use std::path::PathBuf;

/// Serve the models declared in a JSON catalog over HTTP.
#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(name = "model-registry", version, about)]
struct Cli {
    /// Address to bind (overrides API_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides API_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Model catalog file (overrides MODELS_CONFIG)
    #[arg(long)]
    models_config: Option<PathBuf>,

    /// Directory holding adapter libraries (overrides ADAPTERS_DIR)
    #[arg(long)]
    adapters_dir: Option<PathBuf>,

    /// Device hint passed to adapters, or "auto" (overrides DEVICE)
    #[arg(long)]
    device: Option<String>,
}

#[cfg(feature = "cli")]
impl Cli {
    fn apply(self, cfg: &mut Config) {
        if let Some(host) = self.host {
            cfg.api_host = host;
        }
        if let Some(port) = self.port {
            cfg.api_port = port;
        }
        if let Some(path) = self.models_config {
            cfg.models_config = path;
        }
        if let Some(dir) = self.adapters_dir {
            cfg.adapters_dir = dir;
        }
        if let Some(device) = self.device {
            cfg.device = device;
        }
    }
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    model_registry::telemetry::init_tracing();

    let mut cfg = Config::from_env()?;
    cli.apply(&mut cfg);

    run_server(cfg).await
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
