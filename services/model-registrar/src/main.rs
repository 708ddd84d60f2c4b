use anyhow::Result;
use clap::Parser;
use model_registrar::{load, register_with, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load(&cli)?;
    mlreg_core::init_tracing("model-registrar", &cfg.log_level)?;
    register_with(&cli, cfg).await?;
    Ok(())
}
