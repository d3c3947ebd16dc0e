use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vault_node::{process_line, NodeConfig, Summary};

#[derive(Debug, Parser)]
#[command(name = "vaultd", version, about = "Knowledge Vault ledger operator")]
struct Cli {
    /// TOML configuration file. Missing files fall back to defaults.
    #[arg(long, env = "VAULT_CONFIG")]
    config: Option<PathBuf>,
    /// Snapshot file. Without it the ledger lives in memory only.
    #[arg(long, env = "VAULT_STATE")]
    state: Option<PathBuf>,
    /// Administrator account, overriding the config file.
    #[arg(long, env = "VAULT_ADMINISTRATOR")]
    administrator: Option<String>,
    /// Tokens minted to the administrator at genesis.
    #[arg(long)]
    initial_supply: Option<u64>,
    /// Print a ledger summary and exit instead of reading requests.
    #[arg(long, default_value_t = false)]
    query: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vault_node=info,vault_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let node = NodeConfig::resolve(
        cli.config.as_ref(),
        cli.state,
        cli.administrator,
        cli.initial_supply,
    )?;
    let mut vault = node.open()?;
    info!(
        administrator = %vault.administrator(),
        storage = vault.storage_label(),
        entries = vault.journal().len(),
        "vaultd ready"
    );

    let mut stdout = tokio::io::stdout();

    if cli.query {
        let mut line = serde_json::to_vec(&Summary::of(&vault))?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
        stdout.flush().await?;
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut processed = 0u64;
    while let Some(line) = lines.next_line().await? {
        let Some(response) = process_line(&mut vault, &line) else {
            continue;
        };
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
        processed += 1;
    }

    info!(processed, total_supply = vault.total_supply(), "input exhausted, shutting down");
    Ok(())
}
