// Entrypoint for the CLI application.
// - Keeps `main` small: resolve preferences, build the API client and
//   orchestrator, then hand over to the UI loop.

use clap::Parser;
use nft_mint_cli::{
    api::ApiClient,
    config::{PreferenceArgs, Preferences},
    init_tracing,
    pipeline::Orchestrator,
    ui::main_menu,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nft-mint", about = "Pin a file on IPFS and mint it as an NFT")]
struct Cli {
    /// Preferences file (default: <config dir>/nft-mint/preferences.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    preferences: PreferenceArgs,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let prefs = Preferences::load(cli.preferences, cli.config.as_deref())?;
    let api = ApiClient::new(&prefs)?;
    let orchestrator = Orchestrator::new(api, prefs.marketplace_url.clone());

    // Blocks until the user exits.
    main_menu(&orchestrator, &prefs)?;
    Ok(())
}
