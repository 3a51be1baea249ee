//! Sync a Modrinth collection into a packwiz modpack.
//!
//! Run from the pack directory (the one holding `pack.toml`). Without a
//! subcommand, `packsync` performs a full sync.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use packsync::cancel::CancelFlag;
use packsync::core::reporter::summarize_plan;
use packsync::exit_codes;
use packsync::io::config::{CONFIG_FILE_NAME, SyncConfig, load_config};
use packsync::io::installer::PackwizInstaller;
use packsync::io::modrinth::ModrinthClient;
use packsync::logging;
use packsync::report::{
    plan_line, render_slug_list, result_line, summary_block, unresolved_ids,
};
use packsync::sync::{
    PlanRun, SyncRequest, build_plan, check_installer, check_pack_manifest, run_sync,
};

#[derive(Parser)]
#[command(
    name = "packsync",
    version,
    about = "Sync a Modrinth collection into a packwiz modpack"
)]
struct Cli {
    /// Packwiz modpack directory (must contain `pack.toml`).
    #[arg(long, global = true, default_value = ".")]
    pack_dir: PathBuf,

    /// Config file. Defaults to `<pack-dir>/packsync.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Collection id to use instead of the configured one.
    #[arg(long, global = true)]
    collection: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Install every collection mod missing from the pack (default).
    Sync,
    /// Resolve and classify the collection without installing anything.
    Plan,
    /// Write the collection's resolved slugs to a markdown file.
    Slugs {
        /// Output file.
        #[arg(short, long, default_value = "mods_from_collection.md")]
        output: PathBuf,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("error: {:#}", err);
        std::process::exit(exit_codes::FAILED);
    }
    std::process::exit(exit_codes::OK);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.pack_dir.join(CONFIG_FILE_NAME));
    let mut cfg = load_config(&config_path)?;
    if let Some(collection) = cli.collection {
        cfg.collection_id = collection;
    }
    debug!(config = %config_path.display(), collection_id = %cfg.collection_id, "config loaded");

    match cli.command.unwrap_or(Command::Sync) {
        Command::Sync => cmd_sync(&cli.pack_dir, &cfg),
        Command::Plan => cmd_plan(&cli.pack_dir, &cfg),
        Command::Slugs { output } => cmd_slugs(&cli.pack_dir, &cfg, &output),
    }
}

fn cmd_sync(pack_dir: &Path, cfg: &SyncConfig) -> Result<()> {
    check_pack_manifest(pack_dir, cfg)?;
    let binary = cfg.installer_binary();
    check_installer(&binary)?;

    let cancel = CancelFlag::new();
    cancel.install_ctrlc_handler()?;
    let client = client(cfg);
    let installer = PackwizInstaller::new(
        binary,
        pack_dir,
        cfg.call_timeout(),
        cfg.installer_output_limit_bytes,
    );
    let request = SyncRequest::from_config(pack_dir, cfg, cancel);

    println!("Fetching collection {}...", cfg.collection_id);
    let outcome = run_sync(
        &client,
        &client,
        &installer,
        &request,
        print_plan,
        |result| println!("{}", result_line(result)),
    )?;

    if outcome.refreshed == Some(false) {
        eprintln!("warning: packwiz refresh failed; run `packwiz refresh` manually");
    }
    let heading = if outcome.aborted() {
        "SYNC ABORTED"
    } else {
        "SYNC COMPLETE"
    };
    print!("{}", summary_block(heading, &outcome.summary));
    Ok(())
}

fn cmd_plan(pack_dir: &Path, cfg: &SyncConfig) -> Result<()> {
    check_pack_manifest(pack_dir, cfg)?;

    let cancel = CancelFlag::new();
    cancel.install_ctrlc_handler()?;
    let client = client(cfg);
    let request = SyncRequest::from_config(pack_dir, cfg, cancel);

    println!("Fetching collection {}...", cfg.collection_id);
    let plan = build_plan(&client, &client, &request)?;
    print_plan(&plan);
    let heading = if plan.cancelled {
        "PLAN ABORTED"
    } else {
        "PLAN"
    };
    print!("{}", summary_block(heading, &summarize_plan(&plan.entries)));
    Ok(())
}

fn cmd_slugs(pack_dir: &Path, cfg: &SyncConfig, output: &Path) -> Result<()> {
    let cancel = CancelFlag::new();
    cancel.install_ctrlc_handler()?;
    let client = client(cfg);
    let request = SyncRequest::from_config(pack_dir, cfg, cancel);

    println!("Resolving collection {}...", cfg.collection_id);
    let plan = build_plan(&client, &client, &request)?;
    print_plan(&plan);

    let contents = render_slug_list(&cfg.collection_id, &plan.entries);
    fs::write(output, contents).with_context(|| format!("write {}", output.display()))?;

    let failed = unresolved_ids(&plan.entries);
    println!(
        "Saved {} slugs to {}",
        plan.entries.len() - failed.len(),
        output.display()
    );
    if !failed.is_empty() {
        eprintln!("Failed to resolve: {}", failed.join(", "));
    }
    Ok(())
}

fn client(cfg: &SyncConfig) -> ModrinthClient {
    ModrinthClient::new(&cfg.api_base, &cfg.user_agent, cfg.call_timeout())
}

fn print_plan(plan: &PlanRun) {
    match &plan.collection_name {
        Some(name) => println!("Collection: {name} ({} projects)", plan.listed),
        None => println!("Collection: {} projects", plan.listed),
    }
    println!("==================================================");
    let total = plan.entries.len();
    for (index, entry) in plan.entries.iter().enumerate() {
        println!("{}", plan_line(index, total, entry));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_sync() {
        let cli = Cli::parse_from(["packsync"]);
        assert_eq!(cli.command, None);
        assert_eq!(cli.pack_dir, PathBuf::from("."));
    }

    #[test]
    fn collection_override_is_global() {
        let cli = Cli::parse_from(["packsync", "plan", "--collection", "abc123"]);
        assert_eq!(cli.command, Some(Command::Plan));
        assert_eq!(cli.collection.as_deref(), Some("abc123"));
    }

    #[test]
    fn slugs_has_default_output() {
        let cli = Cli::parse_from(["packsync", "slugs"]);
        assert_eq!(
            cli.command,
            Some(Command::Slugs {
                output: PathBuf::from("mods_from_collection.md")
            })
        );
    }
}
