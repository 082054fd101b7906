//! 🚀 elastx-cli: the front door, the bouncer, the maitre d' of elastx.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 Thin wrapper: parse args, set up logging, load config, run one command against
//! the cluster, print the result. The library does the heavy lifting. Like a manager. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use elastx::{Client, ClientConfig, Node};
use serde_json::Value;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "elastx-cli")]
#[command(about = "Talk to an Elasticsearch cluster through a failover-aware node pool", long_about = None)]
struct Cli {
    /// TOML config file; `ELASTX_*` env vars apply either way.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the cluster's version number
    Version,
    /// Print index statistics, for one index or all of them
    Stats {
        #[arg(short, long)]
        index: Option<String>,
    },
    /// Run a search and print the raw response
    Search {
        #[arg(short, long)]
        index: String,
        /// Query DSL as JSON, e.g. '{"match_all":{}}'
        #[arg(short, long)]
        query: String,
    },
    /// Ping the cluster, then show what the node pool thinks of every node
    Nodes,
}

/// 🚀 main(): where it all begins.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Parse args
/// 3. Load config (the moment of truth)
/// 4. Run the command
/// 5. Handle errors (cry, then exit 1)
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion of sadness, one layer at a time
        let mut the_vibes_are_giving_connection_issues = false;
        for cause in err.chain() {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("No node available")
                || cause_str.contains("error sending request")
                || cause_str.contains("onnection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }

        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: no Elasticsearch node answered. Check that the hosts in your config \
                are right and that the cluster is actually running. If you're using Docker, \
                `docker ps` shows what's up and `docker compose up -d` resurrects it. ☕"
            );
        }

        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = load(cli.config)?;
    let mut client = Client::new(&config).context(
        "💀 Couldn't build the client. The host list or the TLS setup is probably the culprit.",
    )?;

    match cli.command {
        Command::Version => {
            let version = client
                .version()
                .await
                .context("💀 Failed to ask the cluster for its version")?;
            println!("{}", version);
        }
        Command::Stats { index } => {
            let stats = client
                .indices_stats(index.as_deref(), &[])
                .await
                .context("💀 Failed to fetch index stats")?;
            print_json(&stats)?;
        }
        Command::Search { index, query } => {
            let query: Value = serde_json::from_str(&query)
                .with_context(|| format!("💀 --query is not valid JSON: {}", query))?;
            let result = client
                .index(index.as_str())
                .search(&serde_json::json!({ "query": query }))
                .await
                .with_context(|| format!("💀 Search against '{}' failed", index))?;
            print_json(&result)?;
        }
        Command::Nodes => {
            // -- 📡 one ping so the table reflects reality, not just the config file
            if let Err(err) = client.version().await {
                warn!("⚠️ Ping failed, showing the pool as it stands: {}", err);
            }
            println!("{}", node_table(client.nodes()));
        }
    }
    Ok(())
}

/// 🔒 An explicit path that doesn't exist is an error, not a silent fallback to env vars.
fn load(config: Option<PathBuf>) -> Result<ClientConfig> {
    if let Some(path) = &config {
        let exists = path.try_exists().with_context(|| {
            format!(
                "💀 Couldn't check whether the configuration file exists: '{}'",
                path.display()
            )
        })?;
        if !exists {
            bail!(
                "💀 Configuration file not found at '{}'. If it's a relative path, \
                 double-check your working directory, or use an absolute path.",
                path.display()
            );
        }
    }
    elastx::load_config(config.as_deref()).context(
        "💀 In elastx-cli we couldn't load the configuration. Take a look at the file and the ELASTX_* env vars.",
    )
}

fn print_json(value: &Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("💀 Failed to pretty-print the response")?
    );
    Ok(())
}

fn node_table(nodes: &[Node]) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Node", "Liveness", "Failures", "Last failure"]);

    for node in nodes {
        let last_failure = node
            .last_failure()
            .and_then(|at| at.elapsed().ok())
            .map(|ago| format!("{}s ago", ago.as_secs()))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(node.address()),
            Cell::new(format!("{:?}", node.liveness())),
            Cell::new(node.failure_count()).set_alignment(CellAlignment::Right),
            Cell::new(last_failure).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
