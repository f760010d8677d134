use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use llmdrift_benchmark::{OllamaClient, OllamaOracle, Orchestrator, Reporter};
use llmdrift_core::{CanonicalSet, DriftConfig, Registry};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "llmdrift")]
#[command(about = "LLM Drift - track LLM answers to fixed benchmarks over time", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add benchmark groups, fire them at the oracle and watch results
    Run {
        /// Add the canonical prime benchmark group
        #[arg(long, env = "ADD_PRIME_BENCHMARKS")]
        add_primes: bool,

        /// Add the canonical happy number counting group
        #[arg(long, env = "ADD_COUNTING_HAPPY_NUMBERS_BENCHMARKS")]
        add_happy_numbers: bool,

        /// Send every unfired benchmark to the oracle
        #[arg(long, env = "FIRE_BENCHMARKS")]
        fire: bool,

        /// Model to query
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Print the canonical benchmark sets
    List {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        output: String,
    },

    /// Show configuration and oracle reachability
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            add_primes,
            add_happy_numbers,
            fire,
            model,
        } => {
            let mut config = config;
            if let Some(model) = model {
                config.oracle.model = model;
            }
            cmd_run(&config, add_primes, add_happy_numbers, fire).await?
        }
        Commands::List { output } => cmd_list(&output)?,
        Commands::Status => cmd_status(&config).await?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<DriftConfig> {
    let config = match path {
        Some(path) => DriftConfig::load(path)?,
        None => DriftConfig::default(),
    };
    Ok(config.apply_env()?)
}

fn canonical_sets(add_primes: bool, add_happy_numbers: bool) -> Vec<CanonicalSet> {
    let mut sets = Vec::new();
    if add_primes {
        sets.push(CanonicalSet::primes());
    }
    if add_happy_numbers {
        sets.push(CanonicalSet::counting_happy_numbers());
    }
    sets
}

async fn cmd_run(
    config: &DriftConfig,
    add_primes: bool,
    add_happy_numbers: bool,
    fire: bool,
) -> Result<()> {
    let registry = Arc::new(Registry::new());
    for set in canonical_sets(add_primes, add_happy_numbers) {
        registry.add_canonical_set(&set)?;
    }

    if registry.is_empty() {
        anyhow::bail!("No benchmark groups. Use --add-primes and/or --add-happy-numbers.");
    }

    let (tx, rx) = mpsc::channel(config.orchestrator.channel_capacity);
    let oracle = Arc::new(OllamaOracle::new(&config.oracle, tx));
    let orchestrator = Arc::new(Orchestrator::new(registry.clone(), oracle));

    let cancel = CancellationToken::new();
    let resolver = tokio::spawn(orchestrator.clone().run_resolver(rx, cancel.clone()));
    let events = tokio::spawn(log_events(orchestrator.subscribe(), cancel.clone()));

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
        }
        ctrl_c.cancel();
    });

    if fire {
        println!();
        println!("Firing benchmarks...");
        println!("  Oracle: {}", config.oracle.host);
        println!("  Model:  {}", config.oracle.model);
        println!();
        let summary = orchestrator.fire_all().await?;
        println!("  Fired: {}  Failed: {}", summary.fired, summary.failed);
        println!();
    }

    let reporter = Reporter::new(
        registry.clone(),
        Duration::from_millis(config.reporter.interval_ms),
    );
    reporter.run(cancel.clone(), &mut io::stdout()).await?;

    let resolved = resolver.await?;
    events.await?;
    info!(
        resolved,
        still_pending = orchestrator.pending_count(),
        "Stopped"
    );

    Ok(())
}

async fn log_events(
    mut rx: broadcast::Receiver<llmdrift_benchmark::RunEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = rx.recv() => event,
        };
        match event {
            Ok(e) => info!(
                group_id = e.group_id,
                request_id = %e.request_id,
                score = e.run.score,
                score_sum = e.score_sum,
                "Benchmark result added"
            ),
            Err(broadcast::error::RecvError::Lagged(n)) => warn!("Skipped {} run events", n),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn cmd_list(output_format: &str) -> Result<()> {
    let sets = canonical_sets(true, true);

    match output_format {
        "json" => {
            let mut out = Vec::new();
            for set in &sets {
                out.push(serde_json::json!({
                    "name": set.name(),
                    "description": set.description(),
                    "benchmarks": set.benchmarks()?,
                }));
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        _ => write_table(&sets, &mut io::stdout())?,
    }

    Ok(())
}

fn write_table<W: Write>(sets: &[CanonicalSet], out: &mut W) -> Result<()> {
    for set in sets {
        writeln!(out)?;
        writeln!(out, "{}", set.name())?;
        writeln!(out, "  {}", set.description())?;
        writeln!(out, "{:-<80}", "")?;
        for benchmark in set.benchmarks()? {
            writeln!(out, "  {:<42} {}", benchmark.id(), benchmark.description())?;
            writeln!(out, "      {}", benchmark.prompt())?;
        }
    }
    writeln!(out)?;
    Ok(())
}

async fn cmd_status(config: &DriftConfig) -> Result<()> {
    println!("System Status:");
    println!("{:-<40}", "");
    println!("  Oracle Host: {}", config.oracle.host);
    println!("  Model: {}", config.oracle.model);
    println!("  Poll Interval: {} ms", config.reporter.interval_ms);

    let client = OllamaClient::new(&config.oracle.host);
    match client.list_models().await {
        Ok(models) => {
            let available = models.iter().any(|m| m == &config.oracle.model);
            println!("  Oracle: connected ({} models available)", models.len());
            if !available {
                println!("  Warning: model {} is not pulled", config.oracle.model);
            }
        }
        Err(e) => {
            println!("  Oracle: disconnected ({})", e);
        }
    }

    Ok(())
}
