//! nodeheap command-line driver
//!
//! Runs heap pool sessions from the command line:
//! - the reference demo session (create, destroy, write, read, release)
//! - replaying a JSON script of pool operations
//! - printing the effective configuration
//!
//! # Examples
//!
//! ```bash
//! # Run the demo, storing a file's bytes in node 4
//! nodeheap demo --input test_data.bin
//!
//! # Replay a session and print outcomes as JSON
//! nodeheap replay session.json --json
//!
//! # Show configuration after file and environment overrides
//! NODEHEAP_MAX_HEAPS=8 nodeheap config
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use nodeheap::script::Script;
use nodeheap::{HeapPool, PoolConfig};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// nodeheap - handle-indexed heaps of byte buffers
#[derive(Parser, Debug)]
#[command(name = "nodeheap")]
#[command(version = nodeheap::VERSION)]
#[command(about = "nodeheap - handle-indexed heaps of byte buffers", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(long, global = true, env = "NODEHEAP_CONFIG")]
    config: Option<PathBuf>,

    /// Log directory path
    #[arg(long, global = true, default_value = "logs", env = "NODEHEAP_LOG_DIR")]
    log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    metrics: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the demo session
    Demo(DemoArgs),

    /// Replay a JSON script of pool operations
    Replay(ReplayArgs),

    /// Print the effective configuration as TOML
    Config,
}

/// Demo arguments
#[derive(Args, Debug)]
struct DemoArgs {
    /// File whose bytes are stored in the demo node
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Node capacity of the demo heap (defaults to configuration)
    #[arg(long)]
    nodes: Option<i32>,

    /// Node that receives the data
    #[arg(long, default_value = "4")]
    node: i32,
}

/// Replay arguments
#[derive(Args, Debug)]
struct ReplayArgs {
    /// Script file
    script: PathBuf,

    /// Print outcomes as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli)?;
    nodeheap::metrics::init_metrics();

    let config = PoolConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Demo(ref args) => demo_command(&config, args)?,
        Commands::Replay(ref args) => replay_command(&config, args)?,
        Commands::Config => print!("{}", config.to_toml()?),
    }

    if cli.metrics {
        print!("{}", nodeheap::metrics::export_metrics());
    }
    Ok(())
}

/// Setup logging with rolling files and console output
fn setup_logging(cli: &Cli) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cli.log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &cli.log_dir, "nodeheap.log");

    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color)
                .pretty(),
        )
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

/// Demo command - exercise the pool lifecycle end to end
fn demo_command(config: &PoolConfig, args: &DemoArgs) -> anyhow::Result<()> {
    let nodes = args.nodes.unwrap_or(config.default_heap_nodes);
    let data = match &args.input {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("reading test data from {}", path.display()))?,
        None => vec![0xDE, 0xAD, 0xBE, 0xEF],
    };

    let mut pool = HeapPool::from_config(config)?;
    info!(max_heaps = config.max_heaps, "Demo pool ready");

    let heap = pool.create_heap(nodes)?;
    println!("new heap index = {}", heap);

    pool.destroy_heap(heap)?;
    println!("destroyed heap {}", heap);

    // Destroying again reports the missing heap without failing the demo
    if let Err(e) = pool.destroy_heap(heap) {
        println!("second destroy of heap {}: {}", heap, e);
    }

    let heap = pool.create_heap(nodes)?;
    println!("new heap index = {}", heap);

    pool.set_data(heap, args.node, data)?;
    let view = pool.get_data(heap, args.node)?;
    let preview: Vec<String> = view
        .bytes()
        .iter()
        .take(4)
        .map(|b| format!("{:02X}", b))
        .collect();
    println!(
        "heap {} node {}: {} bytes [{}]",
        heap,
        args.node,
        view.length(),
        preview.join(",")
    );

    pool.destroy_node(heap, args.node)?;
    match pool.get_data(heap, args.node) {
        Ok(_) => warn!(heap, node = args.node, "Node survived destruction"),
        Err(e) => println!("after destroy_node: {}", e),
    }

    pool.destroy_heap(heap)?;
    println!("{}", serde_json::to_string_pretty(&pool.stats())?);
    Ok(())
}

/// Replay command - run a script against a fresh pool
fn replay_command(config: &PoolConfig, args: &ReplayArgs) -> anyhow::Result<()> {
    let script = Script::load(&args.script)?;
    info!(steps = script.steps.len(), path = %args.script.display(), "Replaying script");

    // The script initializes the pool itself; configuration bounds it
    let mut pool = HeapPool::with_config(config)?;
    let outcomes = script.run(&mut pool);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }

    for outcome in &outcomes {
        match (&outcome.error, &outcome.value) {
            (Some(error), _) => println!("#{:<3} {:<14} error: {}", outcome.step, outcome.op, error),
            (None, Some(value)) => println!("#{:<3} {:<14} ok: {}", outcome.step, outcome.op, value),
            (None, None) => println!("#{:<3} {:<14} ok", outcome.step, outcome.op),
        }
    }
    let failed = outcomes.iter().filter(|o| !o.ok).count();
    println!("{} steps, {} failed", outcomes.len(), failed);
    Ok(())
}
