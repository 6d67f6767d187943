//! Kollektor CLI: validate tracker configuration and replay recorded
//! sessions through the tracker, printing consumer output as JSON lines.

mod replay;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kollektor_core::config::LogConfig;
use kollektor_core::{AppConfig, Configuration, ConsumerHandler, TrackerOptions};

#[derive(Parser, Debug)]
#[command(name = "kollektor")]
#[command(about = "Behavioural interaction tracker: configuration check and session replay")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a configuration, resolve it against its template and print the result
    Validate {
        /// Configuration file (TOML or JSON)
        #[arg(short, long, env = "KOLLEKTOR_CONFIG")]
        config: PathBuf,
    },

    /// Replay a recorded session and print every consumer call to stdout
    Replay {
        /// Configuration file (TOML or JSON)
        #[arg(short, long, env = "KOLLEKTOR_CONFIG")]
        config: PathBuf,

        /// Session file (JSON)
        #[arg(short, long)]
        session: PathBuf,

        /// Force debug diagnostics on (overrides config)
        #[arg(long, default_value_t = false)]
        debug: bool,
    },
}

/// Writes each consumer call to stdout as one JSON line.
struct JsonLineHandler {
    consumer: String,
}

impl ConsumerHandler for JsonLineHandler {
    fn handle(&self, event: &str, data: &Map<String, Value>) {
        println!(
            "{}",
            json!({ "consumer": self.consumer, "event": event, "data": data })
        );
    }
}

/// Consumers loaded from files carry no callback; give each one a stdout
/// handler.
fn bind_stdout_handlers(options: &mut TrackerOptions) {
    for consumer in options.consumers.iter_mut().flatten() {
        if consumer.handler.is_none() {
            consumer.handler = Some(Arc::new(JsonLineHandler {
                consumer: consumer.name.clone(),
            }));
        }
    }
}

fn init_tracing(log: &LogConfig, debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new(format!("{},kollektor_web_sdk=debug", log.filter))
        } else {
            EnvFilter::new(&log.filter)
        }
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load(Some(path)).with_context(|| format!("failed to load config {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => {
            let mut app = load_config(&config)?;
            init_tracing(&app.log, app.tracker.is_debug.unwrap_or(false));
            bind_stdout_handlers(&mut app.tracker);
            cmd_validate(app.tracker)
        }
        Commands::Replay {
            config,
            session,
            debug,
        } => {
            let mut app = load_config(&config)?;
            if debug {
                app.tracker.is_debug = Some(true);
            }
            init_tracing(&app.log, app.tracker.is_debug.unwrap_or(false));
            bind_stdout_handlers(&mut app.tracker);
            let session = replay::Session::load(&session)?;
            let summary = replay::run(app.tracker, &session)?;
            info!(
                events = summary.events,
                forwarded = summary.forwarded,
                tracked_scroll_distances = ?summary.tracked_scroll_distances,
                "replay finished"
            );
            Ok(())
        }
    }
}

fn cmd_validate(options: TrackerOptions) -> Result<()> {
    let collector = kollektor_web_sdk::register(options).context("configuration rejected")?;
    print_configuration(collector.configuration());
    Ok(())
}

fn print_configuration(config: &Configuration) {
    println!("Configuration is VALID");
    println!();
    println!("  Template:          {}", config.template.as_str());
    println!("  Debug:             {}", config.is_debug);
    println!(
        "  Masking:           {} (limit {})",
        if config.privacy.masking { "on" } else { "off" },
        config.privacy.limit
    );
    println!(
        "  Excluded:          {}",
        config.privacy.excluded_selectors.join(", ")
    );
    match &config.debounce {
        Some(debounce) => println!("  Debounce:          {debounce:?}"),
        None => println!("  Debounce:          none"),
    }
    println!(
        "  Scroll distances:  {}",
        config
            .scroll_distances
            .iter()
            .map(|d| format!("{d}%"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();

    println!("  Targets ({}):", config.targets.len());
    for target in &config.targets {
        println!(
            "    {:<20} {:<40} {}",
            target.name,
            target.selector,
            target.events.iter().collect::<Vec<_>>().join(",")
        );
    }
    println!("  Containers ({}):", config.containers.len());
    for container in &config.containers {
        println!("    {:<20} {}", container.name, container.selector);
    }
    println!("  Consumers ({}):", config.consumers.len());
    for consumer in &config.consumers {
        let fields = consumer
            .map
            .as_ref()
            .map(|m| m.keys().cloned().collect::<Vec<_>>().join(","))
            .unwrap_or_default();
        let events = match &consumer.events {
            Some(filter) => format!("{filter:?}"),
            None => "-".to_string(),
        };
        println!("    {:<20} {} [{}]", consumer.name, events, fields);
    }
}
