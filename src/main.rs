//! Trigram Sensor CLI
//!
//! Keystroke trigram latency capture for typing-rhythm research.

use clap::{Parser, Subcommand};
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use trigram_sensor::{
    collector::ReplaySource,
    config::Config,
    core::{
        load_persisted, render_persisted, CapturePipeline, FsStore, PersistenceMerger,
        SaveOutcome, SkipReason, TrigramOutcome,
    },
    transparency::create_shared_log_with_persistence,
    VERSION,
};

#[derive(Parser)]
#[command(name = "trigram-sensor")]
#[command(version = VERSION)]
#[command(about = "Keystroke trigram latency capture for typing-rhythm research", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture trigram samples from a JSONL key-event stream
    Capture {
        /// Event file to replay (one {"key", "timestamp_ms"} object per
        /// line); reads stdin when omitted
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Override the trigram delay threshold in milliseconds
        #[arg(long)]
        threshold_ms: Option<f64>,

        /// Override the save cooldown in milliseconds
        #[arg(long)]
        cooldown_ms: Option<f64>,

        /// Override the save trigger key identifier
        #[arg(long)]
        trigger: Option<String>,
    },

    /// Show configuration and cumulative statistics
    Status,

    /// Print the persisted trigram data in compact form
    Export,

    /// List the distinct key identifiers in the persisted data
    Keys,

    /// Clear the persisted trigram data
    Reset,

    /// Show configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Capture {
            input,
            threshold_ms,
            cooldown_ms,
            trigger,
        } => {
            cmd_capture(input, threshold_ms, cooldown_ms, trigger);
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Export => {
            cmd_export();
        }
        Commands::Keys => {
            cmd_keys();
        }
        Commands::Reset => {
            cmd_reset();
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

fn cmd_capture(
    input: Option<PathBuf>,
    threshold_ms: Option<f64>,
    cooldown_ms: Option<f64>,
    trigger: Option<String>,
) {
    println!("Trigram Sensor v{VERSION}");
    println!();

    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let threshold_ms = threshold_ms.unwrap_or(config.max_trigram_delay_ms);
    let cooldown_ms = cooldown_ms.unwrap_or(config.save_cooldown_ms);
    let trigger = trigger.unwrap_or_else(|| config.save_trigger_key.clone());

    println!("Starting capture...");
    println!("  Delay threshold: {threshold_ms}ms");
    println!("  Save cooldown: {cooldown_ms}ms");
    println!("  Save trigger key: {trigger}");

    let source = match &input {
        Some(path) => {
            println!("  Input: {path:?}");
            match std::fs::File::open(path) {
                Ok(file) => ReplaySource::spawn(BufReader::new(file)),
                Err(e) => {
                    eprintln!("Error opening {path:?}: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => {
            println!("  Input: stdin");
            ReplaySource::spawn(BufReader::new(std::io::stdin()))
        }
    };

    // Set up transparency log
    let transparency_log =
        create_shared_log_with_persistence(config.data_path.join("transparency.json"));

    let store = FsStore::new(config.data_path.clone());
    let mut pipeline = CapturePipeline::new(
        threshold_ms,
        cooldown_ms,
        trigger.into(),
        store,
        transparency_log.clone(),
    );
    println!("  Session ID: {}", pipeline.session_id());
    println!();

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    // Main event loop
    let receiver = source.receiver().clone();

    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(Ok(event)) => {
                let outcome = pipeline.on_key_event(event);

                if let Some(TrigramOutcome::Rejected { key, span_ms }) = &outcome.trigram {
                    println!("skipped [{key}] for span {span_ms}ms");
                }

                match outcome.save {
                    Some(Ok(SaveOutcome::Saved)) => {
                        println!("saved trigram data under key \"trigram_data\"");
                    }
                    Some(Ok(SaveOutcome::Skipped(SkipReason::Cooldown))) => {
                        println!("didn't save: cooldown has not elapsed since the last save");
                    }
                    Some(Ok(SaveOutcome::Skipped(reason))) => {
                        println!("didn't save: {reason}");
                    }
                    Some(Err(e)) => {
                        eprintln!("Warning: save failed, samples kept in memory: {e}");
                    }
                    None => {}
                }
            }
            Ok(Err(e)) => {
                transparency_log.record_invalid_event();
                eprintln!("Warning: dropped invalid event: {e}");
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                // Input exhausted
                break;
            }
        }
    }

    // End of session: persist whatever the trigger key didn't catch
    println!();
    println!("Stopping capture...");
    if let Err(e) = pipeline.finish() {
        eprintln!("Warning: final save failed: {e}");
        println!();
        println!("Unsaved session data:");
        println!("{}", pipeline.render_session());
    }

    // Save transparency log
    if let Err(e) = transparency_log.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }

    // Final stats
    println!();
    println!("{}", transparency_log.summary());
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Trigram Sensor Status");
    println!("=====================");
    println!();

    println!("Configuration:");
    println!("  Delay threshold: {}ms", config.max_trigram_delay_ms);
    println!("  Save cooldown: {}ms", config.save_cooldown_ms);
    println!("  Save trigger key: {}", config.save_trigger_key);
    println!("  Data path: {:?}", config.data_path);
    println!();

    // Show persisted data size
    let store = FsStore::new(config.data_path.clone());
    match load_persisted(&store) {
        Ok(persisted) => {
            let samples: usize = persisted.values().map(Vec::len).sum();
            println!("Persisted data: {} trigrams, {} samples", persisted.len(), samples);
        }
        Err(e) => {
            eprintln!("Warning: could not read persisted data: {e}");
        }
    }
    println!();

    // Load and show transparency stats if available
    let stats_path = config.data_path.join("transparency.json");
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                if let Some(events) = stats.get("key_events") {
                    println!("  Key events: {events}");
                }
                if let Some(recorded) = stats.get("trigrams_recorded") {
                    println!("  Trigram samples recorded: {recorded}");
                }
                if let Some(rejected) = stats.get("trigrams_rejected") {
                    println!("  Trigrams filtered: {rejected}");
                }
                if let Some(saves) = stats.get("saves_completed") {
                    println!("  Saves completed: {saves}");
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_export() {
    let config = Config::load().unwrap_or_default();
    let store = FsStore::new(config.data_path);

    match load_persisted(&store) {
        Ok(persisted) => {
            println!("{}", render_persisted(&persisted));
        }
        Err(e) => {
            eprintln!("Error reading persisted data: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_keys() {
    let config = Config::load().unwrap_or_default();
    let store = FsStore::new(config.data_path);

    let persisted = match load_persisted(&store) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error reading persisted data: {e}");
            std::process::exit(1);
        }
    };

    let keys: std::collections::BTreeSet<&str> = persisted
        .keys()
        .flat_map(|trigram| trigram.split(','))
        .collect();

    for key in &keys {
        println!("{key}");
    }
    println!();
    println!("{} distinct keys across {} trigrams", keys.len(), persisted.len());
}

fn cmd_reset() {
    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }
    let mut store = FsStore::new(config.data_path);

    match PersistenceMerger::reset(&mut store) {
        Ok(()) => println!("Persisted trigram data cleared."),
        Err(e) => {
            eprintln!("Error clearing persisted data: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}
