//! LogoForge CLI - Bridge interface for the web product
//!
//! Commands: digest, params, score, rng, registry
//! Outputs JSON to stdout, logs to stderr
//! Returns non-zero on invalid input

use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use logoforge_core::{
    derive_parameters, generate_hash_input, Digest, DigestBackendKind, DigestEngine, EngineConfig,
    FileStore, LogoEngine, NullStore, SeededRng,
};

#[derive(Parser)]
#[command(name = "logoforge-cli")]
#[command(about = "LogoForge CLI - Parametric Generation Engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to an engine config JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Digest a raw message
    Digest {
        message: String,

        /// Override the configured backend
        #[arg(short, long, value_parser = parse_backend)]
        backend: Option<DigestBackendKind>,
    },

    /// Derive parameters for a brand
    Params {
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        category: String,

        /// Milliseconds since the epoch (defaults to now)
        #[arg(short, long)]
        timestamp: Option<i64>,

        /// Reuse an existing salt
        #[arg(short, long)]
        salt: Option<String>,
    },

    /// Score an SVG artifact against a digest's parameters
    Score {
        #[arg(short, long)]
        digest: String,

        /// Path to the SVG artifact
        #[arg(short, long)]
        artifact: PathBuf,
    },

    /// Print the seeded PRNG stream
    Rng {
        #[arg(short, long)]
        seed: String,

        #[arg(short = 'n', long, default_value_t = 8)]
        count: usize,
    },

    /// Inspect or reset the dedup registry
    Registry {
        /// Directory backing the registry
        #[arg(long, default_value = ".logoforge")]
        store_dir: PathBuf,

        #[command(subcommand)]
        action: RegistryAction,
    },
}

#[derive(Subcommand)]
enum RegistryAction {
    /// List records, optionally for one brand
    List {
        #[arg(short, long)]
        brand: Option<String>,
    },
    /// Check whether a digest was recorded
    Has { digest: String },
    /// Remove every record
    Clear,
}

fn parse_backend(value: &str) -> Result<DigestBackendKind, String> {
    match value {
        "native" => Ok(DigestBackendKind::Native),
        "portable" => Ok(DigestBackendKind::Portable),
        other => Err(format!("unknown backend {:?} (expected native or portable)", other)),
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => println!(r#"{{"error": "Failed to encode output: {}"}}"#, e),
    }
}

fn fail(message: String) -> ExitCode {
    print_json(&json!({ "success": false, "error": message }));
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match EngineConfig::load(path) {
            Ok(c) => c,
            Err(e) => return fail(e.to_string()),
        },
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Digest { message, backend } => {
            let kind = backend.unwrap_or(config.digest_backend);
            let engine = DigestEngine::new(kind.backend());
            print_json(&json!({
                "backend": engine.backend_name(),
                "digest": engine.digest(&message),
            }));
            ExitCode::SUCCESS
        }

        Commands::Params { name, category, timestamp, salt } => {
            let mut input = generate_hash_input(&name, &category, salt.as_deref());
            if let Some(ts) = timestamp {
                input.timestamp = ts;
            }
            let engine = DigestEngine::new(config.digest_backend.backend());
            let digest = engine.digest_input(&input);
            print_json(&json!({
                "input": input,
                "digest": digest,
                "params": derive_parameters(&digest),
            }));
            ExitCode::SUCCESS
        }

        Commands::Score { digest, artifact } => {
            let digest = match Digest::from_hex(&digest) {
                Ok(d) => d,
                Err(e) => return fail(format!("Invalid digest: {}", e)),
            };
            let svg = match fs::read_to_string(&artifact) {
                Ok(s) => s,
                Err(e) => return fail(format!("Failed to read {}: {}", artifact.display(), e)),
            };
            let params = derive_parameters(&digest);
            let engine = LogoEngine::new(config, NullStore);
            print_json(&json!({
                "digest": digest,
                "metrics": engine.score(&svg, &params),
            }));
            ExitCode::SUCCESS
        }

        Commands::Rng { seed, count } => {
            let values: Vec<f64> = SeededRng::new(&seed).take(count).collect();
            print_json(&json!({ "seed": seed, "values": values }));
            ExitCode::SUCCESS
        }

        Commands::Registry { store_dir, action } => {
            let engine = LogoEngine::new(config, FileStore::new(store_dir));
            let registry = engine.registry();
            match action {
                RegistryAction::List { brand } => {
                    let records = match brand {
                        Some(name) => registry.for_brand(&name),
                        None => registry.entries(),
                    };
                    print_json(&json!({
                        "capacity": registry.capacity(),
                        "count": records.len(),
                        "records": records,
                    }));
                    ExitCode::SUCCESS
                }
                RegistryAction::Has { digest } => match Digest::from_hex(&digest) {
                    Ok(d) => {
                        let present = registry.has(&d);
                        print_json(&json!({ "digest": d, "present": present }));
                        ExitCode::SUCCESS
                    }
                    Err(e) => fail(format!("Invalid digest: {}", e)),
                },
                RegistryAction::Clear => {
                    registry.clear();
                    print_json(&json!({ "success": true }));
                    ExitCode::SUCCESS
                }
            }
        }
    }
}
