//! capsim CLI: size GPU clusters by simulating their job queues.

use capsim_core::config::SimConfig;
use capsim_core::{export, metrics};
use capsim_policies::PolicyKind;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "capsim",
    about = "Simulate GPU cluster capacity, queueing and cost",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation with a single policy.
    Run {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: PathBuf,
        /// Placement policy (overrides scheduler.policy).
        #[arg(short, long)]
        policy: Option<String>,
        /// Directory for the tick, job and summary files.
        #[arg(short, long, default_value = "out")]
        out_dir: PathBuf,
        /// File name prefix for the exported files.
        #[arg(short, long, default_value = "run")]
        stem: String,
    },
    /// Compare multiple policies on the same config and seed.
    Compare {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated list of policy names.
        #[arg(short = 'P', long, value_delimiter = ',')]
        policies: Vec<String>,
        /// Output all summaries to a JSON file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse and validate a configuration file.
    Validate {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List available policies.
    ListPolicies,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "capsim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            policy,
            out_dir,
            stem,
        } => {
            let mut sim_config = load_config(&config);
            if let Some(name) = policy {
                sim_config.scheduler.policy = PolicyKind::from_name(&name).unwrap_or_else(|| {
                    error!(
                        "Unknown policy: {}. Available: {:?}",
                        name,
                        capsim_policies::available_policies()
                    );
                    std::process::exit(1);
                });
            }

            let report = capsim_core::run_configured(sim_config);
            println!("{}", metrics::format_table(&report));

            let written = export::write_report(&out_dir, &stem, &report).unwrap_or_else(|e| {
                error!("Error writing output: {}", e);
                std::process::exit(1);
            });
            for path in written {
                info!("wrote {}", path.display());
            }
        }
        Commands::Compare {
            config,
            policies,
            output,
        } => {
            let sim_config = load_config(&config);
            let names: Vec<&str> = if policies.is_empty() {
                capsim_policies::available_policies()
            } else {
                policies.iter().map(|s| s.as_str()).collect()
            };
            for name in &names {
                if PolicyKind::from_name(name).is_none() {
                    error!("Unknown policy {}, skipping", name);
                }
            }

            let results = capsim_core::compare_policies(&sim_config, &names);
            println!("{}", metrics::format_comparison_table(&results));

            for result in &results {
                println!("{}", metrics::format_table(result));
            }

            if let Some(output_path) = output {
                let summaries: Vec<_> = results.iter().map(|r| &r.summary).collect();
                let json = serde_json::to_string_pretty(&summaries).unwrap_or_else(|e| {
                    error!("Error serializing results: {}", e);
                    std::process::exit(1);
                });
                std::fs::write(&output_path, json).unwrap_or_else(|e| {
                    error!("Error writing output: {}", e);
                    std::process::exit(1);
                });
                println!("Results written to {}", output_path.display());
            }
        }
        Commands::Validate { config } => {
            let sim_config = load_config(&config);
            println!(
                "{} is valid: {} nodes x {} GPUs, {} job streams, {} ticks",
                config.display(),
                sim_config.cluster.nodes,
                sim_config.cluster.gpus_per_node,
                sim_config.workload.job_streams.len(),
                sim_config.total_ticks()
            );
        }
        Commands::ListPolicies => {
            println!("Available scheduling policies:");
            for name in capsim_policies::available_policies() {
                println!("  - {}", name);
            }
        }
    }
}

fn load_config(path: &Path) -> SimConfig {
    SimConfig::from_file(path).unwrap_or_else(|e| {
        error!("Error loading config: {}", e);
        std::process::exit(1);
    })
}
