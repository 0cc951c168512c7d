#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for forest watch.
//!
//! ```text
//! forest_watch serve [--interactive]
//! forest_watch analyze <file.geojson> [--no-insights] [--output report.json]
//! ```
//!
//! Running with no subcommand asks which tool to run.

mod analyze;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use dialoguer::{Input, Select};

#[derive(Parser)]
#[command(
    name = "forest_watch",
    about = "Region statistics and restoration insights for drawn forest areas"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Prompt for bind address, port and configuration file
        #[arg(long, short)]
        interactive: bool,
    },
    /// Analyze the polygons of a GeoJSON file and print a JSON report
    Analyze {
        /// GeoJSON file (Polygon, MultiPolygon, Feature or FeatureCollection)
        path: PathBuf,
        /// Only fetch statistics; do not ask the model for insights
        #[arg(long)]
        no_insights: bool,
        /// Write the report to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

/// Tools offered when no subcommand is given.
enum Tool {
    Server,
    Analyze,
}

impl Tool {
    const ALL: &[Self] = &[Self::Server, Self::Analyze];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Server => "Start server",
            Self::Analyze => "Analyze a GeoJSON file",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let command = match cli.command {
        Some(command) => command,
        None => prompt_command()?,
    };

    match command {
        Commands::Serve { interactive } => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new().block_on(async move {
                    if interactive {
                        forest_watch_server::interactive::run().await
                    } else {
                        forest_watch_server::run_server().await
                    }
                })
            })
            .await??;
        }
        Commands::Analyze {
            path,
            no_insights,
            output,
        } => {
            pretty_env_logger::init();
            let report = analyze::run(&path, no_insights).await?;
            let json = serde_json::to_string_pretty(&report)?;
            write_report(&json, output.as_deref())?;

            if let Some(error) = &report.insight_error {
                eprintln!("Insights unavailable: {error}");
            }
        }
    }

    Ok(())
}

fn prompt_command() -> Result<Commands, dialoguer::Error> {
    println!("Forest Watch");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(match Tool::ALL[idx] {
        Tool::Server => Commands::Serve { interactive: true },
        Tool::Analyze => {
            let path: String = Input::new().with_prompt("GeoJSON file").interact_text()?;
            Commands::Analyze {
                path: PathBuf::from(path),
                no_insights: false,
                output: None,
            }
        }
    })
}

fn write_report(json: &str, output: Option<&Path>) -> std::io::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            log::info!("Wrote report to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
