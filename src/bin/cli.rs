//! Command-line interface for the biosimulations utilities
//!
//! This binary reads models and simulation experiments, writes simulation
//! experiments, renders models with MINERVA, imports BioModels and validates
//! JSON records.
//!
//! # Usage
//!
//! ```bash
//! # Read an SBML model and save it as JSON
//! biosimulations read-model --path model.xml --output model.json
//!
//! # Read the simulations of a SED-ML document
//! biosimulations read-simulation --path simulation.sedml
//!
//! # Validate a simulation against its JSON schema
//! biosimulations validate --kind simulation --path simulation.json
//! ```

use std::error::Error;
use std::path::PathBuf;

use biosimulations_utils::prelude::*;
use biosimulations_utils::validation::schema::{validate_json, ValidationReport};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

/// Main CLI configuration struct
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Read a model and print or save its parameters and variables
    ReadModel {
        /// Path to the model file
        #[arg(short, long)]
        path: PathBuf,

        /// Format of the model
        #[arg(short, long, value_enum, default_value_t = ModelFormatArg::Sbml)]
        format: ModelFormatArg,

        /// Path to save the model to as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Read the simulations of a simulation experiment
    ReadSimulation {
        /// Path to the simulation experiment
        #[arg(short, long)]
        path: PathBuf,

        /// Path to save the simulations to as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to save the visualization to as JSON
        #[arg(long)]
        visualization: Option<PathBuf>,
    },
    /// Write a simulation, saved as JSON, as a SED-ML document
    WriteSimulation {
        /// Path to the JSON simulation
        #[arg(short, long)]
        simulation: PathBuf,

        /// File name of the model, as referenced from the document
        #[arg(short, long)]
        model_filename: String,

        /// Path of the SED-ML document to write
        #[arg(short, long)]
        output: PathBuf,

        /// SED-ML level of the document
        #[arg(long, default_value_t = 1)]
        level: u32,

        /// SED-ML version of the document
        #[arg(long, default_value_t = 3)]
        sedml_version: u32,

        /// Path to a JSON visualization whose plots are included
        #[arg(long)]
        visualization: Option<PathBuf>,
    },
    /// Render an SBML model as a PNG image with MINERVA
    Visualize {
        /// Path to the SBML model
        #[arg(short, long)]
        model: PathBuf,

        /// Path of the image to write
        #[arg(short, long)]
        image: PathBuf,

        /// Keep the layouts of the model
        #[arg(long)]
        keep_layouts: bool,

        /// Keep the unit definitions of the model
        #[arg(long)]
        keep_units: bool,
    },
    /// Import the curated models of BioModels
    ImportBiomodels {
        /// Directory where models, images and results are stored
        #[arg(short, long, default_value = "biomodels")]
        cache_dir: PathBuf,

        /// Maximum number of models to import
        #[arg(long)]
        max_models: Option<usize>,

        /// Do not render model images
        #[arg(long)]
        no_images: bool,
    },
    /// Validate a JSON record against its schema
    Validate {
        /// Kind of record
        #[arg(short, long, value_enum)]
        kind: RecordKind,

        /// Path to the JSON record
        #[arg(short, long)]
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelFormatArg {
    Sbml,
    Cellml,
    Bngl,
    Vcml,
}

impl From<ModelFormatArg> for ModelFormat {
    fn from(format: ModelFormatArg) -> Self {
        match format {
            ModelFormatArg::Sbml => ModelFormat::Sbml,
            ModelFormatArg::Cellml => ModelFormat::CellMl,
            ModelFormatArg::Bngl => ModelFormat::Bngl,
            ModelFormatArg::Vcml => ModelFormat::Vcml,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RecordKind {
    Model,
    Simulation,
    Simulator,
    Visualization,
}

/// Main entry point for the CLI application
pub fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(err) = run(cli.command) {
        eprintln!("{} {}", "Error:".bold().red(), err);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::ReadModel {
            path,
            format,
            output,
        } => {
            let model = read_model(&path, format.into())?;
            match output {
                Some(output) => save_json(output, &model)?,
                None => println!("{}", model),
            }
        }
        Commands::ReadSimulation {
            path,
            output,
            visualization,
        } => {
            let result = read_simulation(&path, ModelFormat::Sbml, SimulationFormat::SedMl)?;
            for warning in &result.warnings {
                eprintln!("{} {}", "Warning:".bold().yellow(), warning);
            }

            match output {
                Some(output) => save_json(output, &result.simulations)?,
                None => println!("{}", simulation_table(&result.simulations)),
            }
            if let (Some(path), Some(visualization)) = (visualization, &result.visualization) {
                save_json(path, visualization)?;
            }
        }
        Commands::WriteSimulation {
            simulation,
            model_filename,
            output,
            level,
            sedml_version,
            visualization,
        } => {
            let simulation: Simulation = load_json(simulation)?;
            let visualization: Option<Visualization> = visualization.map(load_json).transpose()?;
            write_simulation(
                &simulation,
                &model_filename,
                &output,
                SimulationFormat::SedMl,
                level,
                sedml_version,
                visualization.as_ref(),
            )?;
            println!("Wrote {}", output.display());
        }
        Commands::Visualize {
            model,
            image,
            keep_layouts,
            keep_units,
        } => {
            let options = RenderOptions {
                remove_layouts: !keep_layouts,
                remove_units: !keep_units,
            };
            let file = MinervaClient::new().visualize(&model, &image, options)?;
            println!(
                "Wrote {} ({} bytes)",
                image.display(),
                file.size.unwrap_or_default()
            );
        }
        Commands::ImportBiomodels {
            cache_dir,
            max_models,
            no_images,
        } => {
            let mut importer = BioModelsImporter::new(cache_dir);
            if let Some(max_models) = max_models {
                importer = importer.with_max_models(max_models);
            }
            if no_images {
                importer = importer.with_minerva(None);
            }

            let (models, stats) = importer.run()?;
            println!("Imported {} models", models.len());
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Validate { kind, path } => {
            let content = std::fs::read_to_string(&path)?;
            let report = match kind {
                RecordKind::Model => validate_json::<Model>(&content)?,
                RecordKind::Simulation => validate_json::<Simulation>(&content)?,
                RecordKind::Simulator => validate_json::<Simulator>(&content)?,
                RecordKind::Visualization => validate_json::<Visualization>(&content)?,
            };
            print_report(&report);
            if !report.valid {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_report(report: &ValidationReport) {
    if report.valid {
        println!("{}", "Document is valid".bold().green());
        return;
    }

    println!("{}", "Document is invalid".bold().red());
    for error in &report.errors {
        println!("{}", error);
    }
}
