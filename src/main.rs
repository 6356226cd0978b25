//! UFC fight prediction CLI
//!
//! Imports bout history, builds temporal features, trains the win classifier
//! and predicts matchups.

use clap::{Parser, Subcommand};
use bout::{Config, Result};

#[derive(Parser)]
#[command(name = "bout")]
#[command(about = "UFC fight-winner prediction from historical bout data", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Feature matrix commands
    Features {
        #[command(subcommand)]
        action: FeatureCommands,
    },
    /// List known competitors
    Fighters {
        /// Only competitors whose name contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Train the win classifier
    Train {
        /// Fit on every labelled fight instead of holding out validation/test
        #[arg(long = "final")]
        final_fit: bool,
        /// Override number of epochs
        #[arg(long)]
        epochs: Option<usize>,
        /// Override learning rate
        #[arg(long)]
        lr: Option<f64>,
    },
    /// Predict the winner of a matchup
    Predict {
        /// First competitor
        fighter_a: String,
        /// Second competitor
        fighter_b: String,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import the raw CSV tables into the database
    Import {
        /// Directory holding the raw tables (defaults to data.raw_dir)
        #[arg(long)]
        dir: Option<String>,
        /// Clear stored fights and fighters before importing
        #[arg(long)]
        replace: bool,
    },
    /// Show database status
    Status,
}

#[derive(Subcommand)]
enum FeatureCommands {
    /// Write the feature matrix to a CSV file
    Export {
        /// Output path
        output: String,
    },
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show model information
    Info,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Import { dir, replace } => commands::data_import(&config, dir, replace),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Features { action } => match action {
            FeatureCommands::Export { output } => commands::features_export(&config, &output),
        },
        Commands::Fighters { search } => commands::fighters(&config, search),
        Commands::Train {
            final_fit,
            epochs,
            lr,
        } => commands::train(&config, final_fit, epochs, lr),
        Commands::Predict {
            fighter_a,
            fighter_b,
            format,
        } => commands::predict(&config, &fighter_a, &fighter_b, format),
        Commands::Model { action } => match action {
            ModelCommands::Info => commands::model_info(&config),
        },
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use bout::data::{Database, RawTables, RecordNormalizer};
    use bout::features::FeaturePipeline;
    use bout::model::{LogisticClassifier, LogisticConfig};
    use bout::predict::{format_prediction, Predictor};
    use bout::training::Trainer;
    use bout::FightError;
    use std::path::Path;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.raw_dir)?;
        std::fs::create_dir_all("model")?;
        println!("Created {} and model/ directories", config.data.raw_dir);

        println!("\nNext steps:");
        println!("  1. Place the raw CSV tables in {}", config.data.raw_dir);
        println!("  2. Run 'bout data import' to load them");
        println!("  3. Run 'bout train' to train the model");
        println!("  4. Run 'bout predict \"Fighter A\" \"Fighter B\"' to make predictions");

        Ok(())
    }

    pub fn data_import(config: &Config, dir: Option<String>, replace: bool) -> Result<()> {
        let dir = dir.unwrap_or_else(|| config.data.raw_dir.clone());
        println!("Loading raw tables from {}...", dir);
        let tables = RawTables::load_dir(&dir)?;

        let history = RecordNormalizer::new(config.features.require_attributes).normalize(&tables)?;
        println!(
            "Normalized {} fights and {} competitor profiles",
            history.records.len(),
            history.profiles.len()
        );

        let db = Database::open(&config.data.database_path)?;
        let (fighters, fights) = if replace {
            println!("Replacing stored history");
            db.replace_all(&history.profiles, &history.records)?
        } else {
            (
                db.upsert_fighters(&history.profiles)?,
                db.upsert_fights(&history.records)?,
            )
        };
        println!("Stored {} fighters and {} fights in database", fighters, fights);

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", config.data.database_path);
        println!("  Fighters: {}", stats.fighter_count);
        println!("  Fights:   {}", stats.fight_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_fight, stats.latest_fight) {
            println!("  Range:    {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn features_export(config: &Config, output: &str) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let matrix = FeaturePipeline::standard().run(db.get_all_fights()?, None)?;
        matrix.write_csv(output)?;
        println!(
            "Wrote {} rows x {} features to {}",
            matrix.len(),
            matrix.column_names().len(),
            output
        );
        Ok(())
    }

    pub fn fighters(config: &Config, search: Option<String>) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        match search {
            Some(text) => {
                let profiles = db.search_fighters(&text)?;
                println!("{:<30} {:>7} {:>7} {:>7}  Stance", "Name", "Height", "Weight", "Reach");
                for profile in &profiles {
                    let attrs = &profile.attributes;
                    let show = |v: Option<f64>| v.map_or("-".to_string(), |v| format!("{:.0}", v));
                    println!(
                        "{:<30} {:>7} {:>7} {:>7}  {}",
                        profile.name,
                        show(attrs.height),
                        show(attrs.weight),
                        show(attrs.reach),
                        attrs.stance.as_deref().unwrap_or("-")
                    );
                }
                println!("\n{} match(es)", profiles.len());
            }
            None => {
                let names = db.get_competitor_names()?;
                for name in &names {
                    println!("{}", name);
                }
                println!("\n{} competitors", names.len());
            }
        }
        Ok(())
    }

    pub fn train(
        config: &Config,
        final_fit: bool,
        epochs: Option<usize>,
        lr: Option<f64>,
    ) -> Result<()> {
        let mut training = config.training.clone();
        if let Some(e) = epochs {
            training.epochs = e;
        }
        if let Some(lr) = lr {
            training.learning_rate = lr;
        }

        let db = Database::open(&config.data.database_path)?;
        let records = db.get_all_fights()?;
        if records.is_empty() {
            return Err(FightError::Config(
                "No fights in database. Run 'bout data import' first.".to_string(),
            ));
        }
        println!("Loaded {} fights from database", records.len());

        let matrix = FeaturePipeline::standard().run(records, None)?;
        let mut model = LogisticClassifier::new(LogisticConfig::from(&training));
        model.set_vocabulary(matrix.vocabulary().clone());

        let trainer = Trainer::new(training);
        println!("\nStarting training...\n");
        let report = if final_fit {
            trainer.train_final(&matrix, &mut model)?
        } else {
            trainer.train(&matrix, &mut model)?
        };

        println!("\nSaving model to {}...", config.data.model_path);
        model.save(Path::new(&config.data.model_path))?;

        println!("\nTraining complete!");
        print!("{}", report);
        if report.validation.is_some() {
            println!("  Best epoch:     {}", report.history.best_epoch + 1);
            println!("  Best val loss:  {:.4}", report.history.best_val_loss);
        }

        Ok(())
    }

    pub fn predict(
        config: &Config,
        fighter_a: &str,
        fighter_b: &str,
        format: OutputFormat,
    ) -> Result<()> {
        let predictor = Predictor::open(config)?;
        let prediction = predictor.predict(fighter_a, fighter_b)?;

        match format {
            OutputFormat::Table => {
                print!("{}", format_prediction(&prediction));
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            }
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(std::io::stdout());
                writer.serialize(&prediction)?;
                writer.flush()?;
            }
        }

        Ok(())
    }

    pub fn model_info(config: &Config) -> Result<()> {
        let model = LogisticClassifier::load(
            Path::new(&config.data.model_path),
            LogisticConfig::from(&config.training),
        )?;
        let metadata = model.metadata().ok_or(FightError::NoModel)?;

        println!("Model Information");
        println!("───────────────────────────────");
        println!("  Path:           {}", config.data.model_path);
        println!("  Features:       {}", metadata.feature_names.len());
        if let Some(vocabulary) = &metadata.vocabulary {
            use bout::features::CategoryFamily;
            for family in CategoryFamily::ALL {
                println!(
                    "  {:<15} {} categories",
                    format!("{}:", family.column()),
                    vocabulary.categories(family).len()
                );
            }
        }

        Ok(())
    }
}
