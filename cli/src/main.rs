mod commands;
mod config;
mod usda;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_categories, cmd_check, cmd_clear, cmd_import, cmd_lookup, cmd_probe, cmd_show, cmd_stats,
};
use crate::config::Config;
use crate::usda::UsdaClient;
use larder_core::config::Preset;
use larder_core::db::Database;

#[derive(Parser)]
#[command(
    name = "larder",
    version,
    about = "Import USDA FoodData Central foods into a local nutrition database"
)]
struct Cli {
    /// Path to a larder.toml config file (default: platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Path to the SQLite database (overrides config)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import foods from FoodData Central
    Import {
        /// Import preset; prompts when neither a preset nor terms are given
        preset: Option<PresetArg>,
        /// Search term to import as its own category (repeatable)
        #[arg(short, long = "term", value_name = "TERM")]
        terms: Vec<String>,
        /// Maximum foods imported per category
        #[arg(long)]
        max_per_category: Option<usize>,
        /// Skip foods whose FDC id is already stored
        #[arg(long)]
        skip_existing: bool,
        /// Output the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show food, nutrition, and category counts
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List food categories
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one stored food with its nutrition facts
    Show {
        /// Local food id (see `stats` or `categories`)
        food_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check the database connection and schema
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete all imported foods, nutrition facts, and categories
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one raw FoodData Central search page
    Probe {
        /// Search query
        query: String,
        /// Number of results to request
        #[arg(long, default_value = "5")]
        page_size: u32,
    },
    /// Show the mapped nutrition of one FoodData Central item
    Lookup {
        /// FDC id of the food
        fdc_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    /// Ten popular foods, up to 500 each
    Quick,
    /// Fourteen categories, up to 1000 each
    Full,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Quick => Preset::Quick,
            PresetArg::Full => Preset::Full,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref(), cli.db)?;

    match cli.command {
        Commands::Import {
            preset,
            terms,
            max_per_category,
            skip_existing,
            json,
        } => cmd_import(
            &config,
            commands::ImportOptions {
                preset: preset.map(Preset::from),
                terms,
                max_per_category,
                skip_existing,
            },
            json,
        ),
        Commands::Stats { json } => {
            let db = Database::open(&config.db_path)?;
            cmd_stats(&db, json)
        }
        Commands::Categories { json } => {
            let db = Database::open(&config.db_path)?;
            cmd_categories(&db, json)
        }
        Commands::Show { food_id, json } => {
            let db = Database::open(&config.db_path)?;
            cmd_show(&db, food_id, json)
        }
        Commands::Check { json } => {
            let db = Database::open(&config.db_path)?;
            cmd_check(&db, &config.db_path, json)
        }
        Commands::Clear { yes, json } => {
            let db = Database::open(&config.db_path)?;
            cmd_clear(&db, yes, json)
        }
        Commands::Probe { query, page_size } => {
            let client = UsdaClient::new(&config.settings.source)?;
            cmd_probe(&client, &query, page_size)
        }
        Commands::Lookup { fdc_id, json } => {
            let client = UsdaClient::new(&config.settings.source)?;
            cmd_lookup(&client, fdc_id, config.settings.source.brand, json)
        }
    }
}
