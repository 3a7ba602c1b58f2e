use anyhow::Result;

use larder_core::config::{DuplicatePolicy, Preset, Settings};
use larder_core::db::SqliteConnector;
use larder_core::import::Importer;

use super::helpers::{print_import_table, prompt_preset};
use crate::config::Config;
use crate::usda::UsdaClient;

pub(crate) struct ImportOptions {
    pub preset: Option<Preset>,
    pub terms: Vec<String>,
    pub max_per_category: Option<usize>,
    pub skip_existing: bool,
}

/// Explicit terms win over a preset, a preset over configured terms; with
/// none of them the user picks a preset interactively.
fn resolve_settings(base: &Settings, opts: ImportOptions) -> Result<Settings> {
    let mut settings = base.clone();

    if !opts.terms.is_empty() {
        settings.import.search_terms = opts.terms;
    } else if let Some(preset) = opts.preset {
        settings.import.apply_preset(preset);
    } else if settings.import.search_terms.is_empty() {
        settings.import.apply_preset(prompt_preset()?);
    }

    if let Some(max) = opts.max_per_category {
        settings.import.max_per_category = max;
    }
    if opts.skip_existing {
        settings.import.duplicates = DuplicatePolicy::SkipExisting;
    }
    Ok(settings)
}

pub(crate) fn cmd_import(config: &Config, opts: ImportOptions, json: bool) -> Result<()> {
    let settings = resolve_settings(&config.settings, opts)?;
    let client = UsdaClient::new(&settings.source)?;
    let connector = SqliteConnector::new(&config.db_path).with_busy_timeout(config.busy_timeout);
    let importer = Importer::new(settings, client, connector);

    let summary = importer.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_import_table(&summary);
        println!("\nTotal imported: {}", summary.total_imported);
        println!(
            "Commits: {}  Reconnects: {}  Lost writes: {}",
            summary.commits, summary.reconnects, summary.lost_writes
        );
        println!("Run: {}", summary.run_id);
    }

    if let Some(reason) = &summary.aborted {
        eprintln!("Import stopped early: {reason}");
    }

    Ok(())
}
