use anyhow::{Context, Result, bail};
use std::io::{self, BufRead, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use larder_core::config::Preset;
use larder_core::import::ImportSummary;
use larder_core::models::{Category, DatabaseStats};
use larder_core::nutrients::{Nutrient, NutrientMap};

fn read_line(message: &str) -> Result<String> {
    eprint!("{message}");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(line.trim().to_string())
}

pub(crate) fn prompt_preset() -> Result<Preset> {
    eprintln!("Choose an import:");
    eprintln!("  1. Quick  (10 popular foods, up to 500 each)");
    eprintln!("  2. Full   (14 categories, up to 1000 each)");
    let line = read_line("\nEnter 1 or 2: ")?;
    parse_preset_choice(&line)
}

pub(crate) fn parse_preset_choice(input: &str) -> Result<Preset> {
    match input.trim() {
        "1" => Ok(Preset::Quick),
        "2" => Ok(Preset::Full),
        other => bail!("Invalid choice '{other}'. Enter 1 or 2"),
    }
}

pub(crate) fn confirm(message: &str) -> Result<bool> {
    let line = read_line(&format!("{message} [y/N]: "))?;
    Ok(is_yes(&line))
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub(crate) fn print_import_table(summary: &ImportSummary) {
    #[derive(Tabled)]
    struct CategoryRow {
        #[tabled(rename = "Category")]
        name: String,
        #[tabled(rename = "Found")]
        found: usize,
        #[tabled(rename = "Imported")]
        imported: usize,
        #[tabled(rename = "Skipped")]
        skipped: usize,
        #[tabled(rename = "Failed")]
        failed: usize,
        #[tabled(rename = "No nutrition")]
        nutrition_missing: usize,
    }

    let rows: Vec<CategoryRow> = summary
        .categories
        .iter()
        .map(|c| CategoryRow {
            name: truncate(&c.name, 30),
            found: c.found,
            imported: c.imported,
            skipped: c.skipped_duplicates,
            failed: c.failed,
            nutrition_missing: c.nutrition_missing,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_stats(stats: &DatabaseStats) {
    #[derive(Tabled)]
    struct CategoryRow {
        #[tabled(rename = "Category")]
        name: String,
        #[tabled(rename = "Foods")]
        foods: i64,
    }

    #[derive(Tabled)]
    struct SampleRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Brand")]
        brand: String,
    }

    println!("Foods:           {}", stats.food_count);
    println!("Nutrition facts: {}", stats.nutrition_count);

    if !stats.categories.is_empty() {
        let rows: Vec<CategoryRow> = stats
            .categories
            .iter()
            .map(|c| CategoryRow {
                name: c.name.clone(),
                foods: c.food_count,
            })
            .collect();
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::single(1)).with(Alignment::right()))
            .to_string();
        println!("\n{table}");
    }

    if !stats.samples.is_empty() {
        let rows: Vec<SampleRow> = stats
            .samples
            .iter()
            .map(|s| SampleRow {
                id: s.food_id,
                name: truncate(&s.name, 40),
                brand: s
                    .brand
                    .as_deref()
                    .map(|b| truncate(b, 20))
                    .unwrap_or_default(),
            })
            .collect();
        let table = Table::new(&rows).with(Style::rounded()).to_string();
        println!("\nSample foods:\n{table}");
    }
}

pub(crate) fn print_nutrition_table(nutrition: &NutrientMap) {
    #[derive(Tabled)]
    struct NutrientRow {
        #[tabled(rename = "Nutrient")]
        name: &'static str,
        #[tabled(rename = "Column")]
        column: &'static str,
        #[tabled(rename = "Per 100g")]
        value: String,
    }

    let rows: Vec<NutrientRow> = Nutrient::ALL
        .iter()
        .map(|n| NutrientRow {
            name: n.name(),
            column: n.column(),
            value: nutrition
                .get(n)
                .map_or("-".into(), |v| format!("{:.2}", no_neg_zero(*v))),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_category_table(categories: &[Category]) {
    #[derive(Tabled)]
    struct CategoryRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Description")]
        description: String,
    }

    let rows: Vec<CategoryRow> = categories
        .iter()
        .map(|c| CategoryRow {
            id: c.category_id,
            name: c.name.clone(),
            description: c
                .description
                .as_deref()
                .map(|d| truncate(d, 50))
                .unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s
            .char_indices()
            .nth(max.saturating_sub(3))
            .map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
