use std::path::Path;

use anyhow::Result;

use larder_core::db::Database;

use super::helpers::confirm;

pub(crate) fn cmd_check(db: &Database, path: &Path, json: bool) -> Result<()> {
    let version = db.sqlite_version()?;
    let tables = db.table_names()?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string(),
                "sqlite_version": version,
                "tables": tables,
            })
        );
    } else {
        println!("Connected to {}", path.display());
        println!("SQLite version: {version}");
        println!("Tables:");
        for table in &tables {
            println!("  - {table}");
        }
    }

    Ok(())
}

pub(crate) fn cmd_clear(db: &Database, yes: bool, json: bool) -> Result<()> {
    if !yes && !confirm("Delete ALL foods, nutrition facts, and categories?")? {
        if json {
            println!("{}", serde_json::json!({ "cleared": false }));
        } else {
            println!("Cancelled.");
        }
        return Ok(());
    }

    let summary = db.clear_all()?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "cleared": true,
                "nutrition_facts_deleted": summary.nutrition_facts_deleted,
                "foods_deleted": summary.foods_deleted,
                "categories_deleted": summary.categories_deleted,
            })
        );
    } else {
        println!("Cleared food data.\n");
        println!("  Nutrition facts: {}", summary.nutrition_facts_deleted);
        println!("  Foods:           {}", summary.foods_deleted);
        println!("  Categories:      {}", summary.categories_deleted);
    }

    Ok(())
}
