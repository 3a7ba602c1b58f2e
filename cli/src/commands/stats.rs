use anyhow::Result;

use larder_core::db::Database;

use super::helpers::print_stats;

pub(crate) fn cmd_stats(db: &Database, json: bool) -> Result<()> {
    let stats = db.stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else if stats.food_count == 0 && stats.categories.is_empty() {
        println!("The database is empty. Run `larder import` to load foods.");
    } else {
        print_stats(&stats);
    }

    Ok(())
}
