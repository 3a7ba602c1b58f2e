use anyhow::Result;

use larder_core::db::Database;

use super::helpers::{print_category_table, print_nutrition_table};

pub(crate) fn cmd_categories(db: &Database, json: bool) -> Result<()> {
    let categories = db.list_categories()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
    } else if categories.is_empty() {
        println!("No categories yet. Run `larder import` to load foods.");
    } else {
        print_category_table(&categories);
    }

    Ok(())
}

pub(crate) fn cmd_show(db: &Database, food_id: i64, json: bool) -> Result<()> {
    let food = db.get_food(food_id)?;
    let category = db.get_category(food.category_id)?;
    let nutrition = db.get_nutrition(food_id)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "food": food,
                "category": category,
                "nutrition": nutrition,
            }))?
        );
        return Ok(());
    }

    println!("{} (id: {})", food.name, food.food_id);
    if let Some(brand) = &food.brand {
        println!("Brand:    {brand}");
    }
    println!("Category: {}", category.name);
    if let Some(fdc_id) = food.fdc_id {
        println!("FDC id:   {fdc_id}");
    }
    println!("Serving:  {} ({} g)", food.serving_size, food.serving_weight_g);
    println!("Source:   {}", food.data_source);
    if let Some(run) = &food.import_run {
        println!("Run:      {run}");
    }
    println!();

    match nutrition {
        Some(facts) => print_nutrition_table(&facts.values),
        None => println!("No nutrition facts recorded."),
    }

    Ok(())
}
