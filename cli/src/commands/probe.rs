use anyhow::{Result, bail};

use larder_core::config::BrandSource;
use larder_core::usda::parse_food_details;

use super::helpers::print_nutrition_table;
use crate::usda::UsdaClient;

pub(crate) fn cmd_probe(client: &UsdaClient, query: &str, page_size: u32) -> Result<()> {
    let raw = client.probe(query, page_size)?;
    println!("{}", serde_json::to_string_pretty(&raw)?);
    Ok(())
}

pub(crate) fn cmd_lookup(
    client: &UsdaClient,
    fdc_id: i64,
    brand_source: BrandSource,
    json: bool,
) -> Result<()> {
    let Some(details) = client.food_details(fdc_id)? else {
        bail!("No food found with FDC id {fdc_id}");
    };
    let food = parse_food_details(&details, brand_source);

    if json {
        println!("{}", serde_json::to_string_pretty(&food)?);
    } else {
        println!("{} (FDC {fdc_id})", food.name);
        if let Some(brand) = &food.brand {
            println!("Brand: {brand}");
        }
        if let Some(data_type) = &details.data_type {
            println!("Data type: {data_type}");
        }
        println!();
        print_nutrition_table(&food.nutrition);
    }

    Ok(())
}
