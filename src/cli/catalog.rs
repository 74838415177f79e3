use crate::services::catalog;
use anyhow::Result;

pub fn run(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&catalog::export())?);
        return Ok(());
    }

    println!("Event catalog v{}\n", catalog::CATALOG_VERSION);
    for category in catalog::categories() {
        println!("{}", category.name);
        for event in category.events {
            println!("  {:<28} {}", event.value, event.label);
        }
        println!();
    }
    Ok(())
}
