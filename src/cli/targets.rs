use super::ui;
use crate::core::taxonomy::AllocationTree;
use anyhow::Result;
use comfy_table::Cell;
use std::collections::HashMap;

/// Target weights grouped by asset class, with effective portfolio weights.
pub fn render_targets_table(allocation: &AllocationTree) -> Result<String> {
    let rows = allocation.to_rows()?;
    let class_weights: HashMap<String, f64> = allocation.asset_class_weights().into_iter().collect();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Category"),
        ui::header_cell("Ticker"),
        ui::header_cell("Weight"),
    ]);

    let root_name = allocation.root().name();
    let mut current_category: Option<&str> = None;
    for row in &rows {
        // A leaf directly under the root is its own asset class
        if row.category == root_name {
            current_category = None;
            table.add_row(vec![
                Cell::new(&row.ticker),
                Cell::new(ui::style_text(&row.ticker, ui::StyleType::Subtle)),
                ui::fraction_cell(row.weight),
            ]);
            continue;
        }
        if current_category != Some(row.category.as_str()) {
            current_category = Some(row.category.as_str());
            if let Some(&class_weight) = class_weights.get(&row.category) {
                table.add_row(vec![
                    Cell::new(&row.category),
                    Cell::new(""),
                    ui::fraction_cell(class_weight),
                ]);
            }
        }
        table.add_row(vec![
            Cell::new(""),
            Cell::new(ui::style_text(&row.ticker, ui::StyleType::Subtle)),
            ui::fraction_cell(row.weight),
        ]);
    }

    Ok(format!(
        "Target allocation: {}\n\n{table}",
        ui::style_text(allocation.root().name(), ui::StyleType::Title)
    ))
}

pub fn run(allocation: &AllocationTree) -> Result<()> {
    println!("{}", render_targets_table(allocation)?);
    Ok(())
}
