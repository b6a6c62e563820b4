use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use std::path::Path;

use bastion_core::modules::config::load_config;
use bastion_types::{ApiDefinition, GatewayConfig};

pub fn validate(path: &Path, json: bool) -> Result<()> {
    let config = load_config(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("Configuration OK: {}", path.display());
    println!("Listening on {}\n", config.bind_address());
    println!("{}", api_table(&config));
    Ok(())
}

fn failover_cell(api: &ApiDefinition) -> Cell {
    let failover = &api.failover;
    if failover.enabled {
        Cell::new(format!(
            "{} retries, slow {}ms, open after {} ({})",
            failover.max_retries,
            failover.slow_call_duration_ms,
            failover.max_failures,
            failover.slow_call_mode
        ))
        .fg(Color::Green)
    } else {
        Cell::new("disabled").fg(Color::Yellow)
    }
}

fn api_table(config: &GatewayConfig) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["API", "Context path", "Type", "Groups", "Endpoints", "Routes", "Failover"]);

    for api in &config.apis {
        table.add_row(vec![
            Cell::new(&api.id),
            Cell::new(&api.context_path),
            Cell::new(api.kind),
            Cell::new(api.endpoint_groups.len()),
            Cell::new(api.endpoint_count()),
            Cell::new(api.routing.len()),
            failover_cell(api),
        ]);
    }
    table
}
