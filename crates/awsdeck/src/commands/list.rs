use awsdeck_cloud::{InventoryAggregator, LifecycleState, ResourceRecord};
use colored::{ColoredString, Colorize};

pub async fn handle(aggregator: &InventoryAggregator, json: bool) -> anyhow::Result<()> {
    if !json {
        println!("{}", "リソース一覧を取得中...".blue());
    }

    let inventory = aggregator.refresh().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(inventory.records())?);
        return Ok(());
    }

    println!();
    if inventory.is_empty() {
        println!("{}", "リソースはありません".dimmed());
        return Ok(());
    }

    println!("{}", header().bold());
    println!("{}", "─".repeat(110).dimmed());
    for record in inventory.records() {
        println!("{}", row(record));
    }

    Ok(())
}

fn header() -> String {
    format!(
        "{:<12} {:<22} {:<24} {:<12} {:<16} {}",
        "PROVIDER", "ID", "NAME", "STATE", "ADDRESS", "TAGS"
    )
}

fn colored_state(state: LifecycleState) -> ColoredString {
    let label = format!("{:<12}", state.to_string());
    match state {
        LifecycleState::Running => label.green(),
        LifecycleState::Stopped | LifecycleState::Terminated => label.red(),
        LifecycleState::Unknown => label.dimmed(),
        _ => label.yellow(),
    }
}

fn row(record: &ResourceRecord) -> String {
    format!(
        "{:<12} {} {:<24} {} {:<16} {}",
        record.provider(),
        format!("{:<22}", record.id()).cyan(),
        record.display_name,
        colored_state(record.lifecycle_state),
        record.address_label(),
        record.display_tags().join(",").dimmed()
    )
}
