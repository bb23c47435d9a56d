//! `quotarelay memory`: Long-term repository notes.

use crate::services::{load_config, open_repository};

pub async fn add(note: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let repository = open_repository(&config);

    let entry = repository.add_entry(note).await?;
    println!("Repository memory entry stored ({}).", entry.timestamp.to_rfc3339());

    Ok(())
}

pub async fn list(limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let repository = open_repository(&config);

    let entries = repository.latest_entries(limit).await;
    if entries.is_empty() {
        println!("Repository memory is currently empty.");
        return Ok(());
    }

    println!("Latest Repository Entries");
    for (i, entry) in entries.iter().enumerate() {
        println!("  {:>2}. [{}] {}", i + 1, entry.timestamp.to_rfc3339(), entry.content);
    }

    Ok(())
}

pub async fn forget() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let repository = open_repository(&config);

    if repository.remove_latest().await? {
        println!("Removed the latest repository memory entry.");
    } else {
        println!("Repository memory is already empty.");
    }

    Ok(())
}
