//! Status command - database and configuration summary

use std::path::Path;

use anyhow::Result;
use colored::*;

use meeting_recall::DataPaths;

pub fn run(json: bool, db: Option<&Path>) -> Result<()> {
    let paths = DataPaths::new();
    let db_path = db.map(Path::to_path_buf).unwrap_or_else(|| paths.db.clone());

    if !db_path.exists() {
        if json {
            println!(
                "{}",
                serde_json::json!({
                    "exists": false,
                    "error": "Database not found"
                })
            );
        } else {
            println!(
                "{} Database not found. Run {} first.",
                "!".yellow().bold(),
                "recall ingest".cyan()
            );
        }
        return Ok(());
    }

    let engine = super::open_engine(Some(db_path.as_path()))?;
    let stats = engine.store().stats()?;
    let config = engine.config();

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "exists": true,
                "db_path": db_path.display().to_string(),
                "meeting_count": stats.meeting_count,
                "embedded_count": stats.embedded_count,
                "chat_count": stats.chat_count,
                "last_created": stats.last_created,
                "file_size_bytes": file_size,
                "config": config,
            })
        );
        return Ok(());
    }

    println!("{}", "Meeting Store Status".bold());
    println!();
    println!(
        "  {} {} meetings ({} with embeddings)",
        "→".dimmed(),
        stats.meeting_count.to_string().cyan(),
        stats.embedded_count.to_string().cyan()
    );
    println!(
        "  {} {} chat exchanges",
        "→".dimmed(),
        stats.chat_count.to_string().cyan()
    );
    println!(
        "  {} Size: {:.2} KB",
        "→".dimmed(),
        file_size as f64 / 1024.0
    );
    if let Some(ts) = stats.last_created {
        let dt = chrono::DateTime::from_timestamp(ts, 0)
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        println!("  {} Last meeting: {}", "→".dimmed(), dt);
    }
    println!(
        "  {} Retrieval: top_k={}, bm25 k1={} b={}",
        "→".dimmed(),
        config.top_k,
        config.bm25.k1,
        config.bm25.b
    );

    Ok(())
}
