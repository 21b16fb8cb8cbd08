//! Meeting listing, details and deletion

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use meeting_recall::search::Passages;
use meeting_recall::MeetingId;

use super::truncate_display;

pub fn list(json: bool, db: Option<&Path>) -> Result<()> {
    let engine = super::open_engine(db)?;
    let meetings = engine.store().list_meetings()?;

    if json {
        let items: Vec<_> = meetings
            .iter()
            .map(|m| serde_json::json!({ "id": m.id, "name": m.name() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if meetings.is_empty() {
        println!(
            "{} No meetings yet. Run {} first.",
            "!".yellow().bold(),
            "recall ingest".cyan()
        );
        return Ok(());
    }

    println!("{}", "Meetings".bold());
    println!();
    for meeting in &meetings {
        let created = chrono::DateTime::from_timestamp(meeting.created_at, 0)
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        println!(
            "  {} {}  {}",
            meeting.id.to_string().cyan(),
            created.dimmed(),
            meeting
                .summary
                .as_deref()
                .map(|s| truncate_display(s, 70))
                .unwrap_or_default()
        );
    }

    Ok(())
}

pub fn show(meeting_id: MeetingId, json: bool, db: Option<&Path>) -> Result<()> {
    let engine = super::open_engine(db)?;
    let store = engine.store();

    let Some(meeting) = store.get_meeting(meeting_id)? else {
        if json {
            println!("{}", serde_json::json!({ "error": "Meeting not found" }));
        } else {
            println!("{} Meeting {} not found", "!".yellow().bold(), meeting_id);
        }
        return Ok(());
    };

    let passages = match store.get_passages(meeting_id)? {
        Some(Passages::Valid(p)) => p,
        _ => Vec::new(),
    };
    let rows = store.get_embeddings(meeting_id)?.map(|m| m.rows());

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "transcript": meeting.transcript,
                "summary": meeting.summary,
                "passages": passages,
                "embedding_rows": rows,
            }))?
        );
        return Ok(());
    }

    println!("{}", meeting.name().bold());
    println!();
    if let Some(summary) = &meeting.summary {
        println!("{}", "Summary".bold());
        println!("{}", summary);
        println!();
    }
    println!(
        "  {} {} passages, {} embedding rows",
        "→".dimmed(),
        passages.len().to_string().cyan(),
        rows.map(|r| r.to_string()).unwrap_or_else(|| "no".to_string())
    );
    println!();
    println!("{}", "Transcript".bold());
    println!("{}", meeting.transcript);

    Ok(())
}

pub fn delete(meeting_id: MeetingId, json: bool, db: Option<&Path>) -> Result<()> {
    let engine = super::open_engine(db)?;
    let deleted = engine.store().delete_meeting(meeting_id)?;

    if json {
        println!("{}", serde_json::json!({ "meeting_id": meeting_id, "deleted": deleted }));
    } else if deleted {
        println!(
            "{} Meeting {} and all related data deleted",
            "✓".green().bold(),
            meeting_id
        );
    } else {
        println!("{} Meeting {} not found", "!".yellow().bold(), meeting_id);
    }

    Ok(())
}
