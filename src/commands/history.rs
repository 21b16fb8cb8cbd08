use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use meeting_recall::MeetingId;

pub fn run(meeting_id: MeetingId, json: bool, db: Option<&Path>) -> Result<()> {
    let engine = super::open_engine(db)?;
    let history = engine.store().chat_history(meeting_id)?;

    if json {
        let items: Vec<_> = history
            .iter()
            .map(|e| serde_json::json!({ "user": e.user, "bot": e.bot }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if history.is_empty() {
        println!("{} No chat history for meeting {}", "→".dimmed(), meeting_id);
        return Ok(());
    }

    for entry in &history {
        println!("{} {}", "you:".cyan().bold(), entry.user);
        println!("{} {}", "bot:".green().bold(), entry.bot);
        println!();
    }

    Ok(())
}
