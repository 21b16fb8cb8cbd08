//! Ask command - hybrid retrieval over one meeting

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use meeting_recall::search::join_context;
use meeting_recall::MeetingId;

use super::truncate_display;

pub struct AskArgs {
    pub meeting: MeetingId,
    pub query: String,
    pub limit: Option<usize>,
    pub json: bool,
    /// Print only the joined context handed to a response generator.
    pub context: bool,
}

/// Run ask command
pub fn run(args: AskArgs, db: Option<&Path>) -> Result<()> {
    let engine = super::open_engine(db)?;
    let limit = args.limit.unwrap_or(engine.config().top_k);

    let results = engine.retrieve(&args.query, args.meeting, limit)?;

    if args.context {
        println!("{}", join_context(&results, &engine.config().context_separator));
        return Ok(());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!(
            "{} No passages found in meeting {} for: {}",
            "→".dimmed(),
            args.meeting,
            args.query.cyan()
        );
        return Ok(());
    }

    println!(
        "{} {} passages from meeting {} for: {}",
        "→".dimmed(),
        results.len(),
        args.meeting,
        args.query.cyan()
    );
    println!();

    for (i, result) in results.iter().enumerate() {
        let score_str = format!("{:.3}", result.score);
        let score_colored = if result.score > 1.0 {
            score_str.green()
        } else if result.score > 0.5 {
            score_str.yellow()
        } else {
            score_str.dimmed()
        };

        println!(
            "{}. [{}] {}",
            (i + 1).to_string().bold(),
            score_colored,
            truncate_display(&result.context, 100)
        );
    }

    Ok(())
}
