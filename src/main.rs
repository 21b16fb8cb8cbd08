mod commands;
#[cfg(feature = "mcp")]
mod mcp;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use meeting_recall::MeetingId;

#[derive(Parser)]
#[command(name = "recall")]
#[command(about = "Ask questions about recorded meetings with hybrid retrieval", long_about = None)]
#[command(version)]
struct Cli {
    /// Database file (default: $RECALL_HOME/meetings.db or ./.recall/meetings.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store summary chunks and their embeddings
    Ingest {
        /// JSON chunk file, or a directory of them
        path: PathBuf,
        #[arg(long, help = "Raw transcript text file")]
        transcript: Option<PathBuf>,
        #[arg(long, help = "Meeting summary")]
        summary: Option<String>,
        #[arg(long, help = "Replace passages of an existing meeting id")]
        meeting: Option<MeetingId>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Retrieve the passages of a meeting most relevant to a question
    Ask {
        meeting: MeetingId,
        query: String,
        #[arg(long, short, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
        #[arg(long, help = "Print only the joined context")]
        context: bool,
    },
    /// List meetings
    Meetings {
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Show transcript, summary and passage count of a meeting
    Show {
        meeting: MeetingId,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Delete a meeting with its embeddings and chat history
    Delete {
        meeting: MeetingId,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Show the chat history of a meeting
    History {
        meeting: MeetingId,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Show database status
    Status {
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    // ===== MCP Server =====
    /// Start MCP server
    #[cfg(feature = "mcp")]
    Mcp {
        #[arg(long, help = "Show MCP client configuration instructions")]
        install: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = cli.db.as_deref();

    match cli.command {
        Commands::Ingest {
            path,
            transcript,
            summary,
            meeting,
            json,
        } => commands::ingest::run(
            commands::ingest::IngestArgs {
                path,
                transcript,
                summary,
                meeting,
                json,
            },
            db,
        ),
        Commands::Ask {
            meeting,
            query,
            limit,
            json,
            context,
        } => commands::ask::run(
            commands::ask::AskArgs {
                meeting,
                query,
                limit,
                json,
                context,
            },
            db,
        ),
        Commands::Meetings { json } => commands::meetings::list(json, db),
        Commands::Show { meeting, json } => commands::meetings::show(meeting, json, db),
        Commands::Delete { meeting, json } => commands::meetings::delete(meeting, json, db),
        Commands::History { meeting, json } => commands::history::run(meeting, json, db),
        Commands::Status { json } => commands::status::run(json, db),

        // MCP Server
        #[cfg(feature = "mcp")]
        Commands::Mcp { install } => {
            let db_path = db
                .map(PathBuf::from)
                .unwrap_or_else(|| meeting_recall::DataPaths::new().db);
            if install {
                print_mcp_install_instructions(&db_path);
                Ok(())
            } else {
                run_mcp_server(db_path)
            }
        }
    }
}

#[cfg(feature = "mcp")]
fn run_mcp_server(db_path: PathBuf) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(mcp::run_mcp_server(db_path))
}

#[cfg(feature = "mcp")]
fn print_mcp_install_instructions(db_path: &std::path::Path) {
    use colored::Colorize;

    let binary_path = std::env::current_exe()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "recall".to_string());

    println!("{}", "MCP Server Installation Guide".bold().cyan());
    println!();
    println!("Add the following to your MCP client configuration:");
    println!();
    println!(r#"{{
  "mcpServers": {{
    "meeting-recall": {{
      "command": "{}",
      "args": ["--db", "{}", "mcp"]
    }}
  }}
}}"#, binary_path, db_path.display());
    println!();
    println!("{}", "Available tools:".bold());
    println!("  • {} - Hybrid retrieval over one meeting", "meeting_retrieve".green());
    println!("  • {} - List recorded meetings", "meeting_list".green());
    println!("  • {} - Get transcript and summary", "meeting_get".green());
    println!("  • {} - Get previous questions and answers", "meeting_chat_history".green());
    println!("  • {} - Record a question and its answer", "meeting_record_chat".green());
}
