//! Ingest command - store summary chunks and their embeddings

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use walkdir::WalkDir;

use meeting_recall::search::PutOutcome;
use meeting_recall::{MeetingId, SearchEngine};

pub struct IngestArgs {
    pub path: PathBuf,
    pub transcript: Option<PathBuf>,
    pub summary: Option<String>,
    pub meeting: Option<MeetingId>,
    pub json: bool,
}

/// Contents of one ingest file.
///
/// Either a bare JSON array of chunk strings, or an object with `chunks`
/// and optional `transcript` / `summary`.
#[derive(Debug, Default, PartialEq)]
struct MeetingFile {
    transcript: Option<String>,
    summary: Option<String>,
    chunks: Value,
}

impl MeetingFile {
    fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(match value {
            Value::Object(mut map) => Self {
                transcript: map
                    .remove("transcript")
                    .and_then(|v| v.as_str().map(String::from)),
                summary: map.remove("summary").and_then(|v| v.as_str().map(String::from)),
                chunks: map.remove("chunks").unwrap_or(Value::Null),
            },
            other => Self {
                chunks: other,
                ..Default::default()
            },
        })
    }
}

#[derive(Debug, Serialize)]
struct IngestReport {
    file: String,
    meeting_id: MeetingId,
    rows: usize,
    skipped: bool,
}

/// Run ingest command
pub fn run(args: IngestArgs, db: Option<&Path>) -> Result<()> {
    let mut engine = super::open_engine(db)?;

    let files = collect_files(&args.path)?;
    if files.is_empty() {
        anyhow::bail!("No .json chunk files found at {}", args.path.display());
    }
    if files.len() > 1 && args.meeting.is_some() {
        anyhow::bail!("--meeting can only be used with a single file");
    }

    let transcript = match &args.transcript {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read transcript {}", path.display()))?,
        ),
        None => None,
    };

    if !args.json {
        println!("{} Ingesting {} file(s)...", "→".dimmed(), files.len());
    }

    let mut reports = Vec::new();
    let mut failed = 0;

    for file in &files {
        match ingest_file(&mut engine, file, &args, transcript.as_deref()) {
            Ok(report) => reports.push(report),
            Err(e) => {
                eprintln!("{} {}: {:#}", "✗".red(), file.display(), e);
                failed += 1;
            }
        }
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "ingested": reports,
                "failed": failed,
            }))?
        );
        return Ok(());
    }

    println!();
    for report in &reports {
        if report.skipped {
            println!(
                "  {} Meeting {} ({}): no usable chunks, nothing stored",
                "!".yellow(),
                report.meeting_id.to_string().cyan(),
                report.file
            );
        } else {
            println!(
                "  {} Meeting {} ({}): {} passages embedded",
                "✓".green(),
                report.meeting_id.to_string().cyan(),
                report.file,
                report.rows
            );
        }
    }
    if failed > 0 {
        println!("  {} {} files failed", "✗".red(), failed);
    }

    Ok(())
}

fn ingest_file(
    engine: &mut SearchEngine,
    file: &Path,
    args: &IngestArgs,
    transcript: Option<&str>,
) -> Result<IngestReport> {
    let raw = std::fs::read_to_string(file)?;
    let parsed = MeetingFile::parse(&raw).context("Invalid chunk file")?;

    let transcript = transcript.map(String::from).or(parsed.transcript);

    let (meeting_id, created) = match args.meeting {
        Some(id) => (id, false),
        None => (
            engine
                .store()
                .save_transcript(transcript.as_deref().unwrap_or_default())?,
            true,
        ),
    };

    let outcome = match engine.ingest_json(meeting_id, &parsed.chunks) {
        Ok(outcome) => outcome,
        Err(e) => {
            if created {
                engine.store().delete_meeting(meeting_id)?;
            }
            return Err(e.into());
        }
    };

    // an existing meeting keeps its transcript unless a new one is given
    if let (false, Some(text)) = (created, transcript.as_deref()) {
        engine.store().update_transcript(meeting_id, text)?;
    }

    if let Some(summary) = args.summary.as_deref().or(parsed.summary.as_deref()) {
        engine.store().save_summary(meeting_id, summary)?;
    }

    let (rows, skipped) = match outcome {
        PutOutcome::Stored { rows } => (rows, false),
        PutOutcome::Skipped => (0, true),
    };

    Ok(IngestReport {
        file: file.display().to_string(),
        meeting_id,
        rows,
        skipped,
    })
}

/// A single file, or every `*.json` below a directory in path order.
fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        anyhow::bail!("Path not found: {}", path.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use meeting_recall::search::{Embedder, Error, HtpEmbedder};
    use meeting_recall::RetrievalConfig;

    struct UnavailableEmbedder;

    impl Embedder for UnavailableEmbedder {
        fn embed_batch(&self, _texts: &[&str]) -> meeting_recall::search::Result<Vec<Vec<f32>>> {
            Err(Error::Embedding("model unavailable".to_string()))
        }
    }

    fn args(path: &Path, meeting: Option<MeetingId>) -> IngestArgs {
        IngestArgs {
            path: path.to_path_buf(),
            transcript: None,
            summary: None,
            meeting,
            json: true,
        }
    }

    fn chunk_file(dir: &tempfile::TempDir) -> PathBuf {
        let file = dir.path().join("standup.json");
        std::fs::write(&file, r#"["budget approved", "launch moved"]"#).unwrap();
        file
    }

    #[test]
    fn test_failed_embedding_leaves_no_meeting() {
        let dir = tempfile::tempdir().unwrap();
        let file = chunk_file(&dir);
        let mut engine =
            SearchEngine::new_in_memory(Arc::new(UnavailableEmbedder), RetrievalConfig::default())
                .unwrap();

        let result = ingest_file(&mut engine, &file, &args(&file, None), Some("SPEAKER_00: hi"));
        assert!(result.is_err());
        assert!(engine.store().list_meetings().unwrap().is_empty());
    }

    #[test]
    fn test_existing_meeting_transcript_updated_only_when_given() {
        let dir = tempfile::tempdir().unwrap();
        let file = chunk_file(&dir);
        let mut engine = SearchEngine::new_in_memory(
            Arc::new(HtpEmbedder::new(16).unwrap()),
            RetrievalConfig::default(),
        )
        .unwrap();
        let id = engine.store().save_transcript("SPEAKER_00: old").unwrap();

        let report = ingest_file(&mut engine, &file, &args(&file, Some(id)), None).unwrap();
        assert_eq!(report.rows, 2);
        let meeting = engine.store().get_meeting(id).unwrap().unwrap();
        assert_eq!(meeting.transcript, "SPEAKER_00: old");

        ingest_file(&mut engine, &file, &args(&file, Some(id)), Some("SPEAKER_00: new")).unwrap();
        let meeting = engine.store().get_meeting(id).unwrap().unwrap();
        assert_eq!(meeting.transcript, "SPEAKER_00: new");
    }

    #[test]
    fn test_parse_bare_array() {
        let file = MeetingFile::parse(r#"["a", "b"]"#).unwrap();
        assert_eq!(file.chunks, serde_json::json!(["a", "b"]));
        assert!(file.transcript.is_none());
    }

    #[test]
    fn test_parse_object() {
        let file = MeetingFile::parse(
            r#"{"transcript": "SPEAKER_00: hi", "summary": "greeting", "chunks": ["hi"]}"#,
        )
        .unwrap();
        assert_eq!(file.transcript.as_deref(), Some("SPEAKER_00: hi"));
        assert_eq!(file.summary.as_deref(), Some("greeting"));
        assert_eq!(file.chunks, serde_json::json!(["hi"]));
    }

    #[test]
    fn test_parse_object_without_chunks() {
        let file = MeetingFile::parse(r#"{"summary": "x"}"#).unwrap();
        assert_eq!(file.chunks, Value::Null);
    }

    #[test]
    fn test_collect_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "[]").unwrap();
        std::fs::write(dir.path().join("a.json"), "[]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = collect_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }
}
