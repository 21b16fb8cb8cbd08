pub mod ask;
pub mod history;
pub mod ingest;
pub mod meetings;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use unicode_width::UnicodeWidthChar;

use meeting_recall::search::HtpEmbedder;
use meeting_recall::{DataPaths, RetrievalConfig, SearchEngine};

/// Open the engine on `--db` if given, else on the default data directory.
///
/// With `--db`, `config.yaml` is read from the database's directory.
pub fn open_engine(db: Option<&Path>) -> Result<SearchEngine> {
    let engine = match db {
        Some(db) => {
            let paths = db_paths(db);
            paths.ensure_root()?;
            let config = RetrievalConfig::load(&paths.config)?;
            let embedder = HtpEmbedder::new(config.embedding_dim)?;
            SearchEngine::new(db, Arc::new(embedder), config)
        }
        None => {
            let paths = DataPaths::new();
            paths.ensure_root()?;
            SearchEngine::open(&paths)
        }
    };

    engine.context("Failed to open meeting database")
}

/// Data paths rooted at the directory holding `db`.
fn db_paths(db: &Path) -> DataPaths {
    let root = db
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    DataPaths::from_root(root.to_path_buf())
}

/// Truncate to `max_width` terminal columns, appending "..." when cut.
pub fn truncate_display(text: &str, max_width: usize) -> String {
    let flat = text.replace('\n', " ");
    let mut width = 0;
    let mut out = String::new();
    for c in flat.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > max_width {
            out.push_str("...");
            return out;
        }
        width += w;
        out.push(c);
    }
    out
}
