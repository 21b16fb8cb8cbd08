use std::path::PathBuf;

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "RECALL_HOME";

const DATA_DIR: &str = ".recall";

pub struct DataPaths {
    pub root: PathBuf,
    pub db: PathBuf,
    pub config: PathBuf,
}

impl DataPaths {
    /// Resolve from `$RECALL_HOME`, falling back to `./.recall`.
    pub fn new() -> Self {
        match std::env::var_os(HOME_ENV) {
            Some(home) if !home.is_empty() => Self::from_root(PathBuf::from(home)),
            _ => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                Self::from_root(cwd.join(DATA_DIR))
            }
        }
    }

    pub fn from_root(root: PathBuf) -> Self {
        Self {
            db: root.join("meetings.db"),
            config: root.join("config.yaml"),
            root,
        }
    }

    /// Create the data directory if it does not exist yet.
    pub fn ensure_root(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_root() {
        let paths = DataPaths::from_root(PathBuf::from("/tmp/recall"));
        assert_eq!(paths.db, PathBuf::from("/tmp/recall/meetings.db"));
        assert_eq!(paths.config, PathBuf::from("/tmp/recall/config.yaml"));
    }
}
