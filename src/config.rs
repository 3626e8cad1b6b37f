use std::path::PathBuf;

/// Where a [crate::Database] keeps its table files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("data")
    }
}
