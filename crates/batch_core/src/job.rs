use std::path::{Path, PathBuf};

/// Length of the source file extension (`.html`) removed to form a job name.
pub const SOURCE_SUFFIX_LEN: usize = 5;

/// Extension of the artifact written by the fetch tool.
pub const GRAPH_EXTENSION: &str = "graphml";

/// One fetch-and-record unit. Identity is `source_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub source_path: PathBuf,
    pub target: String,
    pub output_path: PathBuf,
}

impl Job {
    /// Builds a job, deriving its output path under `output_root`.
    ///
    /// Returns `None` when no job name can be derived from `source_path`.
    pub fn new(source_path: PathBuf, target: String, output_root: &Path) -> Option<Self> {
        let output_path = output_path_for(output_root, &source_path)?;
        Some(Self {
            source_path,
            target,
            output_path,
        })
    }

    /// The derived job name, i.e. the directory holding the artifact.
    pub fn name(&self) -> Option<&str> {
        self.output_path
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
    }
}

/// File name of `source_path` with the trailing [`SOURCE_SUFFIX_LEN`] characters removed.
///
/// `None` for non-UTF-8 names and names too short to leave anything behind.
pub fn job_name(source_path: &Path) -> Option<String> {
    let file_name = source_path.file_name()?.to_str()?;
    let char_count = file_name.chars().count();
    if char_count <= SOURCE_SUFFIX_LEN {
        return None;
    }
    Some(file_name.chars().take(char_count - SOURCE_SUFFIX_LEN).collect())
}

/// `<output_root>/<job_name>/<job_name>.graphml`
pub fn output_path_for(output_root: &Path, source_path: &Path) -> Option<PathBuf> {
    let name = job_name(source_path)?;
    let file_name = format!("{name}.{GRAPH_EXTENSION}");
    Some(output_root.join(&name).join(file_name))
}
