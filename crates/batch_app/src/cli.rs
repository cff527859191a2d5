use std::num::{NonZeroU64, NonZeroUsize};
use std::path::PathBuf;

use clap::Parser;

/// Crawl every page listed in a mapping file through an external page-graph
/// crawler, spread over parallel workers with one local proxy port each.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "pagegraph-batch")]
#[command(about = "Batch page-graph crawls over per-worker proxies", long_about = None)]
pub struct CliOptions {
    /// Path to the browser executable.
    #[arg(short = 'b', value_name = "PATH")]
    pub browser_path: PathBuf,

    /// Directory receiving one `<name>/<name>.graphml` per job.
    #[arg(short = 'o', value_name = "DIR")]
    pub output_root: PathBuf,

    /// Number of parallel workers (1-999), one proxy port each.
    #[arg(short = 'j', value_name = "N")]
    pub workers: NonZeroUsize,

    /// Per-job timeout in seconds.
    #[arg(short = 't', value_name = "SECS")]
    pub timeout_secs: NonZeroU64,

    /// Lines of `source_html_path,target_url`.
    #[arg(long = "map-local-file", value_name = "PATH")]
    pub mapping_file: PathBuf,

    /// RON file overriding the fetch command, markers and proxy.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Abort on malformed mapping lines instead of skipping them.
    #[arg(long)]
    pub strict: bool,

    /// Also write the log to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    const REQUIRED: &[&str] = &[
        "pagegraph-batch",
        "-b",
        "/opt/brave",
        "-o",
        "/data/out",
        "-j",
        "8",
        "-t",
        "120",
        "--map-local-file",
        "/data/map.csv",
    ];

    fn with(extra: &[&str]) -> Vec<String> {
        REQUIRED
            .iter()
            .chain(extra)
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn parses_required_flags() {
        let options = CliOptions::try_parse_from(REQUIRED).unwrap();
        assert_eq!(options.browser_path, PathBuf::from("/opt/brave"));
        assert_eq!(options.output_root, PathBuf::from("/data/out"));
        assert_eq!(options.workers.get(), 8);
        assert_eq!(options.timeout_secs.get(), 120);
        assert_eq!(options.mapping_file, PathBuf::from("/data/map.csv"));
        assert!(!options.strict);
        assert_eq!(options.config, None);
        assert_eq!(options.log_file, None);
    }

    #[test]
    fn parses_optional_flags() {
        let raw = with(&["--strict", "--config", "batch.ron", "--log-file", "run.log"]);
        let options = CliOptions::try_parse_from(raw).unwrap();
        assert!(options.strict);
        assert_eq!(options.config, Some(PathBuf::from("batch.ron")));
        assert_eq!(options.log_file, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn zero_or_garbage_counts_are_rejected() {
        for (flag, bad) in [("-j", "0"), ("-j", "many"), ("-t", "0"), ("-t", "soon")] {
            let mut raw = with(&[]);
            let pos = raw.iter().position(|a| a == flag).unwrap();
            raw[pos + 1] = bad.to_string();
            let err = CliOptions::try_parse_from(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValueValidation, "{flag} {bad}");
        }
    }

    #[test]
    fn missing_required_flag_is_reported() {
        let err = CliOptions::try_parse_from(&REQUIRED[..9]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert!(err.to_string().contains("--map-local-file"));
    }

    #[test]
    fn unknown_flag_is_reported() {
        let err = CliOptions::try_parse_from(with(&["--verbose"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn help_short_circuits() {
        let err = CliOptions::try_parse_from(["pagegraph-batch", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        CliOptions::command().debug_assert();
    }
}
