use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use droidscope_logs::{KeywordFilter, LogLevel};

use crate::Args;

const DEFAULT_ADB: &str = "adb";
const DEFAULT_BUFFER_SIZE: usize = 5000;
const DEFAULT_PID_REFRESH_MS: u64 = 1000;

/// Contents of the optional TOML config file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub adb: Option<String>,
    pub serial: Option<String>,
    pub buffer_size: Option<usize>,
    pub pid_refresh_ms: Option<u64>,
    pub auto_start: Option<bool>,
    pub skip_prefixes: Option<Vec<String>>,
    #[serde(rename = "pane")]
    pub panes: Vec<PaneConfig>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// One `[[pane]]` entry
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaneConfig {
    /// Border title; defaults to the keyword
    pub title: Option<String>,
    pub keyword: String,
    #[serde(default)]
    pub regex: bool,
    #[serde(default)]
    pub case_insensitive: bool,
    /// Severity floor as a logcat level letter
    pub min_level: Option<String>,
    /// Show records that do not match
    #[serde(default)]
    pub invert: bool,
}

impl PaneConfig {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            title: None,
            keyword: keyword.into(),
            regex: false,
            case_insensitive: false,
            min_level: None,
            invert: false,
        }
    }

    fn titled(title: &str, keyword: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::keyword(keyword)
        }
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.keyword)
    }

    /// Build the pane's record filter
    pub fn filter(&self) -> Result<KeywordFilter> {
        let filter = if self.regex {
            KeywordFilter::regex(&self.keyword, self.case_insensitive)
                .with_context(|| format!("Invalid regex for pane '{}'", self.title()))?
        } else if self.case_insensitive {
            KeywordFilter::keyword_case_insensitive(&self.keyword)
        } else {
            KeywordFilter::keyword(&self.keyword)
        };
        let filter = if self.invert { filter.inverted() } else { filter };

        match self.min_level.as_deref() {
            None => Ok(filter),
            Some(code) => match LogLevel::from_code(code) {
                LogLevel::Unknown => {
                    bail!("Invalid min_level '{}' for pane '{}'", code, self.title())
                }
                level => Ok(filter.with_min_level(level)),
            },
        }
    }
}

/// Panes shown when neither the command line nor the config file names any
pub fn default_panes() -> Vec<PaneConfig> {
    vec![
        PaneConfig::titled("mm-camera", "mm-camera"),
        PaneConfig::titled("MiuiGallery", "MiuiGallery2_TileView"),
    ]
}

/// Effective settings after merging CLI, config file and defaults
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub adb: String,
    pub serial: Option<String>,
    pub buffer_size: usize,
    pub pid_refresh: Duration,
    pub auto_start: bool,
    pub skip_prefixes: Vec<String>,
    pub panes: Vec<PaneConfig>,
}

impl Settings {
    /// Load the config file named by `--config` (if any) and merge it with the arguments
    pub fn load(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::merge(args, file))
    }

    /// CLI flags win over the file, the file wins over built-in defaults
    pub fn merge(args: &Args, file: FileConfig) -> Self {
        let panes = if !args.keywords.is_empty() {
            args.keywords.iter().map(PaneConfig::keyword).collect()
        } else if !file.panes.is_empty() {
            file.panes
        } else {
            default_panes()
        };

        let pid_refresh_ms = args
            .pid_refresh_ms
            .or(file.pid_refresh_ms)
            .unwrap_or(DEFAULT_PID_REFRESH_MS)
            .max(1);

        Self {
            adb: args
                .adb
                .clone()
                .or(file.adb)
                .unwrap_or_else(|| DEFAULT_ADB.to_string()),
            serial: args.serial.clone().or(file.serial),
            buffer_size: args
                .buffer_size
                .or(file.buffer_size)
                .unwrap_or(DEFAULT_BUFFER_SIZE),
            pid_refresh: Duration::from_millis(pid_refresh_ms),
            auto_start: !args.no_auto_start && file.auto_start.unwrap_or(true),
            skip_prefixes: file.skip_prefixes.unwrap_or_else(|| vec!["-".to_string()]),
            panes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use droidscope_logs::LogRecord;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("droidscope").chain(argv.iter().copied()))
    }

    fn record(level: &str, message: &str) -> LogRecord {
        LogRecord::new("10-16", "09:41:02.117", "1", "1", level, message)
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::merge(&args(&[]), FileConfig::default());
        assert_eq!(settings.adb, "adb");
        assert_eq!(settings.serial, None);
        assert_eq!(settings.buffer_size, 5000);
        assert_eq!(settings.pid_refresh, Duration::from_secs(1));
        assert!(settings.auto_start);
        assert_eq!(settings.skip_prefixes, vec!["-"]);
        assert_eq!(settings.panes, default_panes());
        assert_eq!(settings.panes[1].title(), "MiuiGallery");
    }

    #[test]
    fn test_file_values() {
        let file = FileConfig::parse(
            r#"
            adb = "/opt/platform-tools/adb"
            serial = "emulator-5554"
            buffer_size = 200
            pid_refresh_ms = 250
            auto_start = false
            skip_prefixes = ["-", "*"]

            [[pane]]
            keyword = "ActivityManager"
            min_level = "W"
            "#,
        )
        .unwrap();

        let settings = Settings::merge(&args(&[]), file);
        assert_eq!(settings.adb, "/opt/platform-tools/adb");
        assert_eq!(settings.serial.as_deref(), Some("emulator-5554"));
        assert_eq!(settings.buffer_size, 200);
        assert_eq!(settings.pid_refresh, Duration::from_millis(250));
        assert!(!settings.auto_start);
        assert_eq!(settings.skip_prefixes, vec!["-", "*"]);
        assert_eq!(settings.panes.len(), 1);
        assert_eq!(settings.panes[0].title(), "ActivityManager");
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = FileConfig::parse(
            r#"
            buffer_size = 200
            serial = "emulator-5554"

            [[pane]]
            keyword = "from-file"
            "#,
        )
        .unwrap();

        let settings = Settings::merge(
            &args(&["--buffer-size", "10", "--serial", "R58M", "--no-auto-start", "camera", "gallery"]),
            file,
        );
        assert_eq!(settings.buffer_size, 10);
        assert_eq!(settings.serial.as_deref(), Some("R58M"));
        assert!(!settings.auto_start);
        let titles: Vec<_> = settings.panes.iter().map(|p| p.title()).collect();
        assert_eq!(titles, vec!["camera", "gallery"]);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(FileConfig::parse("bufer_size = 10").is_err());
        assert!(FileConfig::parse("[[pane]]\nkeyword = \"x\"\ncolour = \"red\"").is_err());
    }

    #[test]
    fn test_pane_filter() {
        let pane = PaneConfig {
            min_level: Some("W".to_string()),
            ..PaneConfig::keyword("camera")
        };
        let filter = pane.filter().unwrap();
        assert!(filter.matches(&record("E", "camera: failed")));
        assert!(!filter.matches(&record("I", "camera: opened")));
        assert!(!filter.matches(&record("E", "gallery: failed")));

        let pane = PaneConfig {
            regex: true,
            case_insensitive: true,
            ..PaneConfig::keyword("^cam(era)?:")
        };
        assert!(pane.filter().unwrap().matches(&record("I", "Camera: opened")));

        let pane = PaneConfig {
            invert: true,
            ..PaneConfig::keyword("chatty")
        };
        let filter = pane.filter().unwrap();
        assert!(!filter.matches(&record("I", "chatty: spam")));
        assert!(filter.matches(&record("I", "camera: opened")));
    }

    #[test]
    fn test_pane_filter_errors() {
        let bad_level = PaneConfig {
            min_level: Some("loud".to_string()),
            ..PaneConfig::keyword("camera")
        };
        assert!(bad_level.filter().is_err());

        let bad_regex = PaneConfig {
            regex: true,
            ..PaneConfig::keyword("(unclosed")
        };
        assert!(bad_regex.filter().is_err());
    }
}
