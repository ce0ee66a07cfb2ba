//! INI file configuration adapter.

use crate::domain::error::ForecastError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::{Path, PathBuf};

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ForecastError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| ForecastError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    /// A path-valued key, falling back to `default` when unset or blank.
    pub fn get_path(&self, section: &str, key: &str, default: &str) -> PathBuf {
        self.get_string(section, key)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(default))
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[data]
path = ./prices
period = 1y

[model]
short_window = 10
learning_rate = 0.5
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(adapter.get_string("data", "path"), Some("./prices".to_string()));
        assert_eq!(adapter.get_string("data", "period"), Some("1y".to_string()));
        assert_eq!(adapter.get_int("model", "short_window", 0), 10);
        assert_eq!(adapter.get_double("model", "learning_rate", 0.0), 0.5);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[model]\nepochs = 100\n").unwrap();
        assert_eq!(adapter.get_string("model", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[model]\nepochs = abc\n").unwrap();
        assert_eq!(adapter.get_int("model", "epochs", 42), 42);
        assert_eq!(adapter.get_int("model", "missing", 7), 7);
    }

    #[test]
    fn get_usize_rejects_negative() {
        let adapter = FileConfigAdapter::from_string("[analysis]\ncv_splits = -3\n").unwrap();
        assert_eq!(adapter.get_usize("analysis", "cv_splits", 3), 3);
    }

    #[test]
    fn get_double_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[analysis]\nerror_threshold = lots\n").unwrap();
        assert_eq!(adapter.get_double("analysis", "error_threshold", 5.0), 5.0);
    }

    #[test]
    fn get_bool_parses_variants() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\na = true\nb = no\nc = 1\n").unwrap();
        assert!(adapter.get_bool("backtest", "a", false));
        assert!(!adapter.get_bool("backtest", "b", true));
        assert!(adapter.get_bool("backtest", "c", false));
        assert!(adapter.get_bool("backtest", "missing", true));
    }

    #[test]
    fn get_path_falls_back_to_default() {
        let adapter =
            FileConfigAdapter::from_string("[report]\npath = out/report.csv\nbacktest_path =\n")
                .unwrap();
        assert_eq!(
            adapter.get_path("report", "path", "report.csv"),
            PathBuf::from("out/report.csv")
        );
        assert_eq!(
            adapter.get_path("report", "backtest_path", "backtest_results.csv"),
            PathBuf::from("backtest_results.csv")
        );
        assert_eq!(
            adapter.get_path("error_log", "path", "error_log.csv"),
            PathBuf::from("error_log.csv")
        );
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[memory]\nbackend = sqlite\npath = memory.db\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("memory", "backend"), Some("sqlite".to_string()));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini")
            .err()
            .unwrap();
        assert!(matches!(err, ForecastError::ConfigParse { .. }));
    }
}
