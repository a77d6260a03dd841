use crate::data::raw_dataset::CsvOptions;
use crate::data::type_inference::{TypeInferencer, DEFAULT_NULL_MARKERS, DEFAULT_SAMPLE_ROWS};
use crate::data::datatable::{ISO_DATE_FORMAT, ISO_DATETIME_FORMAT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub loader: LoaderConfig,
    pub query: QueryConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Non-missing values inspected per column when inferring its type
    pub sample_rows: usize,

    /// Field delimiter; sniffed from the header line when unset
    pub delimiter: Option<String>,

    /// Cell values treated as missing, besides empty cells
    pub null_markers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Stop collecting rows after this many; unlimited when unset
    pub max_result_rows: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// chrono format for date cells in projected results
    pub date_format: String,

    /// chrono format for date-time cells in projected results
    pub datetime_format: String,

    /// Rows printed by the command-line front end before eliding
    pub max_display_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is not set
    pub filter: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            sample_rows: DEFAULT_SAMPLE_ROWS,
            delimiter: None,
            null_markers: DEFAULT_NULL_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: ISO_DATE_FORMAT.to_string(),
            datetime_format: ISO_DATETIME_FORMAT.to_string(),
            max_display_rows: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "queryplay=info".to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn inferencer(&self) -> TypeInferencer {
        TypeInferencer::new(self.sample_rows, self.null_markers.clone())
    }

    /// Parsing options; `\t` is accepted for a tab
    pub fn csv_options(&self) -> crate::Result<CsvOptions> {
        let delimiter = match self.delimiter.as_deref() {
            None | Some("") => None,
            Some("\\t") | Some("\t") => Some(b'\t'),
            Some(d) if d.len() == 1 && d.is_ascii() => Some(d.as_bytes()[0]),
            Some(d) => {
                return Err(crate::Error::Config(format!(
                    "delimiter must be a single ASCII character, got '{}'",
                    d
                )))
            }
        };
        Ok(CsvOptions { delimiter })
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        // Surface a bad delimiter now rather than on the first load
        config.loader.csv_options()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Error writing config file {}", path.display()))?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("queryplay").join("config.toml"))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r##"# queryplay configuration file
# Location: ~/.config/queryplay/config.toml (Linux)
#           ~/Library/Application Support/queryplay/config.toml (macOS)
#           %APPDATA%\queryplay\config.toml (Windows)

[loader]
# Non-missing values inspected per column when inferring its type
sample_rows = 10000

# Field delimiter, e.g. "," ";" "|" or "\t"
# Leave commented to detect it from the header line
# delimiter = ";"

# Cell values treated as missing (empty cells always are)
null_markers = ["NA", "N/A", "#N/A", "NULL", "null", "NaN", "nan"]

[query]
# Stop collecting result rows after this many (unlimited when commented)
# max_result_rows = 100000

[display]
# chrono formats used for date and date-time cells in results and exports
date_format = "%Y-%m-%d"
datetime_format = "%Y-%m-%d %H:%M:%S"

# Rows printed in the terminal before the rest is elided
max_display_rows = 100

[logging]
# Log filter used when RUST_LOG is not set
filter = "queryplay=info"
"##
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.loader.sample_rows, 10_000);
        assert!(config.loader.null_markers.contains(&"N/A".to_string()));
        assert_eq!(config.query.max_result_rows, None);
        assert_eq!(config.display.date_format, "%Y-%m-%d");
    }

    #[test]
    fn test_commented_default_matches_default() {
        let parsed: Config = toml::from_str(&Config::create_default_with_comments()).unwrap();
        let default = Config::default();
        assert_eq!(parsed.loader.sample_rows, default.loader.sample_rows);
        assert_eq!(parsed.loader.null_markers, default.loader.null_markers);
        assert_eq!(parsed.loader.delimiter, None);
        assert_eq!(parsed.display.datetime_format, default.display.datetime_format);
        assert_eq!(parsed.logging.filter, default.logging.filter);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("[query]\nmax_result_rows = 50\n").unwrap();
        assert_eq!(parsed.query.max_result_rows, Some(50));
        assert_eq!(parsed.loader.sample_rows, 10_000);
    }

    #[test]
    fn test_delimiter_options() {
        let mut loader = LoaderConfig::default();
        assert_eq!(loader.csv_options().unwrap().delimiter, None);

        loader.delimiter = Some("\\t".to_string());
        assert_eq!(loader.csv_options().unwrap().delimiter, Some(b'\t'));

        loader.delimiter = Some("|".to_string());
        assert_eq!(loader.csv_options().unwrap().delimiter, Some(b'|'));

        loader.delimiter = Some("::".to_string());
        assert!(matches!(loader.csv_options(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[loader]\ndelimiter = \";\"\nsample_rows = 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.loader.sample_rows, 5);
        assert_eq!(config.loader.csv_options().unwrap().delimiter, Some(b';'));

        fs::write(&path, "[loader]\ndelimiter = \"ab\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.query.max_result_rows = Some(250);
        config.display.date_format = "%d.%m.%Y".to_string();
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.query.max_result_rows, Some(250));
        assert_eq!(reloaded.display.date_format, "%d.%m.%Y");
        assert_eq!(reloaded.loader.null_markers, config.loader.null_markers);
    }
}
