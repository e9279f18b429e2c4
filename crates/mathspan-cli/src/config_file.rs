use std::{fmt, fs, io, path::Path};

use math_core::MathCoreConfig;
use mathspan::ScannerConfig;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Settings for finding math regions.
    pub scanner: ScannerConfig,
    /// Settings for converting them to MathML.
    #[serde(flatten)]
    pub math_core: MathCoreConfig,
}

/// Why a config file could not be used.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Io(io::Error),
    /// The file is not valid TOML, or a value has the wrong type.
    Parse {
        /// The `[table]` that contains the error; `None` for top-level keys.
        section: Option<String>,
        error: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "cannot read file: {}", err),
            ConfigError::Parse {
                section: Some(section),
                error,
            } => write!(f, "invalid setting in [{}]: {}", section, error.message()),
            ConfigError::Parse {
                section: None,
                error,
            } => write!(f, "invalid TOML: {}", error.message()),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse { error, .. } => Some(error),
        }
    }
}

/// Loads the scanner and MathML settings from a TOML file.
///
/// ```toml
/// pretty-print = "auto"
///
/// [scanner]
/// lookahead-lines = 8
///
/// [macros]
/// R = "\\mathbb{R}"
/// ```
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Result<Config, ConfigError> {
    toml::from_str(content).map_err(|error| ConfigError::Parse {
        section: error
            .span()
            .and_then(|span| section_at(content, span.start)),
        error,
    })
}

/// Name of the last table header at or above the line containing `offset`.
fn section_at(content: &str, offset: usize) -> Option<String> {
    let line_end = content
        .get(offset..)?
        .find('\n')
        .map_or(content.len(), |nl| offset + nl);
    content[..line_end]
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('['))
        .map(|header| {
            header
                .split(']')
                .next()
                .unwrap_or_default()
                .trim_start_matches('[')
                .trim()
                .to_owned()
        })
}
