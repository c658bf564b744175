use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::SelectionRule;

/// Relative tolerance used when comparing floating point values.
///
/// Configuration tools and requirement sources often disagree on precision, so
/// this is only the default for [`Config::float_tolerance`].
pub const DEFAULT_FLOAT_TOLERANCE: f64 = 1e-9;

/// How results from several configuration files are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrossFilePolicy {
    /// Try files in priority order and stop at the first that has a match.
    #[default]
    FirstMatch,
    /// Collect matches from every file, so a parameter defined in several
    /// files is ambiguous unless a selection rule applies.
    Merge,
}

/// Settings that control how parameters are resolved and compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Relative tolerance for comparisons involving a floating point value.
    pub float_tolerance: f64,

    /// Compare free text case-insensitively.
    pub case_insensitive_text: bool,

    /// Read `"500 kbps"` as the number `500`.
    pub strip_units: bool,

    /// Selection rule for requirements that do not declare one.
    pub default_selection: Option<SelectionRule>,

    /// How matches in several files are combined.
    pub cross_file: CrossFilePolicy,

    /// Configuration files to try first, in this order.
    ///
    /// Entries match either the path relative to the configuration root or
    /// the bare file name. Files not listed follow, sorted by path.
    pub(crate) source_order: Vec<String>,

    /// Skip configuration files that cannot be parsed instead of failing.
    pub allow_unparseable: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            float_tolerance: DEFAULT_FLOAT_TOLERANCE,
            case_insensitive_text: false,
            strip_units: true,
            default_selection: None,
            cross_file: CrossFilePolicy::default(),
            source_order: Vec::new(),
            allow_unparseable: false,
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The configured file priority list.
    #[must_use]
    pub fn source_order(&self) -> &[String] {
        &self.source_order
    }

    /// Appends a file to the priority list.
    ///
    /// Returns `false` if it was already listed.
    pub fn prioritise_source(&mut self, source: String) -> bool {
        if self.source_order.contains(&source) {
            false
        } else {
            self.source_order.push(source);
            true
        }
    }

    /// The priority of a source file, lower is tried first.
    ///
    /// `relative_path` is the file's path relative to the configuration root,
    /// using `/` separators.
    #[must_use]
    pub fn source_priority(&self, relative_path: &str) -> usize {
        let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
        self.source_order
            .iter()
            .position(|entry| entry == relative_path || entry == file_name)
            .unwrap_or(self.source_order.len())
    }
}

const fn default_float_tolerance() -> f64 {
    DEFAULT_FLOAT_TOLERANCE
}

const fn default_strip_units() -> bool {
    true
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_float_tolerance")]
        float_tolerance: f64,

        #[serde(default)]
        case_insensitive_text: bool,

        #[serde(default = "default_strip_units")]
        strip_units: bool,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_selection: Option<SelectionRule>,

        #[serde(default)]
        cross_file: CrossFilePolicy,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        source_order: Vec<String>,

        #[serde(default)]
        allow_unparseable: bool,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                float_tolerance,
                case_insensitive_text,
                strip_units,
                default_selection,
                cross_file,
                source_order,
                allow_unparseable,
            } => Self {
                float_tolerance,
                case_insensitive_text,
                strip_units,
                default_selection,
                cross_file,
                source_order,
                allow_unparseable,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            float_tolerance: config.float_tolerance,
            case_insensitive_text: config.case_insensitive_text,
            strip_units: config.strip_units,
            default_selection: config.default_selection,
            cross_file: config.cross_file,
            source_order: config.source_order,
            allow_unparseable: config.allow_unparseable,
        }
    }
}
