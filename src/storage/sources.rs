//! Discovery and parsing of configuration files.
//!
//! A configuration root is walked for YAML, JSON, TOML and ARXML files. Each
//! file becomes one [`ConfigTree`]; the trees are returned in priority order.

use std::{
    ffi::OsStr,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{
    domain::{Config, ConfigTree, NodeId, RawValue, TreeBuilder},
    storage::arxml,
};

/// File extensions recognised as configuration sources.
pub const SOURCE_EXTENSIONS: [&str; 5] = ["yaml", "yml", "json", "toml", "arxml"];

/// Errors that can occur when loading configuration sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The configuration root is not a directory.
    MissingRoot(PathBuf),
    /// Some files could not be parsed and `allow_unparseable` is not set.
    UnparseableFiles(Vec<PathBuf>),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRoot(path) => {
                write!(f, "Configuration directory not found: {}", path.display())
            }
            Self::UnparseableFiles(paths) => {
                write!(f, "Unparseable configuration files: ")?;
                for (i, path) in paths.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", path.display())?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum ParseError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// Loads every configuration file below `root`.
///
/// Trees are named by their path relative to `root` and ordered by
/// [`Config::source_priority`], then by path.
///
/// # Errors
///
/// Returns an error if `root` is not a directory. If any file cannot be
/// parsed, that is an error too unless `allow_unparseable` is set, in which
/// case the file is skipped with a warning.
pub fn load_trees(root: &Path, config: &Config) -> Result<Vec<ConfigTree>, SourceError> {
    if !root.is_dir() {
        return Err(SourceError::MissingRoot(root.to_path_buf()));
    }

    let paths = collect_source_paths(root);
    debug!("Found {} configuration files in {}", paths.len(), root.display());

    let (trees, unparseable): (Vec<_>, Vec<_>) = paths
        .par_iter()
        .map(|path| try_load_tree(path, root))
        .partition(Result::is_ok);

    let mut trees: Vec<_> = trees.into_iter().filter_map(Result::ok).collect();
    let unparseable: Vec<_> = unparseable.into_iter().filter_map(Result::err).collect();

    if !unparseable.is_empty() {
        if !config.allow_unparseable {
            return Err(SourceError::UnparseableFiles(unparseable));
        }
        for path in &unparseable {
            warn!("Skipping unparseable configuration file {}", path.display());
        }
    }

    trees.sort_by(|a, b| {
        config
            .source_priority(a.source())
            .cmp(&config.source_priority(b.source()))
            .then_with(|| a.source().cmp(b.source()))
    });
    Ok(trees)
}

fn collect_source_paths(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .is_some_and(|extension| {
                    SOURCE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
                })
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn try_load_tree(path: &Path, root: &Path) -> Result<ConfigTree, PathBuf> {
    let source = relative_name(path, root);
    load_tree(path, source).map_err(|e| {
        debug!("Failed to parse {}: {e}", path.display());
        path.to_path_buf()
    })
}

fn load_tree(path: &Path, source: String) -> Result<ConfigTree, ParseError> {
    let content = fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .unwrap_or_default()
        .to_ascii_lowercase();

    let value: Value = match extension.as_str() {
        "arxml" => return Ok(arxml::parse(source, &content)),
        "json" => serde_json::from_str(&content)?,
        "toml" => toml::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };
    Ok(tree_from_value(source, &value))
}

/// `path` relative to `root`, with `/` separators.
fn relative_name(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Builds a tree from a parsed YAML, JSON or TOML document.
///
/// Mappings become named children and scalars become values. A sequence of
/// scalars is one list value, while a sequence holding mappings becomes
/// same-named siblings, one per item. A document that is not a mapping has
/// no named parameters and gives an empty tree.
pub fn tree_from_value(source: impl Into<String>, document: &Value) -> ConfigTree {
    let mut builder = ConfigTree::builder(source);
    if let Value::Object(members) = document {
        let root = builder.root();
        add_members(&mut builder, root, members);
    }
    builder.build()
}

fn add_members(builder: &mut TreeBuilder, parent: NodeId, members: &Map<String, Value>) {
    for (name, value) in members {
        add_value(builder, parent, name, value);
    }
}

fn add_value(builder: &mut TreeBuilder, parent: NodeId, name: &str, value: &Value) {
    match value {
        Value::Object(members) => {
            let node = builder.add_child(parent, name, None);
            add_members(builder, node, members);
        }
        Value::Array(items) if items.iter().all(is_scalar) => {
            // `null` items stay in place as empty entries.
            let list = RawValue::list(
                items
                    .iter()
                    .map(|item| scalar_text(item).unwrap_or_default()),
            );
            builder.add_child(parent, name, Some(list));
        }
        Value::Array(items) => {
            for item in items {
                add_value(builder, parent, name, item);
            }
        }
        scalar => {
            builder.add_child(parent, name, scalar_text(scalar).map(RawValue::Scalar));
        }
    }
}

const fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Bool(value) => Some(value.to_string()),
        Value::Number(value) => Some(value.to_string()),
        Value::String(value) => Some(value.clone()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::domain::ConfigNode;

    fn write(dir: &TempDir, relative: &str, content: &str) {
        let path = dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn values(tree: &ConfigTree, path: &[&str]) -> Option<String> {
        let mut node = tree.root();
        for name in path {
            node = node.child(name)?;
        }
        node.value().map(ToString::to_string)
    }

    #[test]
    fn documents_map_onto_trees() {
        let document = json!({
            "ModuleA": {
                "Timeout": 500.0,
                "Enabled": true,
                "Channels": ["a", "b"],
                "Channel": [{"Id": 0}, {"Id": 1}],
                "Unset": null,
            }
        });
        let tree = tree_from_value("EcuC.json", &document);

        assert_eq!(values(&tree, &["ModuleA", "Timeout"]).as_deref(), Some("500.0"));
        assert_eq!(values(&tree, &["ModuleA", "Enabled"]).as_deref(), Some("true"));
        assert_eq!(values(&tree, &["ModuleA", "Channels"]).as_deref(), Some("[a, b]"));
        assert_eq!(values(&tree, &["ModuleA", "Unset"]), None);

        let module = tree.root().child("ModuleA").unwrap();
        let names: Vec<_> = module.children().map(ConfigNode::name).collect();
        assert_eq!(
            names,
            vec!["Timeout", "Enabled", "Channels", "Channel", "Channel", "Unset"]
        );
    }

    #[test]
    fn mapping_keys_keep_file_order() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "a.yaml", "Zeta:
  X: 1
Alpha:
  X: 2
");
        write(&dir, "b.toml", "[Zeta]
X = 3

[Alpha]
X = 4
");
        write(&dir, "c.json", r#"{"Zeta": {"X": 5}, "Alpha": {"X": 6}}"#);

        let trees = load_trees(dir.path(), &Config::default()).unwrap();
        for tree in &trees {
            let names: Vec<_> = tree.root().children().map(ConfigNode::name).collect();
            assert_eq!(names, vec!["Zeta", "Alpha"], "{}", tree.source());
        }
    }

    #[test]
    fn null_list_items_keep_their_place() {
        let tree = tree_from_value("a.json", &json!({"Ids": [1, null, 3]}));
        assert_eq!(
            tree.root().child("Ids").unwrap().value(),
            Some(&RawValue::list(["1", "", "3"]))
        );
    }

    #[test]
    fn scalar_document_gives_empty_tree() {
        assert!(tree_from_value("x.json", &json!(42)).is_empty());
    }

    #[test]
    fn loads_every_supported_format() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "a.yaml", "ModuleA:\n  Timeout: 500\n");
        write(&dir, "nested/b.json", r#"{"ModuleB": {"Enabled": "yes"}}"#);
        write(&dir, "c.toml", "[ModuleC]\nRate = 10\n");
        write(
            &dir,
            "d.arxml",
            "<DEFINITION-REF>/AUTOSAR/EcucDefs/Can/Speed</DEFINITION-REF>\n<VALUE>500</VALUE>\n",
        );
        write(&dir, "notes.txt", "not a configuration file");

        let trees = load_trees(dir.path(), &Config::default()).unwrap();
        let sources: Vec<_> = trees.iter().map(ConfigTree::source).collect();
        assert_eq!(sources, vec!["a.yaml", "c.toml", "d.arxml", "nested/b.json"]);

        assert_eq!(values(&trees[0], &["ModuleA", "Timeout"]).as_deref(), Some("500"));
        assert_eq!(values(&trees[1], &["ModuleC", "Rate"]).as_deref(), Some("10"));
        assert_eq!(values(&trees[2], &["Can", "Speed"]).as_deref(), Some("500"));
        assert_eq!(values(&trees[3], &["ModuleB", "Enabled"]).as_deref(), Some("yes"));
    }

    #[test]
    fn prioritised_sources_come_first() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "a.yaml", "A: 1\n");
        write(&dir, "b.yaml", "A: 2\n");
        write(&dir, "vendor/c.yaml", "A: 3\n");

        let mut config = Config::default();
        config.prioritise_source("c.yaml".to_string());
        config.prioritise_source("b.yaml".to_string());

        let trees = load_trees(dir.path(), &config).unwrap();
        let sources: Vec<_> = trees.iter().map(ConfigTree::source).collect();
        assert_eq!(sources, vec!["vendor/c.yaml", "b.yaml", "a.yaml"]);
    }

    #[test]
    fn unparseable_files_fail_the_load() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "good.yaml", "A: 1\n");
        write(&dir, "bad.json", "{ not json");

        let error = load_trees(dir.path(), &Config::default()).unwrap_err();
        assert!(matches!(&error, SourceError::UnparseableFiles(paths) if paths.len() == 1));
        assert!(error.to_string().starts_with("Unparseable configuration files: "));
    }

    #[test]
    fn unparseable_files_can_be_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "good.yaml", "A: 1\n");
        write(&dir, "bad.json", "{ not json");

        let config = Config {
            allow_unparseable: true,
            ..Config::default()
        };
        let trees = load_trees(dir.path(), &config).unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].source(), "good.yaml");
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            load_trees(&missing, &Config::default()),
            Err(SourceError::MissingRoot(path)) if path == missing
        ));
    }

    #[test]
    fn empty_directory_gives_no_trees() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_trees(dir.path(), &Config::default()).unwrap().is_empty());
    }
}
