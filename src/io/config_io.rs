use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::plan_io::{StoreError, atomic_write};
use crate::logging::normalize_level;
use crate::model::config::PlannerConfig;

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Read config.toml. A missing file yields the defaults.
pub fn read_config(data_dir: &Path) -> Result<PlannerConfig, StoreError> {
    let text = read_config_text(data_dir)?;
    Ok(toml::from_str(&text)?)
}

/// Read the config as a toml_edit document for round-trip-safe editing
pub fn read_config_document(data_dir: &Path) -> Result<toml_edit::DocumentMut, StoreError> {
    let text = read_config_text(data_dir)?;
    text.parse()
        .map_err(|e: toml_edit::TomlError| StoreError::ConfigEdit(e.to_string()))
}

fn read_config_text(data_dir: &Path) -> Result<String, StoreError> {
    let path = config_path(data_dir);
    match fs::read_to_string(&path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(StoreError::ReadError { path, source: e }),
    }
}

/// Set `section.key` to `raw`. Booleans and integers are stored typed,
/// anything else as a string. The result must still parse as a valid
/// config; otherwise the document is left unchanged.
pub fn set_config_value(
    doc: &mut toml_edit::DocumentMut,
    dotted_key: &str,
    raw: &str,
) -> Result<(), StoreError> {
    let (section, key) = dotted_key
        .split_once('.')
        .filter(|(s, k)| !s.is_empty() && !k.is_empty() && !k.contains('.'))
        .ok_or_else(|| StoreError::ConfigEdit(format!("expected <section>.<key>, got '{}'", dotted_key)))?;

    let value = if let Ok(b) = raw.parse::<bool>() {
        toml_edit::value(b)
    } else if let Ok(n) = raw.parse::<i64>() {
        toml_edit::value(n)
    } else {
        toml_edit::value(raw)
    };

    let mut candidate = doc.clone();
    if !candidate.contains_key(section) {
        candidate[section] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let table = candidate[section]
        .as_table_like_mut()
        .ok_or_else(|| StoreError::ConfigEdit(format!("'{}' is not a table", section)))?;
    table.insert(key, value);

    let config: PlannerConfig = toml::from_str(&candidate.to_string())?;
    normalize_level(&config.logging.level).map_err(|e| StoreError::ConfigEdit(e.to_string()))?;
    *doc = candidate;
    Ok(())
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(data_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), StoreError> {
    let path = config_path(data_dir);
    atomic_write(&path, doc.to_string().as_bytes())
        .map_err(|e| StoreError::WriteError { path, source: e })
}
