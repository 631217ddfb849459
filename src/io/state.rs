use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::io::plan_io::atomic_write;

/// Persisted session state (written to state.json)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Edit/view mode gate. `None` = use the configured default.
    #[serde(default)]
    pub edit_mode: Option<bool>,
}

/// Read state.json from the data directory
pub fn read_session_state(data_dir: &Path) -> Option<SessionState> {
    let content = fs::read_to_string(data_dir.join("state.json")).ok()?;
    serde_json::from_str(&content).ok()
}

/// Write state.json to the data directory
pub fn write_session_state(data_dir: &Path, state: &SessionState) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(state)?;
    atomic_write(&data_dir.join("state.json"), content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let state = SessionState {
            edit_mode: Some(false),
        };
        write_session_state(dir.path(), &state).unwrap();
        assert_eq!(read_session_state(dir.path()), Some(state));
        let raw = fs::read_to_string(dir.path().join("state.json")).unwrap();
        assert!(raw.contains("\"editMode\": false"));
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_session_state(dir.path()).is_none());
    }

    #[test]
    fn read_malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("state.json"), "not json {{{").unwrap();
        assert!(read_session_state(dir.path()).is_none());
    }

    #[test]
    fn serde_defaults_on_empty_object() {
        let state: SessionState = serde_json::from_str("{}").unwrap();
        assert!(state.edit_mode.is_none());
    }
}
