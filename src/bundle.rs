// Transcript of one run: the raw response of every step that executed,
// written to disk as pretty-printed UTF-8 JSON once all steps are done.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw responses keyed by step name. `upload` is always present; `render`
/// and `mockups` only when those steps actually called the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    pub upload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mockups: Option<Value>,
}

impl ResultBundle {
    pub fn new(upload: Value) -> Self {
        ResultBundle {
            upload,
            render: None,
            mockups: None,
        }
    }

    /// Write the bundle to `path`, replacing whatever is there.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_string_pretty(self).context("Serializing run output")?;
        json.push('\n');
        fs::write(path, json).with_context(|| format!("Writing run output to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_steps_are_not_serialized() {
        let bundle = ResultBundle::new(json!({"success": true}));
        let value = serde_json::to_value(&bundle).unwrap();
        assert_eq!(value, json!({"upload": {"success": true}}));
    }

    #[test]
    fn written_file_round_trips_and_keeps_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_run.json");
        let mut bundle = ResultBundle::new(json!({"success": true, "data": {"uuid": "m-1", "name": "Kupa çay"}}));
        bundle.render = Some(json!({"success": false, "message": "Görsel bulunamadı"}));

        bundle.write_to(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("Kupa çay"));
        assert!(text.contains("\n  \"upload\""));

        let reread: ResultBundle = serde_json::from_str(&text).unwrap();
        assert_eq!(reread, bundle);
        let raw: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(raw, serde_json::to_value(&bundle).unwrap());
    }

    #[test]
    fn existing_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "stale contents that are much longer than the new bundle").unwrap();

        ResultBundle::new(json!({"success": true})).write_to(&path).unwrap();
        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, json!({"upload": {"success": true}}));
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.json");
        let err = ResultBundle::new(json!({})).write_to(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Writing run output"));
    }
}
