//! Preset files and GitHub contents listings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One URL query parameter set by a preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PresetParam {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// A named set of URL parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Preset {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub params: Vec<PresetParam>,
    /// Hosts the preset applies to; empty means any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,
}

/// Accepted layouts of a preset file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PresetFile {
    List(Vec<Preset>),
    Wrapped { presets: Vec<Preset> },
}

/// Decode and check the presets in one file.
///
/// Returns a reason string when the file is not a preset file or holds an
/// invalid preset.
pub fn parse_presets(value: Value) -> Result<Vec<Preset>, String> {
    let presets = match serde_json::from_value(value) {
        Ok(PresetFile::List(presets)) | Ok(PresetFile::Wrapped { presets }) => presets,
        Err(_) => return Err("expected an array of presets or an object with a \"presets\" array".into()),
    };

    for (idx, preset) in presets.iter().enumerate() {
        if preset.name.trim().is_empty() {
            return Err(format!("preset #{} has an empty name", idx + 1));
        }
        if let Some(param) = preset.params.iter().find(|p| p.key.trim().is_empty()) {
            return Err(format!("preset \"{}\" has a parameter with an empty key (value {:?})", preset.name, param.value));
        }
    }

    Ok(presets)
}

/// Item of a GitHub contents API listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl ContentEntry {
    /// A downloadable `.json` file.
    pub fn is_preset_file(&self) -> bool {
        self.kind == "file" && self.name.to_ascii_lowercase().ends_with(".json") && self.download_url.is_some()
    }
}

/// The contents API returns an array for directories and an object for files.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ContentListing {
    Dir(Vec<ContentEntry>),
    File(ContentEntry),
}

impl ContentListing {
    pub fn into_entries(self) -> Vec<ContentEntry> {
        match self {
            ContentListing::Dir(entries) => entries,
            ContentListing::File(entry) => vec![entry],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LISTING_JSON: &str = r#"[
        {
            "name": "qa.json",
            "path": "presets/qa.json",
            "type": "file",
            "download_url": "https://raw.githubusercontent.com/acme/url-presets/main/presets/qa.json"
        },
        {
            "name": "README.md",
            "path": "presets/README.md",
            "type": "file",
            "download_url": "https://raw.githubusercontent.com/acme/url-presets/main/presets/README.md"
        },
        {
            "name": "archive",
            "path": "presets/archive",
            "type": "dir",
            "download_url": null
        }
    ]"#;

    #[test]
    fn test_parse_array_file() {
        let presets = parse_presets(json!([
            {"name": "Debug", "params": [{"key": "debug", "value": "1"}]},
            {"name": "Staging", "description": "Point at staging", "params": [{"key": "env", "value": "staging"}], "domains": ["example.com"]}
        ]))
        .unwrap();

        assert_eq!(presets.len(), 2);
        assert_eq!(presets[0].params, vec![PresetParam { key: "debug".into(), value: "1".into() }]);
        assert_eq!(presets[1].description.as_deref(), Some("Point at staging"));
        assert_eq!(presets[1].domains, vec!["example.com".to_string()]);
    }

    #[test]
    fn test_parse_wrapped_file() {
        let presets = parse_presets(json!({"presets": [{"name": "No cache", "params": [{"key": "nocache"}]}]})).unwrap();
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].params[0].value, "");
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        assert!(parse_presets(json!({"name": "lonely"})).is_err());
        assert!(parse_presets(json!("presets")).is_err());
        assert!(parse_presets(json!([{"params": []}])).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_names() {
        let err = parse_presets(json!([{"name": "  "}])).unwrap_err();
        assert!(err.contains("#1"));

        let err = parse_presets(json!([{"name": "Bad", "params": [{"key": "", "value": "x"}]}])).unwrap_err();
        assert!(err.contains("Bad"));
    }

    #[test]
    fn test_listing_filters_preset_files() {
        let listing: ContentListing = serde_json::from_str(LISTING_JSON).unwrap();
        let entries = listing.into_entries();

        assert_eq!(entries.len(), 3);
        let files: Vec<&str> = entries.iter().filter(|e| e.is_preset_file()).map(|e| e.path.as_str()).collect();
        assert_eq!(files, vec!["presets/qa.json"]);
    }

    #[test]
    fn test_single_file_listing() {
        let listing: ContentListing = serde_json::from_value(json!({
            "name": "team.JSON",
            "path": "team.JSON",
            "type": "file",
            "download_url": "https://raw.githubusercontent.com/acme/url-presets/main/team.JSON"
        }))
        .unwrap();

        let entries = listing.into_entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_preset_file());
    }
}
