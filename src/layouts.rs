//! Layout catalog read from a directory of JSON files
//!
//! Each file is named `<model key>-<layout>.json`, e.g.
//! `k65plus-default-US.json`, and maps key ids to their position:
//!
//! ```json
//! { "1": { "name": "Esc", "row": 0, "packetIndex": [0, 1, 2] } }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use k65_keyboard::{KeyPosition, LayoutCatalog};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyRecord {
    name: String,
    #[serde(default)]
    row: u32,
    packet_index: Vec<usize>,
}

pub struct JsonLayoutCatalog {
    dir: PathBuf,
}

impl JsonLayoutCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl LayoutCatalog for JsonLayoutCatalog {
    fn layouts(&self, model_key: &str) -> Vec<String> {
        let prefix = format!("{}-", model_key);
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut layouts: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|e| e.file_name().into_string().ok())
            .filter_map(|name| {
                name.strip_suffix(".json")
                    .and_then(|stem| stem.strip_prefix(&prefix))
                    .map(str::to_owned)
            })
            .collect();
        layouts.sort();
        layouts
    }

    fn key_packet_offsets(&self, layout_key: &str) -> Option<BTreeMap<u32, KeyPosition>> {
        let path = self.dir.join(format!("{}.json", layout_key));
        let content = std::fs::read_to_string(&path).ok()?;
        let records: BTreeMap<u32, KeyRecord> = match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Invalid layout file {}", path.display());
                return None;
            }
        };
        Some(
            records
                .into_iter()
                .map(|(id, r)| {
                    (
                        id,
                        KeyPosition {
                            name: r.name,
                            row: r.row,
                            packet_index: r.packet_index,
                        },
                    )
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lists_layouts_for_model() {
        let dir = tempdir().unwrap();
        for name in ["k65plus-default-US", "k65plus-default-UK", "k65plusW-default-US"] {
            std::fs::write(dir.path().join(format!("{}.json", name)), "{}").unwrap();
        }
        let catalog = JsonLayoutCatalog::new(dir.path());
        assert_eq!(catalog.layouts("k65plus-default"), vec!["UK", "US"]);
        assert_eq!(catalog.layouts("k65plusW-default"), vec!["US"]);
    }

    #[test]
    fn test_reads_key_offsets() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("k65plus-default-US.json"),
            r#"{ "1": { "name": "Esc", "row": 0, "packetIndex": [0, 1, 2] },
                 "2": { "name": "F1", "packetIndex": [3, 4, 5] } }"#,
        )
        .unwrap();
        let catalog = JsonLayoutCatalog::new(dir.path());
        let keys = catalog.key_packet_offsets("k65plus-default-US").unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[&1].name, "Esc");
        assert_eq!(keys[&2].packet_index, vec![3, 4, 5]);
        assert!(catalog.key_packet_offsets("k65plus-default-DE").is_none());
    }
}
