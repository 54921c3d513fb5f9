//! Keyboard layout catalog boundary

use std::collections::BTreeMap;

use crate::color::Color;
use crate::profile::{KeyEntry, KeyboardMap};

/// Static position data of one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPosition {
    pub name: String,
    pub row: u32,
    pub packet_index: Vec<usize>,
}

/// Source of key-to-frame-offset tables
pub trait LayoutCatalog: Send + Sync {
    /// Layout names available for a model key, e.g. `["US", "UK"]`
    fn layouts(&self, model_key: &str) -> Vec<String>;

    /// Key offsets of `"<model_key>-<layout>"`, `None` if the layout is unknown
    fn key_packet_offsets(&self, layout_key: &str) -> Option<BTreeMap<u32, KeyPosition>>;
}

/// Catalog key for a model and layout name
pub fn layout_key(model_key: &str, layout: &str) -> String {
    format!("{}-{}", model_key, layout)
}

/// Build a keyboard map with every key set to `color`
pub fn keyboard_from_layout(
    layout: &str,
    positions: BTreeMap<u32, KeyPosition>,
    color: Color,
) -> KeyboardMap {
    let keys = positions
        .into_iter()
        .map(|(id, pos)| {
            (
                id,
                KeyEntry {
                    name: pos.name,
                    row: pos.row,
                    packet_index: pos.packet_index,
                    color,
                },
            )
        })
        .collect();
    KeyboardMap {
        layout: layout.to_string(),
        color,
        keys,
    }
}

/// Catalog with no layouts
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLayouts;

impl LayoutCatalog for NoLayouts {
    fn layouts(&self, _model_key: &str) -> Vec<String> {
        Vec::new()
    }

    fn key_packet_offsets(&self, _layout_key: &str) -> Option<BTreeMap<u32, KeyPosition>> {
        None
    }
}
