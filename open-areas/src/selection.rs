//! State read by the surrounding UI: the selected feature and overlay visibility.

use std::collections::BTreeMap;

use geojson::JsonObject;

/// Attributes of the currently selected feature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    selected: Option<JsonObject>,
}

impl SelectionState {
    /// Replaces the selection with the feature attributes.
    pub fn select(&mut self, properties: JsonObject) {
        self.selected = Some(properties);
    }

    /// Drops the selection.
    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Attributes of the selected feature.
    pub fn properties(&self) -> Option<&JsonObject> {
        self.selected.as_ref()
    }

    /// Whether a feature is selected.
    pub fn is_selected(&self) -> bool {
        self.selected.is_some()
    }
}

/// Visibility the user requested for overlay layers.
///
/// Lives only in memory. It outlives basemap switches: the controller applies it again every
/// time the overlays are reloaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityTable {
    layers: BTreeMap<String, bool>,
}

impl VisibilityTable {
    /// Records the requested visibility of a layer.
    pub fn set(&mut self, layer_id: impl Into<String>, visible: bool) {
        self.layers.insert(layer_id.into(), visible);
    }

    /// Requested visibility, `None` if the user never toggled the layer.
    pub fn get(&self, layer_id: &str) -> Option<bool> {
        self.layers.get(layer_id).copied()
    }

    /// All recorded entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.layers.iter().map(|(id, visible)| (id.as_str(), *visible))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn selection_replaces() {
        let mut first = JsonObject::new();
        first.insert("PIN".into(), json!("1"));
        first.insert("Acres".into(), json!(2.5));
        let mut second = JsonObject::new();
        second.insert("PIN".into(), json!("2"));

        let mut state = SelectionState::default();
        state.select(first);
        state.select(second.clone());

        assert_eq!(state.properties(), Some(&second));
        state.clear();
        assert!(!state.is_selected());
    }

    #[test]
    fn visibility_last_write_wins() {
        let mut table = VisibilityTable::default();
        table.set("streams-border", false);
        table.set("streams-border", true);
        table.set("landuse-polygons", false);

        assert_eq!(table.get("streams-border"), Some(true));
        assert_eq!(table.get("borough-border"), None);
        assert_eq!(
            table.iter().collect::<Vec<_>>(),
            [("landuse-polygons", false), ("streams-border", true)]
        );
    }
}
