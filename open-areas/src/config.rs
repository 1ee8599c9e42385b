//! Map configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, LayerDescriptor};
use crate::color::Color;
use crate::error::OpenAreasError;

/// Environment variable overriding [`MapConfig::base_path`].
pub const BASE_PATH_ENV: &str = "OPEN_AREAS_BASE_PATH";

/// What clicking a feature does besides storing its attributes and zooming to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionBehavior {
    /// Hide the interactive overlay and outline the selected feature.
    HighlightOutline,
    /// Only zoom to the feature.
    ZoomOnly,
}

impl SelectionBehavior {
    /// Padding in pixels around the selected feature when the view is fitted to it.
    pub fn fit_padding(&self) -> f64 {
        match self {
            SelectionBehavior::HighlightOutline => 150.0,
            SelectionBehavior::ZoomOnly => 100.0,
        }
    }
}

/// Configuration of the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// URL prefix the application and its assets are deployed under. Always ends with `/`.
    pub base_path: String,
    /// Element the map is rendered into.
    pub container: String,
    /// Basemap style the map starts with.
    pub initial_style: String,
    /// Overlay whose extent limits the view.
    pub boundary_overlay: String,
    /// Padding added around the boundary extent, in degrees.
    pub bounds_padding: f64,
    /// Padding around the initial view, in pixels.
    pub view_padding: f64,
    /// Click behavior.
    pub selection: SelectionBehavior,
    /// Outline color of the selected feature.
    pub highlight_color: Color,
    /// Outline width of the selected feature.
    pub highlight_width: f64,
    /// Overlays; the built-in catalog is used if not given.
    pub catalog: Option<Vec<LayerDescriptor>>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            base_path: "/open-areas-inventory-map/".into(),
            container: "map".into(),
            initial_style: "default".into(),
            boundary_overlay: "borough".into(),
            bounds_padding: 0.01,
            view_padding: 50.0,
            selection: SelectionBehavior::HighlightOutline,
            highlight_color: Color::HIGHLIGHT,
            highlight_width: 4.0,
            catalog: None,
        }
    }
}

impl MapConfig {
    /// Parses a JSON configuration. Missing fields take their default values.
    pub fn from_json_str(json: &str) -> Result<Self, OpenAreasError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| OpenAreasError::Config(err.to_string()))?;
        Ok(config.normalized())
    }

    /// Reads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OpenAreasError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| OpenAreasError::Config(format!("{}: {err}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Applies [`BASE_PATH_ENV`] if it is set.
    pub fn with_env_overrides(self) -> Self {
        match std::env::var(BASE_PATH_ENV) {
            Ok(base_path) => {
                log::info!("Using base path {base_path} from {BASE_PATH_ENV}");
                self.with_base_path(base_path)
            }
            Err(_) => self,
        }
    }

    /// Sets the deployment base path.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self.normalized()
    }

    /// Sets the click behavior.
    pub fn with_selection(mut self, selection: SelectionBehavior) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the initial basemap style.
    pub fn with_initial_style(mut self, style: impl Into<String>) -> Self {
        self.initial_style = style.into();
        self
    }

    /// Replaces the overlays.
    pub fn with_catalog(mut self, descriptors: Vec<LayerDescriptor>) -> Self {
        self.catalog = Some(descriptors);
        self
    }

    fn normalized(mut self) -> Self {
        if !self.base_path.starts_with('/') {
            self.base_path.insert(0, '/');
        }
        if !self.base_path.ends_with('/') {
            self.base_path.push('/');
        }
        self
    }

    /// URL of an asset. Absolute URLs are returned unchanged, relative ones are prefixed with
    /// the base path.
    pub fn asset_url(&self, url: &str) -> String {
        if url.contains("://") || url.starts_with('/') {
            url.to_string()
        } else {
            format!("{}{url}", self.base_path)
        }
    }

    /// The configured catalog, or the built-in one.
    pub fn catalog(&self) -> Result<Catalog, OpenAreasError> {
        match &self.catalog {
            Some(descriptors) => Catalog::new(descriptors.iter().cloned()),
            None => Ok(Catalog::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MapConfig::default();
        assert_eq!(
            config.asset_url("data/borough.geojson"),
            "/open-areas-inventory-map/data/borough.geojson"
        );
        assert_eq!(config.selection.fit_padding(), 150.0);
        assert_eq!(config.bounds_padding, 0.01);
    }

    #[test]
    fn absolute_urls_are_kept() {
        let config = MapConfig::default();
        assert_eq!(
            config.asset_url("https://example.com/a.geojson"),
            "https://example.com/a.geojson"
        );
        assert_eq!(config.asset_url("/other/a.geojson"), "/other/a.geojson");
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config = MapConfig::from_json_str(
            r#"{ "base_path": "maps/open-areas", "selection": "zoom_only" }"#,
        )
        .unwrap();

        assert_eq!(config.base_path, "/maps/open-areas/");
        assert_eq!(config.selection, SelectionBehavior::ZoomOnly);
        assert_eq!(config.initial_style, "default");
        assert_eq!(config.highlight_color, Color::HIGHLIGHT);
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        assert!(matches!(
            MapConfig::from_json_str(r#"{ "highlight_color": "cyan" }"#),
            Err(OpenAreasError::Config(_))
        ));
    }

    #[test]
    fn custom_catalog_is_validated() {
        let config = MapConfig::default().with_catalog(vec![
            LayerDescriptor::fill("a", "a.geojson"),
            LayerDescriptor::fill("a", "b.geojson"),
        ]);
        assert!(matches!(
            config.catalog(),
            Err(OpenAreasError::DuplicateLayer(_))
        ));
    }
}
