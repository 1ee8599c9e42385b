//! Basemap styles: raster tile sources and the layers that draw them.

mod registry;
mod template;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use registry::StyleRegistry;
pub use template::{expand_tile_url, TileIndex, MAX_ZOOM};

use crate::layer::LayerSpec;

/// Version of the style specification the documents are written in.
pub const STYLE_SPEC_VERSION: u32 = 8;

/// Tile addressing scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileScheme {
    /// Slippy map tiles, y grows southwards.
    Xyz,
    /// OSGeo TMS, y grows northwards.
    Tms,
}

/// Raster tile source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSource {
    /// Tile URL templates, see [`expand_tile_url`].
    pub tiles: Vec<String>,
    /// Tile size in pixels.
    #[serde(rename = "tileSize")]
    pub tile_size: u32,
    /// Attribution HTML shown by the map.
    pub attribution: String,
    /// Addressing scheme, `xyz` when not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<TileScheme>,
}

impl TileSource {
    /// Source with a single 256px tile template.
    pub fn new(template: impl Into<String>, attribution: impl Into<String>) -> Self {
        Self {
            tiles: vec![template.into()],
            tile_size: 256,
            attribution: attribution.into(),
            scheme: None,
        }
    }

    /// Sets the addressing scheme.
    pub fn with_scheme(mut self, scheme: TileScheme) -> Self {
        self.scheme = Some(scheme);
        self
    }

    /// URLs of the given tile, one per template.
    pub fn tile_urls(&self, index: TileIndex) -> Vec<String> {
        let index = match self.scheme {
            Some(TileScheme::Tms) => index.flipped(),
            _ => index,
        };

        self.tiles
            .iter()
            .map(|template| expand_tile_url(template, index, self.tile_size))
            .collect()
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut source = json!({ "type": "raster" });
        if let (Value::Object(target), Ok(Value::Object(fields))) =
            (&mut source, serde_json::to_value(self))
        {
            target.extend(fields);
        }
        source
    }
}

/// Self-contained basemap: tile sources and the raster layers drawing them, bottom to top.
#[derive(Debug, Clone, PartialEq)]
pub struct BasemapStyle {
    sources: BTreeMap<String, TileSource>,
    layers: Vec<LayerSpec>,
}

impl BasemapStyle {
    /// Empty style.
    pub fn new() -> Self {
        Self {
            sources: BTreeMap::new(),
            layers: vec![],
        }
    }

    /// Adds a tile source and a raster layer `{id}-layer` drawing it.
    pub fn with_raster(mut self, id: impl Into<String>, source: TileSource) -> Self {
        let id = id.into();
        self.layers
            .push(LayerSpec::raster(format!("{id}-layer"), id.clone()));
        self.sources.insert(id, source);
        self
    }

    /// Tile sources by id.
    pub fn sources(&self) -> &BTreeMap<String, TileSource> {
        &self.sources
    }

    /// Raster layers, bottom to top.
    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    /// Style document with this basemap and no overlays.
    pub fn to_json(&self) -> Value {
        json!({
            "version": STYLE_SPEC_VERSION,
            "sources": self.sources_json(),
            "layers": self.layers.iter().map(LayerSpec::to_json).collect::<Vec<_>>(),
        })
    }

    fn sources_json(&self) -> serde_json::Map<String, Value> {
        self.sources
            .iter()
            .map(|(id, source)| (id.clone(), source.to_json()))
            .collect()
    }
}

impl Default for BasemapStyle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_json() {
        let style = BasemapStyle::new().with_raster(
            "osm-tiles",
            TileSource::new("https://tile.openstreetmap.org/{z}/{x}/{y}.png", "OSM"),
        );

        assert_eq!(
            style.to_json(),
            json!({
                "version": 8,
                "sources": {
                    "osm-tiles": {
                        "type": "raster",
                        "tiles": ["https://tile.openstreetmap.org/{z}/{x}/{y}.png"],
                        "tileSize": 256,
                        "attribution": "OSM",
                    }
                },
                "layers": [
                    { "id": "osm-tiles-layer", "type": "raster", "source": "osm-tiles" }
                ],
            })
        );
    }

    #[test]
    fn tms_source_flips_rows() {
        let source = TileSource::new("https://example.com/{z}/{x}/{y}.png", "")
            .with_scheme(TileScheme::Tms);
        assert_eq!(
            source.tile_urls(TileIndex::new(3, 1, 2).unwrap()),
            ["https://example.com/2/3/2.png"]
        );
    }
}
