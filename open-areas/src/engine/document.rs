use geojson::GeoJson;
use serde_json::{json, Map, Value};

use super::{Control, ControlPosition, Cursor, EngineError, MapEngine, MapOptions};
use crate::geometry::LngLatBounds;
use crate::layer::LayerSpec;
use crate::style::{BasemapStyle, TileSource, STYLE_SPEC_VERSION};

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Tiles(TileSource),
    GeoJson(GeoJson),
}

impl Source {
    fn to_json(&self) -> Value {
        match self {
            Source::Tiles(tiles) => tiles.to_json(),
            Source::GeoJson(data) => json!({
                "type": "geojson",
                "data": serde_json::to_value(data).unwrap_or(Value::Null),
            }),
        }
    }
}

/// Camera state of a [`StyleDocument`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Bounds the view was last fitted to.
    pub bounds: LngLatBounds,
    /// Padding of the fit in pixels.
    pub padding: f64,
    /// The view cannot leave these bounds.
    pub max_bounds: Option<LngLatBounds>,
}

/// Headless map engine keeping the composed map as a style document.
///
/// Sources and layers behave as in a rendering engine: ids are unique, layers need an existing
/// source and a source cannot be removed while drawn. [`StyleDocument::to_json`] gives the
/// document for a style-spec compatible renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleDocument {
    container: String,
    sources: Vec<(String, Source)>,
    layers: Vec<LayerSpec>,
    camera: Camera,
    controls: Vec<(Control, ControlPosition)>,
    cursor: Cursor,
    style_loads: u32,
}

impl StyleDocument {
    /// Id of the element the map was created in.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Current camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Current cursor.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Controls in the order they were added.
    pub fn controls(&self) -> &[(Control, ControlPosition)] {
        &self.controls
    }

    /// Number of times a style was loaded, including the initial one.
    pub fn style_loads(&self) -> u32 {
        self.style_loads
    }

    /// Layers bottom to top.
    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    /// Layer with the id.
    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    /// Ids of the registered sources in registration order.
    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|(id, _)| id.as_str())
    }

    /// Data of a GeoJSON source.
    pub fn geojson_source(&self, id: &str) -> Option<&GeoJson> {
        self.sources.iter().find_map(|(source_id, source)| match source {
            Source::GeoJson(data) if source_id == id => Some(data),
            _ => None,
        })
    }

    /// Whether the layer exists and is drawn.
    pub fn is_visible(&self, id: &str) -> bool {
        self.layer(id).is_some_and(|layer| layer.visible)
    }

    /// The composed style document.
    pub fn to_json(&self) -> Value {
        let sources: Map<String, Value> = self
            .sources
            .iter()
            .map(|(id, source)| (id.clone(), source.to_json()))
            .collect();

        json!({
            "version": STYLE_SPEC_VERSION,
            "sources": sources,
            "layers": self.layers.iter().map(LayerSpec::to_json).collect::<Vec<_>>(),
        })
    }

    fn layer_mut(&mut self, id: &str) -> Result<&mut LayerSpec, EngineError> {
        self.layers
            .iter_mut()
            .find(|layer| layer.id == id)
            .ok_or_else(|| EngineError::MissingLayer(id.to_string()))
    }
}

impl MapEngine for StyleDocument {
    type Container = String;

    fn create(container: Self::Container, options: MapOptions) -> Result<Self, EngineError> {
        let mut document = Self {
            container,
            sources: vec![],
            layers: vec![],
            camera: Camera {
                bounds: options.bounds,
                padding: options.padding,
                max_bounds: options.max_bounds,
            },
            controls: vec![],
            cursor: Cursor::Default,
            style_loads: 0,
        };
        document.set_style(&options.style);

        log::debug!("Created map in container {}", document.container);
        Ok(document)
    }

    fn set_style(&mut self, style: &BasemapStyle) {
        self.sources = style
            .sources()
            .iter()
            .map(|(id, source)| (id.clone(), Source::Tiles(source.clone())))
            .collect();
        self.layers = style.layers().to_vec();
        self.style_loads += 1;
    }

    fn add_control(&mut self, control: Control, position: ControlPosition) {
        self.controls.push((control, position));
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.iter().any(|(source_id, _)| source_id == id)
    }

    fn add_source(&mut self, id: &str, data: GeoJson) -> Result<(), EngineError> {
        if self.has_source(id) {
            return Err(EngineError::SourceExists(id.to_string()));
        }

        self.sources.push((id.to_string(), Source::GeoJson(data)));
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError> {
        if let Some(layer) = self.layers.iter().find(|layer| layer.source == id) {
            return Err(EngineError::SourceInUse {
                source_id: id.to_string(),
                layer_id: layer.id.clone(),
            });
        }

        let count = self.sources.len();
        self.sources.retain(|(source_id, _)| source_id != id);
        if self.sources.len() == count {
            return Err(EngineError::MissingSource(id.to_string()));
        }

        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layer(id).is_some()
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), EngineError> {
        if self.has_layer(&layer.id) {
            return Err(EngineError::LayerExists(layer.id));
        }
        if !self.has_source(&layer.source) {
            return Err(EngineError::MissingSource(layer.source));
        }

        self.layers.push(layer);
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
        let count = self.layers.len();
        self.layers.retain(|layer| layer.id != id);
        if self.layers.len() == count {
            return Err(EngineError::MissingLayer(id.to_string()));
        }

        Ok(())
    }

    fn set_layer_visibility(&mut self, id: &str, visible: bool) -> Result<(), EngineError> {
        self.layer_mut(id)?.visible = visible;
        Ok(())
    }

    fn fit_bounds(&mut self, bounds: LngLatBounds, padding: f64) {
        self.camera.bounds = bounds;
        self.camera.padding = padding;
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }
}
