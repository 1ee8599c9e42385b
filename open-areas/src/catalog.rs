//! Catalog of GeoJSON overlays drawn above the basemap.
//!
//! Each [`LayerDescriptor`] is compiled once into an [`Overlay`]: the list of map layers the
//! descriptor produces. Layer ids are derived from the descriptor name:
//!
//! * `{name}-polygons` for the fill of a [`RenderMode::Fill`] overlay,
//! * `{name}-border` for the outline (fill overlays get one only if they have a line color),
//! * `{name}-border-{suffix}` for every [`LineAccent`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::color::{Color, ColorMatch};
use crate::error::OpenAreasError;
use crate::layer::{FillColor, FillPaint, LayerKind, LayerSpec, LinePaint};

const DEFAULT_LINE_WIDTH: f64 = 3.0;

/// How an overlay is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Filled polygons, optionally colored by an attribute.
    Fill,
    /// Lines only.
    Outline,
}

/// Extra line layer drawn over an outline overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAccent {
    /// Suffix of the layer id.
    pub suffix: String,
    /// Line color.
    pub color: Color,
    /// Line width in pixels.
    pub width: f64,
    /// Dash pattern, solid if `None`.
    #[serde(default)]
    pub dasharray: Option<Vec<f64>>,
}

/// Declarative description of a GeoJSON overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    /// Unique name. Used as the source id and as the prefix of the layer ids.
    pub name: String,
    /// Location of the GeoJSON file, relative to the deployment base path unless absolute.
    pub url: String,
    /// How the overlay is drawn.
    pub render_mode: RenderMode,
    /// Feature property the fill color is looked up by.
    #[serde(default)]
    pub style_attribute: Option<String>,
    /// Ordered (attribute value, color) pairs.
    #[serde(default)]
    pub color_mapping: Vec<(String, Color)>,
    /// Color for attribute values missing from `color_mapping`.
    #[serde(default = "default_fallback_color")]
    pub fallback_color: Color,
    /// Fill opacity.
    #[serde(default = "default_fill_opacity")]
    pub fill_opacity: f64,
    /// Color of the thin outline drawn by the fill layer.
    #[serde(default = "default_fill_outline_color")]
    pub fill_outline_color: Color,
    /// Border color.
    #[serde(default)]
    pub line_color: Option<Color>,
    /// Border width in pixels.
    #[serde(default)]
    pub line_width: Option<f64>,
    /// Whether clicks on the fill select features.
    #[serde(default)]
    pub interactive: bool,
    /// Extra lines drawn over the border.
    #[serde(default)]
    pub accents: Vec<LineAccent>,
}

fn default_fallback_color() -> Color {
    Color::FALLBACK
}

fn default_fill_opacity() -> f64 {
    0.4
}

fn default_fill_outline_color() -> Color {
    Color::WHITE
}

impl LayerDescriptor {
    /// Creates a fill overlay description.
    pub fn fill(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            render_mode: RenderMode::Fill,
            style_attribute: None,
            color_mapping: vec![],
            fallback_color: default_fallback_color(),
            fill_opacity: default_fill_opacity(),
            fill_outline_color: default_fill_outline_color(),
            line_color: None,
            line_width: None,
            interactive: false,
            accents: vec![],
        }
    }

    /// Creates an outline overlay description.
    pub fn outline(
        name: impl Into<String>,
        url: impl Into<String>,
        line_color: Color,
        line_width: f64,
    ) -> Self {
        Self {
            render_mode: RenderMode::Outline,
            line_color: Some(line_color),
            line_width: Some(line_width),
            ..Self::fill(name, url)
        }
    }

    /// Sets the attribute and colors the fill is looked up by.
    pub fn with_color_mapping<I, S>(mut self, attribute: impl Into<String>, mapping: I) -> Self
    where
        I: IntoIterator<Item = (S, &'static str)>,
        S: Into<String>,
    {
        self.style_attribute = Some(attribute.into());
        self.color_mapping = mapping
            .into_iter()
            .filter_map(|(value, hex)| match Color::from_hex(hex) {
                Ok(color) => Some((value.into(), color)),
                Err(err) => {
                    log::warn!("Skipping color mapping entry: {err}");
                    None
                }
            })
            .collect();
        self
    }

    /// Adds a border to a fill overlay.
    pub fn with_border(mut self, color: Color, width: f64) -> Self {
        self.line_color = Some(color);
        self.line_width = Some(width);
        self
    }

    /// Marks the overlay as the one clicks select features from.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Adds an accent line.
    pub fn with_accent(mut self, accent: LineAccent) -> Self {
        self.accents.push(accent);
        self
    }

    /// Id of the fill layer.
    pub fn polygons_layer_id(&self) -> String {
        format!("{}-polygons", self.name)
    }

    /// Id of the border layer.
    pub fn border_layer_id(&self) -> String {
        format!("{}-border", self.name)
    }

    fn accent_layer_id(&self, accent: &LineAccent) -> String {
        format!("{}-border-{}", self.name, accent.suffix)
    }

    fn fill_color(&self) -> FillColor {
        match &self.style_attribute {
            Some(attribute) => FillColor::Match(ColorMatch::new(
                attribute.clone(),
                self.color_mapping.iter().cloned(),
                self.fallback_color,
            )),
            None => FillColor::Constant(self.fallback_color),
        }
    }

    fn border_paint(&self) -> Option<LinePaint> {
        let color = match (self.render_mode, self.line_color) {
            (_, Some(color)) => color,
            (RenderMode::Outline, None) => Color::BLACK,
            (RenderMode::Fill, None) => return None,
        };

        Some(LinePaint::solid(
            color,
            self.line_width.unwrap_or(DEFAULT_LINE_WIDTH),
        ))
    }

    fn compile(&self) -> Vec<LayerSpec> {
        let mut layers = vec![];
        if self.render_mode == RenderMode::Fill {
            layers.push(LayerSpec::new(
                self.polygons_layer_id(),
                &self.name,
                LayerKind::Fill(FillPaint {
                    color: self.fill_color(),
                    opacity: self.fill_opacity,
                    outline_color: self.fill_outline_color,
                }),
            ));
        }

        if let Some(paint) = self.border_paint() {
            layers.push(LayerSpec::new(
                self.border_layer_id(),
                &self.name,
                LayerKind::Line(paint),
            ));
        }

        for accent in &self.accents {
            layers.push(LayerSpec::new(
                self.accent_layer_id(accent),
                &self.name,
                LayerKind::Line(LinePaint {
                    color: accent.color,
                    width: accent.width,
                    dasharray: accent.dasharray.clone(),
                }),
            ));
        }

        layers
    }
}

/// Compiled overlay: the descriptor and the layers it is drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    descriptor: LayerDescriptor,
    layers: Vec<LayerSpec>,
}

impl Overlay {
    /// Descriptor the overlay was compiled from.
    pub fn descriptor(&self) -> &LayerDescriptor {
        &self.descriptor
    }

    /// Source id of the overlay.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Layers in drawing order.
    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    /// Ids of the layers in drawing order.
    pub fn layer_ids(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|layer| layer.id.as_str())
    }

    /// Id of the fill layer, if the overlay has one.
    pub fn polygons_layer_id(&self) -> Option<&str> {
        self.layers
            .iter()
            .find(|layer| matches!(layer.kind, LayerKind::Fill(_)))
            .map(|layer| layer.id.as_str())
    }
}

/// Validated and compiled list of overlays.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    overlays: Vec<Overlay>,
}

impl Catalog {
    /// Compiles the descriptors.
    ///
    /// Fails if two descriptors share a name or derive the same layer id, since the second one
    /// would replace the first on the map.
    pub fn new(
        descriptors: impl IntoIterator<Item = LayerDescriptor>,
    ) -> Result<Self, OpenAreasError> {
        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        let mut overlays = vec![];

        for descriptor in descriptors {
            if !names.insert(descriptor.name.clone()) {
                return Err(OpenAreasError::DuplicateLayer(descriptor.name));
            }

            let layers = descriptor.compile();
            for layer in &layers {
                if !ids.insert(layer.id.clone()) {
                    return Err(OpenAreasError::DuplicateLayer(layer.id.clone()));
                }
            }

            log::debug!(
                "Compiled overlay {} into {} layer(s)",
                descriptor.name,
                layers.len()
            );
            overlays.push(Overlay { descriptor, layers });
        }

        if overlays.iter().filter(|o| o.descriptor.interactive).count() > 1 {
            log::warn!("More than one interactive overlay; only the first one handles clicks");
        }

        Ok(Self { overlays })
    }

    /// Overlays of the open areas inventory map.
    pub fn builtin() -> Self {
        Self {
            overlays: builtin_descriptors()
                .into_iter()
                .map(|descriptor| Overlay {
                    layers: descriptor.compile(),
                    descriptor,
                })
                .collect(),
        }
    }

    /// Overlays in drawing order.
    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    /// Overlay with the given name.
    pub fn get(&self, name: &str) -> Option<&Overlay> {
        self.overlays.iter().find(|overlay| overlay.name() == name)
    }

    /// Overlay whose features are selected by clicks.
    pub fn interactive(&self) -> Option<&Overlay> {
        self.overlays
            .iter()
            .find(|overlay| overlay.descriptor.interactive)
    }

    /// Whether any overlay draws a layer with the given id.
    pub fn contains_layer(&self, layer_id: &str) -> bool {
        self.overlays
            .iter()
            .any(|overlay| overlay.layer_ids().any(|id| id == layer_id))
    }
}

fn builtin_descriptors() -> Vec<LayerDescriptor> {
    vec![
        LayerDescriptor::fill("properties", "data/properties.geojson")
            .with_color_mapping(
                "Reason",
                [
                    ("Borough owned, Municipal Park, Riparian Buffer", "#000000"),
                    ("Borough owned, Municipal Open Space", "#000000"),
                    (
                        "Bucks County Municipal Open Space Program Easement (Preserved)",
                        "#000000",
                    ),
                ],
            )
            .with_border(Color::BLACK, 3.0)
            .with_interactive(true),
        LayerDescriptor::fill("landuse", "data/landuse.geojson").with_color_mapping(
            "LUP1CATN",
            [
                ("Agriculture", "#979c89"),
                ("Commercial", "#7e6d42"),
                ("Community Services", "#536d37"),
                ("Manufacturing", "#6c6c6c"),
                ("Military", "#6c6c6c"),
                ("Mining", "#6c6c6c"),
                ("Parking: Agriculture", "#4f4f4f"),
                ("Parking: Commercial", "#4f4f4f"),
                ("Parking: Community Services", "#4f4f4f"),
                ("Parking: Manufacturing", "#4f4f4f"),
                ("Parking: Military", "#4f4f4f"),
                ("Parking: Mining", "#4f4f4f"),
                ("Parking: Mobile Home", "#4f4f4f"),
                ("Parking: Multi-Family", "#4f4f4f"),
                ("Parking: Recreation", "#4f4f4f"),
                ("Parking: Transportation", "#4f4f4f"),
                ("Parking: Utility", "#4f4f4f"),
                ("Recreation", "#337759"),
                ("Residential: Mobile Home", "#738e7c"),
                ("Residential: Multi-Family", "#738e7c"),
                ("Residential: Single-Family", "#738e7c"),
                ("Transportation", "#6d6d6d"),
                ("Utility", "#8f8467"),
                ("Vacant", "#8b866d"),
                ("Water", "#0090b6"),
                ("Wooded", "#225e44"),
            ],
        ),
        LayerDescriptor::outline(
            "streams",
            "data/streams.geojson",
            Color::rgb(0x00, 0x90, 0xb6),
            3.0,
        ),
        LayerDescriptor::outline("borough", "data/borough.geojson", Color::WHITE, 3.0)
            .with_accent(LineAccent {
                suffix: "outer".into(),
                color: Color::WHITE,
                width: 6.0,
                dasharray: None,
            })
            .with_accent(LineAccent {
                suffix: "inner".into(),
                color: Color::BLACK,
                width: 2.0,
                dasharray: Some(vec![3.0, 3.0]),
            }),
    ]
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let builtin = Catalog::builtin();
        let validated = Catalog::new(builtin_descriptors()).expect("builtin catalog is valid");
        assert_eq!(builtin, validated);
    }

    #[test]
    fn builtin_layer_ids() {
        let catalog = Catalog::builtin();
        let ids: Vec<_> = catalog
            .overlays()
            .iter()
            .flat_map(|overlay| overlay.layer_ids())
            .collect();

        assert_eq!(
            ids,
            [
                "properties-polygons",
                "properties-border",
                "landuse-polygons",
                "streams-border",
                "borough-border",
                "borough-border-outer",
                "borough-border-inner",
            ]
        );
    }

    #[test]
    fn interactive_overlay_is_properties() {
        let catalog = Catalog::builtin();
        let interactive = catalog.interactive().unwrap();
        assert_eq!(interactive.name(), "properties");
        assert_eq!(interactive.polygons_layer_id(), Some("properties-polygons"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = Catalog::new([
            LayerDescriptor::fill("parks", "a.geojson"),
            LayerDescriptor::outline("parks", "b.geojson", Color::BLACK, 1.0),
        ]);
        assert!(matches!(result, Err(OpenAreasError::DuplicateLayer(id)) if id == "parks"));
    }

    #[test]
    fn colliding_layer_ids_are_rejected() {
        let result = Catalog::new([
            LayerDescriptor::fill("a-border", "a.geojson"),
            LayerDescriptor::outline("a", "b.geojson", Color::BLACK, 1.0).with_accent(LineAccent {
                suffix: "polygons".into(),
                color: Color::BLACK,
                width: 1.0,
                dasharray: None,
            }),
        ]);
        assert!(
            matches!(result, Err(OpenAreasError::DuplicateLayer(id)) if id == "a-border-polygons")
        );
    }

    #[test]
    fn fill_without_attribute_uses_fallback() {
        let catalog = Catalog::new([LayerDescriptor::fill("lots", "lots.geojson")]).unwrap();
        let layer = &catalog.overlays()[0].layers()[0];
        assert_eq!(layer.to_json()["paint"]["fill-color"], json!("#aaaaaa"));
        assert_eq!(catalog.overlays()[0].layers().len(), 1);
    }

    #[test]
    fn descriptor_from_json() {
        let descriptor: LayerDescriptor = serde_json::from_value(json!({
            "name": "trails",
            "url": "data/trails.geojson",
            "render_mode": "outline",
            "line_color": "#336699",
            "line_width": 2.0,
        }))
        .unwrap();

        assert_eq!(descriptor.render_mode, RenderMode::Outline);
        assert_eq!(descriptor.fill_opacity, 0.4);
        let catalog = Catalog::new([descriptor]).unwrap();
        assert_eq!(
            catalog.overlays()[0].layers()[0].to_json(),
            json!({
                "id": "trails-border",
                "type": "line",
                "source": "trails",
                "paint": { "line-color": "#336699", "line-width": 2.0 },
            })
        );
    }
}
