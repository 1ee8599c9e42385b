//! Map layer specifications and their style document form.

use serde_json::{json, Map, Value};

use crate::color::{Color, ColorMatch};

/// Fill color of a polygon layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FillColor {
    /// Every feature uses the same color.
    Constant(Color),
    /// Color is looked up by a feature attribute.
    Match(ColorMatch),
}

impl FillColor {
    fn to_expression(&self) -> Value {
        match self {
            FillColor::Constant(color) => json!(color.to_string()),
            FillColor::Match(matcher) => matcher.to_expression(),
        }
    }
}

/// Paint properties of a fill layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FillPaint {
    /// Fill color.
    pub color: FillColor,
    /// Fill opacity in `0.0..=1.0`.
    pub opacity: f64,
    /// Color of the 1px polygon outline drawn by the fill itself.
    pub outline_color: Color,
}

/// Paint properties of a line layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePaint {
    /// Line color.
    pub color: Color,
    /// Line width in pixels.
    pub width: f64,
    /// Dash pattern in line widths, solid if `None`.
    pub dasharray: Option<Vec<f64>>,
}

impl LinePaint {
    /// Solid line of the given color and width.
    pub fn solid(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            dasharray: None,
        }
    }
}

/// Kind of the layer together with its paint.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    /// Filled polygons.
    Fill(FillPaint),
    /// Stroked lines or polygon borders.
    Line(LinePaint),
    /// Raster tiles.
    Raster,
}

impl LayerKind {
    fn type_name(&self) -> &'static str {
        match self {
            LayerKind::Fill(_) => "fill",
            LayerKind::Line(_) => "line",
            LayerKind::Raster => "raster",
        }
    }
}

/// One map layer: a styled rendering of a source.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    /// Unique layer id.
    pub id: String,
    /// Id of the source the layer draws.
    pub source: String,
    /// Layer kind and paint.
    pub kind: LayerKind,
    /// Whether the layer is drawn.
    pub visible: bool,
}

impl LayerSpec {
    /// Creates a visible layer.
    pub fn new(id: impl Into<String>, source: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            kind,
            visible: true,
        }
    }

    /// Raster layer drawing the given tile source.
    pub fn raster(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(id, source, LayerKind::Raster)
    }

    /// Layer in the MapLibre style specification form.
    pub fn to_json(&self) -> Value {
        let mut layer = Map::new();
        layer.insert("id".into(), json!(self.id));
        layer.insert("type".into(), json!(self.kind.type_name()));
        layer.insert("source".into(), json!(self.source));

        match &self.kind {
            LayerKind::Fill(paint) => {
                layer.insert(
                    "paint".into(),
                    json!({
                        "fill-color": paint.color.to_expression(),
                        "fill-opacity": paint.opacity,
                        "fill-outline-color": paint.outline_color.to_string(),
                    }),
                );
            }
            LayerKind::Line(paint) => {
                let mut props = Map::new();
                props.insert("line-color".into(), json!(paint.color.to_string()));
                props.insert("line-width".into(), json!(paint.width));
                if let Some(dash) = &paint.dasharray {
                    props.insert("line-dasharray".into(), json!(dash));
                }
                layer.insert("paint".into(), Value::Object(props));
            }
            LayerKind::Raster => {}
        }

        if !self.visible {
            layer.insert("layout".into(), json!({ "visibility": "none" }));
        }

        Value::Object(layer)
    }
}
