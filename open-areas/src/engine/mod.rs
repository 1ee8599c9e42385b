//! Interface of the map engine the controller drives.
//!
//! The engine owns everything that is drawn: tile fetching, rendering, hit testing and the
//! camera. The controller only registers sources and layers and reacts to engine events.
//! [`StyleDocument`] is a headless engine that keeps the composed map as a style document.

mod document;

pub use document::{Camera, StyleDocument};
use geojson::GeoJson;
use thiserror::Error;

use crate::geometry::LngLatBounds;
use crate::layer::LayerSpec;
use crate::style::BasemapStyle;

/// Error returned by a map engine when an operation conflicts with the current map contents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Source with this id is already registered.
    #[error("source {0} already exists")]
    SourceExists(String),
    /// Layer with this id is already on the map.
    #[error("layer {0} already exists")]
    LayerExists(String),
    /// Source with this id is not registered.
    #[error("source {0} does not exist")]
    MissingSource(String),
    /// Layer with this id is not on the map.
    #[error("layer {0} does not exist")]
    MissingLayer(String),
    /// Source cannot be removed while a layer draws it.
    #[error("source {source_id} is used by layer {layer_id}")]
    SourceInUse {
        /// Source that was to be removed.
        source_id: String,
        /// Layer still drawing it.
        layer_id: String,
    },
}

/// Options the map is created with.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    /// Initial basemap.
    pub style: BasemapStyle,
    /// Initial view.
    pub bounds: LngLatBounds,
    /// The view cannot be moved outside of these bounds.
    pub max_bounds: Option<LngLatBounds>,
    /// Padding around `bounds` in pixels.
    pub padding: f64,
}

/// Map UI controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Zoom and compass buttons.
    Navigation,
}

/// Corner a control is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPosition {
    /// Top left.
    TopLeft,
    /// Top right.
    TopRight,
    /// Bottom left.
    BottomLeft,
    /// Bottom right.
    BottomRight,
}

/// Mouse cursor over the map canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    /// Engine default (grab).
    #[default]
    Default,
    /// Clickable feature under the mouse.
    Pointer,
}

/// Events the engine reports to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The map finished its first style load.
    Load,
    /// The style was (re)loaded or modified.
    StyleData,
}

/// Mouse entering or leaving features of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverEvent {
    /// Mouse moved onto a feature.
    Enter,
    /// Mouse left the features.
    Leave,
}

/// Map engine driven by the [`MapController`](crate::MapController).
pub trait MapEngine {
    /// Handle of the element the map is rendered into.
    type Container;

    /// Creates the map in the container.
    fn create(container: Self::Container, options: MapOptions) -> Result<Self, EngineError>
    where
        Self: Sized;

    /// Replaces the basemap. All sources and layers, including overlays, are discarded.
    fn set_style(&mut self, style: &BasemapStyle);

    /// Adds a UI control.
    fn add_control(&mut self, control: Control, position: ControlPosition);

    /// Whether a source with the id is registered.
    fn has_source(&self, id: &str) -> bool;

    /// Registers a GeoJSON source.
    fn add_source(&mut self, id: &str, data: GeoJson) -> Result<(), EngineError>;

    /// Removes a source. Layers drawing it must be removed first.
    fn remove_source(&mut self, id: &str) -> Result<(), EngineError>;

    /// Whether a layer with the id is on the map.
    fn has_layer(&self, id: &str) -> bool;

    /// Adds a layer on top of the existing ones.
    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), EngineError>;

    /// Removes a layer.
    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError>;

    /// Shows or hides a layer.
    fn set_layer_visibility(&mut self, id: &str, visible: bool) -> Result<(), EngineError>;

    /// Moves the camera so that the bounds fit the view with the padding in pixels.
    fn fit_bounds(&mut self, bounds: LngLatBounds, padding: f64);

    /// Sets the cursor shown over the map canvas.
    fn set_cursor(&mut self, cursor: Cursor);
}
