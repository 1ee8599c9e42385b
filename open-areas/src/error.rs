//! Error types of the crate.

use thiserror::Error;

use crate::engine::EngineError;
use crate::loader::LoadError;

/// Error returned by the map composition operations.
#[derive(Debug, Error)]
pub enum OpenAreasError {
    /// Basemap style with the given name is not registered.
    #[error("unknown basemap style: {0}")]
    UnknownStyle(String),

    /// Two catalog entries derive the same map layer id.
    #[error("layer id {0} is defined more than once in the catalog")]
    DuplicateLayer(String),

    /// Overlay with the given name is not in the catalog.
    #[error("overlay {0} is not in the catalog")]
    UnknownOverlay(String),

    /// Geometry has no coordinates, so no bounding box can be computed.
    #[error("geometry has no coordinates")]
    EmptyGeometry,

    /// Color string could not be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// Failed to load a data asset.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The map engine rejected an operation.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
