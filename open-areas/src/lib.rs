//! Declarative composition of an interactive open-space map.
//!
//! The crate describes the overlays of the map (a [`Catalog`] of [`LayerDescriptor`]s), the
//! basemaps it can switch between (a [`StyleRegistry`]) and drives a [`MapEngine`] through the
//! [`MapController`], which keeps overlays, the selected feature and the overlay visibility in
//! sync with the engine across basemap switches.
//!
//! ```no_run
//! use open_areas::{MapConfig, MapController, StaticLoader, StyleDocument, StyleRegistry};
//!
//! # async fn run(loader: StaticLoader) -> Result<(), open_areas::OpenAreasError> {
//! let mut controller: MapController<StyleDocument> = MapController::initialize(
//!     "map".to_string(),
//!     MapConfig::default(),
//!     StyleRegistry::builtin(),
//!     &loader,
//! )
//! .await?;
//! controller.load_layers(&loader).await?;
//! controller.set_layer_visibility("landuse-polygons", false)?;
//! println!("{}", controller.engine().to_json());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod color;
pub mod config;
pub mod controller;
pub mod engine;
mod error;
pub mod geometry;
pub mod layer;
pub mod loader;
pub mod selection;
pub mod storage;
pub mod style;

pub use catalog::{Catalog, LayerDescriptor, RenderMode};
pub use color::{Color, ColorMatch};
pub use config::{MapConfig, SelectionBehavior};
pub use controller::{LoadState, LoadTicket, MapController};
pub use engine::{MapEngine, StyleDocument};
pub use error::OpenAreasError;
#[cfg(not(target_arch = "wasm32"))]
pub use loader::FileLoader;
#[cfg(feature = "http")]
pub use loader::HttpLoader;
pub use loader::{GeoJsonLoader, StaticLoader};
pub use selection::{SelectionState, VisibilityTable};
pub use style::{BasemapStyle, StyleRegistry};
