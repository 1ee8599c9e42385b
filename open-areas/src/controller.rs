//! The map controller: owns the map engine and keeps overlays, selection and visibility in sync
//! with it.
//!
//! Overlay loading is a state machine driven by engine events:
//!
//! ```text
//!            begin_load            finish_load
//! Unloaded ─────────────► Loading ─────────────► Loaded
//!    ▲                      │                      │
//!    └───── fail_load ──────┘                      │
//!    └──────────────────── set_style ──────────────┘
//! ```
//!
//! Every [`MapController::begin_load`] and [`MapController::set_style`] call invalidates the
//! tickets issued before it, so results of an outdated load are dropped instead of being drawn
//! over the current style.

use geojson::{Feature, GeoJson};

use crate::catalog::{Catalog, Overlay};
use crate::config::{MapConfig, SelectionBehavior};
use crate::engine::{
    Control, ControlPosition, Cursor, EngineEvent, HoverEvent, MapEngine, MapOptions,
};
use crate::error::OpenAreasError;
use crate::geometry::BBox;
use crate::layer::{LayerKind, LayerSpec, LinePaint};
use crate::loader::GeoJsonLoader;
use crate::selection::{SelectionState, VisibilityTable};
use crate::style::StyleRegistry;

/// Id of the source and the layer outlining the selected feature.
pub const HIGHLIGHT_ID: &str = "selected-parcel-outline";

/// Overlay loading state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// The current style has no overlays yet.
    Unloaded,
    /// Overlays are being added.
    Loading,
    /// All overlays of the current style are on the map.
    Loaded,
}

/// Identifies one overlay load. Only the most recently issued ticket is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Owns the map engine and applies the catalog, selection and visibility to it.
pub struct MapController<E: MapEngine> {
    engine: E,
    config: MapConfig,
    catalog: Catalog,
    styles: StyleRegistry,
    active_style: String,
    selection: SelectionState,
    visibility: VisibilityTable,
    state: LoadState,
    epoch: u64,
}

impl<E: MapEngine> MapController<E> {
    /// Creates the map.
    ///
    /// Loads the boundary overlay, pads its extent by [`MapConfig::bounds_padding`] and creates
    /// the engine with the view limited to the padded extent. Overlays are not added until the
    /// engine reports [`EngineEvent::Load`] and [`MapController::load_layers`] runs.
    ///
    /// Failing to load the boundary fails the initialization; there is no retry.
    pub async fn initialize<L>(
        container: E::Container,
        config: MapConfig,
        styles: StyleRegistry,
        loader: &L,
    ) -> Result<Self, OpenAreasError>
    where
        L: GeoJsonLoader + ?Sized,
    {
        let catalog = config.catalog()?;
        let boundary = catalog
            .get(&config.boundary_overlay)
            .ok_or_else(|| OpenAreasError::UnknownOverlay(config.boundary_overlay.clone()))?;

        let url = config.asset_url(&boundary.descriptor().url);
        let data = loader.load(&url).await?;
        let bounds = BBox::of_geojson(&data)?.padded(config.bounds_padding);
        log::info!("Map bounds from {url}: {bounds:?}");

        let style = styles.get(&config.initial_style)?.clone();
        let mut engine = E::create(
            container,
            MapOptions {
                style,
                bounds,
                max_bounds: Some(bounds),
                padding: config.view_padding,
            },
        )?;
        engine.add_control(Control::Navigation, ControlPosition::TopRight);

        Ok(Self {
            engine,
            active_style: config.initial_style.clone(),
            config,
            catalog,
            styles,
            selection: SelectionState::default(),
            visibility: VisibilityTable::default(),
            state: LoadState::Unloaded,
            epoch: 0,
        })
    }

    /// The map engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the map engine for operations the controller does not track, e.g.
    /// camera moves.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Attributes of the selected feature.
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Visibility requested through [`MapController::set_layer_visibility`].
    pub fn visibility(&self) -> &VisibilityTable {
        &self.visibility
    }

    /// Overlay loading state.
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Name of the current basemap style.
    pub fn active_style(&self) -> &str {
        &self.active_style
    }

    /// The overlays.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Available basemap styles.
    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    /// Configuration the map was created with.
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Returns `true` if the event requires [`MapController::load_layers`] to run.
    ///
    /// Engines report style events repeatedly; only the first one after a style change starts a
    /// load.
    pub fn handle_event(&self, event: EngineEvent) -> bool {
        let needs_load = self.state == LoadState::Unloaded;
        log::trace!("Engine event {event:?} in state {:?}", self.state);
        needs_load
    }

    /// Switches the basemap. Overlays are discarded with the old style and must be loaded
    /// again.
    pub fn set_style(&mut self, name: &str) -> Result<(), OpenAreasError> {
        let style = self.styles.get(name)?;
        self.engine.set_style(style);

        log::info!("Switched basemap from {} to {name}", self.active_style);
        self.active_style = name.to_string();
        self.epoch += 1;
        self.state = LoadState::Unloaded;
        Ok(())
    }

    /// Records the requested visibility of a layer and applies it if the layer is on the map.
    ///
    /// The value is applied again after every overlay load, so it survives style switches.
    pub fn set_layer_visibility(
        &mut self,
        layer_id: &str,
        visible: bool,
    ) -> Result<(), OpenAreasError> {
        self.visibility.set(layer_id, visible);
        if self.engine.has_layer(layer_id) {
            self.engine.set_layer_visibility(layer_id, visible)?;
        } else {
            log::debug!("Layer {layer_id} is not on the map yet, visibility is deferred");
        }

        Ok(())
    }

    /// Loads all overlays of the catalog and adds them to the map.
    ///
    /// Safe to run repeatedly: overlays already on the map are replaced. If an asset fails to
    /// load, overlays added before it stay on the map and the error is returned.
    pub async fn load_layers<L>(&mut self, loader: &L) -> Result<(), OpenAreasError>
    where
        L: GeoJsonLoader + ?Sized,
    {
        let ticket = self.begin_load();
        let assets: Vec<(String, String)> = self
            .catalog
            .overlays()
            .iter()
            .map(|overlay| {
                (
                    overlay.name().to_string(),
                    self.config.asset_url(&overlay.descriptor().url),
                )
            })
            .collect();

        for (name, url) in assets {
            let data = match loader.load(&url).await {
                Ok(data) => data,
                Err(err) => {
                    log::error!("Failed to load overlay {name}: {err}");
                    self.fail_load(ticket);
                    return Err(err.into());
                }
            };

            if let Err(err) = self.apply_overlay(ticket, &name, data) {
                self.fail_load(ticket);
                return Err(err);
            }
        }

        self.finish_load(ticket);
        Ok(())
    }

    /// Starts an overlay load. Tickets issued earlier become stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.epoch += 1;
        self.state = LoadState::Loading;
        log::debug!("Loading overlays for style {}", self.active_style);
        LoadTicket(self.epoch)
    }

    /// Whether the ticket belongs to the current load.
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.epoch && self.state == LoadState::Loading
    }

    /// Adds one overlay with its data, replacing it if it is already on the map.
    ///
    /// Returns `false` without touching the map if the ticket is stale.
    pub fn apply_overlay(
        &mut self,
        ticket: LoadTicket,
        name: &str,
        data: GeoJson,
    ) -> Result<bool, OpenAreasError> {
        if !self.is_current(ticket) {
            log::debug!("Dropping stale data for overlay {name}");
            return Ok(false);
        }

        let overlay = self
            .catalog
            .get(name)
            .ok_or_else(|| OpenAreasError::UnknownOverlay(name.to_string()))?;
        let hidden = self.hidden_by_selection(overlay);

        for id in overlay.layer_ids() {
            if self.engine.has_layer(id) {
                self.engine.remove_layer(id)?;
            }
        }
        if self.engine.has_source(name) {
            self.engine.remove_source(name)?;
        }

        self.engine.add_source(name, data)?;
        for layer in overlay.layers() {
            let mut layer = layer.clone();
            layer.visible = !hidden;
            self.engine.add_layer(layer)?;
        }

        log::debug!("Added overlay {name}");
        Ok(true)
    }

    /// Completes the load: applies the recorded visibility and keeps the selection outline on
    /// top. Returns `false` if the ticket is stale.
    pub fn finish_load(&mut self, ticket: LoadTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }

        for (layer_id, visible) in self.visibility.iter() {
            if !self.engine.has_layer(layer_id) {
                continue;
            }
            if let Err(err) = self.engine.set_layer_visibility(layer_id, visible) {
                log::warn!("Failed to restore visibility of {layer_id}: {err}");
            }
        }

        if self.engine.has_layer(HIGHLIGHT_ID) {
            let layer = self.highlight_layer();
            let raised = self
                .engine
                .remove_layer(HIGHLIGHT_ID)
                .and_then(|()| self.engine.add_layer(layer));
            if let Err(err) = raised {
                log::warn!("Failed to keep the selection outline on top: {err}");
            }
        }

        self.state = LoadState::Loaded;
        log::info!("Overlays loaded for style {}", self.active_style);
        true
    }

    /// Abandons the load. The next engine event starts a new one.
    pub fn fail_load(&mut self, ticket: LoadTicket) {
        if self.is_current(ticket) {
            self.state = LoadState::Unloaded;
        }
    }

    /// Handles a click on a layer. `features` are the hit features, topmost first.
    ///
    /// Only the fill layer of the interactive overlay reacts, and only to its topmost feature.
    /// A click that hits nothing keeps the current selection. Returns whether a feature was
    /// selected.
    pub fn handle_click(
        &mut self,
        layer_id: &str,
        features: &[Feature],
    ) -> Result<bool, OpenAreasError> {
        if !self.is_interactive_layer(layer_id) {
            return Ok(false);
        }

        let Some(feature) = features.first() else {
            return Ok(false);
        };

        self.select_feature(feature.clone())?;
        Ok(true)
    }

    /// Changes the cursor when the mouse enters or leaves the interactive layer.
    pub fn handle_hover(&mut self, layer_id: &str, event: HoverEvent) {
        if !self.is_interactive_layer(layer_id) {
            return;
        }

        self.engine.set_cursor(match event {
            HoverEvent::Enter => Cursor::Pointer,
            HoverEvent::Leave => Cursor::Default,
        });
    }

    /// Selects the feature: stores its attributes, replacing the previous selection, and fits
    /// the view to it. With [`SelectionBehavior::HighlightOutline`] the interactive overlay is
    /// hidden and the feature is outlined instead.
    pub fn select_feature(&mut self, feature: Feature) -> Result<(), OpenAreasError> {
        let bbox = BBox::of_feature(&feature)?;

        self.selection
            .select(feature.properties.clone().unwrap_or_default());
        if self.config.selection == SelectionBehavior::HighlightOutline {
            self.set_interactive_visibility(false)?;
        }

        self.engine
            .fit_bounds(bbox.bounds(), self.config.selection.fit_padding());

        if self.config.selection == SelectionBehavior::HighlightOutline {
            self.remove_highlight()?;
            let layer = self.highlight_layer();
            self.engine
                .add_source(HIGHLIGHT_ID, GeoJson::Feature(feature))?;
            self.engine.add_layer(layer)?;
        }

        Ok(())
    }

    /// Removes the selection outline, shows the interactive overlay again and clears the
    /// selection.
    pub fn clear_selection(&mut self) -> Result<(), OpenAreasError> {
        if self.engine.has_layer(HIGHLIGHT_ID) {
            self.remove_highlight()?;
            self.set_interactive_visibility(true)?;
        }

        self.selection.clear();
        Ok(())
    }

    fn is_interactive_layer(&self, layer_id: &str) -> bool {
        self.catalog
            .interactive()
            .and_then(Overlay::polygons_layer_id)
            .is_some_and(|id| id == layer_id)
    }

    fn hidden_by_selection(&self, overlay: &Overlay) -> bool {
        self.config.selection == SelectionBehavior::HighlightOutline
            && overlay.descriptor().interactive
            && self.engine.has_layer(HIGHLIGHT_ID)
    }

    fn highlight_layer(&self) -> LayerSpec {
        LayerSpec::new(
            HIGHLIGHT_ID,
            HIGHLIGHT_ID,
            LayerKind::Line(LinePaint::solid(
                self.config.highlight_color,
                self.config.highlight_width,
            )),
        )
    }

    fn remove_highlight(&mut self) -> Result<(), OpenAreasError> {
        if self.engine.has_layer(HIGHLIGHT_ID) {
            self.engine.remove_layer(HIGHLIGHT_ID)?;
        }
        if self.engine.has_source(HIGHLIGHT_ID) {
            self.engine.remove_source(HIGHLIGHT_ID)?;
        }
        Ok(())
    }

    fn set_interactive_visibility(&mut self, visible: bool) -> Result<(), OpenAreasError> {
        let Some(overlay) = self.catalog.interactive() else {
            return Ok(());
        };

        for id in overlay.layer_ids() {
            if self.engine.has_layer(id) {
                self.engine.set_layer_visibility(id, visible)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::StaticLoader;
    use crate::StyleDocument;

    fn controller() -> MapController<StyleDocument> {
        let loader = StaticLoader::new().with_asset(
            "/open-areas-inventory-map/data/borough.geojson",
            r#"{"type":"Point","coordinates":[-75.1,40.3]}"#,
        );
        tokio_test::block_on(MapController::initialize(
            "map".to_string(),
            MapConfig::default(),
            StyleRegistry::builtin(),
            &loader,
        ))
        .unwrap()
    }

    #[test]
    fn tickets_expire() {
        let mut controller = controller();
        let first = controller.begin_load();
        assert!(controller.is_current(first));

        let second = controller.begin_load();
        assert!(!controller.is_current(first));
        assert!(controller.is_current(second));

        controller.fail_load(first);
        assert_eq!(controller.state(), LoadState::Loading);

        controller.fail_load(second);
        assert_eq!(controller.state(), LoadState::Unloaded);
        assert!(!controller.is_current(second));
    }

    #[test]
    fn loaded_ticket_is_not_current() {
        let mut controller = controller();
        let ticket = controller.begin_load();
        assert!(controller.finish_load(ticket));
        assert!(!controller.is_current(ticket));
        assert!(!controller.finish_load(ticket));
        assert!(!controller.handle_event(EngineEvent::StyleData));
    }

    #[test]
    fn style_switch_invalidates_load() {
        let mut controller = controller();
        let ticket = controller.begin_load();
        controller.set_style("satellite").unwrap();

        assert!(!controller.is_current(ticket));
        assert_eq!(controller.state(), LoadState::Unloaded);
        assert_eq!(controller.active_style(), "satellite");
        assert_eq!(controller.engine().style_loads(), 2);
    }

    #[test]
    fn unknown_overlay_is_rejected() {
        let mut controller = controller();
        let ticket = controller.begin_load();
        let data = GeoJson::from_json_value(serde_json::json!({
            "type": "FeatureCollection",
            "features": [],
        }))
        .unwrap();

        assert!(matches!(
            controller.apply_overlay(ticket, "parks", data),
            Err(OpenAreasError::UnknownOverlay(name)) if name == "parks"
        ));
    }
}
