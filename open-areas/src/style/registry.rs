use std::collections::BTreeMap;

use super::{BasemapStyle, TileScheme, TileSource};
use crate::error::OpenAreasError;

const ESRI_IMAGERY_URL: &str =
    "https://services.arcgisonline.com/arcgis/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}";
const ESRI_LABELS_URL: &str = "https://services.arcgisonline.com/arcgis/rest/services/Reference/World_Transportation/MapServer/tile/{z}/{y}/{x}";
const OSM_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
const NEARMAP_2020_URL: &str = "https://imagery.pasda.psu.edu/arcgis/rest/services/pasda/DVRPC2020/MapServer/export?dpi=96&transparent=true&format=png32&layers=show:0&bbox={bbox-epsg-3857}&bboxSR=3857&imageSR=3857&size=256,256&f=image";

/// Basemap styles by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleRegistry {
    styles: BTreeMap<String, BasemapStyle>,
}

impl StyleRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a style, replacing one with the same name.
    pub fn with_style(mut self, name: impl Into<String>, style: BasemapStyle) -> Self {
        self.styles.insert(name.into(), style);
        self
    }

    /// `default` (OpenStreetMap), `satellite` (Esri imagery with transportation labels) and
    /// `nearmap2020` (DVRPC 2020 orthoimagery with the same labels).
    pub fn builtin() -> Self {
        let esri_labels = || {
            TileSource::new(
                ESRI_LABELS_URL,
                r#"Labels &copy; <a href="https://www.esri.com/">Esri</a>"#,
            )
        };

        Self::new()
            .with_style(
                "default",
                BasemapStyle::new().with_raster(
                    "osm-tiles",
                    TileSource::new(
                        OSM_URL,
                        r#"&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors"#,
                    ),
                ),
            )
            .with_style(
                "satellite",
                BasemapStyle::new()
                    .with_raster(
                        "esri-imagery",
                        TileSource::new(
                            ESRI_IMAGERY_URL,
                            r#"Tiles &copy; <a href="https://www.esri.com/">Esri</a>"#,
                        ),
                    )
                    .with_raster("esri-hybrid-labels", esri_labels()),
            )
            .with_style(
                "nearmap2020",
                BasemapStyle::new()
                    .with_raster(
                        "nearmap-2020",
                        TileSource::new(NEARMAP_2020_URL, "&copy; 2020 Nearmap, DVRPC")
                            .with_scheme(TileScheme::Xyz),
                    )
                    .with_raster("esri-hybrid-labels", esri_labels()),
            )
    }

    /// Style with the given name.
    pub fn get(&self, name: &str) -> Result<&BasemapStyle, OpenAreasError> {
        self.styles
            .get(name)
            .ok_or_else(|| OpenAreasError::UnknownStyle(name.to_string()))
    }

    /// Registered style names in alphabetical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.styles.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::TileIndex;

    #[test]
    fn builtin_names() {
        let registry = StyleRegistry::builtin();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            ["default", "nearmap2020", "satellite"]
        );
    }

    #[test]
    fn satellite_draws_imagery_below_labels() {
        let registry = StyleRegistry::builtin();
        let satellite = registry.get("satellite").unwrap();
        let ids: Vec<_> = satellite.layers().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["esri-imagery-layer", "esri-hybrid-labels-layer"]);
    }

    #[test]
    fn nearmap_uses_bbox_requests() {
        let registry = StyleRegistry::builtin();
        let source = &registry.get("nearmap2020").unwrap().sources()["nearmap-2020"];
        let url = &source.tile_urls(TileIndex::new(0, 0, 0).unwrap())[0];
        assert!(url.contains("&bbox=-20037508.34"));
        assert!(!url.contains('{'));
    }

    #[test]
    fn unknown_style() {
        let registry = StyleRegistry::builtin();
        assert!(matches!(
            registry.get("topo"),
            Err(OpenAreasError::UnknownStyle(name)) if name == "topo"
        ));
    }
}
