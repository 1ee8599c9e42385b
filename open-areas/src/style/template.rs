//! Tile URL templates.

use std::f64::consts::PI;

const EARTH_RADIUS: f64 = 6378137.0;
const HALF_CIRCUMFERENCE: f64 = PI * EARTH_RADIUS;

/// Highest zoom level a [`TileIndex`] can address.
pub const MAX_ZOOM: u32 = 30;

/// Index of a tile in the slippy map grid. Always inside the grid of its zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex {
    x: u32,
    y: u32,
    z: u32,
}

impl TileIndex {
    /// Creates a new index. Returns `None` if the zoom level is above [`MAX_ZOOM`] or the
    /// column or row is outside of the `2^z` by `2^z` grid.
    pub fn new(x: u32, y: u32, z: u32) -> Option<Self> {
        if z > MAX_ZOOM {
            return None;
        }

        let size = 1u32 << z;
        (x < size && y < size).then_some(Self { x, y, z })
    }

    /// Column.
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Row, counted from the north.
    pub fn y(&self) -> u32 {
        self.y
    }

    /// Zoom level.
    pub fn z(&self) -> u32 {
        self.z
    }

    /// Same tile with the row counted from the south.
    pub fn flipped(&self) -> Self {
        let rows = 1u32 << self.z;
        Self {
            y: rows - 1 - self.y,
            ..*self
        }
    }

    /// Tile extent in Web Mercator metres as `[min_x, min_y, max_x, max_y]`.
    pub fn mercator_bbox(&self, tile_size: u32) -> [f64; 4] {
        let tile_size = tile_size as f64;
        let resolution = (2.0 * HALF_CIRCUMFERENCE / tile_size) / 2f64.powi(self.z as i32);
        let merc = |pixel: f64| pixel * resolution - HALF_CIRCUMFERENCE;

        let south_row = self.flipped().y as f64;
        [
            merc(self.x as f64 * tile_size),
            merc(south_row * tile_size),
            merc((self.x as f64 + 1.0) * tile_size),
            merc((south_row + 1.0) * tile_size),
        ]
    }
}

/// Substitutes `{z}`, `{x}`, `{y}` and `{bbox-epsg-3857}` in a tile URL template.
pub fn expand_tile_url(template: &str, index: TileIndex, tile_size: u32) -> String {
    let mut url = template
        .replace("{z}", &index.z.to_string())
        .replace("{x}", &index.x.to_string())
        .replace("{y}", &index.y.to_string());

    if url.contains("{bbox-epsg-3857}") {
        let [min_x, min_y, max_x, max_y] = index.mercator_bbox(tile_size);
        url = url.replace(
            "{bbox-epsg-3857}",
            &format!("{min_x},{min_y},{max_x},{max_y}"),
        );
    }

    url
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn xyz_substitution() {
        let url = expand_tile_url(
            "https://services.arcgisonline.com/arcgis/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
            TileIndex::new(4768, 6195, 14).unwrap(),
            256,
        );
        assert!(url.ends_with("/tile/14/6195/4768"));
    }

    #[test]
    fn world_tile_bbox() {
        let bbox = TileIndex::new(0, 0, 0).unwrap().mercator_bbox(256);
        assert_relative_eq!(bbox[0], -20037508.342789244);
        assert_relative_eq!(bbox[1], -20037508.342789244);
        assert_relative_eq!(bbox[2], 20037508.342789244);
        assert_relative_eq!(bbox[3], 20037508.342789244);
    }

    #[test]
    fn north_west_quadrant_bbox() {
        let bbox = TileIndex::new(0, 0, 1).unwrap().mercator_bbox(256);
        assert_relative_eq!(bbox[0], -20037508.342789244);
        assert_relative_eq!(bbox[1], 0.0);
        assert_relative_eq!(bbox[2], 0.0);
        assert_relative_eq!(bbox[3], 20037508.342789244);
    }

    #[test]
    fn bbox_substitution() {
        let url = expand_tile_url(
            "export?bbox={bbox-epsg-3857}&f=image",
            TileIndex::new(1, 0, 1).unwrap(),
            256,
        );
        let bbox: Vec<f64> = url
            .trim_start_matches("export?bbox=")
            .trim_end_matches("&f=image")
            .split(',')
            .map(|v| v.parse().unwrap())
            .collect();

        assert_eq!(bbox.len(), 4);
        assert_relative_eq!(bbox[0], 0.0);
        assert_relative_eq!(bbox[1], 0.0);
        assert_relative_eq!(bbox[2], 20037508.342789244);
        assert_relative_eq!(bbox[3], 20037508.342789244);
    }

    #[test]
    fn index_outside_grid_is_rejected() {
        assert_eq!(TileIndex::new(0, 5, 2), None);
        assert_eq!(TileIndex::new(4, 0, 2), None);
        assert_eq!(TileIndex::new(0, 0, MAX_ZOOM + 1), None);
        assert_eq!(TileIndex::new(0, 0, 32), None);

        let last = TileIndex::new(3, 3, 2).unwrap();
        assert_eq!(last.flipped().y(), 0);
        let deepest = TileIndex::new(0, (1 << MAX_ZOOM) - 1, MAX_ZOOM).unwrap();
        assert_eq!(deepest.flipped().y(), 0);
    }

    #[test]
    fn flipped_counts_rows_from_south() {
        let index = TileIndex::new(3, 1, 2).unwrap();
        assert_eq!(index.flipped(), TileIndex::new(3, 2, 2).unwrap());
        assert_eq!(index.flipped().flipped(), index);
    }
}
