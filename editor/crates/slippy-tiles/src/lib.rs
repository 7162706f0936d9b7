//! Slippy-map tile keys and WGS84 bounding boxes.
//!
//! Tiles follow the OSM/Web Mercator `z/x/y` scheme. The query queue in the
//! editor deduplicates Overpass requests by [`Tile::key`], so the key format
//! (`"z_x_y"`) is part of the contract and must stay stable.

use std::fmt;
use std::str::FromStr;

/// Highest zoom level accepted by [`Tile::new`] and [`Tile::containing`].
pub const MAX_ZOOM: u8 = 22;

/// Latitude limit of the Web Mercator projection, in degrees.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// One slippy-map tile.
///
/// ## Invariants
/// - `zoom <= MAX_ZOOM`;
/// - `x` and `y` are both below `2^zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tile {
    zoom: u8,
    x: u32,
    y: u32,
}

/// WGS84 bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southern latitude.
    pub south: f64,
    /// Western longitude.
    pub west: f64,
    /// Northern latitude.
    pub north: f64,
    /// Eastern longitude.
    pub east: f64,
}

/// Errors raised while building or parsing tiles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TileKeyError {
    /// The key does not have the `z_x_y` shape.
    #[error("tile key `{key}` must have the form z_x_y")]
    Malformed {
        /// Offending key.
        key: String,
    },
    /// Zoom exceeds [`MAX_ZOOM`].
    #[error("zoom {zoom} exceeds maximum of {MAX_ZOOM}")]
    ZoomOutOfRange {
        /// Requested zoom.
        zoom: u8,
    },
    /// Column or row is outside the tile grid for the zoom level.
    #[error("tile {x},{y} is outside the grid at zoom {zoom}")]
    OutOfGrid {
        /// Requested zoom.
        zoom: u8,
        /// Requested column.
        x: u32,
        /// Requested row.
        y: u32,
    },
    /// A bounding box covers more tiles than the caller allows.
    #[error("area covers {count} tiles at zoom {zoom}; the limit is {limit}")]
    TooManyTiles {
        /// Zoom level.
        zoom: u8,
        /// Tiles the box covers.
        count: u64,
        /// Caller's limit.
        limit: u64,
    },
}

impl Tile {
    /// Build a tile, validating the zoom level and grid bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use slippy_tiles::Tile;
    ///
    /// let tile = Tile::new(15, 17_000, 11_000)?;
    /// assert_eq!(tile.key(), "15_17000_11000");
    /// # Ok::<(), slippy_tiles::TileKeyError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`TileKeyError::ZoomOutOfRange`] or [`TileKeyError::OutOfGrid`].
    pub const fn new(zoom: u8, x: u32, y: u32) -> Result<Self, TileKeyError> {
        if zoom > MAX_ZOOM {
            return Err(TileKeyError::ZoomOutOfRange { zoom });
        }
        let size = grid_size(zoom);
        if x >= size || y >= size {
            return Err(TileKeyError::OutOfGrid { zoom, x, y });
        }
        Ok(Self { zoom, x, y })
    }

    /// Tile that contains the given position at `zoom`.
    ///
    /// Latitudes beyond the Mercator limit are clamped; longitudes outside
    /// `[-180, 180]` are clamped to the edge columns.
    ///
    /// # Errors
    ///
    /// Returns [`TileKeyError::ZoomOutOfRange`] when `zoom > MAX_ZOOM`.
    #[expect(
        clippy::float_arithmetic,
        reason = "Web Mercator projection is inherently floating point"
    )]
    pub fn containing(lon: f64, lat: f64, zoom: u8) -> Result<Self, TileKeyError> {
        if zoom > MAX_ZOOM {
            return Err(TileKeyError::ZoomOutOfRange { zoom });
        }
        let n = f64::from(grid_size(zoom));
        let clamped_lat = lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
        let lat_rad = clamped_lat.to_radians();
        let x = ((lon.clamp(-180.0, 180.0) + 180.0) / 360.0 * n).floor();
        let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0
            * n)
            .floor();
        let max_index = grid_size(zoom).saturating_sub(1);
        Ok(Self {
            zoom,
            x: to_grid_index(x).min(max_index),
            y: to_grid_index(y).min(max_index),
        })
    }

    /// Zoom level.
    #[must_use]
    pub const fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Column index.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Row index.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Stable dedup key in `"z_x_y"` form.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}_{}_{}", self.zoom, self.x, self.y)
    }

    /// Geographic bounds of the tile.
    ///
    /// # Examples
    ///
    /// ```
    /// use slippy_tiles::Tile;
    ///
    /// let bounds = Tile::new(0, 0, 0)?.bounds();
    /// assert_eq!(bounds.west, -180.0);
    /// assert_eq!(bounds.east, 180.0);
    /// # Ok::<(), slippy_tiles::TileKeyError>(())
    /// ```
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox {
            south: row_to_lat(self.y.saturating_add(1), self.zoom),
            west: column_to_lon(self.x, self.zoom),
            north: row_to_lat(self.y, self.zoom),
            east: column_to_lon(self.x.saturating_add(1), self.zoom),
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

impl FromStr for Tile {
    type Err = TileKeyError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let malformed = || TileKeyError::Malformed {
            key: key.to_owned(),
        };
        let mut parts = key.split('_');
        let (Some(zoom), Some(x), Some(y), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        Self::new(
            zoom.parse().map_err(|_| malformed())?,
            x.parse().map_err(|_| malformed())?,
            y.parse().map_err(|_| malformed())?,
        )
    }
}

impl BoundingBox {
    /// Format as the `south,west,north,east` string Overpass expects.
    #[must_use]
    pub fn to_overpass_bbox(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }

    /// Build from the `[min_lng, min_lat, max_lng, max_lat]` ordering used by
    /// GeoJSON and most CLIs.
    #[must_use]
    pub const fn from_lng_lat_bounds(bounds: [f64; 4]) -> Self {
        let [west, south, east, north] = bounds;
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Every tile at `zoom` that intersects this box, row-major from the
    /// north-west corner.
    ///
    /// # Errors
    ///
    /// Returns [`TileKeyError::ZoomOutOfRange`] when `zoom > MAX_ZOOM`.
    pub fn covering_tiles(&self, zoom: u8) -> Result<Vec<Tile>, TileKeyError> {
        let (north_west, south_east) = self.corner_tiles(zoom)?;
        let mut tiles = Vec::new();
        for y in north_west.y..=south_east.y {
            for x in north_west.x..=south_east.x {
                tiles.push(Tile { zoom, x, y });
            }
        }
        Ok(tiles)
    }

    /// Number of tiles [`Self::covering_tiles`] would return, computed
    /// without enumerating them.
    ///
    /// # Errors
    ///
    /// Returns [`TileKeyError::ZoomOutOfRange`] when `zoom > MAX_ZOOM`.
    pub fn tile_count(&self, zoom: u8) -> Result<u64, TileKeyError> {
        let (north_west, south_east) = self.corner_tiles(zoom)?;
        let columns = u64::from(south_east.x.saturating_sub(north_west.x)) + 1;
        let rows = u64::from(south_east.y.saturating_sub(north_west.y)) + 1;
        Ok(columns.saturating_mul(rows))
    }

    /// [`Self::covering_tiles`], refusing boxes that cover more than `limit`
    /// tiles.
    ///
    /// # Errors
    ///
    /// Returns [`TileKeyError::ZoomOutOfRange`] when `zoom > MAX_ZOOM` and
    /// [`TileKeyError::TooManyTiles`] when the box is over the limit.
    ///
    /// # Examples
    ///
    /// ```
    /// use slippy_tiles::{BoundingBox, TileKeyError};
    ///
    /// let world = BoundingBox::from_lng_lat_bounds([-180.0, -90.0, 180.0, 90.0]);
    /// let error = world
    ///     .covering_tiles_at_most(15, 500)
    ///     .expect_err("world is too large at zoom 15");
    /// assert!(matches!(error, TileKeyError::TooManyTiles { .. }));
    /// ```
    pub fn covering_tiles_at_most(&self, zoom: u8, limit: u64) -> Result<Vec<Tile>, TileKeyError> {
        let count = self.tile_count(zoom)?;
        if count > limit {
            return Err(TileKeyError::TooManyTiles { zoom, count, limit });
        }
        self.covering_tiles(zoom)
    }

    fn corner_tiles(&self, zoom: u8) -> Result<(Tile, Tile), TileKeyError> {
        Ok((
            Tile::containing(self.west, self.north, zoom)?,
            Tile::containing(self.east, self.south, zoom)?,
        ))
    }
}

const fn grid_size(zoom: u8) -> u32 {
    1_u32 << zoom
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "input is floored and non-negative after clamping; saturating cast is intended"
)]
fn to_grid_index(value: f64) -> u32 {
    value.max(0.0) as u32
}

#[expect(clippy::float_arithmetic, reason = "tile to longitude projection")]
fn column_to_lon(x: u32, zoom: u8) -> f64 {
    f64::from(x) / f64::from(grid_size(zoom)) * 360.0 - 180.0
}

#[expect(clippy::float_arithmetic, reason = "tile to latitude projection")]
fn row_to_lat(y: u32, zoom: u8) -> f64 {
    let n = f64::from(grid_size(zoom));
    (std::f64::consts::PI * (1.0 - 2.0 * f64::from(y) / n))
        .sinh()
        .atan()
        .to_degrees()
}

#[cfg(test)]
mod tests {
    //! Unit tests for tile and bounding-box conversions.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::origin_zoom_0(0.0, 0.0, 0, (0, 0))]
    #[case::greenwich_zoom_1(0.1, 0.1, 1, (1, 0))]
    #[case::west_edge_equator(-180.0, 0.0, 2, (0, 2))]
    #[case::antimeridian_clamped(180.0, 0.0, 2, (3, 2))]
    fn containing_tile_matches_known_values(
        #[case] lon: f64,
        #[case] lat: f64,
        #[case] zoom: u8,
        #[case] expected: (u32, u32),
    ) {
        let tile = Tile::containing(lon, lat, zoom).expect("zoom is valid");
        assert_eq!((tile.x(), tile.y()), expected);
    }

    #[test]
    fn bounds_contain_the_source_position() {
        let tile = Tile::containing(10.0, 45.0, 14).expect("zoom is valid");
        let bounds = tile.bounds();
        assert!(bounds.west <= 10.0 && 10.0 < bounds.east);
        assert!(bounds.south < 45.0 && 45.0 <= bounds.north);
    }

    #[test]
    fn key_round_trips_through_from_str() {
        let tile = Tile::new(15, 17_000, 11_000).expect("tile is valid");
        let parsed: Tile = tile.key().parse().expect("key parses");
        assert_eq!(parsed, tile);
    }

    #[rstest]
    #[case::missing_part("15_1")]
    #[case::extra_part("15_1_2_3")]
    #[case::not_numeric("a_b_c")]
    fn malformed_keys_are_rejected(#[case] key: &str) {
        let error = key.parse::<Tile>().expect_err("key should be rejected");
        assert!(matches!(error, TileKeyError::Malformed { .. }));
    }

    #[test]
    fn out_of_grid_tiles_are_rejected() {
        let error = Tile::new(1, 2, 0).expect_err("x is outside 2x2 grid");
        assert_eq!(error, TileKeyError::OutOfGrid { zoom: 1, x: 2, y: 0 });
    }

    #[test]
    fn overpass_bbox_is_south_west_north_east() {
        let bbox = BoundingBox::from_lng_lat_bounds([-3.3, 55.9, -3.1, 56.0]);
        assert_eq!(bbox.to_overpass_bbox(), "55.9,-3.3,56,-3.1");
    }

    #[test]
    fn covering_tiles_span_the_box() {
        let bbox = BoundingBox::from_lng_lat_bounds([-180.0, -80.0, 180.0, 80.0]);
        let tiles = bbox.covering_tiles(1).expect("zoom is valid");
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles.first().map(Tile::key), Some("1_0_0".to_owned()));
    }

    #[rstest]
    #[case::city([-3.3, 55.9, -3.1, 56.0], 15, 1_000)]
    #[case::world([-180.0, -85.0, 180.0, 85.0], 1, 4)]
    fn tile_count_matches_enumeration(
        #[case] bounds: [f64; 4],
        #[case] zoom: u8,
        #[case] limit: u64,
    ) {
        let bbox = BoundingBox::from_lng_lat_bounds(bounds);
        let count = bbox.tile_count(zoom).expect("zoom is valid");
        let tiles = bbox.covering_tiles_at_most(zoom, limit).expect("within limit");
        assert_eq!(count, u64::try_from(tiles.len()).expect("count fits"));
    }

    #[test]
    fn world_at_street_zoom_is_refused_without_enumerating() {
        let world = BoundingBox::from_lng_lat_bounds([-180.0, -90.0, 180.0, 90.0]);
        let error = world
            .covering_tiles_at_most(15, 400)
            .expect_err("too many tiles");
        assert_eq!(
            error,
            TileKeyError::TooManyTiles {
                zoom: 15,
                count: 1 << 30,
                limit: 400,
            }
        );
    }

    #[test]
    fn zoom_above_maximum_is_rejected() {
        let error = Tile::containing(0.0, 0.0, MAX_ZOOM + 1).expect_err("zoom too high");
        assert_eq!(error, TileKeyError::ZoomOutOfRange { zoom: MAX_ZOOM + 1 });
    }
}
