//! Fixed Overpass QL templates.
//!
//! Templates carry a `{{bbox}}` placeholder filled with
//! `south,west,north,east`.

use slippy_tiles::Tile;

const BBOX_PLACEHOLDER: &str = "{{bbox}}";

const STOPS_TEMPLATE: &str = r#"[out:json][timeout:60];
(
  node["highway"~"^(bus_stop|platform)$"]({{bbox}});
  nwr["public_transport"~"^(platform|stop_position|station)$"]({{bbox}});
  nwr["railway"~"^(halt|station|tram_stop|platform|stop|subway_entrance)$"]({{bbox}});
  nwr["amenity"~"^(bus_station|ferry_terminal)$"]({{bbox}});
  nwr["aerialway"="station"]({{bbox}});
  node["ferry"="yes"]["public_transport"="stop_position"]({{bbox}});
);
out body;
>;
out skel qt;"#;

const ROUTES_TEMPLATE: &str = r#"[out:json][timeout:120];
(
  relation["type"="route"]["route"~"^(bus|trolleybus|tram|train|subway|light_rail|ferry|aerialway|monorail)$"]({{bbox}});
  relation["type"="route_master"]["route_master"~"^(bus|trolleybus|tram|train|subway|light_rail|ferry|aerialway|monorail)$"]({{bbox}});
);
out body;"#;

/// Query kinds issued per tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryTemplate {
    /// Stops, platforms, and stations plus the nodes of matched ways.
    Stops,
    /// Route and route master relations.
    Routes,
}

impl QueryTemplate {
    /// Template text with the placeholder intact.
    pub const fn template(self) -> &'static str {
        match self {
            Self::Stops => STOPS_TEMPLATE,
            Self::Routes => ROUTES_TEMPLATE,
        }
    }

    /// Query for `tile`.
    pub fn render(self, tile: &Tile) -> String {
        self.template()
            .replace(BBOX_PLACEHOLDER, &tile.bounds().to_overpass_bbox())
    }

    /// Dedup key for `tile`. Each template has its own namespace.
    pub fn dedup_key(self, tile: &Tile) -> String {
        match self {
            Self::Stops => tile.key(),
            Self::Routes => format!("routes/{}", tile.key()),
        }
    }

    /// Label for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stops => "stops",
            Self::Routes => "routes",
        }
    }
}
