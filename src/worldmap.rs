//! Hosts placed on the world map.
//!
//! A host is placed when its business impact is one of the configured
//! `worldmap.hosts_level` values and its `_LOC_LAT`/`_LOC_LNG` custom
//! variables hold coordinates within [-180, 180]. Its popup lists the
//! services whose business impact is one of `worldmap.services_level`.

use serde::Serialize;
use tracing::{debug, warn};
use vantage_types::{Host, ItemRef, Monitored};

use crate::manager::DataManager;
use crate::relation::Viewer;
use crate::search::pattern::Pattern;

pub const LATITUDE_VAR: &str = "_LOC_LAT";
pub const LONGITUDE_VAR: &str = "_LOC_LNG";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A host with valid coordinates.
#[derive(Debug, Clone, Serialize)]
pub struct Located<'a> {
    #[serde(skip)]
    pub host: &'a Host,
    pub name: &'a str,
    pub state: &'static str,
    pub business_impact: i32,
    pub location: GeoPoint,
    pub services: Vec<LocatedService<'a>>,
}

/// A service listed in a located host's popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatedService<'a> {
    pub name: &'a str,
    pub state: &'static str,
    pub business_impact: i32,
}

/// Coordinates from the host's custom variables, if valid.
pub fn host_location(host: &Host) -> Option<GeoPoint> {
    let coordinate = |var: &str| {
        host.customs
            .get(var)?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| (-180.0..=180.0).contains(v))
    };
    Some(GeoPoint {
        lat: coordinate(LATITUDE_VAR)?,
        lng: coordinate(LONGITUDE_VAR)?,
    })
}

/// Hosts matching `search` that can be placed on the map.
///
/// `type:host` is prepended to the search when missing.
pub fn hosts_with_coordinates<'a>(
    dm: &'a DataManager,
    search: &str,
    viewer: Option<&dyn Viewer>,
) -> Vec<Located<'a>> {
    let search = if search.contains("type:host") {
        search.to_string()
    } else {
        format!("type:host {}", search)
    };
    let levels = &dm.settings().worldmap.hosts_level;
    let services_levels = &dm.settings().worldmap.services_level;

    dm.search(&search, viewer)
        .into_iter()
        .filter_map(|item| item.as_host())
        .filter_map(|host| {
            if !levels.contains(&host.business_impact()) {
                debug!(host = %host.name, "business impact not shown on worldmap");
                return None;
            }
            let Some(location) = host_location(host) else {
                debug!(host = %host.name, "invalid GPS coordinates");
                return None;
            };
            Some(Located {
                host,
                name: &host.name,
                state: host.state.as_str(),
                business_impact: host.business_impact(),
                location,
                services: dm
                    .host_services(&host.name, viewer)
                    .into_iter()
                    .filter_map(|item| item.as_service())
                    .filter(|s| services_levels.contains(&s.business_impact()))
                    .map(|s| LocatedService {
                        name: &s.description,
                        state: s.state.as_str(),
                        business_impact: s.business_impact(),
                    })
                    .collect(),
            })
        })
        .collect()
}

/// Worldmap widget content: located hosts whose name matches `refine`
/// (case-insensitive), at most `limit` of them.
pub fn worldmap_widget<'a>(
    dm: &'a DataManager,
    search: &str,
    refine: Option<&str>,
    limit: usize,
    viewer: Option<&dyn Viewer>,
) -> Vec<Located<'a>> {
    let mut located = hosts_with_coordinates(dm, search, viewer);

    if let Some(refine) = refine.filter(|r| !r.is_empty()) {
        match Pattern::compile_case_insensitive(refine) {
            Ok(pattern) => {
                located.retain(|l| pattern.is_match(&ItemRef::Host(l.host).full_name()))
            }
            Err(e) => {
                warn!(error = %e, "invalid worldmap refine filter");
                located.clear();
            }
        }
    }

    located.truncate(limit);
    located
}
