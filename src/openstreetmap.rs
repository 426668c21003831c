//! Stop coordinates from OpenStreetMap, via the Overpass API.

use std::collections::HashMap;

use serde::Deserialize;
use url::Url;

use crate::page::{PageClient, PageResult};

pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Nodes of every Sofia public transport route which carry the transit
/// operator's stop code as `ref`
const STOPS_QUERY: &str = r#"[out:json][timeout:180];
(
  relation["name"="автобуси в София"];
  relation["name"="Тролеи в София"];
  relation["name"="Трамваи в София"];
  relation["name"="метро в София"];
)->.networks;
rel(r.networks)->.routes;
(
  node(r.networks)["ref"];
  node(r.routes)["ref"];
);
out;"#;

#[derive(Debug, Clone, PartialEq)]
pub struct OsmStop {
    pub name: String,
    pub international_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// All stops known to OpenStreetMap, by stop id
pub async fn get_stops(client: &PageClient) -> PageResult<HashMap<i64, OsmStop>> {
    log::info!("Fetching stop coordinates from OpenStreetMap");

    let url = Url::parse(OVERPASS_URL)?;
    let response: OverpassResponse = client.post_json(&url, STOPS_QUERY.to_string()).await?;
    let stops = parse_stops(response);

    log::info!("OpenStreetMap knows {} stops", stops.len());
    Ok(stops)
}

fn parse_stops(response: OverpassResponse) -> HashMap<i64, OsmStop> {
    let mut stops = HashMap::new();

    for element in response.elements {
        if element.kind != "node" {
            continue;
        }

        let Some(reference) = element.tags.get("ref") else {
            continue;
        };

        let Ok(id) = reference.trim().parse::<i64>() else {
            log::warn!("OSM node {} has a non numeric ref [{}]", element.id, reference);
            continue;
        };

        let (Some(latitude), Some(longitude)) = (element.lat, element.lon) else {
            log::warn!("OSM node {} (stop {:04}) has no coordinates", element.id, id);
            continue;
        };

        let international_name = element
            .tags
            .get("int_name")
            .or_else(|| element.tags.get("name:en"))
            .cloned()
            .unwrap_or_default();

        stops.insert(
            id,
            OsmStop {
                name: element.tags.get("name").cloned().unwrap_or_default(),
                international_name,
                latitude,
                longitude,
            },
        );
    }

    stops
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_stops() {
        let json = r#"{
            "version": 0.6,
            "elements": [
                {
                    "type": "node", "id": 1, "lat": 42.6977, "lon": 23.3219,
                    "tags": {"ref": "0001", "name": "Централна гара", "name:en": "Central Station"}
                },
                {
                    "type": "node", "id": 2, "lat": 42.69, "lon": 23.32,
                    "tags": {"ref": "2327", "name:en": "en", "int_name": "int"}
                },
                {"type": "node", "id": 3, "lat": 42.0, "lon": 23.0, "tags": {"ref": "A12"}},
                {"type": "node", "id": 4, "lat": 42.0, "lon": 23.0},
                {"type": "node", "id": 5, "tags": {"ref": "5"}},
                {"type": "relation", "id": 6, "tags": {"ref": "94"}}
            ]
        }"#;

        let stops = parse_stops(serde_json::from_str(json).unwrap());

        assert_eq!(stops.len(), 2);
        assert_eq!(
            stops[&1],
            OsmStop {
                name: "Централна гара".to_string(),
                international_name: "Central Station".to_string(),
                latitude: 42.6977,
                longitude: 23.3219,
            }
        );
        assert_eq!(stops[&2327].international_name, "int");
        assert_eq!(stops[&2327].name, "");
    }
}
