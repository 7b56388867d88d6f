// naturequest-core/src/places/mod.rs
//
// Nearby-places lookup used by challenge verification. The shipped
// implementation talks to the Foursquare Places API; the trait exists so
// verification tests can run without network access.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use naturequest_common::models::LocationType;
use crate::http::HttpClient;
use crate::Error;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NearbyPlace {
    pub name: String,
    pub categories: Vec<String>,
    pub distance_m: f64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlacesClient: Send + Sync {
    /// Places within `radius_m` of the coordinate, filtered to categories
    /// plausible for `location_type`, sorted nearest first.
    async fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: i32,
        location_type: LocationType,
    ) -> Result<Vec<NearbyPlace>, Error>;
}

pub struct FoursquarePlacesClient {
    http: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
}

impl FoursquarePlacesClient {
    pub fn new(http: Arc<dyn HttpClient>, api_key: String) -> Self {
        Self {
            http,
            api_key,
            base_url: "https://api.foursquare.com/v3/places".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl PlacesClient for FoursquarePlacesClient {
    async fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: i32,
        location_type: LocationType,
    ) -> Result<Vec<NearbyPlace>, Error> {
        if self.api_key.is_empty() {
            return Err(Error::Validation("Places API key not configured".into()));
        }

        let mut url = format!(
            "{}/nearby?ll={},{}&radius={}&limit=10",
            self.base_url, latitude, longitude, radius_m
        );
        if let Some(category) = foursquare_category(location_type) {
            url.push_str(&format!("&categories={}", category));
        }

        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), self.api_key.clone());
        headers.insert("Accept".to_string(), "application/json".to_string());

        let body = self.http.get(url, headers).await?;
        match parse_nearby_response(&body) {
            Ok(places) => Ok(places),
            Err(e) => {
                warn!("Failed to parse places response: {}", e);
                Err(e)
            }
        }
    }
}

fn parse_nearby_response(body: &str) -> Result<Vec<NearbyPlace>, Error> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let results = value
        .get("results")
        .and_then(|r| r.as_array())
        .cloned()
        .unwrap_or_default();

    let mut places = Vec::with_capacity(results.len());
    for place in results {
        let name = place
            .get("name")
            .and_then(|n| n.as_str())
            .unwrap_or("")
            .to_string();
        let distance_m = place
            .get("distance")
            .and_then(|d| d.as_f64())
            .unwrap_or(f64::INFINITY);
        let categories = place
            .get("categories")
            .and_then(|c| c.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|cat| cat.get("name").and_then(|n| n.as_str()))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        places.push(NearbyPlace {
            name,
            categories,
            distance_m,
        });
    }
    places.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
    Ok(places)
}

/// Foursquare category id for a location type, where one exists.
fn foursquare_category(location_type: LocationType) -> Option<&'static str> {
    match location_type {
        LocationType::Park | LocationType::Garden => Some("16032"),
        LocationType::Forest | LocationType::Trail | LocationType::Desert => Some("16019"),
        LocationType::Lake | LocationType::River | LocationType::Waterfall => Some("16043"),
        LocationType::Mountain => Some("16038"),
        LocationType::Beach => Some("16044"),
        LocationType::WildlifeArea | LocationType::NatureReserve => Some("16022"),
    }
}

/// Whether any of the place's categories plausibly match the expected
/// location type.
pub fn matches_location_type(location_type: LocationType, categories: &[String]) -> bool {
    let keywords: &[&str] = match location_type {
        LocationType::Park => &["park", "recreation", "green"],
        LocationType::Forest => &["forest", "woods", "wilderness", "nature"],
        LocationType::Lake => &["lake", "water", "reservoir"],
        LocationType::Mountain => &["mountain", "hill", "peak", "summit"],
        LocationType::Beach => &["beach", "shore", "coast", "seaside"],
        LocationType::Garden => &["garden", "botanical", "park"],
        LocationType::Trail => &["trail", "path", "hiking", "walking"],
        LocationType::WildlifeArea => &["wildlife", "sanctuary", "preserve"],
        LocationType::NatureReserve => &["reserve", "preserve", "conservation"],
        LocationType::River => &["river", "stream", "creek", "water"],
        LocationType::Waterfall => &["waterfall", "falls", "cascade"],
        LocationType::Desert => &["desert", "arid", "dry"],
    };

    categories.iter().any(|category| {
        let lower = category.to_lowercase();
        keywords.iter().any(|kw| lower.contains(kw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_keywords_match() {
        assert!(matches_location_type(
            LocationType::Lake,
            &["Reservoir".to_string()]
        ));
        assert!(matches_location_type(
            LocationType::Trail,
            &["Hiking Trail".to_string(), "Scenic Lookout".to_string()]
        ));
        assert!(!matches_location_type(
            LocationType::Mountain,
            &["Coffee Shop".to_string()]
        ));
    }

    #[test]
    fn parses_foursquare_payload() {
        let body = r#"{
            "results": [
                {"name": "Crystal Lake", "distance": 120,
                 "categories": [{"id": 16043, "name": "Lake"}]},
                {"name": "Boat Launch", "distance": 45,
                 "categories": [{"id": 16043, "name": "Harbor / Marina"}]}
            ]
        }"#;
        let places = parse_nearby_response(body).unwrap();
        assert_eq!(places.len(), 2);
        // Sorted nearest first.
        assert_eq!(places[0].name, "Boat Launch");
        assert_eq!(places[1].categories, vec!["Lake".to_string()]);
    }

    #[test]
    fn empty_results_parse_to_empty_vec() {
        let places = parse_nearby_response(r#"{"results": []}"#).unwrap();
        assert!(places.is_empty());
    }
}
