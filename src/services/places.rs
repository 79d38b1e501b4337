//! Thin async client for the Google Geocoding and Places web services.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::geo::GeoPoint;

const DETAIL_FIELDS: &str = "name,formatted_address,formatted_phone_number,website,photos,rating";
const PHOTO_MAX_PX: u32 = 400;

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    status: String,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    next_page_token: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<PlaceDetails>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

/// One hit of a nearby search.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceCandidate {
    pub place_id: String,
    pub name: Option<String>,
    pub geometry: Geometry,
}

impl PlaceCandidate {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.geometry.location.lat, self.geometry.location.lng)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Photo {
    pub photo_reference: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceDetails {
    pub name: String,
    pub formatted_address: Option<String>,
    pub formatted_phone_number: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressParts {
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

impl AddressParts {
    pub fn from_components(components: &[AddressComponent]) -> Self {
        let find = |kind: &str| {
            components
                .iter()
                .find(|c| c.types.iter().any(|t| t == kind))
                .map(|c| c.long_name.clone())
        };
        Self {
            city: find("locality"),
            state: find("administrative_area_level_1"),
            pincode: find("postal_code"),
        }
    }
}

fn check_status(status: &str, error_message: Option<&str>) -> Result<()> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => Err(anyhow!(
            "Places API returned {other}{}",
            error_message.map(|m| format!(": {m}")).unwrap_or_default()
        )),
    }
}

pub struct PlacesClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl PlacesClient {
    pub fn new(api_key: String, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let resp = self
            .client
            .get(self.url(path))
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {path} returned an error status"))?;
        resp.json::<T>()
            .await
            .with_context(|| format!("GET {path}: unexpected response body"))
    }

    /// First geocoding match for a free-text address, if any.
    pub async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>> {
        let resp: ListResponse<GeocodeResult> = self
            .get_json("/geocode/json", &[("address", address.to_string())])
            .await?;
        check_status(&resp.status, resp.error_message.as_deref())?;
        Ok(resp
            .results
            .first()
            .map(|r| GeoPoint::new(r.geometry.location.lat, r.geometry.location.lng)))
    }

    pub async fn reverse_geocode(&self, point: GeoPoint) -> Result<AddressParts> {
        let resp: ListResponse<GeocodeResult> = self
            .get_json(
                "/geocode/json",
                &[("latlng", format!("{},{}", point.latitude, point.longitude))],
            )
            .await?;
        check_status(&resp.status, resp.error_message.as_deref())?;
        Ok(resp
            .results
            .first()
            .map(|r| AddressParts::from_components(&r.address_components))
            .unwrap_or_default())
    }

    fn nearby_params(point: GeoPoint, radius_m: u32, keyword: &str) -> Vec<(&'static str, String)> {
        vec![
            ("location", format!("{},{}", point.latitude, point.longitude)),
            ("radius", radius_m.to_string()),
            ("type", "school".to_string()),
            ("keyword", keyword.to_string()),
        ]
    }

    /// One page of a nearby search plus the token for the next page.
    pub async fn nearby(
        &self,
        point: GeoPoint,
        radius_m: u32,
        keyword: &str,
        page_token: Option<&str>,
    ) -> Result<(Vec<PlaceCandidate>, Option<String>)> {
        let mut params = Self::nearby_params(point, radius_m, keyword);
        if let Some(token) = page_token {
            params.push(("pagetoken", token.to_string()));
        }
        let resp: ListResponse<PlaceCandidate> =
            self.get_json("/place/nearbysearch/json", &params).await?;
        check_status(&resp.status, resp.error_message.as_deref())?;
        Ok((resp.results, resp.next_page_token))
    }

    /// Nearby search results passed through untouched.
    pub async fn nearby_raw(&self, point: GeoPoint, radius_m: u32, keyword: &str) -> Result<Vec<Value>> {
        let resp: ListResponse<Value> = self
            .get_json("/place/nearbysearch/json", &Self::nearby_params(point, radius_m, keyword))
            .await?;
        check_status(&resp.status, resp.error_message.as_deref())?;
        Ok(resp.results)
    }

    pub async fn details(&self, place_id: &str) -> Result<Option<PlaceDetails>> {
        let resp: DetailsResponse = self
            .get_json(
                "/place/details/json",
                &[("place_id", place_id.to_string()), ("fields", DETAIL_FIELDS.to_string())],
            )
            .await?;
        Ok(if resp.status == "OK" { resp.result } else { None })
    }

    /// Publicly fetchable photo URL. It embeds the API key, as the photo endpoint requires.
    pub fn photo_url(&self, reference: &str) -> String {
        format!(
            "{}?maxwidth={PHOTO_MAX_PX}&maxheight={PHOTO_MAX_PX}&photoreference={reference}&key={}",
            self.url("/place/photo"),
            self.api_key
        )
    }
}
