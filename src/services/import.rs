use std::{collections::HashSet, time::Duration};

use sqlx::PgPool;

use crate::{
    error::{ApiError, ApiResult},
    geo::{great_circle_km, GeoPoint},
    models::{
        places::ImportSummary,
        preschool::{CreatePreschoolRequest, NewImage},
    },
    services::{
        details::AdmissionService,
        metrics::PLACES_IMPORTED_COUNTER,
        places::{AddressParts, PlaceCandidate, PlaceDetails, PlacesClient},
        preschools::PreschoolService,
    },
};

pub const SEARCH_KEYWORDS: [&str; 5] = ["preschool", "pre-school", "play school", "nursery", "kindergarten"];
const MAX_PAGES_PER_KEYWORD: usize = 3;
const MAX_IMAGES_PER_PLACE: usize = 3;
/// A next_page_token only becomes valid a short while after it is issued.
const PAGE_TOKEN_DELAY: Duration = Duration::from_secs(2);

enum Outcome {
    Added,
    Skipped,
}

pub struct ImportService;

impl ImportService {
    /// Imports preschools found around `location` within `radius_m` meters.
    pub async fn run(
        pool: &PgPool,
        places: &PlacesClient,
        location: &str,
        radius_m: u32,
    ) -> ApiResult<ImportSummary> {
        let center = places
            .geocode(location)
            .await?
            .ok_or_else(|| ApiError::BadRequest("Location not found".into()))?;
        let radius_km = f64::from(radius_m) / 1000.0;

        tracing::info!(
            "Places import around {location} ({}, {}) within {radius_m} m",
            center.latitude,
            center.longitude
        );

        let mut summary = ImportSummary::default();
        let mut seen: HashSet<String> = HashSet::new();

        for keyword in SEARCH_KEYWORDS {
            let mut page_token: Option<String> = None;
            for page in 0..MAX_PAGES_PER_KEYWORD {
                if page > 0 {
                    if page_token.is_none() {
                        break;
                    }
                    tokio::time::sleep(PAGE_TOKEN_DELAY).await;
                }

                let (candidates, next) = match places
                    .nearby(center, radius_m, keyword, page_token.as_deref())
                    .await
                {
                    Ok(page) => page,
                    Err(e) => {
                        tracing::warn!("Places search for '{keyword}' stopped: {e:#}");
                        break;
                    }
                };

                for candidate in candidates {
                    let outcome = if !seen.insert(candidate.place_id.clone())
                        || great_circle_km(center, candidate.point()) > radius_km
                    {
                        Outcome::Skipped
                    } else {
                        match Self::import_place(pool, places, &candidate).await {
                            Ok(outcome) => outcome,
                            Err(e) => {
                                tracing::warn!("Failed to import place {}: {e:#}", candidate.place_id);
                                Outcome::Skipped
                            }
                        }
                    };
                    match outcome {
                        Outcome::Added => {
                            summary.added += 1;
                            PLACES_IMPORTED_COUNTER.with_label_values(&["added"]).inc();
                        }
                        Outcome::Skipped => {
                            summary.skipped += 1;
                            PLACES_IMPORTED_COUNTER.with_label_values(&["skipped"]).inc();
                        }
                    }
                }

                page_token = next;
            }
        }

        summary.total = summary.added + summary.skipped;
        tracing::info!(
            "Places import for {location}: {} added, {} skipped",
            summary.added,
            summary.skipped
        );
        Ok(summary)
    }

    async fn import_place(
        pool: &PgPool,
        places: &PlacesClient,
        candidate: &PlaceCandidate,
    ) -> anyhow::Result<Outcome> {
        {
            let mut conn = pool.acquire().await?;
            if PreschoolService::exists_by_place_id(&mut conn, &candidate.place_id).await? {
                return Ok(Outcome::Skipped);
            }
        }

        let Some(details) = places.details(&candidate.place_id).await? else {
            return Ok(Outcome::Skipped);
        };
        let point = candidate.point();
        let address = places.reverse_geocode(point).await?;

        let req = listing_from_place(places, candidate, point, &details, address);

        let mut tx = pool.begin().await?;
        let preschool = match PreschoolService::create_in(&mut tx, &req).await {
            Ok(p) => p,
            // Imported concurrently by another run
            Err(ApiError::Conflict(_)) => return Ok(Outcome::Skipped),
            Err(e) => return Err(anyhow::anyhow!("{e}")),
        };
        if let Some(rating) = details.rating.filter(|r| *r > 0.0) {
            AdmissionService::seed_rating_in(&mut tx, preschool.id, rating).await?;
        }
        tx.commit().await?;

        tracing::debug!("imported {} as preschool {}", preschool.name, preschool.id);
        Ok(Outcome::Added)
    }
}

fn listing_from_place(
    places: &PlacesClient,
    candidate: &PlaceCandidate,
    point: GeoPoint,
    details: &PlaceDetails,
    address: AddressParts,
) -> CreatePreschoolRequest {
    let images = details
        .photos
        .iter()
        .take(MAX_IMAGES_PER_PLACE)
        .enumerate()
        .map(|(i, photo)| NewImage {
            image_url: places.photo_url(&photo.photo_reference),
            is_primary: i == 0,
        })
        .collect();

    CreatePreschoolRequest {
        name: details.name.clone(),
        address: details.formatted_address.clone(),
        city: address.city,
        state: address.state,
        pincode: address.pincode,
        latitude: Some(point.latitude),
        longitude: Some(point.longitude),
        phone: details.formatted_phone_number.clone(),
        website: details.website.clone(),
        google_place_id: Some(candidate.place_id.clone()),
        google_map_url: Some(format!(
            "https://www.google.com/maps/place/?q=place_id:{}",
            candidate.place_id
        )),
        verified_status: Some(false),
        images,
        ..Default::default()
    }
}
