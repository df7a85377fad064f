//! Spot service: the public operations, composing validation, the rating
//! aggregator, the asset client and the store.
//!
//! All input validation happens here, before any persistence side effect.
//! Request bodies are strictly typed (unknown fields rejected at
//! deserialization); this layer enforces the semantic rules on top.

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use hiddenspots_common::ratings::{apply_rating, RatingInput};
use hiddenspots_common::{
    AvgRatings, Category, Comment, CreatorInfo, GeoPoint, HiddenSpotsError, Ratings, Spot,
};
use hiddenspots_graph::query::{
    NEARBY_DEFAULT_RADIUS_KM, NEARBY_MAX_RADIUS_KM, NEARBY_MIN_RADIUS_KM, NEARBY_RESULT_CAP,
};
use hiddenspots_graph::{Page, Pagination, SpotFilter, SpotQuery, SpotReader, SpotSort, SpotWriter};

use crate::assets::AssetClient;

const NAME_MAX_CHARS: usize = 100;
const STORY_MAX_CHARS: usize = 2000;
const USERNAME_MAX_CHARS: usize = 50;
const COMMENT_MAX_CHARS: usize = 500;

// --- Inputs ---

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateSpotInput {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub story: String,
    /// [longitude, latitude]
    pub coordinates: Vec<f64>,
    #[serde(default)]
    pub ratings: Option<RatingInput>,
    #[serde(default)]
    pub creator_info: Option<CreatorInfoInput>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreatorInfoInput {
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateCommentInput {
    pub text: String,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub username: Option<String>,
}

/// Raw list-request parameters as they arrive on the query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(rename = "filter.category")]
    pub category: Option<String>,
    #[serde(rename = "filter.minVibe")]
    pub min_vibe: Option<f64>,
    #[serde(rename = "filter.minSafety")]
    pub min_safety: Option<f64>,
    #[serde(rename = "filter.minUniqueness")]
    pub min_uniqueness: Option<f64>,
    #[serde(rename = "filter.minCrowd")]
    pub min_crowd: Option<f64>,
    /// Reference point for distance sorting.
    #[serde(rename = "filter.lat")]
    pub lat: Option<f64>,
    #[serde(rename = "filter.lng")]
    pub lng: Option<f64>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

// --- The service ---

pub struct SpotService {
    reader: SpotReader,
    writer: SpotWriter,
    assets: AssetClient,
}

impl SpotService {
    pub fn new(reader: SpotReader, writer: SpotWriter, assets: AssetClient) -> Self {
        Self {
            reader,
            writer,
            assets,
        }
    }

    pub async fn health(&self) -> Result<(), HiddenSpotsError> {
        self.reader.ping().await
    }

    /// Create a spot. Initial ratings (at most one value per dimension)
    /// become single-element collections with their averages recomputed
    /// before the insert; the asset client resolves images only after all
    /// validation has passed.
    pub async fn create_spot(&self, input: CreateSpotInput) -> Result<Spot, HiddenSpotsError> {
        let name = required_text("name", &input.name, NAME_MAX_CHARS)?;
        let story = required_text("story", &input.story, STORY_MAX_CHARS)?;
        let category = parse_category(input.category.as_deref())?;
        let location = parse_coordinates(&input.coordinates)?;
        let initial = match &input.ratings {
            Some(ratings) => ratings.validate()?,
            None => Default::default(),
        };
        let creator = parse_creator(input.creator_info.unwrap_or_default())?;

        let images = self.assets.resolve_images(&input.images).await?;

        let now = Utc::now();
        let mut spot = Spot {
            id: Uuid::new_v4(),
            name,
            location,
            category,
            story,
            images,
            ratings: Ratings::default(),
            avg_ratings: AvgRatings::default(),
            creator,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        apply_rating(&mut spot, &initial);

        self.writer.create_spot(&spot).await?;
        Ok(spot)
    }

    /// Append ratings to an existing spot. Requires at least one dimension.
    pub async fn rate_spot(
        &self,
        id: Uuid,
        input: RatingInput,
    ) -> Result<Spot, HiddenSpotsError> {
        if input.is_empty() {
            return Err(HiddenSpotsError::validation(
                "ratings",
                "at least one rating dimension must be provided",
            ));
        }
        let update = input.validate()?;

        match self.writer.add_rating(id, &update).await? {
            Some(spot) => Ok(spot),
            None => Err(HiddenSpotsError::not_found(format!("spot {id}"))),
        }
    }

    pub async fn get_spot(&self, id: Uuid) -> Result<(Spot, Vec<Comment>), HiddenSpotsError> {
        self.reader
            .get_spot_with_comments(id)
            .await?
            .ok_or_else(|| HiddenSpotsError::not_found(format!("spot {id}")))
    }

    pub async fn list_spots(&self, params: ListParams) -> Result<Page<Spot>, HiddenSpotsError> {
        let query = build_query(params)?;
        self.reader.find_by_query(&query).await
    }

    /// Nearby spots ordered by ascending distance. Without a reference
    /// point this degrades to the most-recently-created spots (bounded),
    /// not an empty result.
    pub async fn find_nearby(
        &self,
        lat: Option<f64>,
        lng: Option<f64>,
        radius_km: Option<f64>,
    ) -> Result<Vec<(Spot, Option<f64>)>, HiddenSpotsError> {
        let point = match (lat, lng) {
            (Some(lat), Some(lng)) => Some(parse_point(lat, lng)?),
            (None, None) => None,
            _ => {
                return Err(HiddenSpotsError::validation(
                    "lat",
                    "lat and lng must be supplied together",
                ))
            }
        };

        match point {
            Some(point) => {
                let radius = radius_km.unwrap_or(NEARBY_DEFAULT_RADIUS_KM);
                if !(NEARBY_MIN_RADIUS_KM..=NEARBY_MAX_RADIUS_KM).contains(&radius) {
                    return Err(HiddenSpotsError::validation(
                        "radius",
                        format!(
                            "radius must be between {NEARBY_MIN_RADIUS_KM} and {NEARBY_MAX_RADIUS_KM} km"
                        ),
                    ));
                }
                let results = self
                    .reader
                    .find_near(point, radius, NEARBY_RESULT_CAP, None)
                    .await?;
                Ok(results
                    .into_iter()
                    .map(|(spot, dist)| (spot, Some(dist)))
                    .collect())
            }
            None => {
                let recent = self.reader.list_recent(NEARBY_RESULT_CAP).await?;
                Ok(recent.into_iter().map(|spot| (spot, None)).collect())
            }
        }
    }

    pub async fn add_comment(
        &self,
        spot_id: Uuid,
        input: CreateCommentInput,
    ) -> Result<Comment, HiddenSpotsError> {
        let text = required_text("text", &input.text, COMMENT_MAX_CHARS)?;
        let username = if input.is_anonymous {
            None
        } else {
            normalize_username(input.username)?
        };

        let comment = Comment {
            id: Uuid::new_v4(),
            spot_id,
            text,
            is_anonymous: input.is_anonymous,
            username,
            created_at: Utc::now(),
        };
        self.writer.create_comment(&comment).await?;
        Ok(comment)
    }

    pub async fn list_comments(
        &self,
        spot_id: Uuid,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Page<Comment>, HiddenSpotsError> {
        self.reader
            .list_comments(spot_id, Pagination::clamped(page, limit))
            .await?
            .ok_or_else(|| HiddenSpotsError::not_found(format!("spot {spot_id}")))
    }

    pub async fn delete_comment(&self, id: Uuid) -> Result<(), HiddenSpotsError> {
        if !self.writer.delete_comment(id).await? {
            return Err(HiddenSpotsError::not_found(format!("comment {id}")));
        }
        Ok(())
    }
}

// --- Validation helpers ---

/// Translate raw list parameters into the store's query form.
pub fn build_query(params: ListParams) -> Result<SpotQuery, HiddenSpotsError> {
    let mut filter = SpotFilter::default();

    if let Some(csv) = &params.category {
        for name in csv.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let category = Category::from_name(name).ok_or_else(|| {
                HiddenSpotsError::validation("filter.category", format!("unknown category {name:?}"))
            })?;
            filter.categories.push(category);
        }
    }

    filter.min_vibe = min_threshold("filter.minVibe", params.min_vibe)?;
    filter.min_safety = min_threshold("filter.minSafety", params.min_safety)?;
    filter.min_uniqueness = min_threshold("filter.minUniqueness", params.min_uniqueness)?;
    filter.min_crowd = min_threshold("filter.minCrowd", params.min_crowd)?;

    filter.point = match (params.lat, params.lng) {
        (Some(lat), Some(lng)) => Some(parse_point(lat, lng)?),
        (None, None) => None,
        _ => {
            return Err(HiddenSpotsError::validation(
                "filter.lat",
                "filter.lat and filter.lng must be supplied together",
            ))
        }
    };

    let sort = params
        .sort
        .as_deref()
        .map(SpotSort::parse)
        .unwrap_or_default();

    Ok(SpotQuery {
        filter,
        sort,
        page: Pagination::clamped(params.page, params.limit),
    })
}

fn min_threshold(field: &'static str, value: Option<f64>) -> Result<Option<f64>, HiddenSpotsError> {
    if let Some(v) = value {
        if !(0.0..=5.0).contains(&v) {
            return Err(HiddenSpotsError::validation(
                field,
                format!("threshold must be between 0 and 5, got {v}"),
            ));
        }
    }
    Ok(value)
}

fn required_text(
    field: &'static str,
    raw: &str,
    max_chars: usize,
) -> Result<String, HiddenSpotsError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HiddenSpotsError::validation(field, "must not be empty"));
    }
    if trimmed.chars().count() > max_chars {
        return Err(HiddenSpotsError::validation(
            field,
            format!("must be at most {max_chars} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Absent category defaults to Other; an explicitly supplied unknown
/// category is rejected, never coerced.
fn parse_category(raw: Option<&str>) -> Result<Category, HiddenSpotsError> {
    match raw {
        None => Ok(Category::default()),
        Some(s) => Category::from_name(s).ok_or_else(|| {
            HiddenSpotsError::validation("category", format!("unknown category {s:?}"))
        }),
    }
}

/// Coordinates arrive as a [longitude, latitude] pair.
fn parse_coordinates(coords: &[f64]) -> Result<GeoPoint, HiddenSpotsError> {
    if coords.len() != 2 {
        return Err(HiddenSpotsError::validation(
            "coordinates",
            "coordinates must be a [longitude, latitude] pair",
        ));
    }
    parse_point(coords[1], coords[0])
}

fn parse_point(lat: f64, lng: f64) -> Result<GeoPoint, HiddenSpotsError> {
    let point = GeoPoint { lat, lng };
    if !point.in_bounds() {
        return Err(HiddenSpotsError::validation(
            "coordinates",
            format!("latitude {lat} / longitude {lng} out of range"),
        ));
    }
    Ok(point)
}

fn parse_creator(input: CreatorInfoInput) -> Result<CreatorInfo, HiddenSpotsError> {
    // An anonymous creator never stores a username.
    let username = if input.is_anonymous {
        None
    } else {
        normalize_username(input.username)?
    };
    Ok(CreatorInfo {
        is_anonymous: input.is_anonymous,
        username,
    })
}

fn normalize_username(raw: Option<String>) -> Result<Option<String>, HiddenSpotsError> {
    match raw {
        None => Ok(None),
        Some(name) => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if trimmed.chars().count() > USERNAME_MAX_CHARS {
                return Err(HiddenSpotsError::validation(
                    "username",
                    format!("must be at most {USERNAME_MAX_CHARS} characters"),
                ));
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}
