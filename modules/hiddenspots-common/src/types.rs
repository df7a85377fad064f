use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ratings::round1;

// --- Geo Types ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self.lat, self.lng, other.lat, other.lng)
    }

    /// True if latitude ∈ [-90, 90] and longitude ∈ [-180, 180].
    pub fn in_bounds(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Haversine great-circle distance between two lat/lng points in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

// --- Categories ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    Romantic,
    Serene,
    Creative,
    Adventure,
    Food,
    #[default]
    Other,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Romantic => write!(f, "Romantic"),
            Category::Serene => write!(f, "Serene"),
            Category::Creative => write!(f, "Creative"),
            Category::Adventure => write!(f, "Adventure"),
            Category::Food => write!(f, "Food"),
            Category::Other => write!(f, "Other"),
        }
    }
}

impl Category {
    /// Strict parse of the closed category set. An unrecognized name is a
    /// validation failure at the service boundary, never coerced to Other.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "Romantic" => Some(Category::Romantic),
            "Serene" => Some(Category::Serene),
            "Creative" => Some(Category::Creative),
            "Adventure" => Some(Category::Adventure),
            "Food" => Some(Category::Food),
            "Other" => Some(Category::Other),
            _ => None,
        }
    }
}

// --- Rating dimensions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingDimension {
    Vibe,
    Safety,
    Uniqueness,
    Crowd,
}

impl RatingDimension {
    pub const ALL: [RatingDimension; 4] = [
        RatingDimension::Vibe,
        RatingDimension::Safety,
        RatingDimension::Uniqueness,
        RatingDimension::Crowd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingDimension::Vibe => "vibe",
            RatingDimension::Safety => "safety",
            RatingDimension::Uniqueness => "uniqueness",
            RatingDimension::Crowd => "crowd",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "vibe" => Some(RatingDimension::Vibe),
            "safety" => Some(RatingDimension::Safety),
            "uniqueness" => Some(RatingDimension::Uniqueness),
            "crowd" => Some(RatingDimension::Crowd),
            _ => None,
        }
    }
}

impl std::fmt::Display for RatingDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Rating collections ---

/// Raw per-dimension rating collections. Append-only: scores are pushed by
/// `ratings::apply_rating` and never removed or reordered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratings {
    pub vibe: Vec<i64>,
    pub safety: Vec<i64>,
    pub uniqueness: Vec<i64>,
    pub crowd: Vec<i64>,
}

impl Ratings {
    pub fn get(&self, dim: RatingDimension) -> &[i64] {
        match dim {
            RatingDimension::Vibe => &self.vibe,
            RatingDimension::Safety => &self.safety,
            RatingDimension::Uniqueness => &self.uniqueness,
            RatingDimension::Crowd => &self.crowd,
        }
    }

    pub fn get_mut(&mut self, dim: RatingDimension) -> &mut Vec<i64> {
        match dim {
            RatingDimension::Vibe => &mut self.vibe,
            RatingDimension::Safety => &mut self.safety,
            RatingDimension::Uniqueness => &mut self.uniqueness,
            RatingDimension::Crowd => &mut self.crowd,
        }
    }

    pub fn total_count(&self) -> usize {
        RatingDimension::ALL.iter().map(|d| self.get(*d).len()).sum()
    }
}

/// Derived per-dimension averages, rounded to one decimal, 0 when the
/// corresponding collection is empty. Persisted alongside the raw
/// collections and recomputed on every mutation, never lazily.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AvgRatings {
    pub vibe: f64,
    pub safety: f64,
    pub uniqueness: f64,
    pub crowd: f64,
}

impl AvgRatings {
    pub fn get(&self, dim: RatingDimension) -> f64 {
        match dim {
            RatingDimension::Vibe => self.vibe,
            RatingDimension::Safety => self.safety,
            RatingDimension::Uniqueness => self.uniqueness,
            RatingDimension::Crowd => self.crowd,
        }
    }

    pub fn set(&mut self, dim: RatingDimension, value: f64) {
        match dim {
            RatingDimension::Vibe => self.vibe = value,
            RatingDimension::Safety => self.safety = value,
            RatingDimension::Uniqueness => self.uniqueness = value,
            RatingDimension::Crowd => self.crowd = value,
        }
    }
}

// --- Creator ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatorInfo {
    pub is_anonymous: bool,
    pub username: Option<String>,
}

impl CreatorInfo {
    /// Display name shown to other users. An anonymous creator is always
    /// "Anonymous" regardless of any stored username.
    pub fn display_name(&self) -> &str {
        if self.is_anonymous {
            "Anonymous"
        } else {
            self.username.as_deref().unwrap_or("Unknown User")
        }
    }
}

// --- Spot ---

/// A user-submitted geotagged location with a story, photos and
/// multi-dimensional ratings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spot {
    pub id: Uuid,
    pub name: String,
    pub location: GeoPoint,
    pub category: Category,
    pub story: String,
    /// Asset-host URLs, insertion order preserved.
    pub images: Vec<String>,
    pub ratings: Ratings,
    pub avg_ratings: AvgRatings,
    pub creator: CreatorInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped on every persisted mutation.
    pub version: i64,
}

impl Spot {
    /// Mean of the non-zero per-dimension averages, rounded to one decimal.
    /// Derived on read, never persisted.
    pub fn overall_rating(&self) -> f64 {
        let nonzero: Vec<f64> = RatingDimension::ALL
            .iter()
            .map(|d| self.avg_ratings.get(*d))
            .filter(|v| *v > 0.0)
            .collect();
        if nonzero.is_empty() {
            return 0.0;
        }
        round1(nonzero.iter().sum::<f64>() / nonzero.len() as f64)
    }
}

// --- Comment ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub spot_id: Uuid,
    pub text: String,
    pub is_anonymous: bool,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn display_name(&self) -> &str {
        if self.is_anonymous {
            "Anonymous"
        } else {
            self.username.as_deref().unwrap_or("Unknown User")
        }
    }
}
