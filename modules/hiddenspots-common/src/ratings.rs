//! Rating aggregation: append-only per-dimension score collections with
//! eagerly maintained averages.
//!
//! The original design hid recomputation inside a persistence lifecycle
//! hook; here it is an explicit function invoked at every mutation point so
//! the invariant (`avg == round(mean(ratings), 1)` immediately after any
//! append) stays auditable and testable in isolation.

use serde::Deserialize;

use crate::error::HiddenSpotsError;
use crate::types::{RatingDimension, Spot};

pub const RATING_MIN: i64 = 1;
pub const RATING_MAX: i64 = 5;

/// Round to one decimal place.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn average(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: i64 = values.iter().sum();
    round1(sum as f64 / values.len() as f64)
}

/// Recompute every per-dimension average from the raw collections.
/// Must run synchronously as part of any mutation that touches `ratings`.
pub fn recompute(spot: &mut Spot) {
    for dim in RatingDimension::ALL {
        let avg = average(spot.ratings.get(dim));
        spot.avg_ratings.set(dim, avg);
    }
}

/// One rating submission: any subset of the four dimensions. Values arrive
/// as JSON numbers and are only accepted as whole numbers in [1, 5].
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatingInput {
    pub vibe: Option<f64>,
    pub safety: Option<f64>,
    pub uniqueness: Option<f64>,
    pub crowd: Option<f64>,
}

impl RatingInput {
    pub fn get(&self, dim: RatingDimension) -> Option<f64> {
        match dim {
            RatingDimension::Vibe => self.vibe,
            RatingDimension::Safety => self.safety,
            RatingDimension::Uniqueness => self.uniqueness,
            RatingDimension::Crowd => self.crowd,
        }
    }

    pub fn is_empty(&self) -> bool {
        RatingDimension::ALL.iter().all(|d| self.get(*d).is_none())
    }

    /// Validate every present dimension. Fails on the first non-integer or
    /// out-of-range value; nothing is applied on failure.
    pub fn validate(&self) -> Result<RatingUpdate, HiddenSpotsError> {
        let mut update = RatingUpdate::default();
        for dim in RatingDimension::ALL {
            if let Some(v) = self.get(dim) {
                if v.fract() != 0.0 || !(RATING_MIN as f64..=RATING_MAX as f64).contains(&v) {
                    return Err(HiddenSpotsError::validation(
                        dim.as_str(),
                        format!("rating must be an integer between {RATING_MIN} and {RATING_MAX}, got {v}"),
                    ));
                }
                update.set(dim, v as i64);
            }
        }
        Ok(update)
    }
}

/// A validated rating submission, ready to append.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatingUpdate {
    pub vibe: Option<i64>,
    pub safety: Option<i64>,
    pub uniqueness: Option<i64>,
    pub crowd: Option<i64>,
}

impl RatingUpdate {
    pub fn get(&self, dim: RatingDimension) -> Option<i64> {
        match dim {
            RatingDimension::Vibe => self.vibe,
            RatingDimension::Safety => self.safety,
            RatingDimension::Uniqueness => self.uniqueness,
            RatingDimension::Crowd => self.crowd,
        }
    }

    pub fn set(&mut self, dim: RatingDimension, value: i64) {
        match dim {
            RatingDimension::Vibe => self.vibe = Some(value),
            RatingDimension::Safety => self.safety = Some(value),
            RatingDimension::Uniqueness => self.uniqueness = Some(value),
            RatingDimension::Crowd => self.crowd = Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        RatingDimension::ALL.iter().all(|d| self.get(*d).is_none())
    }
}

/// Append each present dimension's score and recompute the averages.
pub fn apply_rating(spot: &mut Spot, update: &RatingUpdate) {
    for dim in RatingDimension::ALL {
        if let Some(v) = update.get(dim) {
            spot.ratings.get_mut(dim).push(v);
        }
    }
    recompute(spot);
}
