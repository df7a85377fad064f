//! Aggregate boundary tests.
//!
//! These verify the contract between the raw rating collections and the
//! derived averages:
//! - Averages always equal round(mean, 1) immediately after any append
//! - Empty collections derive to 0, never NaN
//! - Collections are append-only across interleaved submissions
//! - The overall rating ignores unrated (zero) dimensions

use chrono::Utc;
use uuid::Uuid;

use hiddenspots_common::ratings::{apply_rating, recompute, round1, RatingUpdate};
use hiddenspots_common::types::*;

fn spot() -> Spot {
    Spot {
        id: Uuid::new_v4(),
        name: "Riverbank Reading Nook".to_string(),
        location: GeoPoint {
            lat: 26.2124,
            lng: 78.1772,
        },
        category: Category::Serene,
        story: "Quiet stretch of the riverbank behind the old ghat steps.".to_string(),
        images: vec![],
        ratings: Ratings::default(),
        avg_ratings: AvgRatings::default(),
        creator: CreatorInfo::default(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        version: 0,
    }
}

fn rate(dim: RatingDimension, value: i64) -> RatingUpdate {
    let mut update = RatingUpdate::default();
    update.set(dim, value);
    update
}

// =========================================================================
// Average maintenance
// =========================================================================

#[test]
fn average_tracks_every_append() {
    let mut s = spot();
    let scores = [5, 3, 4, 4, 2, 5, 1, 3];
    let mut running: Vec<i64> = Vec::new();

    for score in scores {
        apply_rating(&mut s, &rate(RatingDimension::Vibe, score));
        running.push(score);

        let expected = round1(running.iter().sum::<i64>() as f64 / running.len() as f64);
        assert_eq!(
            s.avg_ratings.vibe, expected,
            "after appending {running:?} expected avg {expected}"
        );
    }
}

#[test]
fn average_holds_for_all_dimensions() {
    let mut s = spot();
    for dim in RatingDimension::ALL {
        apply_rating(&mut s, &rate(dim, 2));
        apply_rating(&mut s, &rate(dim, 5));
        assert_eq!(s.avg_ratings.get(dim), 3.5, "dimension {dim}");
    }
}

#[test]
fn single_score_extremes() {
    for score in [1, 5] {
        let mut s = spot();
        apply_rating(&mut s, &rate(RatingDimension::Crowd, score));
        assert_eq!(s.avg_ratings.crowd, score as f64);
    }
}

#[test]
fn unrated_dimensions_stay_zero() {
    let mut s = spot();
    apply_rating(&mut s, &rate(RatingDimension::Safety, 4));
    assert_eq!(s.avg_ratings.vibe, 0.0);
    assert_eq!(s.avg_ratings.uniqueness, 0.0);
    assert_eq!(s.avg_ratings.crowd, 0.0);
    assert!(!s.avg_ratings.safety.is_nan());
}

#[test]
fn recompute_twice_changes_nothing() {
    let mut s = spot();
    s.ratings.uniqueness = vec![1, 2, 2];
    recompute(&mut s);
    let snapshot = s.avg_ratings;
    recompute(&mut s);
    assert_eq!(s.avg_ratings, snapshot);
}

// =========================================================================
// Append-only collections
// =========================================================================

#[test]
fn interleaved_submissions_preserve_counts() {
    let mut s = spot();
    // 3 vibe, 2 crowd, 1 safety, interleaved
    apply_rating(&mut s, &rate(RatingDimension::Vibe, 5));
    apply_rating(&mut s, &rate(RatingDimension::Crowd, 2));
    apply_rating(&mut s, &rate(RatingDimension::Vibe, 4));
    apply_rating(&mut s, &rate(RatingDimension::Safety, 3));
    apply_rating(&mut s, &rate(RatingDimension::Crowd, 1));
    apply_rating(&mut s, &rate(RatingDimension::Vibe, 4));

    assert_eq!(s.ratings.vibe.len(), 3);
    assert_eq!(s.ratings.crowd.len(), 2);
    assert_eq!(s.ratings.safety.len(), 1);
    assert_eq!(s.ratings.uniqueness.len(), 0);
    assert_eq!(s.ratings.total_count(), 6);
}

#[test]
fn append_preserves_insertion_order() {
    let mut s = spot();
    for v in [3, 5, 1, 4] {
        apply_rating(&mut s, &rate(RatingDimension::Vibe, v));
    }
    assert_eq!(s.ratings.vibe, vec![3, 5, 1, 4]);
}

#[test]
fn multi_dimension_update_appends_once_per_dimension() {
    let mut s = spot();
    let update = RatingUpdate {
        vibe: Some(5),
        safety: Some(4),
        uniqueness: Some(5),
        crowd: Some(2),
    };
    apply_rating(&mut s, &update);
    for dim in RatingDimension::ALL {
        assert_eq!(s.ratings.get(dim).len(), 1, "dimension {dim}");
    }
}

// =========================================================================
// Creation scenarios
// =========================================================================

#[test]
fn create_with_partial_initial_ratings() {
    // create spot with ratings={vibe:5, safety:4} -> avgs {5, 4, 0, 0}
    let mut s = spot();
    apply_rating(
        &mut s,
        &RatingUpdate {
            vibe: Some(5),
            safety: Some(4),
            ..Default::default()
        },
    );
    assert_eq!(s.avg_ratings.vibe, 5.0);
    assert_eq!(s.avg_ratings.safety, 4.0);
    assert_eq!(s.avg_ratings.uniqueness, 0.0);
    assert_eq!(s.avg_ratings.crowd, 0.0);
    assert_eq!(s.overall_rating(), 4.5);
}

#[test]
fn rate_twice_scenario() {
    // vibe=3 then vibe=5 -> ratings [3,5], avg 4.0
    let mut s = spot();
    apply_rating(&mut s, &rate(RatingDimension::Vibe, 3));
    apply_rating(&mut s, &rate(RatingDimension::Vibe, 5));
    assert_eq!(s.ratings.vibe, vec![3, 5]);
    assert_eq!(s.avg_ratings.vibe, 4.0);
    assert_eq!(s.overall_rating(), 4.0);
}
