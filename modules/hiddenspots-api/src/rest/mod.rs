use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use hiddenspots_common::ratings::RatingInput;
use hiddenspots_common::{Comment, HiddenSpotsError, Spot};
use hiddenspots_graph::Page;

use crate::service::{CreateCommentInput, CreateSpotInput, ListParams};
use crate::AppState;

// --- Query structs ---

#[derive(Deserialize)]
pub struct NearbyQuery {
    lat: Option<f64>,
    lng: Option<f64>,
    radius: Option<f64>,
}

#[derive(Deserialize)]
pub struct CommentsPageQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

// --- Rate limiting ---

pub const RATE_LIMIT_PER_HOUR: usize = 60;

/// Check rate limit for an IP. Returns true if the request is allowed, false if rate-limited.
/// Prunes expired entries and records the new request if allowed.
pub fn check_rate_limit(entries: &mut Vec<Instant>, now: Instant, max_per_hour: usize) -> bool {
    let cutoff = now - std::time::Duration::from_secs(3600);
    entries.retain(|t| *t > cutoff);
    if entries.len() >= max_per_hour {
        return false;
    }
    entries.push(now);
    true
}

async fn enforce_rate_limit(
    state: &AppState,
    addr: std::net::SocketAddr,
) -> Result<(), Response> {
    let mut limiter = state.rate_limiter.lock().await;
    // Periodically prune empty entries to prevent unbounded HashMap growth
    if limiter.len() > 1000 {
        let cutoff = Instant::now() - std::time::Duration::from_secs(3600);
        limiter.retain(|_, entries| {
            entries.retain(|t| *t > cutoff);
            !entries.is_empty()
        });
    }
    let entries = limiter.entry(addr.ip()).or_default();
    if !check_rate_limit(entries, Instant::now(), RATE_LIMIT_PER_HOUR) {
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": format!("Rate limit exceeded — max {RATE_LIMIT_PER_HOUR} writes per hour")
            })),
        )
            .into_response());
    }
    Ok(())
}

// --- JSON views ---
//
// Wire format: camelCase keys, GeoJSON-style coordinates, and the
// anonymity invariant: an anonymous author's stored username never
// appears in output.

pub fn spot_json(spot: &Spot) -> serde_json::Value {
    serde_json::json!({
        "id": spot.id.to_string(),
        "name": spot.name,
        "coordinates": {
            "type": "Point",
            "coordinates": [spot.location.lng, spot.location.lat],
        },
        "category": spot.category.to_string(),
        "story": spot.story,
        "images": spot.images,
        "ratings": {
            "vibe": spot.ratings.vibe,
            "safety": spot.ratings.safety,
            "uniqueness": spot.ratings.uniqueness,
            "crowd": spot.ratings.crowd,
        },
        "avgRatings": avg_ratings_json(spot),
        "overallRating": spot.overall_rating(),
        "creatorInfo": {
            "isAnonymous": spot.creator.is_anonymous,
            "username": if spot.creator.is_anonymous {
                serde_json::Value::Null
            } else {
                serde_json::json!(spot.creator.username)
            },
            "displayName": spot.creator.display_name(),
        },
        "createdAt": spot.created_at.to_rfc3339(),
        "updatedAt": spot.updated_at.to_rfc3339(),
    })
}

/// Trimmed view for nearby results: name, coordinates, category, images,
/// averages and age, plus the computed distance when a point was given.
pub fn spot_summary_json(spot: &Spot, distance_km: Option<f64>) -> serde_json::Value {
    let mut view = serde_json::json!({
        "id": spot.id.to_string(),
        "name": spot.name,
        "coordinates": {
            "type": "Point",
            "coordinates": [spot.location.lng, spot.location.lat],
        },
        "category": spot.category.to_string(),
        "images": spot.images,
        "avgRatings": avg_ratings_json(spot),
        "overallRating": spot.overall_rating(),
        "createdAt": spot.created_at.to_rfc3339(),
    });
    if let Some(distance) = distance_km {
        if let Some(obj) = view.as_object_mut() {
            obj.insert("distanceKm".to_string(), serde_json::json!(distance));
        }
    }
    view
}

fn avg_ratings_json(spot: &Spot) -> serde_json::Value {
    serde_json::json!({
        "vibe": spot.avg_ratings.vibe,
        "safety": spot.avg_ratings.safety,
        "uniqueness": spot.avg_ratings.uniqueness,
        "crowd": spot.avg_ratings.crowd,
    })
}

pub fn comment_json(comment: &Comment) -> serde_json::Value {
    serde_json::json!({
        "id": comment.id.to_string(),
        "spotId": comment.spot_id.to_string(),
        "text": comment.text,
        "isAnonymous": comment.is_anonymous,
        "username": if comment.is_anonymous {
            serde_json::Value::Null
        } else {
            serde_json::json!(comment.username)
        },
        "displayName": comment.display_name(),
        "createdAt": comment.created_at.to_rfc3339(),
    })
}

fn pagination_json<T>(page: &Page<T>) -> serde_json::Value {
    serde_json::json!({
        "page": page.page,
        "limit": page.limit,
        "total": page.total,
        "pages": page.total_pages,
    })
}

// --- Error mapping ---

fn error_response(context: &str, err: HiddenSpotsError) -> Response {
    match &err {
        HiddenSpotsError::Validation { field, message } => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": message, "field": field })),
        )
            .into_response(),
        HiddenSpotsError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
        HiddenSpotsError::Upstream(_) => {
            warn!(error = %err, "{context}: upstream failure");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": "Asset upload failed" })),
            )
                .into_response()
        }
        _ => {
            warn!(error = %err, "{context}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

fn parse_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Invalid id" })),
        )
            .into_response()
    })
}

// --- Handlers ---

pub async fn api_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match state.service.health().await {
        Ok(()) => "Connected",
        Err(e) => {
            warn!(error = %e, "Health check failed to reach the store");
            "Disconnected"
        }
    };
    Json(serde_json::json!({
        "status": "OK",
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn api_create_spot(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    Json(body): Json<CreateSpotInput>,
) -> Response {
    if let Err(resp) = enforce_rate_limit(&state, addr).await {
        return resp;
    }

    match state.service.create_spot(body).await {
        Ok(spot) => (StatusCode::CREATED, Json(spot_json(&spot))).into_response(),
        Err(e) => error_response("Failed to create spot", e),
    }
}

pub async fn api_list_spots(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Response {
    match state.service.list_spots(params).await {
        Ok(page) => {
            let spots: Vec<serde_json::Value> = page.items.iter().map(spot_json).collect();
            Json(serde_json::json!({
                "spots": spots,
                "pagination": pagination_json(&page),
            }))
            .into_response()
        }
        Err(e) => error_response("Failed to list spots", e),
    }
}

pub async fn api_nearby_spots(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyQuery>,
) -> Response {
    match state
        .service
        .find_nearby(params.lat, params.lng, params.radius)
        .await
    {
        Ok(results) => {
            let spots: Vec<serde_json::Value> = results
                .iter()
                .map(|(spot, distance)| spot_summary_json(spot, *distance))
                .collect();
            Json(spots).into_response()
        }
        Err(e) => error_response("Failed to fetch nearby spots", e),
    }
}

pub async fn api_spot_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.service.get_spot(id).await {
        Ok((spot, comments)) => {
            let mut view = spot_json(&spot);
            let comment_views: Vec<serde_json::Value> =
                comments.iter().map(comment_json).collect();
            if let Some(obj) = view.as_object_mut() {
                obj.insert("comments".to_string(), serde_json::json!(comment_views));
            }
            Json(view).into_response()
        }
        Err(e) => error_response("Failed to fetch spot", e),
    }
}

pub async fn api_rate_spot(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    Path(id): Path<String>,
    Json(body): Json<RatingInput>,
) -> Response {
    if let Err(resp) = enforce_rate_limit(&state, addr).await {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.service.rate_spot(id, body).await {
        Ok(spot) => Json(spot_json(&spot)).into_response(),
        Err(e) => error_response("Failed to add rating", e),
    }
}

pub async fn api_list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<CommentsPageQuery>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.service.list_comments(id, params.page, params.limit).await {
        Ok(page) => {
            let comments: Vec<serde_json::Value> = page.items.iter().map(comment_json).collect();
            Json(serde_json::json!({
                "comments": comments,
                "pagination": pagination_json(&page),
            }))
            .into_response()
        }
        Err(e) => error_response("Failed to fetch comments", e),
    }
}

pub async fn api_add_comment(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    Path(id): Path<String>,
    Json(body): Json<CreateCommentInput>,
) -> Response {
    if let Err(resp) = enforce_rate_limit(&state, addr).await {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.service.add_comment(id, body).await {
        Ok(comment) => (StatusCode::CREATED, Json(comment_json(&comment))).into_response(),
        Err(e) => error_response("Failed to create comment", e),
    }
}

pub async fn api_delete_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.service.delete_comment(id).await {
        Ok(()) => Json(serde_json::json!({ "message": "Comment deleted successfully" }))
            .into_response(),
        Err(e) => error_response("Failed to delete comment", e),
    }
}
