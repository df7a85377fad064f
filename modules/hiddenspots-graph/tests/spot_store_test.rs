//! Spot store integration tests against a live graph instance.
//!
//! **Requires:** Docker (for Neo4j via testcontainers).
//!
//! Run with: cargo test -p hiddenspots-graph --test spot_store_test -- --ignored

mod harness;

use chrono::Utc;
use uuid::Uuid;

use hiddenspots_common::ratings::{apply_rating, RatingUpdate};
use hiddenspots_common::types::*;
use hiddenspots_graph::{
    GraphClient, Pagination, SpotFilter, SpotQuery, SpotReader, SpotSort, SpotWriter,
};

/// Spin up a fresh container and run migrations.
async fn setup() -> (impl std::any::Any, GraphClient) {
    let (container, client) = harness::neo4j_container().await;
    hiddenspots_graph::migrate::migrate(&client)
        .await
        .expect("migration failed");
    (container, client)
}

fn spot_at(name: &str, lat: f64, lng: f64, category: Category) -> Spot {
    Spot {
        id: Uuid::new_v4(),
        name: name.to_string(),
        location: GeoPoint { lat, lng },
        category,
        story: format!("A quiet place called {name}."),
        images: vec!["https://assets.example.com/a.jpg".to_string()],
        ratings: Ratings::default(),
        avg_ratings: AvgRatings::default(),
        creator: CreatorInfo {
            is_anonymous: false,
            username: Some("SunsetLover".to_string()),
        },
        created_at: Utc::now(),
        updated_at: Utc::now(),
        version: 0,
    }
}

fn comment_on(spot_id: Uuid, text: &str) -> Comment {
    Comment {
        id: Uuid::new_v4(),
        spot_id,
        text: text.to_string(),
        is_anonymous: false,
        username: Some("LocalGuide".to_string()),
        created_at: Utc::now(),
    }
}

#[tokio::test]
#[ignore]
async fn create_then_get_roundtrip() {
    let (_container, client) = setup().await;
    let writer = SpotWriter::new(client.clone());
    let reader = SpotReader::new(client);

    let mut spot = spot_at("Sunset Point", 26.2183, 78.1648, Category::Romantic);
    apply_rating(
        &mut spot,
        &RatingUpdate {
            vibe: Some(5),
            safety: Some(4),
            ..Default::default()
        },
    );
    writer.create_spot(&spot).await.expect("create failed");

    let loaded = reader
        .get_spot(spot.id)
        .await
        .expect("get failed")
        .expect("spot missing");

    assert_eq!(loaded.name, "Sunset Point");
    assert_eq!(loaded.category, Category::Romantic);
    assert_eq!(loaded.ratings.vibe, vec![5]);
    assert_eq!(loaded.avg_ratings.vibe, 5.0);
    assert_eq!(loaded.avg_ratings.safety, 4.0);
    assert_eq!(loaded.avg_ratings.uniqueness, 0.0);
    assert_eq!(loaded.creator.username.as_deref(), Some("SunsetLover"));
    assert!((loaded.location.lat - 26.2183).abs() < 1e-9);
}

#[tokio::test]
#[ignore]
async fn rating_append_persists_recomputed_averages() {
    let (_container, client) = setup().await;
    let writer = SpotWriter::new(client.clone());
    let reader = SpotReader::new(client);

    let spot = spot_at("Old Bridge", 26.21, 78.17, Category::Creative);
    writer.create_spot(&spot).await.unwrap();

    let first = RatingUpdate {
        vibe: Some(3),
        ..Default::default()
    };
    let second = RatingUpdate {
        vibe: Some(5),
        ..Default::default()
    };
    writer.add_rating(spot.id, &first).await.unwrap().unwrap();
    let updated = writer.add_rating(spot.id, &second).await.unwrap().unwrap();

    assert_eq!(updated.ratings.vibe, vec![3, 5]);
    assert_eq!(updated.avg_ratings.vibe, 4.0);

    // The persisted copy matches what the writer returned.
    let reloaded = reader.get_spot(spot.id).await.unwrap().unwrap();
    assert_eq!(reloaded.ratings.vibe, vec![3, 5]);
    assert_eq!(reloaded.avg_ratings.vibe, 4.0);
    assert_eq!(reloaded.version, 2);
}

#[tokio::test]
#[ignore]
async fn rating_missing_spot_returns_none() {
    let (_container, client) = setup().await;
    let writer = SpotWriter::new(client);

    let update = RatingUpdate {
        crowd: Some(2),
        ..Default::default()
    };
    let result = writer.add_rating(Uuid::new_v4(), &update).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
#[ignore]
async fn concurrent_rating_appends_lose_nothing() {
    let (_container, client) = setup().await;
    let writer = std::sync::Arc::new(SpotWriter::new(client.clone()));
    let reader = SpotReader::new(client);

    let spot = spot_at("Busy Chai Stall", 26.22, 78.16, Category::Food);
    writer.create_spot(&spot).await.unwrap();

    let mut handles = Vec::new();
    for score in [1_i64, 2, 3, 4, 5] {
        let writer = writer.clone();
        let id = spot.id;
        handles.push(tokio::spawn(async move {
            let update = RatingUpdate {
                vibe: Some(score),
                ..Default::default()
            };
            writer.add_rating(id, &update).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().expect("append failed");
    }

    let reloaded = reader.get_spot(spot.id).await.unwrap().unwrap();
    assert_eq!(reloaded.ratings.vibe.len(), 5, "an append was lost");
    assert_eq!(reloaded.avg_ratings.vibe, 3.0);
}

#[tokio::test]
#[ignore]
async fn find_near_orders_by_distance_and_respects_radius() {
    let (_container, client) = setup().await;
    let writer = SpotWriter::new(client.clone());
    let reader = SpotReader::new(client);

    let origin = GeoPoint {
        lat: 26.2183,
        lng: 78.1648,
    };
    // ~0km, ~1.2km, ~3km, ~290km away
    let here = spot_at("Fort Gate", 26.2183, 78.1648, Category::Adventure);
    let close = spot_at("Palace Garden", 26.2156, 78.1589, Category::Serene);
    let farther = spot_at("Rock Shelter", 26.2400, 78.1800, Category::Adventure);
    let out_of_range = spot_at("Delhi Rooftop", 28.6139, 77.209, Category::Food);
    for s in [&here, &close, &farther, &out_of_range] {
        writer.create_spot(s).await.unwrap();
    }

    let results = reader
        .find_near(origin, 5.0, 50, None)
        .await
        .expect("nearby failed");

    let names: Vec<&str> = results.iter().map(|(s, _)| s.name.as_str()).collect();
    assert_eq!(names, vec!["Fort Gate", "Palace Garden", "Rock Shelter"]);
    assert!(results[0].1 < 0.01, "same-coordinate spot should be ~0km");
    for (spot, dist) in &results {
        assert!(
            spot.location.distance_km(&origin) <= 5.0 && *dist <= 5.0,
            "result outside radius"
        );
    }
}

#[tokio::test]
#[ignore]
async fn find_near_caps_results() {
    let (_container, client) = setup().await;
    let writer = SpotWriter::new(client.clone());
    let reader = SpotReader::new(client);

    for i in 0..5 {
        let s = spot_at(
            &format!("Spot {i}"),
            26.2183 + (i as f64) * 0.001,
            78.1648,
            Category::Other,
        );
        writer.create_spot(&s).await.unwrap();
    }

    let origin = GeoPoint {
        lat: 26.2183,
        lng: 78.1648,
    };
    let results = reader.find_near(origin, 5.0, 3, None).await.unwrap();
    assert_eq!(results.len(), 3);
}

#[tokio::test]
#[ignore]
async fn filtered_listing_with_pagination() {
    let (_container, client) = setup().await;
    let writer = SpotWriter::new(client.clone());
    let reader = SpotReader::new(client);

    for i in 0..7 {
        let mut s = spot_at(
            &format!("Romantic {i}"),
            26.2 + (i as f64) * 0.01,
            78.16,
            Category::Romantic,
        );
        apply_rating(
            &mut s,
            &RatingUpdate {
                vibe: Some(4),
                ..Default::default()
            },
        );
        writer.create_spot(&s).await.unwrap();
    }
    for i in 0..3 {
        let s = spot_at(&format!("Food {i}"), 26.3, 78.2 + (i as f64) * 0.01, Category::Food);
        writer.create_spot(&s).await.unwrap();
    }

    let q = SpotQuery {
        filter: SpotFilter {
            categories: vec![Category::Romantic],
            min_vibe: Some(3.0),
            ..Default::default()
        },
        sort: SpotSort::parse("createdAt:desc"),
        page: Pagination::clamped(Some(2), Some(5)),
    };
    let page = reader.find_by_query(&q).await.expect("query failed");

    assert_eq!(page.total, 7);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 2, "page 2 of 7 at limit 5");
    for spot in &page.items {
        assert_eq!(spot.category, Category::Romantic);
        assert!(spot.avg_ratings.vibe >= 3.0);
    }
}

#[tokio::test]
#[ignore]
async fn distance_sorted_listing_routes_through_nearby() {
    let (_container, client) = setup().await;
    let writer = SpotWriter::new(client.clone());
    let reader = SpotReader::new(client);

    let near = spot_at("Near", 26.2183, 78.1648, Category::Serene);
    let far = spot_at("Far", 26.30, 78.30, Category::Serene);
    writer.create_spot(&far).await.unwrap();
    writer.create_spot(&near).await.unwrap();

    let q = SpotQuery {
        filter: SpotFilter {
            point: Some(GeoPoint {
                lat: 26.2183,
                lng: 78.1648,
            }),
            ..Default::default()
        },
        sort: SpotSort::parse("distance:asc"),
        page: Pagination::default(),
    };
    let page = reader.find_by_query(&q).await.unwrap();

    let names: Vec<&str> = page.items.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Near", "Far"]);
}

#[tokio::test]
#[ignore]
async fn comments_link_list_and_delete() {
    let (_container, client) = setup().await;
    let writer = SpotWriter::new(client.clone());
    let reader = SpotReader::new(client);

    let spot = spot_at("Street Art Corner", 26.22, 78.162, Category::Creative);
    writer.create_spot(&spot).await.unwrap();

    let first = comment_on(spot.id, "Found it thanks to this app!");
    let second = comment_on(spot.id, "Murals repainted last month.");
    writer.create_comment(&first).await.unwrap();
    writer.create_comment(&second).await.unwrap();

    let page = reader
        .list_comments(spot.id, Pagination::default())
        .await
        .unwrap()
        .expect("spot should exist");
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 2);

    let (_, populated) = reader
        .get_spot_with_comments(spot.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(populated.len(), 2);

    assert!(writer.delete_comment(first.id).await.unwrap());
    let page = reader
        .list_comments(spot.id, Pagination::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].text, "Murals repainted last month.");

    // Deleting a missing comment reports false
    assert!(!writer.delete_comment(first.id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn comment_on_missing_spot_is_not_found() {
    let (_container, client) = setup().await;
    let writer = SpotWriter::new(client);

    let orphan = comment_on(Uuid::new_v4(), "Nobody will read this.");
    let err = writer.create_comment(&orphan).await.unwrap_err();
    assert!(matches!(
        err,
        hiddenspots_common::HiddenSpotsError::NotFound(_)
    ));
}
