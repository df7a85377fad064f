//! Seed the store with the Gwalior sample spots and comments.
//!
//! Spots go through the same writer path as the API, with every rating
//! applied through the aggregator so averages are recomputed, never copied.
//!
//! Run with: cargo run -p hiddenspots-api --bin seed

use anyhow::Result;
use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use hiddenspots_common::ratings::{apply_rating, RatingUpdate};
use hiddenspots_common::{
    AvgRatings, Category, Comment, Config, CreatorInfo, GeoPoint, Ratings, Spot,
};
use hiddenspots_graph::{GraphClient, SpotWriter};

struct SeedSpot {
    name: &'static str,
    lat: f64,
    lng: f64,
    category: Category,
    story: &'static str,
    images: [&'static str; 2],
    // One entry per submitted rating: (vibe, safety, uniqueness, crowd)
    ratings: [(i64, i64, i64, i64); 5],
    is_anonymous: bool,
    username: Option<&'static str>,
}

fn sample_spots() -> Vec<SeedSpot> {
    vec![
        SeedSpot {
            name: "Sunset Point at Gwalior Fort",
            lat: 26.2183,
            lng: 78.1648,
            category: Category::Romantic,
            story: "A magical spot at the top of Gwalior Fort where you can watch the most \
                    breathtaking sunsets. The golden hour here is absolutely romantic - perfect \
                    for couples. The view of the entire city bathed in golden light is \
                    unforgettable.",
            images: [
                "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=400&h=300&fit=crop",
                "https://images.unsplash.com/photo-1441974231531-c6227db76b6e?w=400&h=300&fit=crop",
            ],
            ratings: [(5, 4, 5, 3), (4, 5, 5, 2), (5, 4, 4, 3), (4, 4, 5, 2), (5, 5, 4, 3)],
            is_anonymous: false,
            username: Some("SunsetLover"),
        },
        SeedSpot {
            name: "Hidden Garden near Jai Vilas Palace",
            lat: 26.2156,
            lng: 78.1589,
            category: Category::Serene,
            story: "A peaceful garden hidden behind the grand Jai Vilas Palace. This is my \
                    secret escape from the city noise. The ancient trees provide perfect shade, \
                    and the sound of birds is therapeutic. Great place to read a book or \
                    meditate.",
            images: [
                "https://images.unsplash.com/photo-1441974231531-c6227db76b6e?w=400&h=300&fit=crop",
                "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=400&h=300&fit=crop",
            ],
            ratings: [(4, 5, 4, 2), (5, 4, 4, 1), (4, 5, 5, 2), (4, 5, 4, 2), (5, 4, 4, 1)],
            is_anonymous: true,
            username: None,
        },
        SeedSpot {
            name: "Street Art Corner in Old City",
            lat: 26.22,
            lng: 78.162,
            category: Category::Creative,
            story: "An amazing corner in the old city where local artists have created \
                    beautiful murals. The colors and creativity here are inspiring. Perfect \
                    spot for photographers and artists looking for inspiration. The community \
                    here is so welcoming!",
            images: [
                "https://images.unsplash.com/photo-1541961017774-22349e4a1262?w=400&h=300&fit=crop",
                "https://images.unsplash.com/photo-1578662996442-48f60103fc96?w=400&h=300&fit=crop",
            ],
            ratings: [(5, 4, 5, 3), (4, 4, 5, 4), (5, 3, 5, 3), (5, 4, 5, 3), (4, 4, 5, 4)],
            is_anonymous: false,
            username: Some("ArtExplorer"),
        },
        SeedSpot {
            name: "Secret Rooftop Cafe",
            lat: 26.218,
            lng: 78.16,
            category: Category::Food,
            story: "A hidden rooftop cafe that serves the most amazing local food. The view \
                    from here is spectacular, and the food is authentic Gwalior cuisine. Not \
                    many people know about this place, so it's always peaceful. Their chai and \
                    samosas are a must-try!",
            images: [
                "https://images.unsplash.com/photo-1414235077428-338989a2e8c0?w=400&h=300&fit=crop",
                "https://images.unsplash.com/photo-1559339352-11d035aa65de?w=400&h=300&fit=crop",
            ],
            ratings: [(4, 5, 4, 3), (5, 4, 5, 2), (4, 5, 4, 3), (4, 5, 4, 3), (5, 4, 5, 2)],
            is_anonymous: false,
            username: Some("FoodieGwalior"),
        },
        SeedSpot {
            name: "Adventure Trail near Tansen Tomb",
            lat: 26.217,
            lng: 78.165,
            category: Category::Adventure,
            story: "An exciting hiking trail near Tansen Tomb that leads to a hidden \
                    viewpoint. The trail is challenging but rewarding. You'll discover ancient \
                    ruins and get amazing panoramic views of the city. Perfect for adventure \
                    seekers!",
            images: [
                "https://images.unsplash.com/photo-1551632811-561732d1e306?w=400&h=300&fit=crop",
                "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=400&h=300&fit=crop",
            ],
            ratings: [(5, 4, 5, 2), (4, 3, 5, 1), (5, 4, 4, 2), (5, 4, 5, 2), (4, 3, 5, 1)],
            is_anonymous: false,
            username: Some("AdventureSeeker"),
        },
    ]
}

fn sample_comments(spot_ids: &[Uuid]) -> Vec<Comment> {
    let entries: [(usize, &str, bool, Option<&str>); 5] = [
        (
            0,
            "Absolutely stunning sunset views! Perfect for a romantic evening.",
            false,
            Some("RomanceSeeker"),
        ),
        (
            0,
            "Best spot in Gwalior for photography. The golden hour is magical!",
            true,
            None,
        ),
        (
            1,
            "So peaceful and quiet. Perfect escape from the city hustle.",
            false,
            Some("PeaceLover"),
        ),
        (
            2,
            "The street art here is incredible! Each mural tells a story.",
            false,
            Some("ArtEnthusiast"),
        ),
        (
            3,
            "Amazing food and even better views! Highly recommended.",
            false,
            Some("FoodExplorer"),
        ),
    ];

    entries
        .into_iter()
        .map(|(idx, text, is_anonymous, username)| Comment {
            id: Uuid::new_v4(),
            spot_id: spot_ids[idx],
            text: text.to_string(),
            is_anonymous,
            username: username.map(String::from),
            created_at: Utc::now(),
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("seed=info".parse()?)
                .add_directive("hiddenspots_graph=info".parse()?),
        )
        .init();

    let config = Config::from_env();
    let client = GraphClient::connect(
        &config.neo4j_uri,
        &config.neo4j_user,
        &config.neo4j_password,
    )
    .await?;
    hiddenspots_graph::migrate::migrate(&client).await?;

    let writer = SpotWriter::new(client);
    let now = Utc::now();

    let mut spot_ids = Vec::new();
    for seed in sample_spots() {
        let mut spot = Spot {
            id: Uuid::new_v4(),
            name: seed.name.to_string(),
            location: GeoPoint {
                lat: seed.lat,
                lng: seed.lng,
            },
            category: seed.category,
            story: seed.story.to_string(),
            images: seed.images.iter().map(|s| s.to_string()).collect(),
            ratings: Ratings::default(),
            avg_ratings: AvgRatings::default(),
            creator: CreatorInfo {
                is_anonymous: seed.is_anonymous,
                username: seed.username.map(String::from),
            },
            created_at: now,
            updated_at: now,
            version: 0,
        };

        for (vibe, safety, uniqueness, crowd) in seed.ratings {
            apply_rating(
                &mut spot,
                &RatingUpdate {
                    vibe: Some(vibe),
                    safety: Some(safety),
                    uniqueness: Some(uniqueness),
                    crowd: Some(crowd),
                },
            );
        }

        writer.create_spot(&spot).await?;
        info!(
            name = %spot.name,
            category = %spot.category,
            overall = spot.overall_rating(),
            "Seeded spot"
        );
        spot_ids.push(spot.id);
    }

    for comment in sample_comments(&spot_ids) {
        writer.create_comment(&comment).await?;
    }

    info!("Database seeded successfully");
    Ok(())
}
