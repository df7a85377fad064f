use neo4rs::query;
use tracing::{info, warn};

use crate::GraphClient;

/// Run idempotent schema migrations: constraints, indexes.
/// Statements use IF NOT EXISTS; older servers that report duplicates
/// instead are handled by ignoring "already exists" errors.
pub async fn migrate(client: &GraphClient) -> Result<(), neo4rs::Error> {
    let g = &client.graph;

    info!("Running schema migrations...");

    // --- UUID uniqueness constraints ---
    let constraints = [
        "CREATE CONSTRAINT spot_id IF NOT EXISTS FOR (s:Spot) REQUIRE s.id IS UNIQUE",
        "CREATE CONSTRAINT comment_id IF NOT EXISTS FOR (c:Comment) REQUIRE c.id IS UNIQUE",
    ];

    for c in &constraints {
        run_ignoring_exists(g, c).await?;
    }
    info!("UUID uniqueness constraints created");

    // --- Property indexes (lat/lng for bounding box proximity queries) ---
    let geo_indexes = [
        "CREATE INDEX spot_lat IF NOT EXISTS FOR (s:Spot) ON (s.lat)",
        "CREATE INDEX spot_lng IF NOT EXISTS FOR (s:Spot) ON (s.lng)",
    ];

    for idx in &geo_indexes {
        run_ignoring_exists(g, idx).await?;
    }
    info!("Geo indexes created");

    // --- Filter/sort indexes ---
    let listing_indexes = [
        "CREATE INDEX spot_category IF NOT EXISTS FOR (s:Spot) ON (s.category)",
        "CREATE INDEX spot_created_at IF NOT EXISTS FOR (s:Spot) ON (s.created_at)",
        "CREATE INDEX spot_avg_vibe IF NOT EXISTS FOR (s:Spot) ON (s.avg_vibe)",
        "CREATE INDEX spot_avg_safety IF NOT EXISTS FOR (s:Spot) ON (s.avg_safety)",
        "CREATE INDEX spot_avg_uniqueness IF NOT EXISTS FOR (s:Spot) ON (s.avg_uniqueness)",
        "CREATE INDEX spot_avg_crowd IF NOT EXISTS FOR (s:Spot) ON (s.avg_crowd)",
    ];

    for idx in &listing_indexes {
        run_ignoring_exists(g, idx).await?;
    }
    info!("Listing indexes created");

    // --- Comment indexes ---
    let comment_indexes = [
        "CREATE INDEX comment_spot_id IF NOT EXISTS FOR (c:Comment) ON (c.spot_id)",
        "CREATE INDEX comment_created_at IF NOT EXISTS FOR (c:Comment) ON (c.created_at)",
    ];

    for idx in &comment_indexes {
        run_ignoring_exists(g, idx).await?;
    }
    info!("Comment indexes created");

    info!("Schema migrations complete");
    Ok(())
}

/// Run a Cypher statement, ignoring errors that indicate the constraint/index already exists.
async fn run_ignoring_exists(g: &neo4rs::Graph, cypher: &str) -> Result<(), neo4rs::Error> {
    match g.run(query(cypher)).await {
        Ok(_) => Ok(()),
        Err(e) => {
            let msg = e.to_string().to_lowercase();
            if msg.contains("already exists") || msg.contains("equivalent") {
                warn!(
                    "Already exists (skipped): {}",
                    cypher.chars().take(80).collect::<String>()
                );
                Ok(())
            } else {
                Err(e)
            }
        }
    }
}
