use chrono::{DateTime, Utc};
use neo4rs::query;
use tracing::{info, warn};
use uuid::Uuid;

use hiddenspots_common::{apply_rating, Comment, HiddenSpotsError, RatingUpdate, Spot};

use crate::reader::{db_err, row_to_spot};
use crate::GraphClient;

/// Bounded retries for optimistic version conflicts on rating appends.
/// Exhausting them surfaces a conflict error; a rating is never dropped
/// silently.
const MAX_WRITE_RETRIES: u32 = 5;

/// Write side of the spot store.
///
/// Rating appends are read-modify-write: the aggregator recomputes averages
/// in Rust, and the conditional `version` check serializes conflicting
/// writers per spot id without any global lock.
pub struct SpotWriter {
    client: GraphClient,
}

impl SpotWriter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Persist a new spot. Validation and initial aggregate recomputation
    /// have already happened at the service boundary. The insert is a
    /// single transaction, so the spot only becomes visible to proximity
    /// queries with its indexed properties in place.
    pub async fn create_spot(&self, spot: &Spot) -> Result<Uuid, HiddenSpotsError> {
        let q = query(
            "CREATE (s:Spot {
                id: $id,
                name: $name,
                category: $category,
                story: $story,
                images: $images,
                lat: $lat,
                lng: $lng,
                ratings_vibe: $ratings_vibe,
                ratings_safety: $ratings_safety,
                ratings_uniqueness: $ratings_uniqueness,
                ratings_crowd: $ratings_crowd,
                avg_vibe: $avg_vibe,
                avg_safety: $avg_safety,
                avg_uniqueness: $avg_uniqueness,
                avg_crowd: $avg_crowd,
                creator_is_anonymous: $creator_is_anonymous,
                creator_username: $creator_username,
                created_at: datetime($created_at),
                updated_at: datetime($updated_at),
                version: $version
            }) RETURN s.id AS id",
        )
        .param("id", spot.id.to_string())
        .param("name", spot.name.as_str())
        .param("category", spot.category.to_string())
        .param("story", spot.story.as_str())
        .param("images", spot.images.clone())
        .param("lat", spot.location.lat)
        .param("lng", spot.location.lng)
        .param("ratings_vibe", spot.ratings.vibe.clone())
        .param("ratings_safety", spot.ratings.safety.clone())
        .param("ratings_uniqueness", spot.ratings.uniqueness.clone())
        .param("ratings_crowd", spot.ratings.crowd.clone())
        .param("avg_vibe", spot.avg_ratings.vibe)
        .param("avg_safety", spot.avg_ratings.safety)
        .param("avg_uniqueness", spot.avg_ratings.uniqueness)
        .param("avg_crowd", spot.avg_ratings.crowd)
        .param("creator_is_anonymous", spot.creator.is_anonymous)
        .param(
            "creator_username",
            spot.creator.username.as_deref().unwrap_or(""),
        )
        .param("created_at", format_datetime(&spot.created_at))
        .param("updated_at", format_datetime(&spot.updated_at))
        .param("version", spot.version);

        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        while stream.next().await.map_err(db_err)?.is_some() {}

        info!(spot_id = %spot.id, name = %spot.name, "Spot created");
        Ok(spot.id)
    }

    /// Append validated rating values and recompute the persisted averages.
    /// Returns the updated spot, or None when the spot does not exist.
    ///
    /// Either the whole append+recompute lands in one conditional write or
    /// none of it does; a lost version race reloads and retries.
    pub async fn add_rating(
        &self,
        id: Uuid,
        update: &RatingUpdate,
    ) -> Result<Option<Spot>, HiddenSpotsError> {
        for attempt in 0..MAX_WRITE_RETRIES {
            let Some(mut spot) = self.load_spot(id).await? else {
                return Ok(None);
            };
            let expected = spot.version;

            apply_rating(&mut spot, update);
            spot.updated_at = Utc::now();
            spot.version = expected + 1;

            if self.store_ratings(&spot, expected).await? {
                return Ok(Some(spot));
            }
            warn!(spot_id = %id, attempt, "Rating append lost a version race, retrying");
        }

        Err(HiddenSpotsError::Conflict(format!(
            "spot {id}: rating append exhausted {MAX_WRITE_RETRIES} attempts"
        )))
    }

    async fn load_spot(&self, id: Uuid) -> Result<Option<Spot>, HiddenSpotsError> {
        let q = query("MATCH (s:Spot {id: $id}) RETURN s").param("id", id.to_string());
        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        if let Some(row) = stream.next().await.map_err(db_err)? {
            return Ok(row_to_spot(&row));
        }
        Ok(None)
    }

    /// Conditional write: only lands if nobody else bumped the version
    /// since our read. Returns false on a lost race.
    async fn store_ratings(
        &self,
        spot: &Spot,
        expected_version: i64,
    ) -> Result<bool, HiddenSpotsError> {
        let q = query(
            "MATCH (s:Spot {id: $id}) WHERE s.version = $expected
             SET s.ratings_vibe = $ratings_vibe,
                 s.ratings_safety = $ratings_safety,
                 s.ratings_uniqueness = $ratings_uniqueness,
                 s.ratings_crowd = $ratings_crowd,
                 s.avg_vibe = $avg_vibe,
                 s.avg_safety = $avg_safety,
                 s.avg_uniqueness = $avg_uniqueness,
                 s.avg_crowd = $avg_crowd,
                 s.updated_at = datetime($updated_at),
                 s.version = $version
             RETURN s.id AS id",
        )
        .param("id", spot.id.to_string())
        .param("expected", expected_version)
        .param("ratings_vibe", spot.ratings.vibe.clone())
        .param("ratings_safety", spot.ratings.safety.clone())
        .param("ratings_uniqueness", spot.ratings.uniqueness.clone())
        .param("ratings_crowd", spot.ratings.crowd.clone())
        .param("avg_vibe", spot.avg_ratings.vibe)
        .param("avg_safety", spot.avg_ratings.safety)
        .param("avg_uniqueness", spot.avg_ratings.uniqueness)
        .param("avg_crowd", spot.avg_ratings.crowd)
        .param("updated_at", format_datetime(&spot.updated_at))
        .param("version", spot.version);

        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        Ok(stream.next().await.map_err(db_err)?.is_some())
    }

    /// Create a comment node and link it to its spot, refreshing the
    /// spot's updated_at. Errors with NotFound if the spot is missing.
    pub async fn create_comment(&self, comment: &Comment) -> Result<(), HiddenSpotsError> {
        let q = query(
            "MATCH (s:Spot {id: $spot_id})
             CREATE (c:Comment {
                 id: $id,
                 spot_id: $spot_id,
                 text: $text,
                 is_anonymous: $is_anonymous,
                 username: $username,
                 created_at: datetime($created_at)
             })
             CREATE (s)-[:HAS_COMMENT]->(c)
             SET s.updated_at = datetime($created_at)
             RETURN c.id AS id",
        )
        .param("id", comment.id.to_string())
        .param("spot_id", comment.spot_id.to_string())
        .param("text", comment.text.as_str())
        .param("is_anonymous", comment.is_anonymous)
        .param("username", comment.username.as_deref().unwrap_or(""))
        .param("created_at", format_datetime(&comment.created_at));

        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        if stream.next().await.map_err(db_err)?.is_none() {
            return Err(HiddenSpotsError::not_found(format!(
                "spot {}",
                comment.spot_id
            )));
        }

        info!(spot_id = %comment.spot_id, comment_id = %comment.id, "Comment added");
        Ok(())
    }

    /// Delete a comment and its spot linkage. Returns false if no such
    /// comment exists.
    pub async fn delete_comment(&self, id: Uuid) -> Result<bool, HiddenSpotsError> {
        let q = query(
            "MATCH (c:Comment {id: $id})
             WITH c, c.id AS cid
             DETACH DELETE c
             RETURN cid",
        )
        .param("id", id.to_string());

        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        Ok(stream.next().await.map_err(db_err)?.is_some())
    }
}

/// Format a DateTime<Utc> as a local datetime string without timezone
/// offset; the store's datetime() takes "YYYY-MM-DDThh:mm:ss".
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
