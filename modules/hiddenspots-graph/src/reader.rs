use chrono::{DateTime, NaiveDateTime, Utc};
use neo4rs::query;
use uuid::Uuid;

use hiddenspots_common::{
    AvgRatings, Category, Comment, CreatorInfo, GeoPoint, HiddenSpotsError, Ratings, Spot,
};

use crate::query::{Page, Pagination, SpotFilter, SpotQuery, SpotSort, NEARBY_MAX_RADIUS_KM};
use crate::GraphClient;

/// Candidate cap for the bounding-box prefilter. The box over-approximates
/// the radius, so fetch more than the result cap before exact filtering.
const BBOX_CANDIDATE_CAP: usize = 500;

/// Read side of the spot store.
///
/// Proximity queries use a bounding box over the lat/lng range indexes as a
/// prefilter, then exact haversine distances for the radius cut and the
/// ascending sort. Averages are read as persisted: they are maintained at
/// write time and never recomputed here.
pub struct SpotReader {
    client: GraphClient,
}

impl SpotReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Liveness probe: a trivial round trip to the store.
    pub async fn ping(&self) -> Result<(), HiddenSpotsError> {
        let mut stream = self
            .client
            .graph
            .execute(query("RETURN 1 AS ok"))
            .await
            .map_err(db_err)?;
        while stream.next().await.map_err(db_err)?.is_some() {}
        Ok(())
    }

    pub async fn get_spot(&self, id: Uuid) -> Result<Option<Spot>, HiddenSpotsError> {
        let q = query("MATCH (s:Spot {id: $id}) RETURN s").param("id", id.to_string());
        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        if let Some(row) = stream.next().await.map_err(db_err)? {
            return Ok(row_to_spot(&row));
        }
        Ok(None)
    }

    /// Get a spot with its comments, newest first.
    pub async fn get_spot_with_comments(
        &self,
        id: Uuid,
    ) -> Result<Option<(Spot, Vec<Comment>)>, HiddenSpotsError> {
        let q = query(
            "MATCH (s:Spot {id: $id})
             OPTIONAL MATCH (s)-[:HAS_COMMENT]->(c:Comment)
             WITH s, c ORDER BY c.created_at DESC
             RETURN s, collect(c) AS comments",
        )
        .param("id", id.to_string());

        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        if let Some(row) = stream.next().await.map_err(db_err)? {
            let Some(spot) = row_to_spot(&row) else {
                return Ok(None);
            };
            let nodes: Vec<neo4rs::Node> = row.get("comments").unwrap_or_default();
            let comments: Vec<Comment> = nodes.iter().filter_map(node_to_comment).collect();
            return Ok(Some((spot, comments)));
        }
        Ok(None)
    }

    pub async fn spot_exists(&self, id: Uuid) -> Result<bool, HiddenSpotsError> {
        let q = query("MATCH (s:Spot {id: $id}) RETURN s.id AS id").param("id", id.to_string());
        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        Ok(stream.next().await.map_err(db_err)?.is_some())
    }

    /// Most recently created spots. The nearby endpoint degrades to this
    /// when no reference point is supplied.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<Spot>, HiddenSpotsError> {
        let cypher = format!(
            "MATCH (s:Spot) RETURN s ORDER BY s.created_at DESC LIMIT {limit}"
        );
        let mut stream = self
            .client
            .graph
            .execute(query(&cypher))
            .await
            .map_err(db_err)?;
        let mut spots = Vec::new();
        while let Some(row) = stream.next().await.map_err(db_err)? {
            if let Some(spot) = row_to_spot(&row) {
                spots.push(spot);
            }
        }
        Ok(spots)
    }

    /// Find spots within `radius_km` of `point`, ordered by ascending
    /// distance, capped at `limit`. Additional filter clauses compose into
    /// the same WHERE (used by distance-sorted listings).
    pub async fn find_near(
        &self,
        point: GeoPoint,
        radius_km: f64,
        limit: usize,
        filter: Option<&SpotFilter>,
    ) -> Result<Vec<(Spot, f64)>, HiddenSpotsError> {
        // ~1 degree lat ≈ 111km, 1 degree lng ≈ 111km * cos(lat)
        let lat_delta = radius_km / 111.0;
        let lng_delta = radius_km / (111.0 * point.lat.to_radians().cos());

        let mut clauses = vec![
            "s.lat >= $min_lat AND s.lat <= $max_lat".to_string(),
            "s.lng >= $min_lng AND s.lng <= $max_lng".to_string(),
        ];
        if let Some(f) = filter {
            clauses.extend(f.clauses());
        }

        let cypher = format!(
            "MATCH (s:Spot) WHERE {} RETURN s LIMIT {BBOX_CANDIDATE_CAP}",
            clauses.join(" AND "),
        );

        let mut q = query(&cypher)
            .param("min_lat", point.lat - lat_delta)
            .param("max_lat", point.lat + lat_delta)
            .param("min_lng", point.lng - lng_delta)
            .param("max_lng", point.lng + lng_delta);
        if let Some(f) = filter {
            q = f.bind(q);
        }

        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        let mut results: Vec<(Spot, f64)> = Vec::new();
        while let Some(row) = stream.next().await.map_err(db_err)? {
            if let Some(spot) = row_to_spot(&row) {
                let distance = spot.location.distance_km(&point);
                if distance <= radius_km {
                    results.push((spot, distance));
                }
            }
        }

        results.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        Ok(results)
    }

    /// Filtered, sorted, paginated listing with total count. A distance
    /// sort with a reference point routes through [`find_near`] at the
    /// maximum radius and paginates after the exact distance sort.
    ///
    /// [`find_near`]: SpotReader::find_near
    pub async fn find_by_query(&self, q: &SpotQuery) -> Result<Page<Spot>, HiddenSpotsError> {
        if q.sort == SpotSort::Distance {
            if let Some(point) = q.filter.point {
                return self.find_near_paged(point, q).await;
            }
        }

        let clauses = q.filter.clauses();
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {} ", clauses.join(" AND "))
        };

        let cypher = format!(
            "MATCH (s:Spot) {where_sql}RETURN s {} SKIP {} LIMIT {}",
            q.sort.order_clause(),
            q.page.skip(),
            q.page.limit,
        );
        let data_q = q.filter.bind(query(&cypher));

        let mut stream = self.client.graph.execute(data_q).await.map_err(db_err)?;
        let mut spots = Vec::new();
        while let Some(row) = stream.next().await.map_err(db_err)? {
            if let Some(spot) = row_to_spot(&row) {
                spots.push(spot);
            }
        }

        let count_cypher = format!("MATCH (s:Spot) {where_sql}RETURN count(s) AS total");
        let count_q = q.filter.bind(query(&count_cypher));
        let mut stream = self.client.graph.execute(count_q).await.map_err(db_err)?;
        let total: i64 = match stream.next().await.map_err(db_err)? {
            Some(row) => row.get("total").unwrap_or(0),
            None => 0,
        };

        Ok(Page::new(spots, q.page, total as u64))
    }

    async fn find_near_paged(
        &self,
        point: GeoPoint,
        q: &SpotQuery,
    ) -> Result<Page<Spot>, HiddenSpotsError> {
        let ranked = self
            .find_near(point, NEARBY_MAX_RADIUS_KM, BBOX_CANDIDATE_CAP, Some(&q.filter))
            .await?;
        let total = ranked.len() as u64;
        let skip = q.page.skip() as usize;
        let items: Vec<Spot> = ranked
            .into_iter()
            .skip(skip)
            .take(q.page.limit as usize)
            .map(|(spot, _)| spot)
            .collect();
        Ok(Page::new(items, q.page, total))
    }

    /// Paginated comments for a spot, newest first. Returns None when the
    /// spot itself does not exist.
    pub async fn list_comments(
        &self,
        spot_id: Uuid,
        page: Pagination,
    ) -> Result<Option<Page<Comment>>, HiddenSpotsError> {
        if !self.spot_exists(spot_id).await? {
            return Ok(None);
        }

        let cypher = format!(
            "MATCH (s:Spot {{id: $spot_id}})-[:HAS_COMMENT]->(c:Comment)
             RETURN c ORDER BY c.created_at DESC SKIP {} LIMIT {}",
            page.skip(),
            page.limit,
        );
        let q = query(&cypher).param("spot_id", spot_id.to_string());
        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        let mut comments = Vec::new();
        while let Some(row) = stream.next().await.map_err(db_err)? {
            if let Ok(node) = row.get::<neo4rs::Node>("c") {
                if let Some(comment) = node_to_comment(&node) {
                    comments.push(comment);
                }
            }
        }

        let count_q = query(
            "MATCH (s:Spot {id: $spot_id})-[:HAS_COMMENT]->(c:Comment)
             RETURN count(c) AS total",
        )
        .param("spot_id", spot_id.to_string());
        let mut stream = self.client.graph.execute(count_q).await.map_err(db_err)?;
        let total: i64 = match stream.next().await.map_err(db_err)? {
            Some(row) => row.get("total").unwrap_or(0),
            None => 0,
        };

        Ok(Some(Page::new(comments, page, total as u64)))
    }
}

// --- Row parsing ---

pub(crate) fn db_err(e: neo4rs::Error) -> HiddenSpotsError {
    HiddenSpotsError::Database(e.to_string())
}

pub fn row_to_spot(row: &neo4rs::Row) -> Option<Spot> {
    let n: neo4rs::Node = row.get("s").ok()?;
    node_to_spot(&n)
}

pub fn node_to_spot(n: &neo4rs::Node) -> Option<Spot> {
    let id_str: String = n.get("id").ok()?;
    let id = Uuid::parse_str(&id_str).ok()?;

    let name: String = n.get("name").unwrap_or_default();
    let category_str: String = n.get("category").unwrap_or_default();
    let category = Category::from_name(&category_str).unwrap_or_default();
    let story: String = n.get("story").unwrap_or_default();
    let images: Vec<String> = n.get("images").unwrap_or_default();

    let lat: f64 = n.get("lat").unwrap_or(0.0);
    let lng: f64 = n.get("lng").unwrap_or(0.0);

    let ratings = Ratings {
        vibe: n.get("ratings_vibe").unwrap_or_default(),
        safety: n.get("ratings_safety").unwrap_or_default(),
        uniqueness: n.get("ratings_uniqueness").unwrap_or_default(),
        crowd: n.get("ratings_crowd").unwrap_or_default(),
    };
    let avg_ratings = AvgRatings {
        vibe: n.get("avg_vibe").unwrap_or(0.0),
        safety: n.get("avg_safety").unwrap_or(0.0),
        uniqueness: n.get("avg_uniqueness").unwrap_or(0.0),
        crowd: n.get("avg_crowd").unwrap_or(0.0),
    };

    let is_anonymous: bool = n.get("creator_is_anonymous").unwrap_or(false);
    let username: String = n.get("creator_username").unwrap_or_default();
    let creator = CreatorInfo {
        is_anonymous,
        username: if username.is_empty() {
            None
        } else {
            Some(username)
        },
    };

    Some(Spot {
        id,
        name,
        location: GeoPoint { lat, lng },
        category,
        story,
        images,
        ratings,
        avg_ratings,
        creator,
        created_at: parse_datetime_prop(n, "created_at"),
        updated_at: parse_datetime_prop(n, "updated_at"),
        version: n.get("version").unwrap_or(0),
    })
}

pub fn node_to_comment(n: &neo4rs::Node) -> Option<Comment> {
    let id_str: String = n.get("id").ok()?;
    let id = Uuid::parse_str(&id_str).ok()?;
    let spot_id_str: String = n.get("spot_id").unwrap_or_default();
    let spot_id = Uuid::parse_str(&spot_id_str).ok()?;

    let text: String = n.get("text").unwrap_or_default();
    let is_anonymous: bool = n.get("is_anonymous").unwrap_or(false);
    let username: String = n.get("username").unwrap_or_default();

    Some(Comment {
        id,
        spot_id,
        text,
        is_anonymous,
        username: if username.is_empty() {
            None
        } else {
            Some(username)
        },
        created_at: parse_datetime_prop(n, "created_at"),
    })
}

pub fn parse_datetime_prop(n: &neo4rs::Node, prop: &str) -> DateTime<Utc> {
    // Stored via Cypher datetime() but may come back as a bolt datetime or
    // a plain string depending on the server. Try both.
    if let Ok(dt) = n.get::<DateTime<chrono::FixedOffset>>(prop) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = n.get::<NaiveDateTime>(prop) {
        return ndt.and_utc();
    }
    if let Ok(s) = n.get::<String>(prop) {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
            return dt.with_timezone(&Utc);
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f") {
            return naive.and_utc();
        }
    }
    Utc::now()
}
