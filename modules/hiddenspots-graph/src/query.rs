//! Query Builder: translates an external filter/sort/pagination request
//! into the store's Cypher query form.
//!
//! Filters are logically ANDed. Sorting accepts `"<field>:<asc|desc>"`
//! specs; `distance` is special-cased because it is only meaningful
//! relative to a reference point, so the reader routes it through the
//! nearby path instead of a generic ORDER BY.

use serde::Serialize;

use hiddenspots_common::{Category, GeoPoint, RatingDimension};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 50;

pub const NEARBY_DEFAULT_RADIUS_KM: f64 = 5.0;
pub const NEARBY_MIN_RADIUS_KM: f64 = 0.1;
pub const NEARBY_MAX_RADIUS_KM: f64 = 50.0;
/// Cap on nearby results, matching the original API's hard limit.
pub const NEARBY_RESULT_CAP: usize = 50;

// --- Sorting ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn cypher(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotSort {
    CreatedAt(SortDirection),
    AvgRating(RatingDimension, SortDirection),
    /// Ascending distance from the filter's reference point.
    Distance,
}

impl Default for SpotSort {
    fn default() -> Self {
        SpotSort::CreatedAt(SortDirection::Desc)
    }
}

impl SpotSort {
    /// Parse a `"<field>:<asc|desc>"` sort spec. Recognized fields are
    /// `createdAt`, `avgRatings.<dimension>` and `distance`; anything else
    /// falls back to the default `createdAt:desc`.
    pub fn parse(spec: &str) -> Self {
        let (field, dir) = spec.split_once(':').unwrap_or((spec, "asc"));
        let direction = match dir {
            "desc" => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        match field {
            "createdAt" => SpotSort::CreatedAt(direction),
            "distance" => SpotSort::Distance,
            _ => field
                .strip_prefix("avgRatings.")
                .and_then(RatingDimension::from_name)
                .map(|dim| SpotSort::AvgRating(dim, direction))
                .unwrap_or_default(),
        }
    }

    /// ORDER BY clause for store-side sorting. Distance ordering happens
    /// in-process after exact distance computation, so when a distance sort
    /// reaches the generic query path (no reference point supplied) it
    /// falls back to the default ordering.
    pub fn order_clause(&self) -> String {
        match self {
            SpotSort::CreatedAt(dir) => format!("ORDER BY s.created_at {}", dir.cypher()),
            SpotSort::AvgRating(dim, dir) => {
                format!("ORDER BY s.avg_{} {}", dim.as_str(), dir.cypher())
            }
            SpotSort::Distance => Self::default().order_clause(),
        }
    }
}

// --- Filtering ---

#[derive(Debug, Clone, Default)]
pub struct SpotFilter {
    /// "category in set"; empty means no category restriction.
    pub categories: Vec<Category>,
    pub min_vibe: Option<f64>,
    pub min_safety: Option<f64>,
    pub min_uniqueness: Option<f64>,
    pub min_crowd: Option<f64>,
    /// Reference point enabling the distance sort.
    pub point: Option<GeoPoint>,
}

impl SpotFilter {
    pub fn min_rating(&self, dim: RatingDimension) -> Option<f64> {
        match dim {
            RatingDimension::Vibe => self.min_vibe,
            RatingDimension::Safety => self.min_safety,
            RatingDimension::Uniqueness => self.min_uniqueness,
            RatingDimension::Crowd => self.min_crowd,
        }
    }

    /// WHERE fragments referencing `$`-parameters supplied by [`bind`].
    ///
    /// [`bind`]: SpotFilter::bind
    pub fn clauses(&self) -> Vec<String> {
        let mut clauses = Vec::new();
        if !self.categories.is_empty() {
            clauses.push("s.category IN $categories".to_string());
        }
        for dim in RatingDimension::ALL {
            if self.min_rating(dim).is_some() {
                clauses.push(format!("s.avg_{d} >= $min_{d}", d = dim.as_str()));
            }
        }
        clauses
    }

    /// Bind the parameter values referenced by [`clauses`].
    ///
    /// [`clauses`]: SpotFilter::clauses
    pub fn bind(&self, mut q: neo4rs::Query) -> neo4rs::Query {
        if !self.categories.is_empty() {
            let names: Vec<String> = self.categories.iter().map(|c| c.to_string()).collect();
            q = q.param("categories", names);
        }
        for dim in RatingDimension::ALL {
            if let Some(min) = self.min_rating(dim) {
                q = q.param(&format!("min_{}", dim.as_str()), min);
            }
        }
        q
    }
}

// --- Pagination ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Pagination {
    pub fn clamped(page: Option<u32>, limit: Option<u32>) -> Self {
        Pagination {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

/// One page of results plus the pagination envelope the API returns.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total: u64) -> Self {
        Page {
            items,
            page: pagination.page,
            limit: pagination.limit,
            total,
            total_pages: total.div_ceil(pagination.limit as u64),
        }
    }
}

// --- The combined query ---

#[derive(Debug, Clone, Default)]
pub struct SpotQuery {
    pub filter: SpotFilter,
    pub sort: SpotSort,
    pub page: Pagination,
}
