//! Typed query composer for the property listing endpoint.
//!
//! Enumerates the recognized filter keys and their operators instead of
//! concatenating caller-supplied SQL fragments. Every supplied filter adds
//! one numbered-placeholder condition; an absent filter imposes no
//! constraint on that dimension.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

use crate::models::Property;

/// Optional filter set accepted by `GET /api/properties`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PropertyFilters {
    pub property_type: Option<String>,
    /// Case-insensitive substring match on the city column.
    pub city: Option<String>,
    /// Inclusive lower bound.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub min_price: Option<Decimal>,
    /// Inclusive upper bound.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub max_price: Option<Decimal>,
    pub status: Option<String>,
    /// Inclusive minimum bedroom count.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub bedrooms: Option<i32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub featured: Option<bool>,
}

/// Query-string values arrive as strings, so `?min_price=` would otherwise
/// fail numeric deserialization. Treat the empty string as an absent
/// parameter, like the string filters.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

pub struct PropertyQuery {
    filters: PropertyFilters,
}

impl PropertyQuery {
    pub fn new(mut filters: PropertyFilters) -> Self {
        // Empty string parameters (e.g. `?city=`) count as absent.
        filters.property_type = filters.property_type.filter(|v| !v.is_empty());
        filters.city = filters.city.filter(|v| !v.is_empty());
        filters.status = filters.status.filter(|v| !v.is_empty());
        Self { filters }
    }

    /// Render the SELECT with `$n` placeholders in a fixed key order. Binds
    /// are applied in the same order by `fetch_all`.
    fn sql(&self) -> String {
        let mut sql = String::from("SELECT * FROM properties");
        let mut conditions = Vec::new();
        let mut param = Param::default();

        if self.filters.property_type.is_some() {
            conditions.push(format!("property_type = {}", param.next()));
        }
        if self.filters.city.is_some() {
            conditions.push(format!("city ILIKE {}", param.next()));
        }
        if self.filters.min_price.is_some() {
            conditions.push(format!("price >= {}", param.next()));
        }
        if self.filters.max_price.is_some() {
            conditions.push(format!("price <= {}", param.next()));
        }
        if self.filters.status.is_some() {
            conditions.push(format!("status = {}", param.next()));
        }
        if self.filters.bedrooms.is_some() {
            conditions.push(format!("bedrooms >= {}", param.next()));
        }
        if self.filters.featured.is_some() {
            conditions.push(format!("featured = {}", param.next()));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        // Stable listing order: newest first.
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        sql
    }

    /// All rows satisfying every supplied bound. Fails whole, never partial.
    pub async fn fetch_all(&self, pool: &PgPool) -> Result<Vec<Property>, sqlx::Error> {
        let sql = self.sql();
        let mut query = sqlx::query_as::<_, Property>(&sql);

        // Bind order must mirror the condition order in `sql`.
        if let Some(property_type) = &self.filters.property_type {
            query = query.bind(property_type);
        }
        if let Some(city) = &self.filters.city {
            query = query.bind(format!("%{}%", escape_like(city)));
        }
        if let Some(min_price) = self.filters.min_price {
            query = query.bind(min_price);
        }
        if let Some(max_price) = self.filters.max_price {
            query = query.bind(max_price);
        }
        if let Some(status) = &self.filters.status {
            query = query.bind(status);
        }
        if let Some(bedrooms) = self.filters.bedrooms {
            query = query.bind(bedrooms);
        }
        if let Some(featured) = self.filters.featured {
            query = query.bind(featured);
        }

        query.fetch_all(pool).await
    }
}

#[derive(Default)]
struct Param(usize);

impl Param {
    fn next(&mut self) -> String {
        self.0 += 1;
        format!("${}", self.0)
    }
}

/// Escape LIKE metacharacters so a city filter matches literally.
fn escape_like(input: &str) -> String {
    input.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
