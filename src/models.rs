use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use crate::auth::Role;

/// A listing row from the `properties` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Property {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub property_type: Option<String>,
    pub listing_type: Option<String>,
    pub price: Decimal,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area_sqft: Option<i32>,
    pub year_built: Option<i32>,
    pub status: String,
    pub featured: bool,
    pub agent_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A property plus the ordered ids of its associated images, the shape the
/// listing and detail endpoints return.
#[derive(Debug, Serialize)]
pub struct PropertyWithImages {
    #[serde(flatten)]
    pub property: Property,
    pub images: Vec<i64>,
}

/// Image-to-property association row, without the byte payload.
#[derive(Debug, FromRow)]
pub struct ImageRef {
    pub id: i64,
    pub property_id: Option<i64>,
}

/// Stored image payload for the byte-serving route.
#[derive(Debug, FromRow)]
pub struct StoredImage {
    pub image_data: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Client-facing user view; never carries the password hash.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            role: user.role,
            profile_image: user.profile_image,
            created_at: user.created_at,
        }
    }
}

/// User listing row with the per-agent property count joined in.
#[derive(Debug, FromRow)]
pub struct UserWithPropertyCount {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub property_count: i64,
}

/// A favorite joined with the property columns the listing page renders.
#[derive(Debug, Serialize, FromRow)]
pub struct FavoriteListing {
    pub id: i64,
    pub property_id: i64,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub price: Decimal,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub property_type: Option<String>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area_sqft: Option<i32>,
    pub status: String,
    pub featured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_drops_password_hash() {
        let user = User {
            id: 1,
            email: "a@b.c".into(),
            password_hash: "$2b$12$secret".into(),
            full_name: "A B".into(),
            phone: None,
            role: Role::User,
            profile_image: None,
            created_at: Utc::now(),
        };

        let public: PublicUser = user.into();
        let json = serde_json::to_value(&public).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "a@b.c");
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn property_with_images_flattens() {
        let property = Property {
            id: 7,
            title: "Lake House".into(),
            description: None,
            property_type: Some("house".into()),
            listing_type: Some("sale".into()),
            price: Decimal::new(450_000, 0),
            address: Some("1 Shore Dr".into()),
            city: Some("Tahoe".into()),
            state: Some("CA".into()),
            zip_code: Some("96150".into()),
            country: "USA".into(),
            bedrooms: 3,
            bathrooms: 2,
            area_sqft: Some(2100),
            year_built: Some(1987),
            status: "available".into(),
            featured: false,
            agent_id: 2,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(PropertyWithImages {
            property,
            images: vec![7, 8],
        })
        .unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["title"], "Lake House");
        assert_eq!(json["images"], serde_json::json!([7, 8]));
    }
}
