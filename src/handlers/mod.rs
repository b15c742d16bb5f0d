pub mod auth;
pub mod favorites;
pub mod health;
pub mod images;
pub mod properties;
pub mod uploads;
pub mod users;
