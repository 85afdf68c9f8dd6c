//! Data models for movies, request payloads and shared application state.
//!
//! Models derive Serde and SQLx traits for (de)serialization and DB mapping.
//! JSON uses camelCase field names, SQL columns use snake_case.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::config::Settings;
use crate::db;
use crate::query::QueryTranslator;

/// A movie in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    /// URL-safe identifier derived from the title, see [`slugify`]
    pub slug: String,
    pub description: Option<String>,
    /// Running time in minutes
    pub duration: i32,
    pub release_year: i32,
    /// Average rating between 1.0 and 10.0
    pub ratings: Option<f64>,
    pub total_ratings: Option<i32>,
    pub release_date: DateTime<Utc>,
    pub genres: Vec<String>,
    pub director: Vec<String>,
    pub casts: Vec<String>,
    pub language: Vec<String>,
    pub cover_image: String,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column list matching [`Movie`]'s `FromRow` mapping, for the `movies m` alias.
pub const MOVIE_SELECT: &str = "m.id, m.title, m.slug, m.description, m.duration, \
     m.release_year, m.ratings, m.total_ratings, m.release_date, m.genres, m.director, \
     m.casts, m.language, m.cover_image, m.price, m.created_at, m.updated_at";

/// A movie as returned to clients, with derived fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDocument<'a> {
    #[serde(flatten)]
    pub movie: &'a Movie,
    pub duration_in_hours: f64,
}

impl Movie {
    pub fn document(&self) -> MovieDocument<'_> {
        MovieDocument {
            movie: self,
            duration_in_hours: f64::from(self.duration) / 60.0,
        }
    }
}

/// Request body for creating a movie.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewMovie {
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub duration: i32,
    #[validate(range(min = 1870, max = 2200))]
    pub release_year: i32,
    #[validate(range(min = 1.0, max = 10.0))]
    pub ratings: Option<f64>,
    #[validate(range(min = 0))]
    pub total_ratings: Option<i32>,
    pub release_date: DateTime<Utc>,
    #[validate(length(min = 1))]
    pub genres: Vec<String>,
    #[validate(length(min = 1))]
    pub director: Vec<String>,
    #[validate(length(min = 1))]
    pub casts: Vec<String>,
    #[serde(default)]
    pub language: Vec<String>,
    #[validate(length(min = 1))]
    pub cover_image: String,
    #[validate(range(min = 0.0))]
    pub price: f64,
}

/// Request body for a partial update. Unknown fields are rejected.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MoviePatch {
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub duration: Option<i32>,
    #[validate(range(min = 1870, max = 2200))]
    pub release_year: Option<i32>,
    #[validate(range(min = 1.0, max = 10.0))]
    pub ratings: Option<f64>,
    #[validate(range(min = 0))]
    pub total_ratings: Option<i32>,
    pub release_date: Option<DateTime<Utc>>,
    #[validate(length(min = 1))]
    pub genres: Option<Vec<String>>,
    #[validate(length(min = 1))]
    pub director: Option<Vec<String>>,
    #[validate(length(min = 1))]
    pub casts: Option<Vec<String>>,
    pub language: Option<Vec<String>>,
    #[validate(length(min = 1))]
    pub cover_image: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
}

/// Titles are stored trimmed, so whitespace alone does not count as a title.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

/// Per-year statistics over well-rated released movies.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct YearStats {
    pub release_year: i32,
    pub movie_count: i64,
    pub avg_rating: Option<f64>,
    pub avg_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub total_price: Option<f64>,
}

/// Released movies grouped under one genre.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GenreSummary {
    pub genre: String,
    pub movie_count: i64,
    /// Titles in alphabetical order
    pub movies: Vec<String>,
}

/// Derives a URL slug from a title.
///
/// Lowercases, keeps ASCII letters, digits and whitespace, turns whitespace
/// runs into single dashes and strips dashes at both ends.
///
/// ```
/// assert_eq!(marquee::slugify("  The Good, the Bad & the Ugly "), "the-good-the-bad-the-ugly");
/// ```
pub fn slugify(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// SQLx Postgres connection pool
    pub db: Arc<PgPool>,
    /// Translator for movie listing queries
    pub translator: QueryTranslator,
}

impl AppState {
    /// Connects to the database described by `settings` and brings its schema
    /// up to date.
    ///
    /// # Errors
    /// Connection and migration errors are returned as `anyhow::Error`.
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let db = db::connect_pg_pool(settings).await?;
        db::run_migrations(&db).await?;
        Ok(Self::from_pool(db))
    }

    /// Wraps an existing pool.
    pub fn from_pool(db: PgPool) -> Self {
        Self {
            db: Arc::new(db),
            translator: QueryTranslator::movies(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_drops_punctuation_and_collapses_spaces() {
        assert_eq!(slugify("Star Wars: Episode IV"), "star-wars-episode-iv");
        assert_eq!(slugify("  Mad   Max -- Fury Road!  "), "mad-max-fury-road");
        assert_eq!(slugify("2001: A Space Odyssey"), "2001-a-space-odyssey");
        assert_eq!(slugify("Amélie"), "amlie");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn document_adds_duration_in_hours() {
        let movie = Movie {
            id: Uuid::nil(),
            title: "Heat".into(),
            slug: "heat".into(),
            description: None,
            duration: 170,
            release_year: 1995,
            ratings: Some(8.3),
            total_ratings: None,
            release_date: Utc::now(),
            genres: vec!["Crime".into()],
            director: vec!["Michael Mann".into()],
            casts: vec!["Al Pacino".into()],
            language: vec![],
            cover_image: "https://img.example/heat.jpg".into(),
            price: 9.99,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let doc = serde_json::to_value(movie.document()).unwrap();
        assert_eq!(doc["title"], "Heat");
        assert_eq!(doc["releaseYear"], 1995);
        assert!((doc["durationInHours"].as_f64().unwrap() - 170.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let err = serde_json::from_str::<MoviePatch>(r#"{"slug": "hand-picked"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));

        let patch: MoviePatch = serde_json::from_str(r#"{"price": 4.5}"#).unwrap();
        assert_eq!(patch.price, Some(4.5));
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn whitespace_only_title_is_rejected() {
        let body = serde_json::json!({
            "title": "   ",
            "duration": 170,
            "releaseYear": 1995,
            "releaseDate": "1995-12-15T00:00:00Z",
            "genres": ["Crime"],
            "director": ["Michael Mann"],
            "casts": ["Al Pacino"],
            "coverImage": "https://img.example/heat.jpg",
            "price": 9.99
        });
        let movie: NewMovie = serde_json::from_value(body).unwrap();
        let errors = movie.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));

        let patch: MoviePatch = serde_json::from_str(r#"{"title": " \t "}"#).unwrap();
        assert!(patch.validate().unwrap_err().field_errors().contains_key("title"));

        let patch: MoviePatch = serde_json::from_str(r#"{"title": " Heat "}"#).unwrap();
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn new_movie_bounds_are_validated() {
        let body = serde_json::json!({
            "title": "Heat",
            "duration": 0,
            "releaseYear": 1995,
            "ratings": 11.0,
            "releaseDate": "1995-12-15T00:00:00Z",
            "genres": ["Crime"],
            "director": ["Michael Mann"],
            "casts": ["Al Pacino"],
            "coverImage": "https://img.example/heat.jpg",
            "price": 9.99
        });
        let movie: NewMovie = serde_json::from_value(body).unwrap();
        let errors = movie.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("duration"));
        assert!(fields.contains_key("ratings"));
    }
}
