//! HTTP handlers and route registration for the catalog API.

pub mod health;
pub mod movies;

use actix_web::{HttpRequest, HttpResponse, web};

use crate::errors::ApiError;

/// Registers every `/api/v1` route plus the JSON body configuration.
///
/// Fixed `/movies/...` paths are registered before `/movies/{id}` so they are
/// never captured as ids.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config()).service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/movies")
                    // Listings
                    .route("", web::get().to(movies::get_all_movies))
                    .route("", web::post().to(movies::add_movie))
                    .route("/highest-rated", web::get().to(movies::get_highest_rated))
                    .route("/upcoming-movies", web::get().to(movies::get_upcoming_movies))
                    // Aggregates
                    .route("/movies-stats", web::get().to(movies::get_movies_stats))
                    .route(
                        "/movies-by-genre/{genre}",
                        web::get().to(movies::get_movies_by_genre),
                    )
                    // Single movie
                    .route("/slug/{slug}", web::get().to(movies::get_movie_by_slug))
                    .route("/{id}", web::get().to(movies::get_movie_by_id))
                    .route("/{id}", web::patch().to(movies::update_movie))
                    .route("/{id}", web::delete().to(movies::delete_movie)),
            ),
    );
}

/// Renders malformed JSON bodies as [`ApiError::InvalidBody`].
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::InvalidBody(err.to_string()).into())
}

/// Fallback for unmatched routes.
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    Err(ApiError::RouteNotFound(req.path().to_string()))
}
