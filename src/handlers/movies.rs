//! Movie catalog endpoints.
//!
//! Listings are driven by the query translator: the raw query string is
//! validated and translated before the database is touched, then counted,
//! bounds-checked and fetched. Single-resource routes look movies up by id or
//! slug. All handlers use structured tracing for observability.

use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::errors::ApiError;
use crate::models::{Movie, MoviePatch, NewMovie};
use crate::query::{Preset, Projection, QueryError, QuerySpec, RawQuery};
use crate::repository::{self, ReleaseWindow};

/// Collects the request's query string into a [`RawQuery`].
fn raw_query(req: &HttpRequest) -> Result<RawQuery, ApiError> {
    let pairs = web::Query::<Vec<(String, String)>>::from_query(req.query_string())
        .map_err(|e| QueryError::invalid_parameter(req.query_string(), e.to_string()))?;
    Ok(pairs.into_inner().into_iter().collect())
}

fn project(movies: &[Movie], projection: &Projection) -> Result<Vec<Value>, ApiError> {
    movies
        .iter()
        .map(|movie| -> Result<Value, ApiError> {
            Ok(projection.apply(serde_json::to_value(movie.document())?))
        })
        .collect()
}

fn movie_body(movie: &Movie) -> Value {
    json!({
        "status": "success",
        "data": { "movie": movie.document() },
    })
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidId(raw.to_string()))
}

async fn list(
    app_state: &AppState,
    spec: QuerySpec,
    window: ReleaseWindow,
) -> Result<HttpResponse, ApiError> {
    let page = repository::list_movies(&app_state.db, &spec, window).await?;
    let movies = project(&page.movies, &spec.projection)?;

    tracing::info!(
        total = page.total,
        returned = movies.len(),
        page = spec.pagination.page,
        "Listed movies"
    );

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "results": movies.len(),
        "total": page.total,
        "page": spec.pagination.page,
        "limit": spec.pagination.page_size,
        "data": { "movies": movies },
    })))
}

/// Lists released movies with filtering, sorting, field selection and pagination.
///
/// # HTTP Method
/// `GET /api/v1/movies`
///
/// # Query Parameters
/// - Filters: `genres` (alias `genre`), `director`, `casts`, `language` take a
///   comma-separated list matched case-insensitively against whole values;
///   `ratings`, `price`, `releaseYear`, `duration` take a number and accept the
///   `[gte]`, `[gt]`, `[lte]`, `[lt]` suffixes.
/// - `sort`: comma-separated fields, `-` prefix for descending (default `-createdAt`)
/// - `fields`: comma-separated fields to return
/// - `page`, `limit`: positive integers (defaults 1 and 10)
///
/// # Request Examples
/// ```text
/// GET /api/v1/movies?genres=action,thriller&price[lte]=15&sort=-ratings,title
/// GET /api/v1/movies?fields=title,ratings&page=2&limit=5
/// ```
///
/// # Success Response (200 OK)
/// ```json
/// {
///   "status": "success",
///   "results": 1,
///   "total": 11,
///   "page": 2,
///   "limit": 10,
///   "data": { "movies": [ { "id": "…", "title": "Heat", "ratings": 8.3 } ] }
/// }
/// ```
/// An empty result set is a 200 with an empty `movies` array.
///
/// # Error Responses
/// - `400 Bad Request`: unknown parameter, non-positive page/limit, page past
///   the end of the results, or a value the field cannot take
/// - `500 Internal Server Error`: database failures
#[tracing::instrument(skip(req, app_state), fields(query = %req.query_string()))]
pub async fn get_all_movies(
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let raw = raw_query(&req)?;
    let spec = app_state.translator.translate(&raw)?;
    list(&app_state, spec, ReleaseWindow::Released).await
}

/// Top five released movies by rating. Filters and `fields` still apply.
///
/// `GET /api/v1/movies/highest-rated`
#[tracing::instrument(skip(req, app_state), fields(query = %req.query_string()))]
pub async fn get_highest_rated(
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let raw = raw_query(&req)?;
    let spec = app_state
        .translator
        .translate_preset(&raw, Preset::HighestRated)?;
    list(&app_state, spec, ReleaseWindow::Released).await
}

/// Movies whose release date is still ahead, with the same query parameters
/// as the main listing.
///
/// `GET /api/v1/movies/upcoming-movies`
#[tracing::instrument(skip(req, app_state), fields(query = %req.query_string()))]
pub async fn get_upcoming_movies(
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let raw = raw_query(&req)?;
    let spec = app_state.translator.translate(&raw)?;
    list(&app_state, spec, ReleaseWindow::Upcoming).await
}

/// Per-release-year statistics over released movies rated 4.5 or better.
///
/// `GET /api/v1/movies/movies-stats`
///
/// ```json
/// {
///   "status": "success",
///   "count": 1,
///   "data": { "stats": [ { "releaseYear": 1995, "movieCount": 3, "avgRating": 8.1,
///     "avgPrice": 9.5, "minPrice": 7.99, "maxPrice": 11.99, "totalPrice": 28.5 } ] }
/// }
/// ```
#[tracing::instrument(skip(app_state))]
pub async fn get_movies_stats(app_state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let stats = repository::movie_stats(&app_state.db).await?;
    tracing::info!(years = stats.len(), "Computed movie statistics");
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "count": stats.len(),
        "data": { "stats": stats },
    })))
}

/// Released movies in one genre, matched without regard to case.
///
/// `GET /api/v1/movies/movies-by-genre/{genre}`
#[tracing::instrument(skip(app_state))]
pub async fn get_movies_by_genre(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let genre = path.into_inner();
    let groups = repository::movies_by_genre(&app_state.db, &genre).await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "count": groups.len(),
        "data": { "movies": groups },
    })))
}

/// `GET /api/v1/movies/{id}`
#[tracing::instrument(skip(app_state))]
pub async fn get_movie_by_id(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let movie = repository::find_movie_by_id(&app_state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Movie"))?;
    Ok(HttpResponse::Ok().json(movie_body(&movie)))
}

/// `GET /api/v1/movies/slug/{slug}`
#[tracing::instrument(skip(app_state))]
pub async fn get_movie_by_slug(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let movie = repository::find_movie_by_slug(&app_state.db, &path)
        .await?
        .ok_or(ApiError::NotFound("Movie"))?;
    Ok(HttpResponse::Ok().json(movie_body(&movie)))
}

/// Creates a movie. The slug is derived from the title.
///
/// # HTTP Method
/// `POST /api/v1/movies`
///
/// # Request Body (JSON)
/// ```json
/// {
///   "title": "Heat",
///   "duration": 170,
///   "releaseYear": 1995,
///   "releaseDate": "1995-12-15T00:00:00Z",
///   "genres": ["Crime", "Thriller"],
///   "director": ["Michael Mann"],
///   "casts": ["Al Pacino", "Robert De Niro"],
///   "coverImage": "https://img.example/heat.jpg",
///   "price": 9.99
/// }
/// ```
///
/// # Responses
/// - `201 Created` with the stored movie
/// - `400 Bad Request`: validation failure, or a title/slug that already exists
#[tracing::instrument(skip(app_state, body), fields(title = %body.title))]
pub async fn add_movie(
    app_state: web::Data<AppState>,
    body: web::Json<NewMovie>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;
    let movie = repository::insert_movie(&app_state.db, &body).await?;
    tracing::info!(movie_id = %movie.id, slug = %movie.slug, "Movie created");
    Ok(HttpResponse::Created().json(movie_body(&movie)))
}

/// Partially updates a movie. Unknown body fields are rejected.
///
/// `PATCH /api/v1/movies/{id}`
#[tracing::instrument(skip(app_state, body))]
pub async fn update_movie(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<MoviePatch>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    body.validate()?;
    let movie = repository::update_movie(&app_state.db, id, &body)
        .await?
        .ok_or(ApiError::NotFound("Movie"))?;
    tracing::info!(movie_id = %movie.id, "Movie updated");
    Ok(HttpResponse::Ok().json(movie_body(&movie)))
}

/// `DELETE /api/v1/movies/{id}`, answering 204 on success.
#[tracing::instrument(skip(app_state))]
pub async fn delete_movie(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    if !repository::delete_movie(&app_state.db, id).await? {
        return Err(ApiError::NotFound("Movie"));
    }
    tracing::info!(movie_id = %id, "Movie deleted");
    Ok(HttpResponse::NoContent().finish())
}
