//! Movie persistence on PostgreSQL.
//!
//! Listing goes through [`list_movies`], which compiles a [`QuerySpec`] into a
//! count query and a page query up front, so a spec the store cannot express
//! is rejected before any round-trip. The count and the page are two
//! independent reads; rows may change between them.

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::{GenreSummary, MOVIE_SELECT, Movie, MoviePatch, NewMovie, YearStats, slugify};
use crate::query::{QueryError, QuerySpec, check_page_bounds, sql};

/// Which side of the release date a listing looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseWindow {
    /// `releaseDate <= now`
    Released,
    /// `releaseDate > now`
    Upcoming,
}

impl ReleaseWindow {
    fn condition(self) -> &'static str {
        match self {
            Self::Released => "m.release_date <= NOW()",
            Self::Upcoming => "m.release_date > NOW()",
        }
    }
}

/// One page of a listing plus the number of rows matching the filter.
#[derive(Debug)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub total: i64,
}

fn count_query(
    spec: &QuerySpec,
    window: ReleaseWindow,
) -> Result<QueryBuilder<'static, Postgres>, QueryError> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM movies m WHERE ");
    builder.push(window.condition());
    sql::push_filter(&mut builder, &spec.filter)?;
    Ok(builder)
}

fn page_query(
    spec: &QuerySpec,
    window: ReleaseWindow,
) -> Result<QueryBuilder<'static, Postgres>, QueryError> {
    let mut builder = QueryBuilder::new(format!("SELECT {MOVIE_SELECT} FROM movies m WHERE "));
    builder.push(window.condition());
    sql::push_filter(&mut builder, &spec.filter)?;
    sql::push_order_by(&mut builder, &spec.sort_keys)?;
    sql::push_window(&mut builder, &spec.pagination);
    Ok(builder)
}

/// Counts the matches, checks the page bounds, then fetches the page.
///
/// An empty result set is an empty page, not an error.
#[tracing::instrument(skip(db, spec), fields(page = spec.pagination.page, limit = spec.pagination.page_size))]
pub async fn list_movies(
    db: &PgPool,
    spec: &QuerySpec,
    window: ReleaseWindow,
) -> Result<MoviePage, ApiError> {
    let mut count = count_query(spec, window)?;
    let mut page = page_query(spec, window)?;

    let total = count.build_query_scalar::<i64>().fetch_one(db).await?;
    check_page_bounds(spec.pagination.skip, total)?;

    let movies: Vec<Movie> = if total == 0 {
        Vec::new()
    } else {
        page.build_query_as::<Movie>().fetch_all(db).await?
    };

    tracing::debug!(total, returned = movies.len(), "Fetched movie page");
    Ok(MoviePage { movies, total })
}

pub async fn find_movie_by_id(db: &PgPool, id: Uuid) -> Result<Option<Movie>, sqlx::Error> {
    sqlx::query_as::<_, Movie>(&format!("SELECT {MOVIE_SELECT} FROM movies m WHERE m.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_movie_by_slug(db: &PgPool, slug: &str) -> Result<Option<Movie>, sqlx::Error> {
    sqlx::query_as::<_, Movie>(&format!("SELECT {MOVIE_SELECT} FROM movies m WHERE m.slug = $1"))
        .bind(slug)
        .fetch_optional(db)
        .await
}

/// Inserts a movie, deriving its slug from the trimmed title.
#[tracing::instrument(skip(db, movie), fields(title = %movie.title))]
pub async fn insert_movie(db: &PgPool, movie: &NewMovie) -> Result<Movie, ApiError> {
    let title = movie.title.trim();
    let slug = slugify(title);

    sqlx::query_as::<_, Movie>(&format!(
        "INSERT INTO movies AS m (title, slug, description, duration, release_year, ratings, \
         total_ratings, release_date, genres, director, casts, language, cover_image, price) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         RETURNING {MOVIE_SELECT}"
    ))
    .bind(title)
    .bind(&slug)
    .bind(&movie.description)
    .bind(movie.duration)
    .bind(movie.release_year)
    .bind(movie.ratings)
    .bind(movie.total_ratings)
    .bind(movie.release_date)
    .bind(&movie.genres)
    .bind(&movie.director)
    .bind(&movie.casts)
    .bind(&movie.language)
    .bind(&movie.cover_image)
    .bind(movie.price)
    .fetch_one(db)
    .await
    .map_err(|e| duplicate_or(e, title, &slug))
}

/// Applies the fields present in `patch`; a new title also renews the slug.
#[tracing::instrument(skip(db, patch))]
pub async fn update_movie(
    db: &PgPool,
    id: Uuid,
    patch: &MoviePatch,
) -> Result<Option<Movie>, ApiError> {
    let title = patch.title.as_deref().map(str::trim);
    let slug = title.map(slugify);

    sqlx::query_as::<_, Movie>(&format!(
        "UPDATE movies AS m SET \
         title = COALESCE($2, m.title), \
         slug = COALESCE($3, m.slug), \
         description = COALESCE($4, m.description), \
         duration = COALESCE($5, m.duration), \
         release_year = COALESCE($6, m.release_year), \
         ratings = COALESCE($7, m.ratings), \
         total_ratings = COALESCE($8, m.total_ratings), \
         release_date = COALESCE($9, m.release_date), \
         genres = COALESCE($10, m.genres), \
         director = COALESCE($11, m.director), \
         casts = COALESCE($12, m.casts), \
         language = COALESCE($13, m.language), \
         cover_image = COALESCE($14, m.cover_image), \
         price = COALESCE($15, m.price), \
         updated_at = NOW() \
         WHERE m.id = $1 \
         RETURNING {MOVIE_SELECT}"
    ))
    .bind(id)
    .bind(title)
    .bind(&slug)
    .bind(&patch.description)
    .bind(patch.duration)
    .bind(patch.release_year)
    .bind(patch.ratings)
    .bind(patch.total_ratings)
    .bind(patch.release_date)
    .bind(&patch.genres)
    .bind(&patch.director)
    .bind(&patch.casts)
    .bind(&patch.language)
    .bind(&patch.cover_image)
    .bind(patch.price)
    .fetch_optional(db)
    .await
    .map_err(|e| duplicate_or(e, title.unwrap_or_default(), slug.as_deref().unwrap_or_default()))
}

/// Returns whether a row was deleted.
pub async fn delete_movie(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM movies WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Per-year figures over released movies rated 4.5 or better, cheapest year first.
pub async fn movie_stats(db: &PgPool) -> Result<Vec<YearStats>, sqlx::Error> {
    sqlx::query_as::<_, YearStats>(
        r#"
        SELECT m.release_year,
               COUNT(*) AS movie_count,
               AVG(m.ratings) AS avg_rating,
               AVG(m.price) AS avg_price,
               MIN(m.price) AS min_price,
               MAX(m.price) AS max_price,
               SUM(m.price) AS total_price
        FROM movies m
        WHERE m.release_date <= NOW() AND m.ratings >= 4.5
        GROUP BY m.release_year
        ORDER BY min_price ASC
        "#,
    )
    .fetch_all(db)
    .await
}

/// Released movies carrying `genre`, compared without regard to case.
pub async fn movies_by_genre(db: &PgPool, genre: &str) -> Result<Vec<GenreSummary>, sqlx::Error> {
    sqlx::query_as::<_, GenreSummary>(
        r#"
        SELECT g AS genre,
               COUNT(*) AS movie_count,
               ARRAY_AGG(m.title ORDER BY m.title) AS movies
        FROM movies m
        CROSS JOIN LATERAL unnest(m.genres) AS g
        WHERE m.release_date <= NOW() AND lower(g) = lower($1)
        GROUP BY g
        ORDER BY movie_count DESC, genre ASC
        "#,
    )
    .bind(genre)
    .fetch_all(db)
    .await
}

/// Maps unique violations on title or slug to [`ApiError::Duplicate`].
fn duplicate_or(error: sqlx::Error, title: &str, slug: &str) -> ApiError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            let on_slug = db_error.constraint().is_some_and(|c| c.contains("slug"));
            let (field, value) = if on_slug { ("slug", slug) } else { ("title", title) };
            tracing::warn!(field, value, "Rejected duplicate movie");
            return ApiError::Duplicate {
                field: field.to_string(),
                value: value.to_string(),
            };
        }
    }
    ApiError::Database(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryTranslator, RawQuery};

    fn spec(pairs: &[(&str, &str)]) -> QuerySpec {
        let raw: RawQuery = pairs.iter().copied().collect();
        QueryTranslator::movies().translate(&raw).unwrap()
    }

    #[test]
    fn count_query_ignores_sort_and_window() {
        let spec = spec(&[("ratings[gte]", "7"), ("sort", "title"), ("page", "2")]);
        let builder = count_query(&spec, ReleaseWindow::Released).unwrap();
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM movies m WHERE m.release_date <= NOW() AND (m.ratings >= $1)"
        );
    }

    #[test]
    fn page_query_orders_and_limits() {
        let spec = spec(&[("sort", "-ratings")]);
        let builder = page_query(&spec, ReleaseWindow::Upcoming).unwrap();
        let sql = builder.sql();
        assert!(sql.contains("WHERE m.release_date > NOW()"));
        assert!(sql.ends_with("ORDER BY m.ratings DESC, m.id ASC LIMIT $1 OFFSET $2"));
    }

    #[test]
    fn unsupported_sort_fails_before_any_query_runs() {
        let spec = spec(&[("sort", "secret")]);
        assert!(count_query(&spec, ReleaseWindow::Released).is_ok());
        let err = page_query(&spec, ReleaseWindow::Released)
            .err()
            .expect("sort on an unknown column must fail");
        assert_eq!(err.parameter(), Some("sort"));
    }
}
