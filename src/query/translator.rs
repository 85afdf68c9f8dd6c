//! Translation of a raw query-string mapping into a [`QuerySpec`].

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use super::filter::{FilterPredicate, FilterValue, parse_key};
use super::{QueryError, RawQuery};

/// Field every listing sorts by when the client does not ask for an order.
pub const DEFAULT_SORT_FIELD: &str = "createdAt";
pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Keys that steer the listing rather than filter it.
pub const CONTROL_KEYS: &[&str] = &["sort", "fields", "page", "limit"];

/// Fields hidden from documents unless explicitly projected.
pub const INTERNAL_FIELDS: &[&str] = &["createdAt"];

/// Direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Which document fields are returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Every field except [`INTERNAL_FIELDS`].
    AllExceptInternal,
    /// Only the named fields (plus `id`).
    Include(BTreeSet<String>),
}

impl Projection {
    /// Trims a serialized document down to the projected fields.
    ///
    /// `id` always survives; names that are not present in the document are
    /// ignored.
    pub fn apply(&self, doc: Value) -> Value {
        let Value::Object(mut map) = doc else {
            return doc;
        };
        match self {
            Self::AllExceptInternal => {
                for field in INTERNAL_FIELDS {
                    map.remove(*field);
                }
            }
            Self::Include(fields) => {
                map.retain(|key, _| key == "id" || fields.contains(key));
            }
        }
        Value::Object(map)
    }
}

/// Offset-based pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub skip: i64,
}

impl Pagination {
    /// Builds a window, rejecting non-positive values and offset overflow.
    pub fn new(page: i64, page_size: i64) -> Result<Self, QueryError> {
        if page <= 0 || page_size <= 0 {
            return Err(QueryError::invalid_pagination(
                "page and limit must be positive numbers",
            ));
        }
        let skip = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| QueryError::invalid_pagination("page is too large"))?;
        Ok(Self {
            page,
            page_size,
            skip,
        })
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            skip: 0,
        }
    }
}

/// A validated, store-agnostic description of one listing request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    pub filter: FilterPredicate,
    pub sort_keys: Vec<SortKey>,
    pub projection: Projection,
    pub pagination: Pagination,
}

/// Named listings that own their sort order and page window.
///
/// The caller's `sort`, `page` and `limit` are accepted by the allow-list but
/// never parsed; filters and `fields` still apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Top five movies by rating.
    HighestRated,
}

impl Preset {
    pub fn sort_keys(self) -> Vec<SortKey> {
        match self {
            Self::HighestRated => vec![SortKey::descending("ratings")],
        }
    }

    pub fn pagination(self) -> Pagination {
        match self {
            Self::HighestRated => Pagination {
                page: 1,
                page_size: 5,
                skip: 0,
            },
        }
    }
}

/// Rejects a page that starts past the end of a non-empty result set.
///
/// An empty result set is a valid (empty) page, never an error.
pub fn check_page_bounds(skip: i64, total_matching: i64) -> Result<(), QueryError> {
    if total_matching != 0 && skip >= total_matching {
        return Err(QueryError::PageOutOfRange {
            skip,
            total: total_matching,
        });
    }
    Ok(())
}

/// Turns query strings into [`QuerySpec`]s for one collection.
///
/// The translator is plain configuration (allow-lists) and holds no state, so
/// a single value can be shared freely across request handlers.
#[derive(Debug, Clone, Copy)]
pub struct QueryTranslator {
    filterable: &'static [&'static str],
    array_fields: &'static [&'static str],
    /// `(alias, canonical)`; the alias is dropped when the canonical name is also present.
    aliases: &'static [(&'static str, &'static str)],
}

impl QueryTranslator {
    /// Translator for the movie catalog.
    pub const fn movies() -> Self {
        Self {
            filterable: &[
                "genres",
                "genre",
                "director",
                "casts",
                "language",
                "ratings",
                "price",
                "releaseYear",
                "duration",
            ],
            array_fields: &["genres", "director", "casts", "language"],
            aliases: &[("genre", "genres")],
        }
    }

    fn is_allowed(&self, field: &str) -> bool {
        self.filterable.contains(&field) || CONTROL_KEYS.contains(&field)
    }

    /// Validates then builds every part of the spec.
    #[tracing::instrument(level = "debug", skip_all, fields(keys = raw.iter().count()))]
    pub fn translate(&self, raw: &RawQuery) -> Result<QuerySpec, QueryError> {
        self.validate(raw)?;
        let spec = QuerySpec {
            filter: self.build_filter(raw)?,
            sort_keys: self.build_sort(raw),
            projection: self.build_projection(raw),
            pagination: self.build_pagination(raw)?,
        };
        tracing::debug!(
            conditions = spec.filter.len(),
            sort_keys = spec.sort_keys.len(),
            page = spec.pagination.page,
            page_size = spec.pagination.page_size,
            "Translated listing query"
        );
        Ok(spec)
    }

    /// Like [`translate`](Self::translate), with the sort and window taken
    /// from `preset` instead of the query string.
    pub fn translate_preset(&self, raw: &RawQuery, preset: Preset) -> Result<QuerySpec, QueryError> {
        self.validate(raw)?;
        Ok(QuerySpec {
            filter: self.build_filter(raw)?,
            sort_keys: preset.sort_keys(),
            projection: self.build_projection(raw),
            pagination: preset.pagination(),
        })
    }

    /// Checks every original key against the allow-list.
    pub fn validate(&self, raw: &RawQuery) -> Result<(), QueryError> {
        for (key, _) in raw.iter() {
            let parsed = parse_key(key);
            if !self.is_allowed(parsed.field) {
                tracing::debug!(key, "Rejected unknown query parameter");
                return Err(QueryError::invalid_parameter(key, "not a recognized query parameter"));
            }
        }
        Ok(())
    }

    fn canonical<'a>(&self, field: &'a str, raw: &RawQuery) -> Option<&'a str> {
        match self.aliases.iter().find(|(alias, _)| *alias == field) {
            Some((_, canonical)) => {
                let canonical_given = raw.iter().any(|(key, _)| parse_key(key).field == *canonical);
                (!canonical_given).then_some(*canonical)
            }
            None => Some(field),
        }
    }

    /// Builds the filter from every non-control key.
    pub fn build_filter(&self, raw: &RawQuery) -> Result<FilterPredicate, QueryError> {
        let mut filter = FilterPredicate::default();

        for (key, values) in raw.iter() {
            let parsed = parse_key(key);
            if CONTROL_KEYS.contains(&parsed.field) {
                continue;
            }
            let Some(field) = self.canonical(parsed.field, raw) else {
                continue;
            };

            match parsed.op {
                Some(op) => {
                    let value = single_value(key, values)?;
                    filter.add_bound(key, field, op, FilterValue::coerce(value))?;
                }
                None if self.array_fields.contains(&field) => {
                    filter.add_any_of(key, field, split_list(values))?;
                }
                None => {
                    let value = single_value(key, values)?;
                    filter.add_equals(key, field, FilterValue::coerce(value))?;
                }
            }
        }

        Ok(filter)
    }

    /// `sort=-ratings,title` becomes `[ratings desc, title asc]`.
    pub fn build_sort(&self, raw: &RawQuery) -> Vec<SortKey> {
        let keys: Vec<SortKey> = raw
            .get("sort")
            .map(split_list)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|segment| match segment.strip_prefix('-') {
                Some("") => None,
                Some(field) => Some(SortKey::descending(field)),
                None => Some(SortKey::ascending(segment)),
            })
            .collect();

        if keys.is_empty() {
            vec![SortKey::descending(DEFAULT_SORT_FIELD)]
        } else {
            keys
        }
    }

    pub fn build_projection(&self, raw: &RawQuery) -> Projection {
        let fields: BTreeSet<String> = raw
            .get("fields")
            .map(split_list)
            .unwrap_or_default()
            .into_iter()
            .collect();

        if fields.is_empty() {
            Projection::AllExceptInternal
        } else {
            Projection::Include(fields)
        }
    }

    /// Absent or non-numeric `page`/`limit` fall back to the defaults;
    /// numeric values must be positive.
    pub fn build_pagination(&self, raw: &RawQuery) -> Result<Pagination, QueryError> {
        let page = parse_int(raw.first("page")).unwrap_or(DEFAULT_PAGE);
        let page_size = parse_int(raw.first("limit")).unwrap_or(DEFAULT_PAGE_SIZE);
        Pagination::new(page, page_size)
    }
}

impl Default for QueryTranslator {
    fn default() -> Self {
        Self::movies()
    }
}

fn single_value<'a>(key: &str, values: &'a [String]) -> Result<&'a str, QueryError> {
    match values {
        [value] => Ok(value),
        _ => Err(QueryError::invalid_parameter(key, "expects a single value")),
    }
}

/// Flattens repeated values and comma-joined lists into trimmed, non-empty items.
fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_int(value: Option<&str>) -> Option<i64> {
    value?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::{ComparisonOp, FieldPredicate, RangeBounds};
    use serde_json::json;

    fn raw(pairs: &[(&str, &str)]) -> RawQuery {
        pairs.iter().copied().collect()
    }

    #[test]
    fn allow_listed_keys_validate() {
        let translator = QueryTranslator::movies();
        let query = raw(&[
            ("genres", "Action"),
            ("genre", "Drama"),
            ("director", "Nolan"),
            ("casts", "Pacino"),
            ("language", "English"),
            ("ratings[gte]", "7"),
            ("price[lt]", "20"),
            ("releaseYear[gt]", "1999"),
            ("duration[lte]", "180"),
            ("sort", "-ratings"),
            ("fields", "title"),
            ("page", "2"),
            ("limit", "5"),
        ]);
        assert_eq!(translator.validate(&query), Ok(()));
    }

    #[test]
    fn unknown_keys_fail_naming_the_key() {
        let translator = QueryTranslator::movies();
        for key in ["title", "password[gte]", "price[ne]", "$where", "releaseDate[gt]"] {
            let err = translator.validate(&raw(&[("genres", "x"), (key, "1")])).unwrap_err();
            assert_eq!(err.kind(), "invalid_parameter");
            assert_eq!(err.parameter(), Some(key));
        }
    }

    #[test]
    fn operator_keys_merge_into_one_range() {
        let filter = QueryTranslator::movies()
            .build_filter(&raw(&[("price[gte]", "10"), ("price[lte]", "50")]))
            .unwrap();

        assert_eq!(filter.len(), 1);
        assert_eq!(
            filter.get("price"),
            Some(&FieldPredicate::Range(RangeBounds {
                gte: Some(FilterValue::Number(10.0)),
                lte: Some(FilterValue::Number(50.0)),
                ..RangeBounds::default()
            }))
        );
    }

    #[test]
    fn non_numeric_bounds_stay_text() {
        let filter = QueryTranslator::movies()
            .build_filter(&raw(&[("releaseYear[gte]", "2020-01-01")]))
            .unwrap();
        let Some(FieldPredicate::Range(bounds)) = filter.get("releaseYear") else {
            panic!("expected a range on releaseYear");
        };
        assert_eq!(bounds.gte, Some(FilterValue::Text("2020-01-01".into())));
    }

    #[test]
    fn array_fields_match_any_value_ignoring_case() {
        let filter = QueryTranslator::movies()
            .build_filter(&raw(&[("genres", "Action,Comedy")]))
            .unwrap();

        assert_eq!(
            filter.get("genres"),
            Some(&FieldPredicate::AnyOf(vec!["Action".into(), "Comedy".into()]))
        );
    }

    #[test]
    fn repeated_and_comma_joined_values_combine() {
        let filter = QueryTranslator::movies()
            .build_filter(&raw(&[("casts", "Al Pacino, Robert De Niro"), ("casts", "Val Kilmer")]))
            .unwrap();
        assert_eq!(
            filter.get("casts"),
            Some(&FieldPredicate::AnyOf(vec![
                "Al Pacino".into(),
                "Robert De Niro".into(),
                "Val Kilmer".into()
            ]))
        );
    }

    #[test]
    fn genre_alias_yields_to_genres() {
        let translator = QueryTranslator::movies();

        let filter = translator
            .build_filter(&raw(&[("genre", "Drama"), ("genres", "Horror")]))
            .unwrap();
        assert_eq!(filter.len(), 1);
        assert_eq!(
            filter.get("genres"),
            Some(&FieldPredicate::AnyOf(vec!["Horror".into()]))
        );

        let alias_only = translator.build_filter(&raw(&[("genre", "drama")])).unwrap();
        assert_eq!(
            alias_only.get("genres"),
            Some(&FieldPredicate::AnyOf(vec!["drama".into()]))
        );
        assert!(alias_only.get("genre").is_none());
    }

    #[test]
    fn control_keys_never_reach_the_filter() {
        let filter = QueryTranslator::movies()
            .build_filter(&raw(&[
                ("sort", "title"),
                ("fields", "title"),
                ("page", "2"),
                ("limit", "3"),
                ("page[gte]", "1"),
                ("limit[lt]", "9"),
            ]))
            .unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn scalar_filter_with_repeated_values_is_rejected() {
        let err = QueryTranslator::movies()
            .build_filter(&raw(&[("ratings", "7"), ("ratings", "8")]))
            .unwrap_err();
        assert_eq!(err.parameter(), Some("ratings"));
    }

    #[test]
    fn empty_query_builds_match_everything_filter() {
        let filter = QueryTranslator::movies().build_filter(&RawQuery::new()).unwrap();
        assert!(filter.is_empty());
        assert_eq!(filter.len(), 0);
    }

    #[test]
    fn sort_keys_keep_order_and_direction() {
        let sort = QueryTranslator::movies().build_sort(&raw(&[("sort", "-ratings,title")]));
        assert_eq!(
            sort,
            vec![SortKey::descending("ratings"), SortKey::ascending("title")]
        );
    }

    #[test]
    fn sort_defaults_to_newest_first() {
        let translator = QueryTranslator::movies();
        let expected = vec![SortKey::descending("createdAt")];
        assert_eq!(translator.build_sort(&RawQuery::new()), expected);
        assert_eq!(translator.build_sort(&raw(&[("sort", "")])), expected);
    }

    #[test]
    fn projection_from_fields() {
        let translator = QueryTranslator::movies();
        assert_eq!(
            translator.build_projection(&RawQuery::new()),
            Projection::AllExceptInternal
        );

        let projection = translator.build_projection(&raw(&[("fields", "title,ratings")]));
        let doc = projection.apply(json!({
            "id": "1",
            "title": "Heat",
            "ratings": 8.3,
            "price": 9.99
        }));
        assert_eq!(doc, json!({ "id": "1", "title": "Heat", "ratings": 8.3 }));
    }

    #[test]
    fn default_projection_hides_internal_fields() {
        let doc = Projection::AllExceptInternal.apply(json!({
            "id": "1",
            "title": "Heat",
            "createdAt": "2024-01-01T00:00:00Z"
        }));
        assert_eq!(doc, json!({ "id": "1", "title": "Heat" }));
    }

    #[test]
    fn pagination_defaults_and_skip() {
        let translator = QueryTranslator::movies();
        assert_eq!(
            translator.build_pagination(&RawQuery::new()),
            Ok(Pagination {
                page: 1,
                page_size: 10,
                skip: 0
            })
        );
        assert_eq!(
            translator.build_pagination(&raw(&[("page", "3"), ("limit", "20")])),
            Ok(Pagination {
                page: 3,
                page_size: 20,
                skip: 40
            })
        );
        assert_eq!(
            translator.build_pagination(&raw(&[("page", "abc")])),
            Ok(Pagination::default())
        );
    }

    #[test]
    fn non_positive_pagination_is_rejected() {
        let translator = QueryTranslator::movies();
        for query in [raw(&[("page", "0")]), raw(&[("limit", "-5")])] {
            let err = translator.build_pagination(&query).unwrap_err();
            assert_eq!(err.kind(), "invalid_pagination");
        }
        assert!(
            translator
                .build_pagination(&raw(&[("page", &i64::MAX.to_string()), ("limit", "100")]))
                .is_err()
        );
    }

    #[test]
    fn page_bounds() {
        assert_eq!(
            check_page_bounds(20, 5),
            Err(QueryError::PageOutOfRange { skip: 20, total: 5 })
        );
        assert_eq!(check_page_bounds(20, 0), Ok(()));
        assert_eq!(check_page_bounds(0, 0), Ok(()));
        assert_eq!(check_page_bounds(10, 11), Ok(()));
        assert!(check_page_bounds(10, 10).is_err());
    }

    #[test]
    fn translate_short_circuits_on_invalid_keys() {
        let err = QueryTranslator::movies()
            .translate(&raw(&[("page", "0"), ("bogus", "1")]))
            .unwrap_err();
        assert_eq!(err.parameter(), Some("bogus"));
    }

    #[test]
    fn highest_rated_preset_pins_sort_and_limit() {
        let spec = QueryTranslator::movies()
            .translate_preset(
                &raw(&[("sort", "title"), ("limit", "50"), ("genres", "Drama")]),
                Preset::HighestRated,
            )
            .unwrap();

        assert_eq!(spec.sort_keys, vec![SortKey::descending("ratings")]);
        assert_eq!(spec.pagination.page_size, 5);
        assert_eq!(spec.pagination.skip, 0);
        assert!(spec.filter.get("genres").is_some());
    }

    #[test]
    fn preset_ignores_the_window_and_sort_it_replaces() {
        let translator = QueryTranslator::movies();
        let spec = translator
            .translate_preset(
                &raw(&[("page", "0"), ("limit", "-1"), ("sort", "bogus")]),
                Preset::HighestRated,
            )
            .unwrap();
        assert_eq!(spec.pagination, Preset::HighestRated.pagination());
        assert_eq!(spec.sort_keys, vec![SortKey::descending("ratings")]);

        let err = translator
            .translate_preset(&raw(&[("page", "0"), ("bogus", "1")]), Preset::HighestRated)
            .unwrap_err();
        assert_eq!(err.parameter(), Some("bogus"));
    }

    #[test]
    fn bound_operator_enum_round_trips_through_key_parsing() {
        for op in [ComparisonOp::Gte, ComparisonOp::Gt, ComparisonOp::Lte, ComparisonOp::Lt] {
            let key = format!("price[{}]", op.as_str());
            assert_eq!(crate::query::filter::parse_key(&key).op, Some(op));
        }
    }
}
