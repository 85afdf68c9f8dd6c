//! The raw query-string mapping handed over by the HTTP layer.

/// Query-string keys mapped to one or more values.
///
/// Repeated keys (`?genres=Action&genres=Drama`) collapse into a single entry
/// holding every value in arrival order. Key order is preserved as well so that
/// validation reports the first offending key the client sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQuery {
    entries: Vec<(String, Vec<String>)>,
}

impl RawQuery {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` under `key`, merging with earlier values of the same key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// All values supplied for `key`.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    /// The first value supplied for `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Iterates over `(key, values)` in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawQuery
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut raw = RawQuery::new();
        for (key, value) in iter {
            raw.push(key, value);
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_are_merged_in_order() {
        let raw: RawQuery = [("genres", "Action"), ("price[gte]", "5"), ("genres", "Drama")]
            .into_iter()
            .collect();

        assert_eq!(
            raw.get("genres"),
            Some(&["Action".to_string(), "Drama".to_string()][..])
        );
        assert_eq!(raw.first("price[gte]"), Some("5"));
        let keys: Vec<&str> = raw.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["genres", "price[gte]"]);
    }
}
