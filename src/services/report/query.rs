use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Text(String),
    List(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::List(values)
    }
}

/// The flat query string of a report request.
///
/// Repeated keys, and keys written as `key[]`, collect into a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportQuery(BTreeMap<String, QueryValue>);

impl ReportQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut query = Self::new();
        for (key, value) in pairs {
            query.append(key.into(), value.into());
        }
        query
    }

    fn append(&mut self, key: String, value: String) {
        let (key, force_list) = match key.strip_suffix("[]") {
            Some(stripped) => (stripped.to_string(), true),
            None => (key, false),
        };

        match self.0.remove(&key) {
            None if force_list => {
                self.0.insert(key, QueryValue::List(vec![value]));
            }
            None => {
                self.0.insert(key, QueryValue::Text(value));
            }
            Some(QueryValue::Text(existing)) => {
                self.0.insert(key, QueryValue::List(vec![existing, value]));
            }
            Some(QueryValue::List(mut values)) => {
                values.push(value);
                self.0.insert(key, QueryValue::List(values));
            }
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The value of `key` when it is a single, non-empty string.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(QueryValue::Text(value)) if !value.is_empty() => Some(value.as_str()),
            _ => None,
        }
    }

    /// Every entry of `key`, splitting comma separated text.
    pub fn values(&self, key: &str) -> Vec<String> {
        let raw: Vec<&str> = match self.0.get(key) {
            Some(QueryValue::Text(value)) => vec![value.as_str()],
            Some(QueryValue::List(values)) => values.iter().map(String::as_str).collect(),
            None => Vec::new(),
        };

        raw.into_iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Numeric ids listed under `key`; entries that do not parse are dropped.
    pub fn ids(&self, key: &str) -> Vec<i64> {
        self.values(key)
            .iter()
            .filter_map(|id| id.parse::<i64>().ok())
            .collect()
    }

    pub fn is_truthy(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(QueryValue::Text(value)) => {
                !matches!(value.trim(), "" | "0" | "false")
            }
            Some(QueryValue::List(values)) => !values.is_empty(),
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &QueryValue)> {
        self.0.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for ReportQuery
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_and_bracketed_keys_become_lists() {
        let query = ReportQuery::from_pairs([
            ("period", "month"),
            ("status_is[]", "completed"),
            ("products", "1"),
            ("products", "2"),
        ]);

        assert_eq!(query.text("period"), Some("month"));
        assert_eq!(
            query.get("status_is"),
            Some(&QueryValue::List(vec!["completed".to_string()]))
        );
        assert_eq!(query.ids("products"), vec![1, 2]);
    }

    #[test]
    fn ids_split_comma_lists_and_skip_garbage() {
        let query = ReportQuery::new().with("products", "12, 7,abc,,3");
        assert_eq!(query.ids("products"), vec![12, 7, 3]);
        assert!(query.ids("variations").is_empty());
    }

    #[test]
    fn empty_text_is_not_a_value_but_is_a_key() {
        let query = ReportQuery::new().with("filter", "");
        assert_eq!(query.text("filter"), None);
        assert!(query.contains_key("filter"));
        assert!(!query.is_truthy("filter"));
    }
}
