use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

/// Query string parameters, looked up either as given (`startIndex`) or
/// with a capitalized first letter (`StartIndex`).
#[derive(Debug, Default)]
pub struct QueryParams {
    map: HashMap<String, String>,
}

impl<'de> Deserialize<'de> for QueryParams {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = HashMap::<String, String>::deserialize(deserializer)?;
        Ok(QueryParams { map })
    }
}

impl QueryParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(val) = self.map.get(key) {
            return Some(val);
        }

        let mut chars = key.chars();
        let first = chars.next()?;
        if !first.is_ascii_lowercase() {
            return None;
        }
        let capitalized: String = first.to_ascii_uppercase().to_string() + chars.as_str();
        self.map.get(&capitalized).map(|x| x.as_str())
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|s| s.parse::<usize>().ok())
    }
}

impl From<HashMap<String, String>> for QueryParams {
    fn from(map: HashMap<String, String>) -> Self {
        QueryParams { map }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>()
            .into()
    }

    #[test]
    fn test_lookup_with_capitalized_key() {
        let p = params(&[("StartIndex", "10"), ("limit", "5")]);
        assert_eq!(p.get("startIndex"), Some("10"));
        assert_eq!(p.get_usize("limit"), Some(5));
        assert_eq!(p.get("search"), None);
        assert_eq!(p.get(""), None);
    }
}
