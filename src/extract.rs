//! Best-effort field extraction over decoded JSON payloads.
//!
//! Every accessor returns a zero value when the path is missing or holds an
//! unexpected type, so adapters can normalize loosely shaped payloads without
//! failing the delivery.

use serde_json::Value;

/// Read-only view over a JSON value with path-based lookups.
#[derive(Clone, Copy)]
pub struct Fields<'a> {
    value: &'a Value,
}

impl<'a> Fields<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    fn lookup(&self, path: &[&str]) -> Option<&'a Value> {
        let mut current = self.value;
        for key in path {
            current = current.as_object()?.get(*key)?;
        }
        Some(current)
    }

    /// Nested object at `path`, if it is an object.
    pub fn object(&self, path: &[&str]) -> Option<Fields<'a>> {
        self.lookup(path).filter(|v| v.is_object()).map(Fields::new)
    }

    /// String at `path`, or empty.
    pub fn string(&self, path: &[&str]) -> String {
        self.lookup(path)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Identifier at `path`; numbers and strings are both accepted.
    pub fn id(&self, path: &[&str]) -> String {
        match self.lookup(path) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    /// Boolean at `path`, false when absent.
    pub fn flag(&self, path: &[&str]) -> bool {
        self.lookup(path).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn integer(&self, path: &[&str]) -> Option<i64> {
        self.lookup(path).and_then(Value::as_i64)
    }

    /// First non-empty string among several candidate paths.
    pub fn first_string(&self, paths: &[&[&str]]) -> String {
        paths
            .iter()
            .map(|p| self.string(p))
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }

    /// Array at `path`, empty when absent.
    pub fn array(&self, path: &[&str]) -> &'a [Value] {
        self.lookup(path)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_lookups() {
        let v = json!({"repository": {"id": 42, "owner": {"login": "octo"}, "private": true}});
        let f = Fields::new(&v);
        assert_eq!(f.id(&["repository", "id"]), "42");
        assert_eq!(f.string(&["repository", "owner", "login"]), "octo");
        assert!(f.flag(&["repository", "private"]));
        assert!(f.object(&["repository", "owner"]).is_some());
    }

    #[test]
    fn wrong_types_and_missing_paths_give_zero_values() {
        let v = json!({"repository": "not-an-object", "count": "7"});
        let f = Fields::new(&v);
        assert!(f.object(&["repository"]).is_none());
        assert_eq!(f.string(&["repository", "name"]), "");
        assert_eq!(f.id(&["missing"]), "");
        assert!(!f.flag(&["count"]));
        assert_eq!(f.integer(&["count"]), None);
        assert!(f.array(&["count"]).is_empty());
    }

    #[test]
    fn first_string_skips_empty_candidates() {
        let v = json!({"a": "", "b": {"c": "found"}});
        let f = Fields::new(&v);
        assert_eq!(f.first_string(&[&["a"], &["x"], &["b", "c"]]), "found");
        assert_eq!(f.first_string(&[&["a"], &["x"]]), "");
    }
}
