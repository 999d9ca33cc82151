/// Ordered header list; names compare case-insensitively.
pub type Headers = Vec<(String, String)>;

/// Replaces every value stored under `name` with a single `value`.
pub fn header_set(headers: &mut Headers, name: impl Into<String>, value: impl Into<String>) {
    let name = name.into();
    header_remove(headers, &name);
    headers.push((name, value.into()));
}

pub fn header_get<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Removes all values stored under `name`, returning the first one.
pub fn header_remove(headers: &mut Headers, name: &str) -> Option<String> {
    let mut removed = None;
    headers.retain(|(k, v)| {
        if !k.eq_ignore_ascii_case(name) {
            return true;
        }
        if removed.is_none() {
            removed = Some(v.clone());
        }
        false
    });
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_duplicates_case_insensitively() {
        let mut headers: Headers = vec![
            ("X-Goog-Api-Key".to_string(), "a".to_string()),
            ("accept".to_string(), "*/*".to_string()),
            ("x-goog-api-key".to_string(), "b".to_string()),
        ];
        header_set(&mut headers, "x-goog-api-key", "pool");
        assert_eq!(headers.len(), 2);
        assert_eq!(header_get(&headers, "X-GOOG-API-KEY"), Some("pool"));
    }

    #[test]
    fn remove_returns_first_value() {
        let mut headers: Headers = vec![
            ("Cookie".to_string(), "a=1".to_string()),
            ("cookie".to_string(), "b=2".to_string()),
        ];
        assert_eq!(header_remove(&mut headers, "cookie").as_deref(), Some("a=1"));
        assert!(headers.is_empty());
        assert_eq!(header_remove(&mut headers, "cookie"), None);
    }
}
