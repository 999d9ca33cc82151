use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyPoolError {
    #[error("no API keys found in environment variables starting with {prefix}")]
    Empty { prefix: String },
}

/// Upstream API key. `Debug`/`Display` only ever show a masked preview.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ApiKey(Arc<str>);

impl ApiKey {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "***".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.masked()).finish()
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Fixed, non-empty set of keys handed out in round-robin order.
pub struct KeyPool {
    keys: Arc<[ApiKey]>,
    cursor: AtomicUsize,
}

impl fmt::Debug for KeyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPool")
            .field("key_count", &self.keys.len())
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}

impl KeyPool {
    pub fn new(keys: Vec<ApiKey>, prefix: &str) -> Result<Self, KeyPoolError> {
        if keys.is_empty() {
            return Err(KeyPoolError::Empty {
                prefix: prefix.to_string(),
            });
        }
        Ok(Self {
            keys: keys.into(),
            cursor: AtomicUsize::new(0),
        })
    }

    /// Collects keys from `vars` whose name starts with `prefix`.
    ///
    /// Blank values and unresolved `${VAR}` placeholders are skipped, duplicates keep their
    /// first slot, and the order follows the variable names with numeric suffixes compared
    /// by value (`KEY_2` before `KEY_10`).
    pub fn from_vars<I>(vars: I, prefix: &str) -> Result<Self, KeyPoolError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut matched: Vec<(String, String)> = vars
            .into_iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .filter_map(|(name, value)| {
                let value = value.trim();
                if value.is_empty() || (value.starts_with("${") && value.ends_with('}')) {
                    return None;
                }
                Some((name, value.to_string()))
            })
            .collect();
        matched.sort_by_cached_key(|(name, _)| suffix_rank(&name[prefix.len()..]));

        let mut seen = HashSet::new();
        let keys = matched
            .into_iter()
            .filter(|(_, value)| seen.insert(value.clone()))
            .map(|(_, value)| ApiKey::new(value))
            .collect();
        Self::new(keys, prefix)
    }

    /// Returns the key under the cursor and advances it by one, wrapping at `len()`.
    pub fn next(&self) -> ApiKey {
        let len = self.keys.len();
        let index = match self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some((current + 1) % len)
            }) {
            Ok(previous) | Err(previous) => previous,
        };
        self.keys[index].clone()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn masked(&self) -> Vec<String> {
        self.keys.iter().map(ApiKey::masked).collect()
    }
}

/// Bare prefix first, then numeric suffixes by value, then everything else by name.
fn suffix_rank(suffix: &str) -> (u8, u64, String) {
    if suffix.is_empty() {
        return (0, 0, String::new());
    }
    match suffix.trim_start_matches('_').parse::<u64>() {
        Ok(n) => (1, n, suffix.to_string()),
        Err(_) => (2, 0, suffix.to_string()),
    }
}
