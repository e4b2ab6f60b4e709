//! Mount prefix matching.
//!
//! # Responsibilities
//! - Normalize mount prefixes (leading slash, no trailing slash)
//! - Match a request path against a prefix on a segment boundary
//! - Produce the remaining path seen by the mounted router
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - `/api` matches `/api` and `/api/..`, never `/apix`
//! - Empty prefix (mounted at `/`) matches every path

/// A normalized mount prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefix {
    prefix: String,
}

impl PathPrefix {
    /// Create a prefix, normalizing `api/`, `/api/` and `/api` to `/api`.
    pub fn new(prefix: impl AsRef<str>) -> Self {
        let trimmed = prefix.as_ref().trim_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        };
        Self { prefix }
    }

    pub fn as_str(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }

    /// Length used to rank overlapping mounts; longest wins.
    pub fn specificity(&self) -> usize {
        self.prefix.len()
    }

    /// The path left for the mounted router, if `path` falls under this prefix.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        match rest {
            "" => Some("/"),
            _ if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }
}
