//! Route table: the dispatch capability wrapped by the router.
//!
//! # Responsibilities
//! - Store endpoint chains keyed by path pattern and method
//! - Store mounted sub-tables under path prefixes
//! - Resolve method + path to the full handler list for one request
//!
//! # Design Decisions
//! - Pattern matching is delegated to `matchit`; this module only decides
//!   which chain a match maps to
//! - Lookup order: a fully static route, then the longest matching mount,
//!   then a parameterized route; a mount is only taken when it resolves to
//!   a real endpoint, otherwise the parent's own match (or 405/404) stands
//! - Not-found and method-not-allowed are ordinary chains, inherited by
//!   mounted tables that do not register their own
//! - Mutated only while the router is being built; read-only afterwards

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use axum::http::{Method, StatusCode};

use crate::chain::{boxed, BoxedHandler};
use crate::context::{Context, DEFAULT_BODY_LIMIT};
use crate::error::{Error, Result};
use crate::routing::matcher::PathPrefix;

/// A pre-composed list of handlers: scoped middleware followed by the endpoint.
pub(crate) type Endpoint = Arc<[BoxedHandler]>;

pub(crate) type SharedTable = Arc<RwLock<RouteTable>>;

pub(crate) fn read(table: &SharedTable) -> RwLockReadGuard<'_, RouteTable> {
    table.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write(table: &SharedTable) -> RwLockWriteGuard<'_, RouteTable> {
    table.write().unwrap_or_else(PoisonError::into_inner)
}

/// Why a resolution ended where it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Matched,
    NotFound,
    MethodNotAllowed(Vec<Method>),
}

/// Everything the dispatcher needs to run one request.
pub(crate) struct Resolved {
    pub handlers: Vec<BoxedHandler>,
    pub params: Vec<(String, String)>,
    pub outcome: Outcome,
}

impl Resolved {
    fn empty() -> Self {
        Self {
            handlers: Vec::new(),
            params: Vec::new(),
            outcome: Outcome::NotFound,
        }
    }

    fn finish(&mut self, endpoint: &Endpoint, params: Vec<(String, String)>, outcome: Outcome) {
        self.handlers.extend(endpoint.iter().cloned());
        self.params.extend(params);
        self.outcome = outcome;
    }

    fn append(&mut self, nested: Resolved) {
        self.handlers.extend(nested.handlers);
        self.params.extend(nested.params);
        self.outcome = nested.outcome;
    }
}

struct PathEntry {
    /// No `{param}` or `{*wildcard}` segments.
    is_static: bool,
    methods: Vec<(Method, Endpoint)>,
}

impl PathEntry {
    fn new(pattern: &str) -> Self {
        Self {
            is_static: !pattern.contains('{'),
            methods: Vec::new(),
        }
    }

    fn get(&self, method: &Method) -> Option<&Endpoint> {
        self.methods
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, endpoint)| endpoint)
    }

    fn allowed(&self) -> Vec<Method> {
        self.methods.iter().map(|(m, _)| m.clone()).collect()
    }
}

struct Mount {
    prefix: PathPrefix,
    scoped: Vec<BoxedHandler>,
    table: SharedTable,
}

#[derive(Clone, Default)]
struct Fallbacks {
    not_found: Option<Endpoint>,
    method_not_allowed: Option<Endpoint>,
}

impl Fallbacks {
    fn inherit(&self, parent: &Fallbacks) -> Fallbacks {
        Fallbacks {
            not_found: self.not_found.clone().or_else(|| parent.not_found.clone()),
            method_not_allowed: self
                .method_not_allowed
                .clone()
                .or_else(|| parent.method_not_allowed.clone()),
        }
    }
}

pub(crate) struct RouteTable {
    middleware: Vec<BoxedHandler>,
    matcher: matchit::Router<usize>,
    entries: Vec<PathEntry>,
    patterns: HashMap<String, usize>,
    mounts: Vec<Mount>,
    fallbacks: Fallbacks,
    body_limit: usize,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            middleware: Vec::new(),
            matcher: matchit::Router::new(),
            entries: Vec::new(),
            patterns: HashMap::new(),
            mounts: Vec::new(),
            fallbacks: Fallbacks::default(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl RouteTable {
    pub fn shared() -> SharedTable {
        Arc::new(RwLock::new(Self::default()))
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }

    pub fn set_body_limit(&mut self, limit: usize) {
        self.body_limit = limit;
    }

    pub fn push_middleware(&mut self, middleware: BoxedHandler) {
        self.middleware.push(middleware);
    }

    /// Register `endpoint` for `method` on `pattern`.
    ///
    /// # Panics
    /// On an invalid pattern, a pattern that conflicts with an existing one,
    /// or a method already registered for this pattern.
    pub fn insert(&mut self, method: Method, pattern: &str, endpoint: Endpoint) {
        let index = match self.patterns.get(pattern) {
            Some(&index) => index,
            None => {
                let index = self.entries.len();
                if let Err(err) = self.matcher.insert(pattern, index) {
                    panic!("invalid route `{pattern}`: {err}");
                }
                self.entries.push(PathEntry::new(pattern));
                self.patterns.insert(pattern.to_string(), index);
                index
            }
        };

        let entry = &mut self.entries[index];
        if entry.get(&method).is_some() {
            panic!("route `{method} {pattern}` is already registered");
        }
        entry.methods.push((method, endpoint));
    }

    /// Mount `table` under `prefix`.
    ///
    /// # Panics
    /// If another table is already mounted at the same prefix.
    pub fn mount(&mut self, prefix: PathPrefix, scoped: Vec<BoxedHandler>, table: SharedTable) {
        if self.mounts.iter().any(|m| m.prefix == prefix) {
            panic!("a router is already mounted at `{}`", prefix.as_str());
        }
        self.mounts.push(Mount {
            prefix,
            scoped,
            table,
        });
        self.mounts
            .sort_by(|a, b| b.prefix.specificity().cmp(&a.prefix.specificity()));
    }

    pub fn set_not_found(&mut self, endpoint: Endpoint) {
        self.fallbacks.not_found = Some(endpoint);
    }

    pub fn set_method_not_allowed(&mut self, endpoint: Endpoint) {
        self.fallbacks.method_not_allowed = Some(endpoint);
    }

    /// Resolve `method` + `path` to the handlers that must run, in order.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolved {
        let mut resolved = Resolved::empty();
        self.resolve_into(method, path, &Fallbacks::default(), &mut resolved);
        resolved
    }

    fn resolve_into(
        &self,
        method: &Method,
        path: &str,
        inherited: &Fallbacks,
        resolved: &mut Resolved,
    ) {
        resolved.handlers.extend(self.middleware.iter().cloned());
        let fallbacks = self.fallbacks.inherit(inherited);

        let exact = self.matcher.at(path).ok().map(|matched| {
            let params: Vec<(String, String)> = matched
                .params
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect();
            (&self.entries[*matched.value], params)
        });

        if let Some((entry, params)) = &exact {
            if entry.is_static {
                if let Some(endpoint) = entry.get(method) {
                    resolved.finish(endpoint, params.clone(), Outcome::Matched);
                    return;
                }
            }
        }

        let mounted = match self.resolve_mount(method, path, &fallbacks) {
            Some(nested) if nested.outcome == Outcome::Matched => {
                resolved.append(nested);
                return;
            }
            other => other,
        };

        if let Some((entry, params)) = exact {
            match entry.get(method) {
                Some(endpoint) => resolved.finish(endpoint, params, Outcome::Matched),
                None => {
                    let endpoint = fallbacks
                        .method_not_allowed
                        .unwrap_or_else(default_method_not_allowed);
                    resolved.finish(&endpoint, params, Outcome::MethodNotAllowed(entry.allowed()));
                }
            }
            return;
        }

        if let Some(nested) = mounted {
            resolved.append(nested);
            return;
        }

        let endpoint = fallbacks.not_found.unwrap_or_else(default_not_found);
        resolved.finish(&endpoint, Vec::new(), Outcome::NotFound);
    }

    /// Resolve inside the longest mount covering `path`, if any.
    fn resolve_mount(&self, method: &Method, path: &str, fallbacks: &Fallbacks) -> Option<Resolved> {
        let (mount, rest) = self
            .mounts
            .iter()
            .find_map(|mount| mount.prefix.strip(path).map(|rest| (mount, rest)))?;

        let mut nested = Resolved::empty();
        nested.handlers.extend(mount.scoped.iter().cloned());
        read(&mount.table).resolve_into(method, rest, fallbacks, &mut nested);
        Some(nested)
    }
}

async fn not_found(ctx: Context) -> Result<()> {
    ctx.status(StatusCode::NOT_FOUND)?;
    Err(Error::msg("not found"))
}

async fn method_not_allowed(ctx: Context) -> Result<()> {
    ctx.status(StatusCode::METHOD_NOT_ALLOWED)?;
    Err(Error::msg("method not allowed"))
}

fn default_not_found() -> Endpoint {
    Arc::from(vec![boxed(not_found)])
}

fn default_method_not_allowed() -> Endpoint {
    Arc::from(vec![boxed(method_not_allowed)])
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok(_ctx: Context) -> Result<()> {
        Ok(())
    }

    fn endpoint() -> Endpoint {
        Arc::from(vec![boxed(ok)])
    }

    #[test]
    fn test_resolve_exact_route_with_params() {
        let mut table = RouteTable::default();
        table.insert(Method::GET, "/users/{id}", endpoint());

        let resolved = table.resolve(&Method::GET, "/users/42");
        assert_eq!(resolved.outcome, Outcome::Matched);
        assert_eq!(resolved.params, vec![("id".to_string(), "42".to_string())]);
        assert_eq!(resolved.handlers.len(), 1);
    }

    #[test]
    fn test_resolve_method_not_allowed_lists_methods() {
        let mut table = RouteTable::default();
        table.insert(Method::GET, "/items", endpoint());
        table.insert(Method::POST, "/items", endpoint());

        let resolved = table.resolve(&Method::DELETE, "/items");
        assert_eq!(
            resolved.outcome,
            Outcome::MethodNotAllowed(vec![Method::GET, Method::POST])
        );
    }

    #[test]
    fn test_resolve_into_mount_strips_prefix() {
        let child = RouteTable::shared();
        write(&child).insert(Method::GET, "/users/{id}", endpoint());

        let mut table = RouteTable::default();
        table.mount(PathPrefix::new("/api"), Vec::new(), child);

        let resolved = table.resolve(&Method::GET, "/api/users/7");
        assert_eq!(resolved.outcome, Outcome::Matched);
        assert_eq!(resolved.params[0].1, "7");

        let missing = table.resolve(&Method::GET, "/api/nothing");
        assert_eq!(missing.outcome, Outcome::NotFound);
    }

    #[test]
    fn test_longest_mount_prefix_wins() {
        let outer = RouteTable::shared();
        write(&outer).insert(Method::GET, "/v1/x", endpoint());
        let inner = RouteTable::shared();
        write(&inner).insert(Method::GET, "/x", endpoint());
        write(&inner).insert(Method::POST, "/x", endpoint());

        let mut table = RouteTable::default();
        table.mount(PathPrefix::new("/api"), Vec::new(), outer);
        table.mount(PathPrefix::new("/api/v1"), Vec::new(), inner);

        // Only the inner table knows POST.
        let resolved = table.resolve(&Method::POST, "/api/v1/x");
        assert_eq!(resolved.outcome, Outcome::Matched);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_route_panics() {
        let mut table = RouteTable::default();
        table.insert(Method::GET, "/dup", endpoint());
        table.insert(Method::GET, "/dup", endpoint());
    }

    #[test]
    fn test_mount_serves_method_missing_on_parent_route() {
        let child = RouteTable::shared();
        write(&child).insert(Method::POST, "/x", endpoint());

        let mut table = RouteTable::default();
        table.insert(Method::GET, "/api/x", endpoint());
        table.mount(PathPrefix::new("/api"), Vec::new(), child);

        assert_eq!(table.resolve(&Method::POST, "/api/x").outcome, Outcome::Matched);
        assert_eq!(table.resolve(&Method::GET, "/api/x").outcome, Outcome::Matched);
        assert_eq!(
            table.resolve(&Method::DELETE, "/api/x").outcome,
            Outcome::MethodNotAllowed(vec![Method::GET])
        );
    }

    #[test]
    fn test_static_mount_beats_parameterized_route() {
        let child = RouteTable::shared();
        write(&child).insert(Method::GET, "/", endpoint());

        let mut table = RouteTable::default();
        table.insert(Method::GET, "/{id}", endpoint());
        table.mount(PathPrefix::new("/users"), Vec::new(), child);

        let resolved = table.resolve(&Method::GET, "/users");
        assert_eq!(resolved.outcome, Outcome::Matched);
        assert!(resolved.params.is_empty());

        let fallback = table.resolve(&Method::GET, "/42");
        assert_eq!(fallback.params, vec![("id".to_string(), "42".to_string())]);
    }

    #[test]
    fn test_parameterized_route_used_when_mount_has_no_match() {
        let child = RouteTable::shared();
        write(&child).insert(Method::GET, "/list", endpoint());

        let mut table = RouteTable::default();
        table.insert(Method::GET, "/{section}/{page}", endpoint());
        table.mount(PathPrefix::new("/users"), Vec::new(), child);

        let resolved = table.resolve(&Method::GET, "/users/7");
        assert_eq!(resolved.outcome, Outcome::Matched);
        assert_eq!(resolved.params[1], ("page".to_string(), "7".to_string()));
    }
}
