//! # Route Cache
//!
//! Persists the compiled route table so later processes can skip compilation.
//!
//! Only controller routes are written: an inline closure has no stable
//! representation, so closure routes must be registered again on every start
//! and are merged back in by the dispatcher after a successful load.
//!
//! Loading never fails loudly. A missing, unreadable, corrupt or outdated file
//! (including one whose stored patterns no longer match what this build
//! compiles) is a cache miss and the caller compiles from scratch. A snapshot
//! without routes is a miss too.
//!
//! Saves go to a sibling `.tmp` file that is renamed over the cache, so readers
//! never observe a half-written snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::router::{
    compile_pattern, is_static, parse_method, CompiledRoutes, ControllerRef, Handler, Route,
    RouteKey,
};

/// Bumped whenever the snapshot layout changes; other versions are misses.
pub const CACHE_FORMAT_VERSION: u32 = 2;

/// A cacheable route, minus the method and compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRoute {
    pub path: String,
    /// Registration index, used to slot re-registered closures back in between
    /// cached dynamic routes.
    pub order: usize,
    pub handler: ControllerRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<String>,
}

/// A dynamic route together with the regex source it compiled to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedDynamic {
    pub pattern: String,
    #[serde(flatten)]
    pub route: CachedRoute,
}

/// Serializable projection of [`CompiledRoutes`]: method to path (static) or
/// ordered patterns (dynamic), plus the name index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub version: u32,
    pub static_routes: BTreeMap<String, BTreeMap<String, CachedRoute>>,
    pub dynamic_routes: BTreeMap<String, Vec<CachedDynamic>>,
    pub names: BTreeMap<String, RouteKey>,
}

impl CacheSnapshot {
    /// Project `compiled`, skipping every route that is not cacheable.
    #[must_use]
    pub fn from_compiled(compiled: &CompiledRoutes) -> Self {
        let mut snapshot = Self {
            version: CACHE_FORMAT_VERSION,
            static_routes: BTreeMap::new(),
            dynamic_routes: BTreeMap::new(),
            names: BTreeMap::new(),
        };

        for route in compiled.iter() {
            let Some(cached) = CachedRoute::from_route(route) else {
                continue;
            };
            let method = route.method().as_str().to_string();
            if let Some(name) = route.name() {
                snapshot.names.insert(name.to_string(), route.key());
            }
            match route.pattern() {
                Some(pattern) if !route.is_static() => {
                    snapshot
                        .dynamic_routes
                        .entry(method)
                        .or_default()
                        .push(CachedDynamic {
                            pattern: pattern.as_str().to_string(),
                            route: cached,
                        });
                }
                _ => {
                    snapshot
                        .static_routes
                        .entry(method)
                        .or_default()
                        .insert(cached.path.clone(), cached);
                }
            }
        }
        snapshot
    }

    /// Number of routes in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.static_routes.values().map(BTreeMap::len).sum::<usize>()
            + self.dynamic_routes.values().map(Vec::len).sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuild compiled routes. `Err` carries the reason the snapshot was rejected.
    fn restore(self) -> Result<CompiledRoutes, String> {
        if self.version != CACHE_FORMAT_VERSION {
            return Err(format!("unsupported cache version {}", self.version));
        }

        let mut compiled = CompiledRoutes::default();
        for (method, routes) in self.static_routes {
            let method = parse_method(&method).map_err(|e| e.to_string())?;
            for (path, cached) in routes {
                if path != cached.path || !is_static(&path) {
                    return Err(format!("static entry {path} is inconsistent"));
                }
                compiled.push(Arc::new(cached.into_route(method.clone(), None)));
            }
        }
        for (method, routes) in self.dynamic_routes {
            let method = parse_method(&method).map_err(|e| e.to_string())?;
            for entry in routes {
                let pattern = compile_pattern(&entry.route.path).map_err(|e| e.to_string())?;
                if pattern.as_str() != entry.pattern {
                    return Err(format!("pattern for {} changed", entry.route.path));
                }
                let route = entry.route.into_route(method.clone(), Some(Arc::new(pattern)));
                compiled.push(Arc::new(route));
            }
        }

        if compiled.names() != &self.names {
            return Err("name index does not match routes".to_string());
        }
        Ok(compiled)
    }
}

impl CachedRoute {
    fn from_route(route: &Route) -> Option<Self> {
        let handler = match route.handler() {
            Handler::Controller(target) => target.clone(),
            Handler::Inline(_) => return None,
        };
        Some(Self {
            path: route.path().to_string(),
            order: route.order(),
            handler,
            name: route.name().map(str::to_string),
            middleware: route.middleware().to_vec(),
        })
    }

    fn into_route(
        self,
        method: http::Method,
        pattern: Option<Arc<crate::router::CompiledPattern>>,
    ) -> Route {
        Route {
            method,
            path: self.path,
            handler: Handler::Controller(self.handler),
            name: self.name,
            middleware: self.middleware,
            pattern,
            order: self.order,
        }
    }
}

/// File-backed store for the compiled route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCache {
    path: PathBuf,
}

impl RouteCache {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the cacheable part of `compiled`, returning how many routes were stored.
    pub fn save(&self, compiled: &CompiledRoutes) -> Result<usize, CacheError> {
        let snapshot = CacheSnapshot::from_compiled(compiled);
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.io_error(dir, e))?;
        }

        let tmp = self.tmp_path();
        if let Err(e) = self.write_snapshot(&tmp, &snapshot) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                debug!(path = %tmp.display(), error = %cleanup, "No temporary cache file to remove");
            }
            return Err(e);
        }
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(&self.path, e))?;

        debug!(
            path = %self.path.display(),
            routes = snapshot.len(),
            skipped = compiled.len() - snapshot.len(),
            "Route cache saved"
        );
        Ok(snapshot.len())
    }

    /// Read the snapshot back. Every failure is logged and reported as `None`.
    #[must_use]
    pub fn load(&self) -> Option<CompiledRoutes> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Route cache not available");
                return None;
            }
        };

        let snapshot: CacheSnapshot = match serde_json::from_reader(BufReader::new(file)) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable route cache");
                return None;
            }
        };

        if snapshot.is_empty() {
            debug!(path = %self.path.display(), "Route cache holds no routes");
            return None;
        }

        match snapshot.restore() {
            Ok(compiled) => {
                debug!(path = %self.path.display(), routes = compiled.len(), "Route cache loaded");
                Some(compiled)
            }
            Err(reason) => {
                warn!(path = %self.path.display(), reason = %reason, "Ignoring stale route cache");
                None
            }
        }
    }

    fn write_snapshot(&self, tmp: &Path, snapshot: &CacheSnapshot) -> Result<(), CacheError> {
        let file = File::create(tmp).map_err(|e| self.io_error(tmp, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, snapshot)?;
        writer.flush().map_err(|e| self.io_error(tmp, e))?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
