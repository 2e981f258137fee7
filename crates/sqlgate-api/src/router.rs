//! Static route table.
//!
//! Route definitions are compiled once (at load time, and again after each
//! admin edit) into a table mapping HTTP method → list of path patterns.
//! Per-request dispatch is a table lookup plus linear pattern match — no
//! dynamic registration, no reflection.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use sqlgate_commons::RouteDef;
use sqlgate_core::ParamMap;

/// A parsed route path like `/users/{id}/orders`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Param(String),
}

impl PathPattern {
    /// Parse a declared path. `{name}` segments capture path parameters.
    pub fn parse(path: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                if name.is_empty() {
                    return Err(format!("empty path parameter in '{path}'"));
                }
                segments.push(Segment::Param(name.to_string()));
            } else if part.contains('{') || part.contains('}') {
                return Err(format!("malformed path segment '{part}' in '{path}'"));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }
        Ok(Self { segments })
    }

    /// Match a request path, returning captured parameters (as strings —
    /// validation coerces them later).
    pub fn matches(&self, path: &str) -> Option<ParamMap> {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut captured = ParamMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    captured.insert(name.clone(), JsonValue::String(part.to_string()));
                }
            }
        }
        Some(captured)
    }
}

/// One route compiled for dispatch.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub def: RouteDef,
    pattern: PathPattern,
}

/// Method → ordered route list. Built once, swapped atomically on edits.
#[derive(Debug, Default)]
pub struct RouteTable {
    by_method: HashMap<String, Vec<Arc<CompiledRoute>>>,
}

impl RouteTable {
    /// Compile all definitions, validating structure and path syntax.
    pub fn build(defs: &[RouteDef]) -> Result<Self, String> {
        let mut by_method: HashMap<String, Vec<Arc<CompiledRoute>>> = HashMap::new();
        for def in defs {
            def.check()?;
            let pattern = PathPattern::parse(&def.path)?;
            by_method
                .entry(def.method.to_ascii_uppercase())
                .or_default()
                .push(Arc::new(CompiledRoute { def: def.clone(), pattern }));
        }
        Ok(Self { by_method })
    }

    /// Look up a request. First declared match wins.
    pub fn lookup(&self, method: &str, path: &str) -> Option<(Arc<CompiledRoute>, ParamMap)> {
        let candidates = self.by_method.get(&method.to_ascii_uppercase())?;
        for route in candidates {
            if let Some(captured) = route.pattern.matches(path) {
                return Some((route.clone(), captured));
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.by_method.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
