//! Route resolution: request path → declared route → page.
//!
//! Matching is depth-first in declaration order. Exact string equality wins
//! immediately, then `:param` dynamic segments, then the route's children.
//! Child routes are matched against the original absolute request path, not
//! against parent-relative concatenation; a child declared as
//! `/user/profile` under `/user` matches `/user/profile` and a child
//! declared as `profile` never matches anything. Matching never fails; no
//! match is a normal `None`.

use regex::Regex;

use crate::document::{DslDocument, PageNode, RouteConfig};

/// Result of a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub path: String,
    pub name: Option<String>,
    pub page_ref: Option<String>,
}

impl RouteMatch {
    fn from_route(route: &RouteConfig) -> Self {
        Self {
            path: route.path.clone(),
            name: route.name.clone(),
            page_ref: route.page_ref().map(str::to_string),
        }
    }
}

/// Match a request path against a route table. First match in declaration
/// order wins.
pub fn match_route(routes: &[RouteConfig], path: &str) -> Option<RouteMatch> {
    find_route(routes, path).map(RouteMatch::from_route)
}

fn find_route<'a>(routes: &'a [RouteConfig], path: &str) -> Option<&'a RouteConfig> {
    for route in routes {
        if route.path == path {
            return Some(route);
        }
        if route.path.contains(':') && dynamic_segments_match(&route.path, path) {
            return Some(route);
        }
        if let Some(children) = route.children.as_ref() {
            if let Some(found) = find_route(children, path) {
                return Some(found);
            }
        }
    }
    None
}

/// Compile a `:param` route pattern and test it. Each `:name` segment
/// matches exactly one non-`/` path segment.
fn dynamic_segments_match(pattern: &str, path: &str) -> bool {
    let compiled = pattern
        .split('/')
        .map(|segment| {
            if segment.starts_with(':') {
                "[^/]+".to_string()
            } else {
                regex::escape(segment)
            }
        })
        .collect::<Vec<_>>()
        .join("/");
    match Regex::new(&format!("^{}$", compiled)) {
        Ok(re) => re.is_match(path),
        // An unparseable pattern simply never matches.
        Err(_) => false,
    }
}

/// Resolve the page a request path should render.
///
/// Single-page documents always render their page. Multi-page documents
/// fall back to the first page whenever there is no path, no route table,
/// no matching route, or a match whose page reference does not resolve.
/// Page selection never fails once the document has at least one page.
pub fn get_target_page<'a>(document: &'a DslDocument, path: Option<&str>) -> Option<&'a PageNode> {
    if let Some(page) = document.page.as_ref() {
        return Some(page);
    }
    let first = document.first_page()?;

    let (Some(path), Some(routes)) = (path, document.routes.as_ref()) else {
        return Some(first);
    };
    if routes.is_empty() {
        return Some(first);
    }

    let page = match_route(routes, path)
        .and_then(|matched| matched.page_ref)
        .and_then(|page_ref| document.all_pages().find(|p| p.id == page_ref));
    Some(page.unwrap_or(first))
}
