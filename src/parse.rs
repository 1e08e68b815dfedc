//! Document parsing and validation.
//!
//! Validation sequence: structural decode → schema check (all violations
//! aggregated) → typed decode → route path check → route reference check.
//! The path check runs before the reference check: an un-prefixed path is a
//! contract violation regardless of what it points to.

use std::collections::HashSet;

use serde_json::Value;

use crate::document::{DslDocument, RouteConfig};
use crate::error::ParseError;
use crate::schema;

/// Input encoding of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Json,
    Yaml,
}

/// Parse and validate a DSL document from source text.
pub fn parse_document(content: &str, format: DocumentFormat) -> Result<DslDocument, ParseError> {
    let raw: Value = match format {
        DocumentFormat::Json => serde_json::from_str(content)
            .map_err(|e| ParseError::new(format!("Failed to parse JSON: {}", e)))?,
        DocumentFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| ParseError::new(format!("Failed to parse YAML: {}", e)))?,
    };

    let violations = schema::validate_value(&raw);
    if !violations.is_empty() {
        return Err(ParseError::new(format!(
            "Schema validation failed: {}",
            violations.join("; ")
        )));
    }

    let document: DslDocument = serde_json::from_value(raw)
        .map_err(|e| ParseError::new(format!("Schema validation failed: {}", e)))?;

    validate_routes(&document)?;

    Ok(document)
}

/// Parse a document, sniffing the format: content starting with `{` is
/// treated as JSON, anything else as YAML.
pub fn parse_document_auto(content: &str) -> Result<DslDocument, ParseError> {
    let format = if content.trim_start().starts_with('{') {
        DocumentFormat::Json
    } else {
        DocumentFormat::Yaml
    };
    parse_document(content, format)
}

fn validate_routes(document: &DslDocument) -> Result<(), ParseError> {
    let Some(routes) = document.routes.as_ref() else {
        return Ok(());
    };
    if routes.is_empty() {
        return Ok(());
    }

    // Pass 1: path syntax, fail fast on the first bad path.
    for route in routes {
        validate_route_path(route)?;
    }

    // Pass 2: page references.
    let page_ids: HashSet<&str> = document.all_pages().map(|p| p.id.as_str()).collect();
    for route in routes {
        validate_route_references(route, &page_ids)?;
    }

    Ok(())
}

fn validate_route_path(route: &RouteConfig) -> Result<(), ParseError> {
    if !route.path.starts_with('/') {
        return Err(ParseError::new(format!(
            "Route path must start with '/': {}",
            route.path
        )));
    }
    if let Some(children) = route.children.as_ref() {
        for child in children {
            validate_route_path(child)?;
        }
    }
    Ok(())
}

fn validate_route_references(
    route: &RouteConfig,
    page_ids: &HashSet<&str>,
) -> Result<(), ParseError> {
    if let Some(page_id) = route.page_ref() {
        if !page_ids.contains(page_id) {
            return Err(ParseError::new(format!(
                "Route '{}' references non-existent page: {}",
                route.path, page_id
            )));
        }
    }
    if let Some(children) = route.children.as_ref() {
        for child in children {
            validate_route_references(child, page_ids)?;
        }
    }
    Ok(())
}
