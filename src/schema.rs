//! Schema validation over the raw decoded document value.
//!
//! Runs before the typed decode so that every violation in the document is
//! collected and reported at once, each qualified by its instance path.

use serde_json::Value;

const HYDRATION_STRATEGIES: &[&str] = &["immediate", "idle", "visible", "interaction", "never"];
const HYDRATION_PRIORITIES: &[&str] = &["critical", "high", "normal", "low"];
const ROUTER_MODES: &[&str] = &["hash", "history", "memory"];
const NAVIGATION_TYPES: &[&str] = &["menu", "nav", "navbar", "sidebar", "tabs"];

/// Check a decoded document value against the DSL schema. Returns every
/// violation found, as `instancePath message` strings.
pub fn validate_value(doc: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    let Some(root) = doc.as_object() else {
        return vec![" must be an object".to_string()];
    };

    // Version pin: the 1.x document format.
    match root.get("dslVersion") {
        None => errors.push("/dslVersion is required".to_string()),
        Some(Value::String(version)) => {
            if !(version == "1" || version.starts_with("1.")) {
                errors.push(format!(
                    "/dslVersion must be a 1.x version, got \"{}\"",
                    version
                ));
            }
        }
        Some(_) => errors.push("/dslVersion must be a string".to_string()),
    }

    if !root.contains_key("page") && !root.contains_key("pages") {
        errors.push(" must have at least one of 'page' or 'pages'".to_string());
    }

    if let Some(page) = root.get("page") {
        check_page(page, "/page", &mut errors);
    }
    if let Some(pages) = root.get("pages") {
        match pages.as_array() {
            Some(items) => {
                for (i, page) in items.iter().enumerate() {
                    check_page(page, &format!("/pages/{}", i), &mut errors);
                }
            }
            None => errors.push("/pages must be an array".to_string()),
        }
    }

    if let Some(routes) = root.get("routes") {
        match routes.as_array() {
            Some(items) => {
                for (i, route) in items.iter().enumerate() {
                    check_route(route, &format!("/routes/{}", i), &mut errors);
                }
            }
            None => errors.push("/routes must be an array".to_string()),
        }
    }

    if let Some(router) = root.get("router") {
        if let Some(mode) = router.get("mode") {
            check_enum(mode, ROUTER_MODES, "/router/mode", &mut errors);
        }
    }

    if let Some(navigation) = root.get("navigation").and_then(Value::as_object) {
        for slot in ["header", "sidebar", "footer"] {
            if let Some(nav) = navigation.get(slot) {
                let path = format!("/navigation/{}", slot);
                match nav.get("type") {
                    Some(nav_type) => {
                        check_enum(nav_type, NAVIGATION_TYPES, &format!("{}/type", path), &mut errors)
                    }
                    None => errors.push(format!("{}/type is required", path)),
                }
                if nav.get("items").map(|v| !v.is_array()).unwrap_or(false) {
                    errors.push(format!("{}/items must be an array", path));
                }
            }
        }
    }

    errors
}

fn check_page(page: &Value, path: &str, errors: &mut Vec<String>) {
    let Some(obj) = page.as_object() else {
        errors.push(format!("{} must be an object", path));
        return;
    };

    for field in ["id", "title"] {
        match obj.get(field) {
            None => errors.push(format!("{}/{} is required", path, field)),
            Some(Value::String(_)) => {}
            Some(_) => errors.push(format!("{}/{} must be a string", path, field)),
        }
    }

    match obj.get("layout") {
        None => errors.push(format!("{}/layout is required", path)),
        Some(layout) => check_component(layout, &format!("{}/layout", path), errors),
    }
}

fn check_component(node: &Value, path: &str, errors: &mut Vec<String>) {
    let Some(obj) = node.as_object() else {
        errors.push(format!("{} must be an object", path));
        return;
    };

    match obj.get("type") {
        None => errors.push(format!("{}/type is required", path)),
        Some(Value::String(_)) => {}
        Some(_) => errors.push(format!("{}/type must be a string", path)),
    }

    if let Some(hydration) = obj.get("hydration") {
        let hpath = format!("{}/hydration", path);
        match hydration.get("strategy") {
            None => errors.push(format!("{}/strategy is required", hpath)),
            Some(strategy) => {
                check_enum(strategy, HYDRATION_STRATEGIES, &format!("{}/strategy", hpath), errors)
            }
        }
        if let Some(priority) = hydration.get("priority") {
            check_enum(priority, HYDRATION_PRIORITIES, &format!("{}/priority", hpath), errors);
        }
    }

    if let Some(loop_cfg) = obj.get("loop") {
        let lpath = format!("{}/loop", path);
        for field in ["items", "itemVar"] {
            if loop_cfg.get(field).and_then(Value::as_str).is_none() {
                errors.push(format!("{}/{} is required", lpath, field));
            }
        }
    }

    if let Some(children) = obj.get("children") {
        match children.as_array() {
            Some(items) => {
                for (i, child) in items.iter().enumerate() {
                    // Literal text children are always legal.
                    if !child.is_string() {
                        check_component(child, &format!("{}/children/{}", path, i), errors);
                    }
                }
            }
            None => errors.push(format!("{}/children must be an array", path)),
        }
    }
}

fn check_route(route: &Value, path: &str, errors: &mut Vec<String>) {
    let Some(obj) = route.as_object() else {
        errors.push(format!("{} must be an object", path));
        return;
    };

    if obj.get("path").and_then(Value::as_str).is_none() {
        errors.push(format!("{}/path is required", path));
    }

    if let Some(children) = obj.get("children") {
        match children.as_array() {
            Some(items) => {
                for (i, child) in items.iter().enumerate() {
                    check_route(child, &format!("{}/children/{}", path, i), errors);
                }
            }
            None => errors.push(format!("{}/children must be an array", path)),
        }
    }
}

fn check_enum(value: &Value, domain: &[&str], path: &str, errors: &mut Vec<String>) {
    match value.as_str() {
        Some(s) if domain.contains(&s) => {}
        _ => errors.push(format!(
            "{} must be one of [{}], got {}",
            path,
            domain.join(", "),
            value
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_single_page_passes() {
        let doc = json!({
            "dslVersion": "1.0",
            "page": { "id": "home", "title": "Home", "layout": { "type": "container" } }
        });
        assert!(validate_value(&doc).is_empty());
    }

    #[test]
    fn collects_all_violations() {
        let doc = json!({
            "pages": [{ "id": "a", "layout": { "type": "container" } }],
            "router": { "mode": "teleport" }
        });
        let errors = validate_value(&doc);
        assert!(errors.iter().any(|e| e.contains("/dslVersion")));
        assert!(errors.iter().any(|e| e.contains("/pages/0/title")));
        assert!(errors.iter().any(|e| e.contains("/router/mode")));
        assert!(errors.len() >= 3);
    }

    #[test]
    fn rejects_unknown_hydration_strategy() {
        let doc = json!({
            "dslVersion": "1.0",
            "page": {
                "id": "p", "title": "P",
                "layout": { "type": "button", "hydration": { "strategy": "eventually" } }
            }
        });
        let errors = validate_value(&doc);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("/page/layout/hydration/strategy"));
        assert!(errors[0].contains("immediate"));
    }

    #[test]
    fn rejects_wrong_version_line() {
        let doc = json!({
            "dslVersion": "2.0",
            "page": { "id": "p", "title": "P", "layout": { "type": "container" } }
        });
        let errors = validate_value(&doc);
        assert!(errors[0].contains("1.x"));
    }

    #[test]
    fn requires_page_or_pages() {
        let errors = validate_value(&json!({ "dslVersion": "1.0" }));
        assert!(errors.iter().any(|e| e.contains("'page' or 'pages'")));
    }

    #[test]
    fn nested_route_missing_path_is_reported() {
        let doc = json!({
            "dslVersion": "1.0",
            "pages": [{ "id": "p", "title": "P", "layout": { "type": "container" } }],
            "routes": [{ "path": "/", "children": [{ "name": "child" }] }]
        });
        let errors = validate_value(&doc);
        assert!(errors.iter().any(|e| e.contains("/routes/0/children/0/path")));
    }
}
