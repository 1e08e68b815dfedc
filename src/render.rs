//! Server-side markup generation from the lowered IR.
//!
//! Rendering walks the IR directly; there is no intermediate source-code
//! string. Expressions and directives evaluate against the document scope,
//! conditions gate their child, loops rebind `item`/`index` per element.
//! Every hydration-hinted element carries its id in `data-hydration-id` so
//! the client scheduler can locate it. All text and attribute escaping
//! lives in this module and nowhere else.

use log::warn;
use serde_json::Value;

use crate::document::DslDocument;
use crate::eval::{evaluate_binding, evaluate_directive, is_truthy, value_to_display, Scope};
use crate::hydrate::HydrationHint;
use crate::ir::{collect_hydration_hints, ElementIr, IrGenerator, IrNode, IrValue};
use crate::router::get_target_page;

/// Elements rendered without a closing tag; children are ignored.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Per-request render inputs. `data`/`env` overlay the document's own.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub route_path: Option<String>,
    pub data: serde_json::Map<String, Value>,
    pub env: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub html: String,
    pub hydration_hints: Vec<HydrationHint>,
}

/// Render the page a context's route path selects. A document with no
/// pages renders an empty container rather than failing.
pub fn render_document(document: &DslDocument, context: &RenderContext) -> RenderOutput {
    let generator = IrGenerator::new();
    let ir = match get_target_page(document, context.route_path.as_deref()) {
        Some(page) => generator.generate_page(page),
        None => generator.generate(document),
    };

    let mut scope = Scope::from_document(document);
    for (key, value) in &context.data {
        scope.data.insert(key.clone(), value.clone());
    }
    for (key, value) in &context.env {
        scope.env.insert(key.clone(), value.clone());
    }

    RenderOutput {
        html: render_ir(&ir, &scope),
        hydration_hints: collect_hydration_hints(&ir),
    }
}

/// Render one IR tree against a scope.
pub fn render_ir(node: &IrNode, scope: &Scope) -> String {
    let mut out = String::new();
    render_node(node, scope, &mut out);
    out
}

fn render_node(node: &IrNode, scope: &Scope, out: &mut String) {
    match node {
        IrNode::Element(element) => render_element(element, scope, out),
        IrNode::Text { value } => out.push_str(&escape_html(value)),
        IrNode::Expression { raw } => {
            let value = evaluate_binding(raw, scope);
            out.push_str(&escape_html(&value_to_display(&value)));
        }
        IrNode::Condition(wrapper) => {
            if is_truthy(&evaluate_directive(&wrapper.condition, scope)) {
                render_node(&wrapper.child, scope, out);
            }
        }
        IrNode::Loop(wrapper) => {
            let items = evaluate_directive(&wrapper.items, scope);
            let Value::Array(items) = items else {
                if !items.is_null() {
                    warn!("loop items '{}' did not evaluate to an array", wrapper.items);
                }
                return;
            };
            for (index, item) in items.into_iter().enumerate() {
                let bound = scope.with_loop_binding(
                    &wrapper.item_var,
                    wrapper.index_var.as_deref(),
                    item,
                    index,
                );
                render_node(&wrapper.child, &bound, out);
            }
        }
    }
}

fn render_element(element: &ElementIr, scope: &Scope, out: &mut String) {
    out.push('<');
    out.push_str(&element.tag);

    for (key, value) in &element.props {
        render_attribute(key, value, scope, out);
    }
    if element.hydration.is_some() {
        out.push_str(&format!(
            " data-hydration-id=\"{}\"",
            escape_attribute(&element.id)
        ));
    }

    if VOID_ELEMENTS.contains(&element.tag.as_str()) {
        out.push_str(" />");
        return;
    }
    out.push('>');

    for child in &element.children {
        render_node(child, scope, out);
    }

    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

/// Attribute policy: null and `false` omit the attribute, `true` renders
/// the bare attribute name, everything else renders `key="value"`.
fn render_attribute(key: &str, value: &IrValue, scope: &Scope, out: &mut String) {
    let resolved = match value {
        IrValue::Literal { value } => value.clone(),
        IrValue::Expression { raw } => evaluate_binding(raw, scope),
    };
    match resolved {
        Value::Null | Value::Bool(false) => {}
        Value::Bool(true) => {
            out.push(' ');
            out.push_str(key);
        }
        other => {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_attribute(&value_to_display(&other)));
            out.push('"');
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn escape_attribute(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(json: serde_json::Value) -> DslDocument {
        serde_json::from_value(json).unwrap()
    }

    fn render(doc: serde_json::Value) -> RenderOutput {
        render_document(&document(doc), &RenderContext::default())
    }

    #[test]
    fn renders_bound_text() {
        let output = render(json!({
            "dslVersion": "1.0",
            "page": {
                "id": "home", "title": "Home",
                "layout": {
                    "type": "text",
                    "children": ["{{ data.message }}"]
                }
            },
            "data": { "message": "Hello" }
        }));
        assert_eq!(output.html, "<span>Hello</span>");
    }

    #[test]
    fn escapes_interpolated_markup() {
        let output = render(json!({
            "dslVersion": "1.0",
            "page": {
                "id": "home", "title": "Home",
                "layout": { "type": "text", "children": ["{{ data.message }}"] }
            },
            "data": { "message": "<script>alert(1)</script>" }
        }));
        assert_eq!(
            output.html,
            "<span>&lt;script&gt;alert(1)&lt;/script&gt;</span>"
        );
    }

    #[test]
    fn condition_gates_rendering() {
        let doc = json!({
            "dslVersion": "1.0",
            "page": {
                "id": "home", "title": "Home",
                "layout": {
                    "type": "container",
                    "children": [{
                        "type": "text",
                        "condition": "{{ data.show }}",
                        "children": ["secret"]
                    }]
                }
            },
            "data": { "show": false }
        });
        assert_eq!(render(doc).html, "<div></div>");

        let mut shown: serde_json::Value = json!({
            "dslVersion": "1.0",
            "page": {
                "id": "home", "title": "Home",
                "layout": {
                    "type": "container",
                    "children": [{
                        "type": "text",
                        "condition": "{{ data.show }}",
                        "children": ["secret"]
                    }]
                }
            }
        });
        shown["data"] = json!({ "show": true });
        assert_eq!(render(shown).html, "<div><span>secret</span></div>");
    }

    #[test]
    fn loop_repeats_with_item_binding() {
        let output = render(json!({
            "dslVersion": "1.0",
            "page": {
                "id": "home", "title": "Home",
                "layout": {
                    "type": "list",
                    "children": [{
                        "type": "text",
                        "loop": { "items": "{{ data.names }}", "itemVar": "name", "indexVar": "i" },
                        "children": ["{{ i }}:{{ name }}"]
                    }]
                }
            },
            "data": { "names": ["a", "b"] }
        }));
        assert_eq!(
            output.html,
            "<ul><span>0:a</span><span>1:b</span></ul>"
        );
    }

    #[test]
    fn hinted_element_carries_correlation_attribute() {
        let output = render(json!({
            "dslVersion": "1.0",
            "page": {
                "id": "home", "title": "Home",
                "layout": {
                    "type": "button",
                    "id": "cta",
                    "props": { "class": "primary" },
                    "hydration": { "strategy": "visible" },
                    "children": ["Buy"]
                }
            }
        }));
        assert_eq!(
            output.html,
            "<button class=\"primary\" data-hydration-id=\"cta\">Buy</button>"
        );
        assert_eq!(output.hydration_hints.len(), 1);
        assert_eq!(output.hydration_hints[0].id, "cta");
    }

    #[test]
    fn expression_props_evaluate_and_escape() {
        let output = render(json!({
            "dslVersion": "1.0",
            "page": {
                "id": "home", "title": "Home",
                "layout": {
                    "type": "link",
                    "props": { "href": "{{ data.target }}", "hidden": false, "draggable": true }
                }
            },
            "data": { "target": "/a?b=1&c=\"x\"" }
        }));
        assert_eq!(
            output.html,
            "<a draggable href=\"/a?b=1&amp;c=&quot;x&quot;\"></a>"
        );
    }

    #[test]
    fn void_elements_self_close() {
        let output = render(json!({
            "dslVersion": "1.0",
            "page": {
                "id": "home", "title": "Home",
                "layout": { "type": "image", "props": { "src": "/logo.png" } }
            }
        }));
        assert_eq!(output.html, "<img src=\"/logo.png\" />");
    }

    #[test]
    fn route_path_selects_the_page() {
        let doc = document(json!({
            "dslVersion": "1.0",
            "pages": [
                {
                    "id": "home", "title": "Home",
                    "layout": { "type": "text", "children": ["home"] }
                },
                {
                    "id": "about", "title": "About",
                    "layout": { "type": "text", "children": ["about"] }
                }
            ],
            "routes": [
                { "path": "/", "pageId": "home" },
                { "path": "/about", "pageId": "about" }
            ]
        }));
        let context = RenderContext {
            route_path: Some("/about".to_string()),
            ..RenderContext::default()
        };
        assert_eq!(render_document(&doc, &context).html, "<span>about</span>");
    }

    #[test]
    fn context_data_overlays_document_data() {
        let doc = document(json!({
            "dslVersion": "1.0",
            "page": {
                "id": "home", "title": "Home",
                "layout": { "type": "text", "children": ["{{ data.message }}"] }
            },
            "data": { "message": "original" }
        }));
        let mut context = RenderContext::default();
        context
            .data
            .insert("message".to_string(), json!("overridden"));
        assert_eq!(render_document(&doc, &context).html, "<span>overridden</span>");
    }

    #[test]
    fn bad_binding_renders_empty_not_panic() {
        let output = render(json!({
            "dslVersion": "1.0",
            "page": {
                "id": "home", "title": "Home",
                "layout": {
                    "type": "container",
                    "children": ["{{ data. }}", "after"]
                }
            }
        }));
        assert_eq!(output.html, "<div>after</div>");
    }
}
