//! Intermediate representation and the AST→IR lowering pass.
//!
//! The IR is flat and framework-agnostic: element/text/expression nodes plus
//! condition and loop wrappers, each wrapper carrying exactly one lowered
//! child. Element ids are the hydration correlation keys and must be stable
//! across repeated compilations of the same document revision, so anonymous
//! ids come from an explicit generator reset per compilation — never from
//! global state.

use std::collections::{BTreeMap, HashMap, HashSet};

use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{
    ComponentChild, ComponentNode, DslDocument, HydrationConfig, NavigationItem, NavigationType,
    PageNode, RouteConfig, RouterMode,
};
use crate::hydrate::HydrationHint;

lazy_static! {
    /// A string participates in data binding iff it contains a `{{ ... }}` span.
    static ref EXPRESSION_RE: Regex = Regex::new(r"\{\{.*?\}\}").unwrap();

    /// DSL component type → target primitive tag. Unknown types fall back to
    /// a generic container; lowering never fails on an unknown type.
    static ref TYPE_TAG_MAP: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("container", "div");
        m.insert("header", "header");
        m.insert("footer", "footer");
        m.insert("section", "section");
        m.insert("text", "span");
        m.insert("button", "button");
        m.insert("image", "img");
        m.insert("link", "a");
        m.insert("list", "ul");
        m.insert("grid", "div");
        m.insert("flex", "div");
        m.insert("form", "form");
        m.insert("input", "input");
        m.insert("select", "select");
        m
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// IR TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IrNode {
    Element(ElementIr),
    Text { value: String },
    Expression { raw: String },
    Condition(ConditionIr),
    Loop(LoopIr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementIr {
    pub tag: String,
    /// Stable hydration correlation key: author-supplied id, or a generated
    /// `cN` counter id, deterministic for a given document revision.
    pub id: String,
    #[serde(default)]
    pub props: BTreeMap<String, IrValue>,
    #[serde(default)]
    pub children: Vec<IrNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hydration: Option<HydrationConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionIr {
    pub condition: String,
    pub child: Box<IrNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopIr {
    pub items: String,
    pub item_var: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_var: Option<String>,
    pub child: Box<IrNode>,
}

/// A lowered prop value: a scalar literal or a raw binding expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IrValue {
    Literal { value: Value },
    Expression { raw: String },
}

impl IrValue {
    pub fn literal(value: impl Into<Value>) -> Self {
        IrValue::Literal {
            value: value.into(),
        }
    }

    pub fn expression(raw: impl Into<String>) -> Self {
        IrValue::Expression { raw: raw.into() }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTER / NAVIGATION IR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterIr {
    pub routes: Vec<RouteIr>,
    pub mode: RouterMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteIr {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RouteIr>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationKind {
    Navbar,
    Sidebar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationIr {
    pub kind: NavigationKind,
    pub items: Vec<NavItemIr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavItemIr {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NavItemIr>>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ID GENERATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Counter for anonymous element ids, threaded through a single lowering
/// pass. A fresh generator per compilation keeps concurrent compilations
/// independent and repeated compilations deterministic. Author-supplied
/// ids are reserved up front; a generated id never collides with one, so
/// `data-hydration-id` correlation keys stay unique even when an author
/// writes a counter-shaped id like `c1`.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: u32,
    reserved: HashSet<String>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator with every author id under `root` reserved.
    pub fn reserving(root: &ComponentNode) -> Self {
        let mut reserved = HashSet::new();
        collect_author_ids(root, &mut reserved);
        Self { next: 0, reserved }
    }

    pub fn next_id(&mut self) -> String {
        loop {
            let id = format!("c{}", self.next);
            self.next += 1;
            if !self.reserved.contains(&id) {
                return id;
            }
        }
    }
}

fn collect_author_ids(node: &ComponentNode, ids: &mut HashSet<String>) {
    if let Some(id) = node.id.as_ref() {
        ids.insert(id.clone());
    }
    if let Some(children) = node.children.as_ref() {
        for child in children {
            if let ComponentChild::Node(nested) = child {
                collect_author_ids(nested, ids);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOWERING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct IrGenerator;

impl IrGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Lower a document's default page: the single `page`, else `pages[0]`.
    /// A document with neither lowers to an empty container rather than
    /// failing. Per-route page selection belongs to the route resolver.
    pub fn generate(&self, document: &DslDocument) -> IrNode {
        match document.first_page() {
            Some(page) => self.generate_page(page),
            None => IrNode::Element(ElementIr {
                tag: "div".to_string(),
                id: IdGenerator::new().next_id(),
                props: BTreeMap::new(),
                children: Vec::new(),
                hydration: None,
            }),
        }
    }

    /// Lower one specific page's layout tree.
    pub fn generate_page(&self, page: &PageNode) -> IrNode {
        let mut ids = IdGenerator::reserving(&page.layout);
        self.lower_component(&page.layout, &mut ids)
    }

    /// Lower the route table. `None` when the document declares no routes.
    pub fn generate_router_ir(&self, document: &DslDocument) -> Option<RouterIr> {
        let routes = document.routes.as_ref()?;
        if routes.is_empty() {
            return None;
        }
        Some(RouterIr {
            routes: routes.iter().map(|r| self.lower_route(r)).collect(),
            mode: document
                .router
                .as_ref()
                .and_then(|r| r.mode)
                .unwrap_or_default(),
        })
    }

    /// Lower the header navigation. `None` when there is no header nav or
    /// its type is not a horizontal nav/navbar.
    pub fn generate_navigation_ir(&self, document: &DslDocument) -> Option<NavigationIr> {
        let header = document.navigation.as_ref()?.header.as_ref()?;
        let kind = match header.nav_type {
            NavigationType::Navbar => NavigationKind::Navbar,
            NavigationType::Nav => NavigationKind::Sidebar,
            _ => return None,
        };
        Some(NavigationIr {
            kind,
            items: header.items.iter().map(lower_nav_item).collect(),
        })
    }

    /// Lowering order is fixed: loop wraps condition wraps element. Each
    /// wrapper strips its own field before lowering the same node again,
    /// which is what terminates the recursion.
    fn lower_component(&self, node: &ComponentNode, ids: &mut IdGenerator) -> IrNode {
        if let Some(loop_cfg) = node.loop_.as_ref() {
            return IrNode::Loop(LoopIr {
                items: loop_cfg.items.clone(),
                item_var: loop_cfg.item_var.clone(),
                index_var: loop_cfg.index_var.clone(),
                child: Box::new(self.lower_conditional(node, ids)),
            });
        }
        self.lower_conditional(node, ids)
    }

    fn lower_conditional(&self, node: &ComponentNode, ids: &mut IdGenerator) -> IrNode {
        if let Some(condition) = node.condition.as_ref() {
            return IrNode::Condition(ConditionIr {
                condition: condition.clone(),
                child: Box::new(self.lower_element(node, ids)),
            });
        }
        self.lower_element(node, ids)
    }

    fn lower_element(&self, node: &ComponentNode, ids: &mut IdGenerator) -> IrNode {
        let id = node
            .id
            .clone()
            .unwrap_or_else(|| ids.next_id());

        let mut props = BTreeMap::new();
        if let Some(node_props) = node.props.as_ref() {
            for (key, value) in node_props {
                props.insert(key.clone(), lower_prop_value(key, value));
            }
        }

        let mut children = Vec::new();
        if let Some(node_children) = node.children.as_ref() {
            for child in node_children {
                children.push(match child {
                    ComponentChild::Text(text) => {
                        if has_expression(text) {
                            IrNode::Expression { raw: text.clone() }
                        } else {
                            IrNode::Text {
                                value: text.clone(),
                            }
                        }
                    }
                    ComponentChild::Node(nested) => self.lower_component(nested, ids),
                });
            }
        }

        IrNode::Element(ElementIr {
            tag: map_component_type(&node.node_type).to_string(),
            id,
            props,
            children,
            hydration: node.hydration.clone(),
        })
    }

    fn lower_route(&self, route: &RouteConfig) -> RouteIr {
        RouteIr {
            path: route.path.clone(),
            name: route.name.clone(),
            component: route.page_ref().unwrap_or_default().to_string(),
            meta: route
                .meta
                .as_ref()
                .and_then(|m| serde_json::to_value(m).ok()),
            children: route
                .children
                .as_ref()
                .map(|children| children.iter().map(|c| self.lower_route(c)).collect()),
            redirect: route.redirect.clone(),
        }
    }
}

fn lower_nav_item(item: &NavigationItem) -> NavItemIr {
    NavItemIr {
        label: item.label.clone(),
        path: item.path.clone(),
        icon: item.icon.clone(),
        external: item.meta.as_ref().and_then(|m| m.external),
        badge: item.meta.as_ref().and_then(|m| m.badge.clone()),
        children: item
            .children
            .as_ref()
            .map(|children| children.iter().map(lower_nav_item).collect()),
    }
}

fn lower_prop_value(key: &str, value: &Value) -> IrValue {
    match value {
        Value::String(s) if has_expression(s) => IrValue::expression(s.clone()),
        Value::String(_) | Value::Number(_) | Value::Bool(_) => IrValue::Literal {
            value: value.clone(),
        },
        other => {
            // Lossy normalization of non-scalar prop values; observable so
            // authoring errors are not silently masked.
            warn!(
                "prop '{}' has unsupported value kind ({}), normalized to empty string",
                key,
                value_kind(other)
            );
            IrValue::literal("")
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn has_expression(text: &str) -> bool {
    EXPRESSION_RE.is_match(text)
}

pub fn map_component_type(node_type: &str) -> &str {
    TYPE_TAG_MAP.get(node_type).copied().unwrap_or("div")
}

// ═══════════════════════════════════════════════════════════════════════════════
// HYDRATION HINT COLLECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Walk a lowered tree and collect one hint per hydration-hinted element,
/// keyed by the element's stable id.
pub fn collect_hydration_hints(ir: &IrNode) -> Vec<HydrationHint> {
    let mut hints = Vec::new();
    collect_hints_into(ir, &mut hints);
    hints
}

fn collect_hints_into(node: &IrNode, hints: &mut Vec<HydrationHint>) {
    match node {
        IrNode::Element(element) => {
            if let Some(config) = element.hydration.as_ref() {
                hints.push(HydrationHint {
                    id: element.id.clone(),
                    config: config.clone(),
                });
            }
            for child in &element.children {
                collect_hints_into(child, hints);
            }
        }
        IrNode::Condition(wrapper) => collect_hints_into(&wrapper.child, hints),
        IrNode::Loop(wrapper) => collect_hints_into(&wrapper.child, hints),
        IrNode::Text { .. } | IrNode::Expression { .. } => {}
    }
}
