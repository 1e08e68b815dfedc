//! Typed model of the DSL document.
//!
//! The wire format is JSON-shaped (camelCase keys) and may arrive as JSON
//! or YAML. Routes are read-only after validation; they reference pages by
//! id and never own them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Versioned document root. Holds a single `page`, an ordered `pages` list,
/// or both; validation requires at least one of the two.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DslDocument {
    pub dsl_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<PageNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<RouteConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation: Option<NavigationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<RouterConfig>,
    #[serde(default)]
    pub data: serde_json::Map<String, Value>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeConfig>,
}

impl DslDocument {
    /// Iterate all declared pages, single-page mode first.
    pub fn all_pages(&self) -> impl Iterator<Item = &PageNode> {
        self.page
            .iter()
            .chain(self.pages.iter().flat_map(|pages| pages.iter()))
    }

    /// First page in declaration order, the stable render default.
    pub fn first_page(&self) -> Option<&PageNode> {
        self.all_pages().next()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageNode {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    pub layout: ComponentNode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// One node of a page layout tree. A node may carry at most one of
/// `condition`/`loop` as its own wrapper; when both are present the loop
/// wraps the condition during lowering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<serde_json::Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ComponentChild>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// `loop` is a Rust keyword; the wire name is kept via rename.
    #[serde(rename = "loop", default, skip_serializing_if = "Option::is_none")]
    pub loop_: Option<LoopConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hydration: Option<HydrationConfig>,
}

impl ComponentNode {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            id: None,
            props: None,
            children: None,
            condition: None,
            loop_: None,
            hydration: None,
        }
    }
}

/// Children mix nested component nodes and literal text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentChild {
    Text(String),
    Node(ComponentNode),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopConfig {
    /// Items expression, e.g. `data.items`.
    pub items: String,
    pub item_var: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_var: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// HYDRATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HydrationStrategy {
    Immediate,
    Idle,
    Visible,
    Interaction,
    Never,
}

impl std::fmt::Display for HydrationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HydrationStrategy::Immediate => "immediate",
            HydrationStrategy::Idle => "idle",
            HydrationStrategy::Visible => "visible",
            HydrationStrategy::Interaction => "interaction",
            HydrationStrategy::Never => "never",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HydrationPriority {
    Critical,
    High,
    Normal,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrationConfig {
    pub strategy: HydrationStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<HydrationPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<ViewportConfig>,
}

impl HydrationConfig {
    pub fn strategy(strategy: HydrationStrategy) -> Self {
        Self {
            strategy,
            priority: None,
            trigger: None,
            viewport: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_margin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    /// Absolute route path, e.g. `/home` or `/user/:id`.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Referenced page id. `component` and `pageId` are interchangeable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RouteMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RouteConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl RouteConfig {
    /// The page reference this route denotes, if any. Redirect-only routes
    /// carry neither `component` nor `pageId`.
    pub fn page_ref(&self) -> Option<&str> {
        self.component.as_deref().or(self.page_id.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_auth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<bool>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAVIGATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<NavigationNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidebar: Option<NavigationNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<NavigationNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadcrumb: Option<BreadcrumbConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationType {
    Menu,
    Nav,
    Navbar,
    Sidebar,
    Tabs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationNode {
    #[serde(rename = "type")]
    pub nav_type: NavigationType,
    pub items: Vec<NavigationItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationItem {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NavigationItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<NavigationItemMeta>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationItemMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreadcrumbConfig {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<Value>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTER / THEME
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterMode {
    Hash,
    #[default]
    History,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<RouterMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_behavior: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_active_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_exact_active_class: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fonts: Option<HashMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_mixed_children() {
        let json = serde_json::json!({
            "type": "container",
            "children": [
                "Hello",
                { "type": "text", "props": { "content": "{{ data.x }}" } }
            ]
        });
        let node: ComponentNode = serde_json::from_value(json).unwrap();
        let children = node.children.unwrap();
        assert!(matches!(children[0], ComponentChild::Text(_)));
        assert!(matches!(children[1], ComponentChild::Node(_)));
    }

    #[test]
    fn loop_field_keeps_wire_name() {
        let json = serde_json::json!({
            "type": "list",
            "loop": { "items": "data.items", "itemVar": "item", "indexVar": "i" }
        });
        let node: ComponentNode = serde_json::from_value(json).unwrap();
        let lp = node.loop_.unwrap();
        assert_eq!(lp.items, "data.items");
        assert_eq!(lp.item_var, "item");
        assert_eq!(lp.index_var.as_deref(), Some("i"));
    }

    #[test]
    fn page_ref_prefers_component() {
        let route: RouteConfig = serde_json::from_value(serde_json::json!({
            "path": "/", "name": "home", "component": "a", "pageId": "b"
        }))
        .unwrap();
        assert_eq!(route.page_ref(), Some("a"));
    }

    #[test]
    fn hydration_strategy_round_trips_lowercase() {
        let cfg: HydrationConfig =
            serde_json::from_value(serde_json::json!({ "strategy": "interaction" })).unwrap();
        assert_eq!(cfg.strategy, HydrationStrategy::Interaction);
        assert_eq!(
            serde_json::to_value(&cfg).unwrap()["strategy"],
            "interaction"
        );
    }
}
