//! # SparkView Compiler
//!
//! Compiles declarative page DSL documents into framework-agnostic IR,
//! server-rendered markup and partial-hydration metadata.
//!
//! ## Pipeline Invariants
//!
//! 1. **Validation order**: structural decode → schema check (all
//!    violations aggregated) → route path check → route reference check.
//!    Route paths are verified before references; an un-prefixed path is a
//!    contract violation regardless of its target.
//!
//! 2. **Lowering order**: per component node, `loop` wraps `condition`
//!    wraps `element`. Each wrapper lowers the same node with its own
//!    field stripped, so the nesting is always loop → condition → element.
//!
//! 3. **Stable ids**: element ids are hydration correlation keys. Author
//!    ids pass through untouched; anonymous ids come from a per-compilation
//!    counter, never from global state, so repeated compilations of the
//!    same document produce identical IR.
//!
//! 4. **Closed evaluation scope**: expressions resolve only `data`, `env`,
//!    `item`, `index` and the fixed helper table. Evaluation failures
//!    degrade to empty output and never abort a render.
//!
//! 5. **Exactly-once hydration**: per region the state machine is
//!    pending → hydrated, terminal. Every activation path checks the
//!    hydrated set first; repeat activations are no-ops.
//!
//! 6. **Route matching never fails**: no match is `None`; page resolution
//!    falls back to the first declared page rather than erroring.

mod builder;
mod cache;
mod compile;
mod document;
mod error;
mod eval;
mod expression;
mod hydrate;
mod ir;
mod lexer;
mod parse;
mod render;
mod router;
mod schema;

pub use builder::{build_dir, build_site, route_output_path, BuildError, BuildResult};
pub use cache::{ArtifactCache, CachedPage, CachedRouterBundle};
pub use compile::{compile, compile_route, compile_source, CompileOutput};
pub use document::{
    BreadcrumbConfig, ComponentChild, ComponentNode, DslDocument, HydrationConfig,
    HydrationPriority, HydrationStrategy, LoopConfig, NavigationConfig, NavigationItem,
    NavigationItemMeta, NavigationNode, NavigationType, PageMeta, PageNode, RouteConfig, RouteMeta,
    RouterConfig, RouterMode, ThemeConfig, ViewportConfig,
};
pub use error::{EvaluationError, LexError, ParseError};
pub use eval::{
    evaluate, evaluate_binding, evaluate_directive, evaluate_raw, interpolate, is_truthy,
    value_to_display, Scope,
};
pub use expression::{parse_expression, parse_inner_expression, ExpressionNode};
pub use hydrate::{
    HydrationHint, HydrationScheduler, HydrationSurface, DEFAULT_ROOT_MARGIN,
    DEFAULT_VISIBILITY_THRESHOLD, IDLE_FALLBACK_MS,
};
pub use ir::{
    collect_hydration_hints, ConditionIr, ElementIr, IdGenerator, IrGenerator, IrNode, IrValue,
    LoopIr, NavItemIr, NavigationIr, NavigationKind, RouteIr, RouterIr,
};
pub use lexer::{tokenize, Lexer, Token, TokenKind};
pub use parse::{parse_document, parse_document_auto, DocumentFormat};
pub use render::{render_document, render_ir, RenderContext, RenderOutput};
pub use router::{get_target_page, match_route, RouteMatch};
pub use schema::validate_value;
