//! Compilation entry points: document in, IR plus hydration metadata out.
//!
//! Compilation is synchronous and side-effect-free; independent documents
//! may be compiled concurrently with no shared state.

use serde::{Deserialize, Serialize};

use crate::document::DslDocument;
use crate::error::ParseError;
use crate::hydrate::HydrationHint;
use crate::ir::{collect_hydration_hints, IrGenerator, IrNode, NavigationIr, RouterIr};
use crate::parse::{parse_document, DocumentFormat};
use crate::router::get_target_page;

/// The contract handed to a host-specific code generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    pub ir: IrNode,
    pub hydration_hints: Vec<HydrationHint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_ir: Option<RouterIr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_ir: Option<NavigationIr>,
}

/// Compile a parsed document. Lowers the default page; use
/// [`compile_route`] for a specific request path.
pub fn compile(document: &DslDocument) -> CompileOutput {
    let generator = IrGenerator::new();
    let ir = generator.generate(document);
    output_for(&generator, document, ir)
}

/// Compile the page a request path resolves to.
pub fn compile_route(document: &DslDocument, path: &str) -> CompileOutput {
    let generator = IrGenerator::new();
    let ir = match get_target_page(document, Some(path)) {
        Some(page) => generator.generate_page(page),
        None => generator.generate(document),
    };
    output_for(&generator, document, ir)
}

/// Parse and compile document source in one step.
pub fn compile_source(content: &str, format: DocumentFormat) -> Result<CompileOutput, ParseError> {
    let document = parse_document(content, format)?;
    Ok(compile(&document))
}

fn output_for(generator: &IrGenerator, document: &DslDocument, ir: IrNode) -> CompileOutput {
    let hydration_hints = collect_hydration_hints(&ir);
    CompileOutput {
        ir,
        hydration_hints,
        router_ir: generator.generate_router_ir(document),
        navigation_ir: generator.generate_navigation_ir(document),
    }
}
