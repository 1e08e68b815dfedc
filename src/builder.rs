//! Static site building: render every static route of a document to HTML
//! files on disk.
//!
//! `build_site` writes one file per static route (`/` becomes `index.html`,
//! `/a/b` becomes `a/b.html`). Dynamic routes and redirect-only routes are
//! skipped; they have no static markup. `build_dir` walks a directory of
//! document sources and builds them in parallel, logging per-document
//! failures without aborting the batch.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{error, info};
use rayon::prelude::*;
use thiserror::Error;
use walkdir::WalkDir;

use crate::document::{DslDocument, RouteConfig};
use crate::error::ParseError;
use crate::parse::parse_document_auto;
use crate::render::{escape_html, render_document, RenderContext};
use crate::router::get_target_page;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Clone, Default)]
pub struct BuildResult {
    pub pages: usize,
    pub documents: usize,
    pub duration: Duration,
}

/// Render every static route of a document into `out_dir`. Returns the
/// number of pages written.
pub fn build_site(document: &DslDocument, out_dir: &Path) -> Result<usize, BuildError> {
    let mut paths: Vec<String> = Vec::new();
    if let Some(routes) = document.routes.as_ref() {
        collect_static_paths(routes, &mut paths);
    }
    if paths.is_empty() {
        // No usable routes: the default page still gets an index.
        paths.push("/".to_string());
    }

    let mut written = 0;
    for route_path in &paths {
        let context = RenderContext {
            route_path: Some(route_path.clone()),
            ..RenderContext::default()
        };
        let output = render_document(document, &context);
        let title = get_target_page(document, Some(route_path))
            .map(|page| page.title.as_str())
            .unwrap_or("");
        let html = page_shell(title, &output.html, &output.hydration_hints);

        let file_path = out_dir.join(route_output_path(route_path));
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).map_err(|source| BuildError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&file_path, html).map_err(|source| BuildError::Io {
            path: file_path.clone(),
            source,
        })?;
        written += 1;
    }
    Ok(written)
}

/// Walk `input_dir` for document sources (`.json`, `.yaml`, `.yml`) and
/// build each into a subdirectory of `out_dir` named after the file stem.
/// Documents are built in parallel; a failing document is logged and
/// skipped.
pub fn build_dir(input_dir: &Path, out_dir: &Path) -> BuildResult {
    let started = Instant::now();
    let sources: Vec<PathBuf> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("json") | Some("yaml") | Some("yml")
            )
        })
        .collect();

    let results: Vec<usize> = sources
        .par_iter()
        .filter_map(|path| match build_one(path, out_dir) {
            Ok(pages) => {
                info!("built {} ({} pages)", path.display(), pages);
                Some(pages)
            }
            Err(err) => {
                error!("skipping {}: {}", path.display(), err);
                None
            }
        })
        .collect();

    BuildResult {
        pages: results.iter().sum(),
        documents: results.len(),
        duration: started.elapsed(),
    }
}

fn build_one(source_path: &Path, out_dir: &Path) -> Result<usize, BuildError> {
    let content = fs::read_to_string(source_path).map_err(|source| BuildError::Io {
        path: source_path.to_path_buf(),
        source,
    })?;
    let document = parse_document_auto(&content)?;
    let stem = source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("site");
    build_site(&document, &out_dir.join(stem))
}

/// Output file for a route path: `/` → `index.html`, `/a/b` → `a/b.html`.
pub fn route_output_path(route_path: &str) -> PathBuf {
    let trimmed = route_path.trim_matches('/');
    if trimmed.is_empty() {
        PathBuf::from("index.html")
    } else {
        PathBuf::from(format!("{}.html", trimmed))
    }
}

fn collect_static_paths(routes: &[RouteConfig], paths: &mut Vec<String>) {
    for route in routes {
        if route.redirect.is_none() && !route.path.contains(':') {
            paths.push(route.path.clone());
        }
        if let Some(children) = route.children.as_ref() {
            collect_static_paths(children, paths);
        }
    }
}

fn page_shell(
    title: &str,
    body: &str,
    hints: &[crate::hydrate::HydrationHint],
) -> String {
    let hints_json = serde_json::to_string(hints).unwrap_or_else(|_| "[]".to_string());
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n\
         <title>{}</title>\n</head>\n<body>\n<div id=\"app\">{}</div>\n\
         <script type=\"application/json\" id=\"hydration-hints\">{}</script>\n\
         </body>\n</html>\n",
        escape_html(title),
        body,
        hints_json
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> DslDocument {
        serde_json::from_value(json!({
            "dslVersion": "1.0",
            "pages": [
                {
                    "id": "home", "title": "Home",
                    "layout": { "type": "text", "children": ["home"] }
                },
                {
                    "id": "about", "title": "About & More",
                    "layout": { "type": "text", "children": ["about"] }
                }
            ],
            "routes": [
                { "path": "/", "pageId": "home" },
                { "path": "/company/about", "pageId": "about" },
                { "path": "/user/:id", "pageId": "home" },
                { "path": "/legacy", "redirect": "/" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn route_paths_map_to_files() {
        assert_eq!(route_output_path("/"), PathBuf::from("index.html"));
        assert_eq!(route_output_path("/about"), PathBuf::from("about.html"));
        assert_eq!(
            route_output_path("/company/about"),
            PathBuf::from("company/about.html")
        );
    }

    #[test]
    fn builds_static_routes_only() {
        let out = tempdir("routes-out");
        let written = build_site(&document(), &out).unwrap();
        // Dynamic and redirect routes are skipped.
        assert_eq!(written, 2);

        let index = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(index.contains("<title>Home</title>"));
        assert!(index.contains("<span>home</span>"));
        assert!(index.contains("id=\"hydration-hints\""));

        let about = fs::read_to_string(out.join("company/about.html")).unwrap();
        assert!(about.contains("<title>About &amp; More</title>"));
        assert!(about.contains("<span>about</span>"));

        fs::remove_dir_all(&out).ok();
    }

    #[test]
    fn document_without_routes_gets_an_index() {
        let doc: DslDocument = serde_json::from_value(json!({
            "dslVersion": "1.0",
            "page": {
                "id": "only", "title": "Only",
                "layout": { "type": "container" }
            }
        }))
        .unwrap();
        let out = tempdir("noroutes-out");
        assert_eq!(build_site(&doc, &out).unwrap(), 1);
        assert!(out.join("index.html").exists());
        fs::remove_dir_all(&out).ok();
    }

    #[test]
    fn build_dir_skips_broken_documents() {
        let input = tempdir("dir-in");
        fs::write(
            input.join("good.json"),
            json!({
                "dslVersion": "1.0",
                "page": { "id": "p", "title": "P", "layout": { "type": "container" } }
            })
            .to_string(),
        )
        .unwrap();
        fs::write(input.join("bad.json"), "{ broken").unwrap();
        fs::write(input.join("notes.txt"), "ignored").unwrap();

        let out = tempdir("dir-out");
        let result = build_dir(&input, &out);
        assert_eq!(result.documents, 1);
        assert_eq!(result.pages, 1);
        assert!(out.join("good/index.html").exists());
        assert!(!out.join("bad").exists());

        fs::remove_dir_all(&input).ok();
        fs::remove_dir_all(&out).ok();
    }

    fn tempdir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sparkview-{}-{}", label, std::process::id()));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        dir
    }
}
