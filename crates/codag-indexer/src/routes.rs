//! File-path route conventions
//!
//! Frameworks like Next.js and SvelteKit derive a route from where a handler
//! file lives; its exported `GET`/`POST`/... functions are the handlers.

use std::path::{Component, Path};

/// Derives a route path from a file location.
pub trait RouteConvention: Send + Sync {
    fn name(&self) -> &'static str;

    /// Route served by `file`, or `None` if the file is not a route file under
    /// this convention.
    fn route_path(&self, file: &Path) -> Option<String>;
}

/// Next.js app router: `app/api/chat/[id]/route.ts` → `/api/chat/:id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NextAppRouter;

impl RouteConvention for NextAppRouter {
    fn name(&self) -> &'static str {
        "next-app-router"
    }

    fn route_path(&self, file: &Path) -> Option<String> {
        let stem = file.file_stem()?.to_str()?;
        let ext = file.extension()?.to_str()?;
        if stem != "route" || !matches!(ext, "ts" | "js" | "tsx" | "jsx") {
            return None;
        }
        route_after(file, "app")
    }
}

/// SvelteKit: `src/routes/api/chat/+server.ts` → `/api/chat`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvelteKitServer;

impl RouteConvention for SvelteKitServer {
    fn name(&self) -> &'static str {
        "sveltekit"
    }

    fn route_path(&self, file: &Path) -> Option<String> {
        let stem = file.file_stem()?.to_str()?;
        let ext = file.extension()?.to_str()?;
        if stem != "+server" || !matches!(ext, "ts" | "js") {
            return None;
        }
        route_after(file, "routes")
    }
}

pub fn default_conventions() -> Vec<Box<dyn RouteConvention>> {
    vec![Box::new(NextAppRouter), Box::new(SvelteKitServer)]
}

/// Directory segments between the last `root` directory and the file name,
/// turned into a route.
fn route_after(file: &Path, root: &str) -> Option<String> {
    let dirs: Vec<&str> = file
        .parent()?
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    let start = dirs.iter().rposition(|d| *d == root)? + 1;

    let segments: Vec<String> = dirs[start..].iter().filter_map(|d| route_segment(d)).collect();
    Some(format!("/{}", segments.join("/")))
}

/// `(group)` and `@slot` vanish, `[id]`, `[...slug]` and `[[...slug]]` become params.
fn route_segment(dir: &str) -> Option<String> {
    if (dir.starts_with('(') && dir.ends_with(')')) || dir.starts_with('@') {
        return None;
    }
    if dir.starts_with('[') && dir.ends_with(']') {
        let name = dir.trim_matches(|c| c == '[' || c == ']').trim_start_matches("...");
        return Some(format!(":{}", name));
    }
    Some(dir.to_string())
}
