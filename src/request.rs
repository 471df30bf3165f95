//! Execution-context seam for authgate.
//!
//! The surrounding request layer supplies everything the engine needs to
//! know about the inbound request: whether the context is interactive (a
//! browser, as opposed to a CLI job), which handler was resolved, which
//! execution group it belongs to, the requested path, and how to build and
//! issue redirects. The engine consumes these through one trait so hosts
//! stay free to wire in any router.

use std::sync::Mutex;

/// Request-scoped environment the engine runs inside.
pub trait RequestContext {
    /// True for interactive (browser) requests. Cookie issuance and
    /// clearing are suppressed when false.
    fn is_interactive(&self) -> bool;

    /// Name of the handler resolved for this request.
    fn handler_name(&self) -> &str;

    /// Execution group of the current request.
    fn group(&self) -> &str;

    /// Ordered path segments of the originally requested URL.
    fn path_segments(&self) -> Vec<String>;

    /// Build a URL for a handler name.
    fn build_url(&self, handler: &str) -> String;

    /// Issue a redirect. The host terminates normal request flow after the
    /// engine returns; the engine itself only records the decision.
    fn redirect(&self, url: &str);
}

/// Fixed request context for tests, CLI embedding, and token-only flows.
#[derive(Debug)]
pub struct StaticRequest {
    interactive: bool,
    handler: String,
    group: String,
    path: Vec<String>,
    redirected: Mutex<Option<String>>,
}

impl StaticRequest {
    /// An interactive request resolved to `handler`.
    pub fn interactive(handler: impl Into<String>) -> Self {
        Self {
            interactive: true,
            handler: handler.into(),
            group: "web".to_string(),
            path: Vec::new(),
            redirected: Mutex::new(None),
        }
    }

    /// A headless (CLI) context; no cookies are touched under it.
    pub fn headless(handler: impl Into<String>) -> Self {
        Self {
            interactive: false,
            handler: handler.into(),
            group: "cli".to_string(),
            path: Vec::new(),
            redirected: Mutex::new(None),
        }
    }

    /// Set the execution group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Set the requested path segments.
    pub fn with_path(mut self, path: &[&str]) -> Self {
        self.path = path.iter().map(|s| s.to_string()).collect();
        self
    }

    /// The redirect issued through this context, if any.
    pub fn redirected_to(&self) -> Option<String> {
        self.redirected.lock().unwrap().clone()
    }
}

impl RequestContext for StaticRequest {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn handler_name(&self) -> &str {
        &self.handler
    }

    fn group(&self) -> &str {
        &self.group
    }

    fn path_segments(&self) -> Vec<String> {
        self.path.clone()
    }

    fn build_url(&self, handler: &str) -> String {
        format!("/{}", handler.to_lowercase())
    }

    fn redirect(&self, url: &str) {
        *self.redirected.lock().unwrap() = Some(url.to_string());
    }
}
