//! Browser fetch response types.

/// A page rendered by the headless browser.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// URL after redirects; base for resolving relative links.
    pub final_url: String,
    /// Serialized DOM after scripts ran.
    pub content: String,
}
