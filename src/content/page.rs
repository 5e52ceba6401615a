use url::Url;

/// Where the document is being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameContext {
    #[default]
    TopLevel,
    /// Inside an iframe; `top_accessible` is false for sandboxed frames
    Nested { top_accessible: bool },
}

impl FrameContext {
    /// Only the top-level document is scanned
    pub fn should_run(&self) -> bool {
        matches!(self, FrameContext::TopLevel)
    }
}

/// A loaded document
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub html: String,
    pub frame: FrameContext,
}

impl Page {
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
            frame: FrameContext::TopLevel,
        }
    }

    pub fn in_frame(mut self, frame: FrameContext) -> Self {
        self.frame = frame;
        self
    }
}
