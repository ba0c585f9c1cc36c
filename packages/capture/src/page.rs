//! Browser abstraction consumed by the capture core
//!
//! The core never talks to Chrome directly. Everything it needs from a live
//! page goes through [`Page`], so the same logic runs against headless Chrome
//! and against the in-memory [`crate::mock::FakePage`].

use crate::types::{DeviceProfile, ElementRect, ViewportMetrics, WaitUntil};
use crate::Result;
use std::time::Duration;

/// How a scroll is performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

impl ScrollBehavior {
    pub fn as_css(&self) -> &'static str {
        match self {
            ScrollBehavior::Smooth => "smooth",
            ScrollBehavior::Instant => "instant",
        }
    }
}

/// Browser engine owned by a capture run
pub trait Browser {
    type Page: Page;

    /// Open a page in a fresh, isolated browsing context emulating `profile`
    fn open_page(&self, profile: &DeviceProfile, navigation_timeout: Duration) -> Result<Self::Page>;

    /// Close the page and discard its browsing context
    fn close_page(&self, page: Self::Page) -> Result<()>;

    /// Release the engine. Called exactly once, at the end of a run.
    fn shutdown(&mut self);
}

/// A single live page
pub trait Page {
    fn navigate(&self, url: &str, wait_until: WaitUntil, timeout: Duration) -> Result<()>;

    /// Number of direct children of the first element matching `parent`,
    /// or `None` when nothing matches or `parent` is malformed.
    fn count_children(&self, parent: &str) -> Result<Option<usize>>;

    /// Set `data-screenshot="<token>"` on the `index`-th direct child of `parent`
    fn tag_child(&self, parent: &str, index: usize, token: &str) -> Result<()>;

    /// Set `data-screenshot="<token>"` on the first element matching
    /// `selector`, unless it already carries a token.
    ///
    /// Returns the token on the element afterwards, or `None` when nothing
    /// matches. Malformed selectors count as matching nothing.
    fn tag_first_match(&self, selector: &str, token: &str) -> Result<Option<String>>;

    fn element_rect(&self, selector: &str) -> Result<Option<ElementRect>>;

    fn viewport(&self) -> Result<ViewportMetrics>;

    /// Scroll to an absolute vertical offset
    fn scroll_to(&self, top: f64, behavior: ScrollBehavior) -> Result<()>;

    /// Scroll immediately by a relative vertical delta
    fn scroll_by(&self, delta: f64) -> Result<()>;

    /// PNG bytes of the element matching `selector`
    fn capture_element(&self, selector: &str) -> Result<Vec<u8>>;

    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
