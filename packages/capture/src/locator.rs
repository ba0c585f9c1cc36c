//! Synthetic locators
//!
//! A selector the user hands us may match many elements, or match a
//! different element after the page reflows. Before capture every selector is
//! pinned to one element by stamping a `data-screenshot` attribute on it and
//! querying by that attribute from then on.

use crate::page::Page;
use crate::{CaptureError, Result};
use tracing::debug;

/// Attribute carrying the synthetic token
pub const SYNTHETIC_ATTRIBUTE: &str = "data-screenshot";

const SYNTHETIC_PREFIX: &str = "[data-screenshot";

/// Build `[data-screenshot="<token>"]`
pub fn synthetic_locator(token: &str) -> String {
    format!(r#"[{}="{}"]"#, SYNTHETIC_ATTRIBUTE, token)
}

/// Whether `selector` was produced by this crate
pub fn is_synthetic(selector: &str) -> bool {
    selector.starts_with(SYNTHETIC_PREFIX)
}

/// Rewrites selectors into synthetic locators for one page session.
///
/// Tokens come from a counter owned by the stabilizer, so they are unique for
/// as long as the stabilizer lives. Create one per page.
#[derive(Debug, Default)]
pub struct SelectorStabilizer {
    next_token: u64,
}

impl SelectorStabilizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `selector` to the first element it matches.
    ///
    /// Synthetic locators are returned unchanged. An element that already
    /// carries a token keeps it, and its existing locator is returned.
    pub fn stabilize<P: Page>(&mut self, page: &P, selector: &str) -> Result<String> {
        if is_synthetic(selector) {
            return Ok(selector.to_string());
        }

        let token = format!("screenshot-{}", self.next_token);
        let assigned = page
            .tag_first_match(selector, &token)?
            .ok_or_else(|| CaptureError::ElementNotFound(selector.to_string()))?;
        if assigned == token {
            self.next_token += 1;
        }

        let locator = synthetic_locator(&assigned);
        debug!(selector = %selector, locator = %locator, "Stabilized selector");
        Ok(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FakeElement, FakePage};

    #[test]
    fn test_synthetic_passthrough() {
        let page = FakePage::new(1000.0);
        let id = page.add_element(FakeElement::new(&[".hero"], 0.0, 100.0));
        let mut stabilizer = SelectorStabilizer::new();

        let locator = stabilizer
            .stabilize(&page, r#"[data-screenshot="x"]"#)
            .unwrap();
        assert_eq!(locator, r#"[data-screenshot="x"]"#);
        assert!(page.attribute_of(id, SYNTHETIC_ATTRIBUTE).is_none());

        // The pass-through does not consume a token
        assert_eq!(
            stabilizer.stabilize(&page, ".hero").unwrap(),
            r#"[data-screenshot="screenshot-0"]"#
        );
    }

    #[test]
    fn test_stabilize_tags_first_match_only() {
        let page = FakePage::new(1000.0);
        page.add_element(FakeElement::new(&[".card"], 100.0, 50.0));
        page.add_element(FakeElement::new(&[".card"], 300.0, 50.0));

        let mut stabilizer = SelectorStabilizer::new();
        let locator = stabilizer.stabilize(&page, ".card").unwrap();

        assert_eq!(locator, r#"[data-screenshot="screenshot-0"]"#);
        assert_eq!(
            page.attribute_of(0, SYNTHETIC_ATTRIBUTE).as_deref(),
            Some("screenshot-0")
        );
        assert!(page.attribute_of(1, SYNTHETIC_ATTRIBUTE).is_none());
    }

    #[test]
    fn test_tokens_are_unique_per_session() {
        let page = FakePage::new(1000.0);
        page.add_element(FakeElement::new(&[".a"], 0.0, 10.0));
        page.add_element(FakeElement::new(&[".b"], 10.0, 10.0));
        page.add_element(FakeElement::new(&[".c"], 20.0, 10.0));

        let mut stabilizer = SelectorStabilizer::new();
        let a = stabilizer.stabilize(&page, ".a").unwrap();
        let b = stabilizer.stabilize(&page, ".b").unwrap();
        let c = stabilizer.stabilize(&page, ".c").unwrap();

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(c, r#"[data-screenshot="screenshot-2"]"#);
    }

    #[test]
    fn test_tagged_element_keeps_its_token() {
        let page = FakePage::new(1000.0);
        let parent = page.add_element(FakeElement::new(&["#features"], 0.0, 400.0));
        let first = page.add_child(parent, FakeElement::new(&[".feature-first"], 0.0, 200.0));
        page.tag_child("#features", 0, "screenshot-target-0").unwrap();

        let mut stabilizer = SelectorStabilizer::new();
        let locator = stabilizer.stabilize(&page, ".feature-first").unwrap();

        assert_eq!(locator, r#"[data-screenshot="screenshot-target-0"]"#);
        assert_eq!(
            page.attribute_of(first, SYNTHETIC_ATTRIBUTE).as_deref(),
            Some("screenshot-target-0")
        );

        // Reusing a token leaves the counter alone
        page.add_element(FakeElement::new(&[".other"], 400.0, 10.0));
        assert_eq!(
            stabilizer.stabilize(&page, ".other").unwrap(),
            r#"[data-screenshot="screenshot-0"]"#
        );
    }

    #[test]
    fn test_same_selector_twice_resolves_to_same_token() {
        let page = FakePage::new(1000.0);
        page.add_element(FakeElement::new(&[".a"], 0.0, 10.0));

        let mut stabilizer = SelectorStabilizer::new();
        let first = stabilizer.stabilize(&page, ".a").unwrap();
        let again = stabilizer.stabilize(&page, ".a").unwrap();

        assert_eq!(first, again);
    }

    #[test]
    fn test_missing_element() {
        let page = FakePage::new(1000.0);
        let mut stabilizer = SelectorStabilizer::new();

        let err = stabilizer.stabilize(&page, ".missing").unwrap_err();
        assert!(matches!(err, CaptureError::ElementNotFound(s) if s == ".missing"));
    }

    #[test]
    fn test_is_synthetic() {
        assert!(is_synthetic(&synthetic_locator("screenshot-target-3")));
        assert!(!is_synthetic("div[data-screenshot]"));
        assert!(!is_synthetic(".hero"));
    }
}
