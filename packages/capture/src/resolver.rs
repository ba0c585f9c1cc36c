//! Selector resolution: base list plus child expansion, de-duplicated

use crate::locator::synthetic_locator;
use crate::page::Page;
use crate::Result;
use std::collections::HashSet;
use tracing::{debug, info};

/// Tag every direct child of `parent` and return one locator per child, in
/// document order.
///
/// Indices restart at 0 on every call, so call this at most once per parent
/// per page. A missing parent yields no locators.
pub fn expand_children<P: Page>(page: &P, parent: &str) -> Result<Vec<String>> {
    let count = match page.count_children(parent)? {
        Some(count) => count,
        None => {
            info!(parent = %parent, "Parent not found, no children to expand");
            return Ok(Vec::new());
        }
    };

    let mut locators = Vec::with_capacity(count);
    for index in 0..count {
        let token = format!("screenshot-target-{}", index);
        page.tag_child(parent, index, &token)?;
        locators.push(synthetic_locator(&token));
    }

    debug!(parent = %parent, children = count, "Expanded parent");
    Ok(locators)
}

/// Drop repeated selectors, keeping the first occurrence of each
pub fn dedupe_selectors<I>(selectors: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    selectors
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Resolve the selectors to capture on `page`.
///
/// Base selectors come first in their given order, followed by child
/// locators in document order.
pub fn resolve_selectors<P: Page>(
    page: &P,
    base: Vec<String>,
    parent: Option<&str>,
) -> Result<Vec<String>> {
    let children = match parent {
        Some(parent) => expand_children(page, parent)?,
        None => Vec::new(),
    };

    Ok(dedupe_selectors(base.into_iter().chain(children)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::SYNTHETIC_ATTRIBUTE;
    use crate::mock::{FakeElement, FakePage};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn page_with_list(children: usize) -> (FakePage, Vec<usize>) {
        let page = FakePage::new(900.0);
        let list = page.add_element(FakeElement::new(&["#list"], 0.0, 1000.0));
        let ids = (0..children)
            .map(|i| page.add_child(list, FakeElement::new(&["li"], i as f64 * 100.0, 100.0)))
            .collect();
        (page, ids)
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let resolved = dedupe_selectors(strings(&[".b", ".a", ".b", ".c", ".a"]));
        assert_eq!(resolved, strings(&[".b", ".a", ".c"]));
    }

    #[test]
    fn test_expand_children_in_document_order() {
        let (page, ids) = page_with_list(3);

        let locators = expand_children(&page, "#list").unwrap();
        assert_eq!(
            locators,
            strings(&[
                r#"[data-screenshot="screenshot-target-0"]"#,
                r#"[data-screenshot="screenshot-target-1"]"#,
                r#"[data-screenshot="screenshot-target-2"]"#,
            ])
        );
        assert_eq!(
            page.attribute_of(ids[2], SYNTHETIC_ATTRIBUTE).as_deref(),
            Some("screenshot-target-2")
        );
    }

    #[test]
    fn test_expand_direct_children_only() {
        let (page, ids) = page_with_list(2);
        page.add_child(ids[0], FakeElement::new(&["span"], 0.0, 10.0));

        assert_eq!(expand_children(&page, "#list").unwrap().len(), 2);
    }

    #[test]
    fn test_resolve_adds_children_after_base() {
        let (page, _) = page_with_list(4);
        let base = strings(&[".hero", ".footer"]);

        let resolved = resolve_selectors(&page, base, Some("#list")).unwrap();
        assert_eq!(resolved.len(), 2 + 4);
        assert_eq!(&resolved[..2], &strings(&[".hero", ".footer"])[..]);
        assert_eq!(resolved[2], r#"[data-screenshot="screenshot-target-0"]"#);
    }

    #[test]
    fn test_resolve_missing_parent_keeps_base() {
        let page = FakePage::new(900.0);
        let base = strings(&[".hero", ".footer"]);

        let resolved = resolve_selectors(&page, base.clone(), Some("#nope")).unwrap();
        assert_eq!(resolved, base);
    }

    #[test]
    fn test_resolve_removes_overlap_with_children() {
        let (page, _) = page_with_list(2);
        let base = strings(&[
            r#"[data-screenshot="screenshot-target-1"]"#,
            ".hero",
            ".hero",
        ]);

        let resolved = resolve_selectors(&page, base, Some("#list")).unwrap();
        assert_eq!(
            resolved,
            strings(&[
                r#"[data-screenshot="screenshot-target-1"]"#,
                ".hero",
                r#"[data-screenshot="screenshot-target-0"]"#,
            ])
        );
    }
}
