//! Output filenames for captured sections

/// Derive `<slug>__<device>.png` from the selector as the user wrote it.
///
/// No timestamp, so a rerun overwrites the previous capture of the same
/// selector on the same device.
pub fn generate_filename(selector: &str, device: &str) -> String {
    let mut slug = String::with_capacity(selector.len());

    for c in selector.chars().filter(|c| *c != '#' && *c != '.') {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }

    format!("{}__{}.png", slug.trim_matches('_'), device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_and_id() {
        assert_eq!(generate_filename(".hero-banner", "mobile"), "hero_banner__mobile.png");
        assert_eq!(generate_filename("#main", "desktop"), "main__desktop.png");
    }

    #[test]
    fn test_compound_selector() {
        assert_eq!(
            generate_filename("main > section.Pricing:nth-child(2)", "desktop"),
            "main_sectionpricing_nth_child_2__desktop.png"
        );
    }

    #[test]
    fn test_synthetic_locator() {
        assert_eq!(
            generate_filename(r#"[data-screenshot="screenshot-target-3"]"#, "mobile"),
            "data_screenshot_screenshot_target_3__mobile.png"
        );
    }

    #[test]
    fn test_non_ascii_replaced() {
        assert_eq!(generate_filename(".café--menu", "desktop"), "caf_menu__desktop.png");
    }

    #[test]
    fn test_deterministic() {
        let first = generate_filename(".a .b", "desktop");
        assert_eq!(first, generate_filename(".a .b", "desktop"));
        assert_ne!(first, generate_filename(".a .b", "mobile"));
    }
}
