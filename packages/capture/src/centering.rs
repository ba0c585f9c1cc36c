//! Scroll an element to the vertical center of the viewport
//!
//! Two phases. A smooth scroll gets close, but where it lands cannot be read
//! until it has finished, so we wait for the scroll offset to stop changing
//! and then measure again. If the element is still more than
//! [`CENTER_TOLERANCE_PX`] off center, an instant scroll corrects it.

use crate::page::{Page, ScrollBehavior};
use crate::types::ElementRect;
use crate::Result;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum distance between element center and viewport center left alone
pub const CENTER_TOLERANCE_PX: f64 = 50.0;

/// Bounded poll for a scroll to come to rest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub interval: Duration,
    pub max_samples: u32,
}

impl SettlePolicy {
    /// After the smooth scroll (at most 500ms)
    pub const COARSE: SettlePolicy = SettlePolicy {
        interval: Duration::from_millis(50),
        max_samples: 10,
    };

    /// After the corrective scroll (at most 200ms)
    pub const CORRECTION: SettlePolicy = SettlePolicy {
        interval: Duration::from_millis(50),
        max_samples: 4,
    };
}

/// Absolute scroll offset that centers `rect`, never negative
pub fn coarse_scroll_target(scroll_y: f64, rect: ElementRect, viewport_height: f64) -> f64 {
    let target = scroll_y + rect.top - (viewport_height - rect.height) / 2.0;
    target.max(0.0)
}

/// Distance from viewport center to element center, if beyond tolerance
pub fn correction_offset(rect: ElementRect, viewport_height: f64) -> Option<f64> {
    let offset = (rect.top + rect.height / 2.0) - viewport_height / 2.0;
    (offset.abs() > CENTER_TOLERANCE_PX).then_some(offset)
}

/// Sample the scroll offset until two consecutive reads agree.
///
/// Returns the number of samples taken.
fn wait_for_settle<P: Page>(page: &P, policy: SettlePolicy) -> Result<u32> {
    let mut last = page.viewport()?.scroll_y;
    for sample in 1..=policy.max_samples {
        page.pause(policy.interval);
        let current = page.viewport()?.scroll_y;
        if current == last {
            return Ok(sample);
        }
        last = current;
    }
    debug!(samples = policy.max_samples, "Scroll still moving, giving up on settle");
    Ok(policy.max_samples)
}

/// Best-effort centering of the element matching `selector`.
///
/// Imprecise centering is not an error; only page failures are returned.
pub fn center_element<P: Page>(page: &P, selector: &str) -> Result<()> {
    let Some(rect) = page.element_rect(selector)? else {
        warn!(selector = %selector, "No bounding box, skipping centering");
        return Ok(());
    };
    let viewport = page.viewport()?;

    let target = coarse_scroll_target(viewport.scroll_y, rect, viewport.height);
    page.scroll_to(target, ScrollBehavior::Smooth)?;
    wait_for_settle(page, SettlePolicy::COARSE)?;

    let Some(rect) = page.element_rect(selector)? else {
        return Ok(());
    };
    let viewport_height = page.viewport()?.height;

    if let Some(offset) = correction_offset(rect, viewport_height) {
        debug!(selector = %selector, offset, "Correcting scroll");
        page.scroll_by(offset)?;
        wait_for_settle(page, SettlePolicy::CORRECTION)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FakeElement, FakePage, ScrollCall};

    fn rect(top: f64, height: f64) -> ElementRect {
        ElementRect { top, height }
    }

    #[test]
    fn test_coarse_target_centers_element() {
        // Element 200px tall, 1000px below the fold of a 800px viewport
        let target = coarse_scroll_target(0.0, rect(1000.0, 200.0), 800.0);
        assert_eq!(target, 700.0);
        assert_eq!(correction_offset(rect(1000.0 - target, 200.0), 800.0), None);
    }

    #[test]
    fn test_coarse_target_never_negative() {
        let cases = [
            (0.0, rect(0.0, 10.0), 1000.0),
            (0.0, rect(-500.0, 100.0), 900.0),
            (120.0, rect(-400.0, 20.0), 932.0),
            (0.0, rect(10.0, 5000.0), 600.0),
            (50.0, rect(-50.0, 0.0), 1095.0),
        ];
        for (scroll_y, r, vh) in cases {
            assert!(coarse_scroll_target(scroll_y, r, vh) >= 0.0);
        }

        for top in (-3000..3000).step_by(137) {
            for height in [0.0, 40.0, 900.0, 4000.0] {
                let target = coarse_scroll_target(0.0, rect(top as f64, height), 932.0);
                assert!(target >= 0.0, "top={} height={}", top, height);
            }
        }
    }

    #[test]
    fn test_correction_threshold() {
        // Viewport center is 400; element center = top + 50
        assert_eq!(correction_offset(rect(400.0, 100.0), 800.0), None);
        assert_eq!(correction_offset(rect(400.5, 100.0), 800.0), Some(50.5));
        assert_eq!(correction_offset(rect(249.0, 100.0), 800.0), Some(-101.0));
        assert_eq!(correction_offset(rect(300.0, 100.0), 800.0), None);
    }

    #[test]
    fn test_center_without_correction() {
        let page = FakePage::new(800.0);
        page.add_element(FakeElement::new(&[".hero"], 1000.0, 200.0));

        center_element(&page, ".hero").unwrap();

        assert_eq!(
            page.scroll_calls(),
            vec![ScrollCall::To {
                top: 700.0,
                behavior: ScrollBehavior::Smooth
            }]
        );
        assert_eq!(page.scroll_y(), 700.0);
    }

    #[test]
    fn test_center_corrects_drifted_landing() {
        // Lazy content above pushes the landing 120px past target
        let page = FakePage::new(800.0).with_landing_drift(120.0);
        page.add_element(FakeElement::new(&[".pricing"], 2000.0, 100.0));

        center_element(&page, ".pricing").unwrap();

        let calls = page.scroll_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], ScrollCall::By { delta: -120.0 });
        assert_eq!(page.scroll_y(), 1650.0);
    }

    #[test]
    fn test_small_drift_within_tolerance() {
        let page = FakePage::new(800.0).with_landing_drift(50.0);
        page.add_element(FakeElement::new(&[".pricing"], 2000.0, 100.0));

        center_element(&page, ".pricing").unwrap();

        assert_eq!(page.scroll_calls().len(), 1);
    }

    #[test]
    fn test_element_near_top_clamps_to_zero() {
        let page = FakePage::new(800.0).with_scroll(300.0);
        page.add_element(FakeElement::new(&[".nav"], 0.0, 60.0));

        center_element(&page, ".nav").unwrap();

        assert_eq!(
            page.scroll_calls()[0],
            ScrollCall::To {
                top: 0.0,
                behavior: ScrollBehavior::Smooth
            }
        );
        // Cannot scroll above the document, so the element stays off center
        assert!(matches!(page.scroll_calls()[1], ScrollCall::By { delta } if delta < 0.0));
        assert_eq!(page.scroll_y(), 0.0);
    }

    #[test]
    fn test_settle_polls_until_stable() {
        let page = FakePage::new(800.0).with_smooth_steps(3);
        page.add_element(FakeElement::new(&[".hero"], 1000.0, 200.0));

        center_element(&page, ".hero").unwrap();

        // Three moving reads, then one confirming read
        assert_eq!(page.pauses().len(), 3);
        assert_eq!(page.scroll_y(), 700.0);
    }

    #[test]
    fn test_settle_is_bounded() {
        let page = FakePage::new(800.0).with_smooth_steps(50);
        page.add_element(FakeElement::new(&[".hero"], 10_000.0, 200.0));

        center_element(&page, ".hero").unwrap();

        let coarse = SettlePolicy::COARSE.max_samples as usize;
        let correction = SettlePolicy::CORRECTION.max_samples as usize;
        assert!(page.pauses().len() <= coarse + correction);
        assert!(page.pauses().iter().all(|p| *p == Duration::from_millis(50)));
    }

    #[test]
    fn test_missing_element_is_skipped() {
        let page = FakePage::new(800.0);

        center_element(&page, ".ghost").unwrap();
        assert!(page.scroll_calls().is_empty());
    }
}
