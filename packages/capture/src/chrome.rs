//! Headless Chrome implementation of the browser traits

use crate::locator::SYNTHETIC_ATTRIBUTE;
use crate::page::{Browser, Page, ScrollBehavior};
use crate::types::{DeviceProfile, ElementRect, ViewportMetrics, WaitUntil};
use crate::{CaptureError, Result};
use headless_chrome::protocol::cdp::{Emulation, Page as CdpPage, Target};
use headless_chrome::{LaunchOptions, Tab};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Resource count must hold still this long to count as network idle
const NETWORK_QUIET: Duration = Duration::from_millis(500);

/// One Chrome process, shared by every device pass of a run
pub struct ChromeBrowser {
    browser: Option<headless_chrome::Browser>,
}

impl ChromeBrowser {
    /// Launch Chrome. `headless: false` opens a visible window.
    pub fn launch(headless: bool) -> Result<Self> {
        let desktop = DeviceProfile::DESKTOP;
        let browser = headless_chrome::Browser::new(LaunchOptions {
            headless,
            window_size: Some((desktop.width, desktop.height)),
            idle_browser_timeout: Duration::from_secs(600),
            ..Default::default()
        })
        .map_err(|e| CaptureError::Browser(e.to_string()))?;

        info!(headless, "Launched Chrome");
        Ok(Self {
            browser: Some(browser),
        })
    }

    fn browser(&self) -> Result<&headless_chrome::Browser> {
        self.browser
            .as_ref()
            .ok_or_else(|| CaptureError::ContextSetup("browser has been shut down".to_string()))
    }
}

impl Browser for ChromeBrowser {
    type Page = ChromePage;

    fn open_page(&self, profile: &DeviceProfile, navigation_timeout: Duration) -> Result<ChromePage> {
        let context = self.browser()?.new_context().map_err(setup_error)?;
        let context_id = context.get_id().to_string();
        let tab = context.new_tab().map_err(setup_error)?;
        tab.set_default_timeout(navigation_timeout);

        tab.call_method(Emulation::SetDeviceMetricsOverride {
            width: profile.width,
            height: profile.height,
            device_scale_factor: profile.device_scale_factor,
            mobile: profile.is_mobile,
            scale: None,
            screen_width: None,
            screen_height: None,
            position_x: None,
            position_y: None,
            dont_set_visible_size: None,
            screen_orientation: None,
            viewport: None,
            display_feature: None,
            device_posture: None,
        })
        .map_err(setup_error)?;

        if profile.is_mobile {
            tab.call_method(Emulation::SetTouchEmulationEnabled {
                enabled: true,
                max_touch_points: Some(5),
            })
            .map_err(setup_error)?;
        }

        if let Some(user_agent) = profile.user_agent {
            tab.set_user_agent(user_agent, None, None).map_err(setup_error)?;
        }

        debug!(device = %profile.name, context = %context_id, "Opened browsing context");
        Ok(ChromePage { tab, context_id })
    }

    /// Disposes the page's browser context, which also closes its tab.
    ///
    /// `Context` is not disposed on drop, so each device pass ends here.
    fn close_page(&self, page: ChromePage) -> Result<()> {
        let disposed = page.tab.call_method(Target::DisposeBrowserContext {
            browser_context_id: page.context_id.clone(),
        });

        if let Err(e) = disposed {
            warn!(error = %e, context = %page.context_id, "Failed to dispose context, closing tab");
            page.tab
                .close(true)
                .map_err(|e| CaptureError::Browser(e.to_string()))?;
            return Ok(());
        }

        debug!(context = %page.context_id, "Disposed browsing context");
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.browser.take().is_some() {
            info!("Chrome shut down");
        }
    }
}

/// A tab inside its own browsing context
pub struct ChromePage {
    tab: Arc<Tab>,
    context_id: String,
}

fn setup_error(e: impl std::fmt::Display) -> CaptureError {
    CaptureError::ContextSetup(e.to_string())
}

fn navigation_error(e: impl std::fmt::Display) -> CaptureError {
    CaptureError::Navigation(e.to_string())
}

/// Quote `value` as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// `document.querySelector` that yields null for malformed selectors
/// instead of throwing
fn query_first(selector: &str) -> String {
    format!(
        "(() => {{ try {{ return document.querySelector({}); }} catch (_) {{ return null; }} }})()",
        js_string(selector)
    )
}

fn count_children_script(parent: &str) -> String {
    format!(
        r#"(() => {{
            const parent = {};
            return JSON.stringify(parent ? parent.children.length : null);
        }})()"#,
        query_first(parent)
    )
}

/// Tags the first match unless it already carries a token, and returns the
/// token now on the element (null when nothing matches)
fn tag_first_match_script(selector: &str, token: &str) -> String {
    let attribute = js_string(SYNTHETIC_ATTRIBUTE);
    format!(
        r#"(() => {{
            const el = {};
            if (!el) return JSON.stringify(null);
            const existing = el.getAttribute({attribute});
            if (existing) return JSON.stringify(existing);
            el.setAttribute({attribute}, {token});
            return JSON.stringify({token});
        }})()"#,
        query_first(selector),
        attribute = attribute,
        token = js_string(token)
    )
}

fn element_rect_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = {};
            if (!el) return JSON.stringify(null);
            const rect = el.getBoundingClientRect();
            return JSON.stringify({{ top: rect.top, height: rect.height }});
        }})()"#,
        query_first(selector)
    )
}

impl ChromePage {
    /// Run `script`, which must evaluate to a `JSON.stringify` result
    fn eval_json<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let value = self
            .tab
            .evaluate(script, false)
            .map_err(|e| CaptureError::Script(e.to_string()))?
            .value
            .ok_or_else(|| CaptureError::Script("script returned no value".to_string()))?;

        let json = value
            .as_str()
            .ok_or_else(|| CaptureError::Script(format!("expected JSON string, got {}", value)))?;

        serde_json::from_str(json).map_err(|e| CaptureError::Script(e.to_string()))
    }

    /// Poll `condition` (a boolean JS expression) until true or `timeout`
    fn wait_for(&self, condition: &str, timeout: Duration) -> Result<()> {
        let script = format!("JSON.stringify(Boolean({}))", condition);
        let deadline = Instant::now() + timeout;

        while !self.eval_json::<bool>(&script)? {
            if Instant::now() >= deadline {
                return Err(CaptureError::Navigation(format!(
                    "timed out after {}ms waiting for {}",
                    timeout.as_millis(),
                    condition
                )));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        Ok(())
    }

    /// Wait until no new resources have loaded for [`NETWORK_QUIET`]
    fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
        let script = "JSON.stringify(performance.getEntriesByType('resource').length)";
        let deadline = Instant::now() + timeout;
        let mut count: usize = self.eval_json(script)?;
        let mut quiet_since = Instant::now();

        loop {
            if quiet_since.elapsed() >= NETWORK_QUIET {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(CaptureError::Navigation(format!(
                    "network still busy after {}ms",
                    timeout.as_millis()
                )));
            }
            std::thread::sleep(POLL_INTERVAL);

            let current: usize = self.eval_json(script)?;
            if current != count {
                count = current;
                quiet_since = Instant::now();
            }
        }
    }
}

impl Page for ChromePage {
    fn navigate(&self, url: &str, wait_until: WaitUntil, timeout: Duration) -> Result<()> {
        self.tab.navigate_to(url).map_err(navigation_error)?;

        match wait_until {
            WaitUntil::Commit => {}
            WaitUntil::Load => {
                self.tab.wait_until_navigated().map_err(navigation_error)?;
            }
            WaitUntil::DomContentLoaded => {
                self.wait_for("document.readyState !== 'loading'", timeout)?;
            }
            WaitUntil::NetworkIdle => {
                self.tab.wait_until_navigated().map_err(navigation_error)?;
                self.wait_for_network_idle(timeout)?;
            }
        }
        Ok(())
    }

    fn count_children(&self, parent: &str) -> Result<Option<usize>> {
        self.eval_json(&count_children_script(parent))
    }

    fn tag_child(&self, parent: &str, index: usize, token: &str) -> Result<()> {
        let script = format!(
            r#"(() => {{
                const parent = document.querySelector({});
                const child = parent && parent.children[{}];
                if (!child) return JSON.stringify(false);
                child.setAttribute({}, {});
                return JSON.stringify(true);
            }})()"#,
            js_string(parent),
            index,
            js_string(SYNTHETIC_ATTRIBUTE),
            js_string(token)
        );

        if self.eval_json::<bool>(&script)? {
            Ok(())
        } else {
            Err(CaptureError::Script(format!(
                "child {} of {} disappeared",
                index, parent
            )))
        }
    }

    fn tag_first_match(&self, selector: &str, token: &str) -> Result<Option<String>> {
        self.eval_json(&tag_first_match_script(selector, token))
    }

    fn element_rect(&self, selector: &str) -> Result<Option<ElementRect>> {
        self.eval_json(&element_rect_script(selector))
    }

    fn viewport(&self) -> Result<ViewportMetrics> {
        self.eval_json("JSON.stringify({ scrollY: window.scrollY, innerHeight: window.innerHeight })")
    }

    fn scroll_to(&self, top: f64, behavior: ScrollBehavior) -> Result<()> {
        let script = format!(
            "window.scrollTo({{ top: {}, behavior: '{}' }}); JSON.stringify(true)",
            top,
            behavior.as_css()
        );
        self.eval_json::<bool>(&script).map(|_| ())
    }

    fn scroll_by(&self, delta: f64) -> Result<()> {
        let script = format!(
            "window.scrollBy({{ top: {}, behavior: 'instant' }}); JSON.stringify(true)",
            delta
        );
        self.eval_json::<bool>(&script).map(|_| ())
    }

    fn capture_element(&self, selector: &str) -> Result<Vec<u8>> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|_| CaptureError::ElementNotFound(selector.to_string()))?;

        element
            .capture_screenshot(CdpPage::CaptureScreenshotFormatOption::Png)
            .map_err(|e| CaptureError::Browser(e.to_string()))
    }
}
