//! In-memory browser for testing
//!
//! [`FakePage`] models just enough of a page for the capture core: a flat
//! list of elements in document order with selectors, attributes, children
//! and an absolute vertical position, plus a scroll offset. Smooth scrolls
//! can be made to take several reads to land, and to land off target.

use crate::locator::SYNTHETIC_ATTRIBUTE;
use crate::page::{Browser, Page, ScrollBehavior};
use crate::types::{DeviceProfile, ElementRect, ViewportMetrics, WaitUntil};
use crate::{CaptureError, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Cursor;
use std::rc::Rc;
use std::time::Duration;

/// Element of a fake page
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    /// Selectors this element answers to
    pub selectors: Vec<String>,

    /// Absolute offset from the top of the document
    pub top: f64,

    pub height: f64,

    pub attributes: HashMap<String, String>,

    pub children: Vec<usize>,

    /// Capture of this element fails with a browser error
    pub fail_capture: bool,
}

impl FakeElement {
    pub fn new(selectors: &[&str], top: f64, height: f64) -> Self {
        Self {
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            top,
            height,
            ..Default::default()
        }
    }

    pub fn failing_capture(mut self) -> Self {
        self.fail_capture = true;
        self
    }
}

/// Scroll request issued against a fake page
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollCall {
    To { top: f64, behavior: ScrollBehavior },
    By { delta: f64 },
}

#[derive(Debug, Default)]
struct PageState {
    elements: Vec<FakeElement>,
    viewport_height: f64,
    scroll_y: f64,
    pending_scroll: Option<f64>,
    remaining_steps: u32,
    smooth_steps: u32,
    landing_drift: f64,
    navigation_error: Option<String>,
    navigated_to: Vec<String>,
    scrolls: Vec<ScrollCall>,
    pauses: Vec<Duration>,
    captured: Vec<String>,
    device: &'static str,
    closed: bool,
}

impl PageState {
    fn matches(element: &FakeElement, selector: &str) -> bool {
        match parse_synthetic(selector) {
            Some(token) => element.attributes.get(SYNTHETIC_ATTRIBUTE).map(String::as_str) == Some(token),
            None => element.selectors.iter().any(|s| s == selector),
        }
    }

    fn first_match(&self, selector: &str) -> Option<usize> {
        self.elements.iter().position(|e| Self::matches(e, selector))
    }
}

fn parse_synthetic(selector: &str) -> Option<&str> {
    selector
        .strip_prefix("[data-screenshot=\"")
        .and_then(|rest| rest.strip_suffix("\"]"))
}

/// Fake page shared between the test and the code under test
#[derive(Debug, Clone)]
pub struct FakePage {
    state: Rc<RefCell<PageState>>,
}

impl FakePage {
    pub fn new(viewport_height: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(PageState {
                viewport_height,
                ..Default::default()
            })),
        }
    }

    /// Smooth scrolls take `steps` viewport reads to land
    pub fn with_smooth_steps(self, steps: u32) -> Self {
        self.state.borrow_mut().smooth_steps = steps;
        self
    }

    /// Smooth scrolls land `drift` pixels past their target
    pub fn with_landing_drift(self, drift: f64) -> Self {
        self.state.borrow_mut().landing_drift = drift;
        self
    }

    pub fn with_scroll(self, scroll_y: f64) -> Self {
        self.state.borrow_mut().scroll_y = scroll_y;
        self
    }

    pub fn failing_navigation(self, message: &str) -> Self {
        self.state.borrow_mut().navigation_error = Some(message.to_string());
        self
    }

    /// Add a top-level element, returning its id
    pub fn add_element(&self, element: FakeElement) -> usize {
        let mut state = self.state.borrow_mut();
        state.elements.push(element);
        state.elements.len() - 1
    }

    /// Add `element` as the last direct child of `parent`
    pub fn add_child(&self, parent: usize, element: FakeElement) -> usize {
        let id = self.add_element(element);
        self.state.borrow_mut().elements[parent].children.push(id);
        id
    }

    pub fn attribute_of(&self, id: usize, name: &str) -> Option<String> {
        self.state.borrow().elements[id].attributes.get(name).cloned()
    }

    pub fn scroll_y(&self) -> f64 {
        self.state.borrow().scroll_y
    }

    pub fn scroll_calls(&self) -> Vec<ScrollCall> {
        self.state.borrow().scrolls.clone()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.state.borrow().pauses.clone()
    }

    /// Selectors passed to `capture_element`, in order
    pub fn captured(&self) -> Vec<String> {
        self.state.borrow().captured.clone()
    }

    pub fn navigated_to(&self) -> Vec<String> {
        self.state.borrow().navigated_to.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

impl Page for FakePage {
    fn navigate(&self, url: &str, _wait_until: WaitUntil, _timeout: Duration) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(message) = &state.navigation_error {
            return Err(CaptureError::Navigation(message.clone()));
        }
        state.navigated_to.push(url.to_string());
        Ok(())
    }

    fn count_children(&self, parent: &str) -> Result<Option<usize>> {
        let state = self.state.borrow();
        Ok(state
            .first_match(parent)
            .map(|id| state.elements[id].children.len()))
    }

    fn tag_child(&self, parent: &str, index: usize, token: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let child = state
            .first_match(parent)
            .and_then(|id| state.elements[id].children.get(index).copied())
            .ok_or_else(|| CaptureError::Script(format!("no child {} under {}", index, parent)))?;
        state.elements[child]
            .attributes
            .insert(SYNTHETIC_ATTRIBUTE.to_string(), token.to_string());
        Ok(())
    }

    fn tag_first_match(&self, selector: &str, token: &str) -> Result<Option<String>> {
        let mut state = self.state.borrow_mut();
        let Some(id) = state.first_match(selector) else {
            return Ok(None);
        };
        let assigned = state.elements[id]
            .attributes
            .entry(SYNTHETIC_ATTRIBUTE.to_string())
            .or_insert_with(|| token.to_string());
        Ok(Some(assigned.clone()))
    }

    fn element_rect(&self, selector: &str) -> Result<Option<ElementRect>> {
        let state = self.state.borrow();
        Ok(state.first_match(selector).map(|id| {
            let element = &state.elements[id];
            ElementRect {
                top: element.top - state.scroll_y,
                height: element.height,
            }
        }))
    }

    fn viewport(&self) -> Result<ViewportMetrics> {
        let mut state = self.state.borrow_mut();
        if let Some(target) = state.pending_scroll {
            let remaining = state.remaining_steps.max(1);
            state.scroll_y += (target - state.scroll_y) / remaining as f64;
            state.remaining_steps = remaining - 1;
            if state.remaining_steps == 0 {
                state.scroll_y = target;
                state.pending_scroll = None;
            }
        }
        Ok(ViewportMetrics {
            scroll_y: state.scroll_y,
            height: state.viewport_height,
        })
    }

    fn scroll_to(&self, top: f64, behavior: ScrollBehavior) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.scrolls.push(ScrollCall::To { top, behavior });
        match behavior {
            ScrollBehavior::Instant => {
                state.scroll_y = top.max(0.0);
                state.pending_scroll = None;
            }
            ScrollBehavior::Smooth => {
                let landing = (top + state.landing_drift).max(0.0);
                if state.smooth_steps == 0 {
                    state.scroll_y = landing;
                } else {
                    state.pending_scroll = Some(landing);
                    state.remaining_steps = state.smooth_steps;
                }
            }
        }
        Ok(())
    }

    fn scroll_by(&self, delta: f64) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.scrolls.push(ScrollCall::By { delta });
        state.pending_scroll = None;
        state.scroll_y = (state.scroll_y + delta).max(0.0);
        Ok(())
    }

    fn capture_element(&self, selector: &str) -> Result<Vec<u8>> {
        let mut state = self.state.borrow_mut();
        state.captured.push(selector.to_string());

        let id = state
            .first_match(selector)
            .ok_or_else(|| CaptureError::ElementNotFound(selector.to_string()))?;
        let element = &state.elements[id];
        if element.fail_capture {
            return Err(CaptureError::Browser(format!("capture failed for {}", selector)));
        }

        let height = element.height.round().max(1.0) as u32;
        let image = image::RgbaImage::new(8, height);
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, image::ImageFormat::Png)
            .map_err(|e| CaptureError::Browser(e.to_string()))?;
        Ok(bytes.into_inner())
    }

    fn pause(&self, duration: Duration) {
        self.state.borrow_mut().pauses.push(duration);
    }
}

/// Log of browser-level events, shared with the test
pub type BrowserJournal = Rc<RefCell<Vec<String>>>;

/// Fake browser that builds one [`FakePage`] per opened context
pub struct FakeBrowser {
    build_page: Box<dyn Fn(&DeviceProfile) -> FakePage>,
    journal: BrowserJournal,
    fail_open: Option<&'static str>,
}

impl FakeBrowser {
    pub fn new(build_page: impl Fn(&DeviceProfile) -> FakePage + 'static) -> Self {
        Self {
            build_page: Box::new(build_page),
            journal: Rc::new(RefCell::new(Vec::new())),
            fail_open: None,
        }
    }

    /// Opening a context for the named device fails
    pub fn failing_open_for(mut self, device: &'static str) -> Self {
        self.fail_open = Some(device);
        self
    }

    /// Entries look like `open:desktop`, `close:desktop` and `shutdown`
    pub fn journal(&self) -> BrowserJournal {
        Rc::clone(&self.journal)
    }
}

impl Browser for FakeBrowser {
    type Page = FakePage;

    fn open_page(&self, profile: &DeviceProfile, _navigation_timeout: Duration) -> Result<FakePage> {
        if self.fail_open == Some(profile.name) {
            return Err(CaptureError::ContextSetup(format!(
                "cannot open context for {}",
                profile.name
            )));
        }
        self.journal.borrow_mut().push(format!("open:{}", profile.name));
        let page = (self.build_page)(profile);
        page.state.borrow_mut().device = profile.name;
        Ok(page)
    }

    fn close_page(&self, page: FakePage) -> Result<()> {
        let mut state = page.state.borrow_mut();
        state.closed = true;
        self.journal.borrow_mut().push(format!("close:{}", state.device));
        Ok(())
    }

    fn shutdown(&mut self) {
        self.journal.borrow_mut().push("shutdown".to_string());
    }
}
