//! # Sectionshot Capture
//!
//! Per-section screenshots of a live web page, across device profiles.
//!
//! ## How a capture run works
//!
//! For every requested device profile the run opens a fresh, isolated
//! browsing context, loads the page, and resolves the selectors to capture:
//!
//! - Base selectors come from a JSON config file or directly from the caller
//! - A parent selector may add one synthetic locator per direct child
//! - Every selector is stabilized into a `[data-screenshot="..."]` locator that
//!   matches exactly one element before anything else touches it
//! - Optionally the element is scrolled to the vertical center of the viewport
//!
//! A selector that fails never aborts the run. A page that fails to load does.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sectionshot_capture::{CaptureOptions, CaptureRun, ChromeBrowser, SelectorSource};
//! use std::path::PathBuf;
//!
//! let browser = ChromeBrowser::launch(true).unwrap();
//! let mut options = CaptureOptions::new("https://example.com");
//! options.source = SelectorSource::Direct(vec![".hero".to_string(), "#pricing".to_string()]);
//! options.output_dir = PathBuf::from("./screenshots");
//!
//! let report = CaptureRun::new(browser, options).execute().unwrap();
//! println!("{} saved, {} failed", report.saved_count(), report.failed_count());
//! ```

mod capture;
mod centering;
mod chrome;
mod filename;
mod locator;
pub mod mock;
mod page;
mod resolver;
mod source;
mod types;

pub use capture::CaptureRun;
pub use centering::{
    center_element, coarse_scroll_target, correction_offset, SettlePolicy, CENTER_TOLERANCE_PX,
};
pub use chrome::{ChromeBrowser, ChromePage};
pub use filename::generate_filename;
pub use locator::{is_synthetic, synthetic_locator, SelectorStabilizer, SYNTHETIC_ATTRIBUTE};
pub use page::{Browser, Page, ScrollBehavior};
pub use resolver::{dedupe_selectors, expand_children, resolve_selectors};
pub use source::{load_config_selectors, SelectorConfig, SelectorSource};
pub use types::{
    CaptureOptions, CaptureOutcome, CaptureRecord, DeviceChoice, DeviceProfile, ElementRect,
    RunReport, ViewportMetrics, WaitUntil,
};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Config error: could not read selectors from {path}: {reason}")]
    ConfigRead { path: PathBuf, reason: String },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Context setup error: {0}")]
    ContextSetup(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
