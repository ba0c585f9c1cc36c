//! Core types for section capture

use crate::source::SelectorSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const IPHONE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) \
AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1";

/// Fixed combination of viewport size, pixel density and mobile emulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviceProfile {
    /// Profile name, used in output filenames (e.g., "desktop")
    pub name: &'static str,

    pub width: u32,

    pub height: u32,

    /// Device pixel ratio (1.0 = standard, 2.0 = retina)
    pub device_scale_factor: f64,

    /// Enables mobile viewport and touch emulation
    pub is_mobile: bool,

    pub user_agent: Option<&'static str>,
}

impl DeviceProfile {
    /// Desktop: 1500x1095 at scale 1
    pub const DESKTOP: DeviceProfile = DeviceProfile {
        name: "desktop",
        width: 1500,
        height: 1095,
        device_scale_factor: 1.0,
        is_mobile: false,
        user_agent: None,
    };

    /// Mobile: 430x932 at scale 2 with an iPhone user agent
    pub const MOBILE: DeviceProfile = DeviceProfile {
        name: "mobile",
        width: 430,
        height: 932,
        device_scale_factor: 2.0,
        is_mobile: true,
        user_agent: Some(IPHONE_USER_AGENT),
    };
}

/// Which device profiles a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceChoice {
    Desktop,
    Mobile,
    #[default]
    Both,
}

impl DeviceChoice {
    /// Profiles in processing order
    pub fn profiles(&self) -> Vec<DeviceProfile> {
        match self {
            DeviceChoice::Desktop => vec![DeviceProfile::DESKTOP],
            DeviceChoice::Mobile => vec![DeviceProfile::MOBILE],
            DeviceChoice::Both => vec![DeviceProfile::DESKTOP, DeviceProfile::MOBILE],
        }
    }
}

impl FromStr for DeviceChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desktop" => Ok(DeviceChoice::Desktop),
            "mobile" => Ok(DeviceChoice::Mobile),
            "both" => Ok(DeviceChoice::Both),
            other => Err(format!(
                "Invalid device: {}. Use: desktop, mobile, or both",
                other
            )),
        }
    }
}

/// Condition that marks a navigation as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitUntil {
    #[default]
    Load,
    DomContentLoaded,
    NetworkIdle,
    Commit,
}

impl FromStr for WaitUntil {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "load" => Ok(WaitUntil::Load),
            "domcontentloaded" => Ok(WaitUntil::DomContentLoaded),
            "networkidle" => Ok(WaitUntil::NetworkIdle),
            "commit" => Ok(WaitUntil::Commit),
            other => Err(format!(
                "Invalid wait condition: {}. Use: load, domcontentloaded, networkidle, or commit",
                other
            )),
        }
    }
}

impl fmt::Display for WaitUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle => "networkidle",
            WaitUntil::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// Element bounding rectangle, relative to the viewport
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct ElementRect {
    pub top: f64,
    pub height: f64,
}

/// Current vertical scroll state of the page
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct ViewportMetrics {
    #[serde(rename = "scrollY")]
    pub scroll_y: f64,

    #[serde(rename = "innerHeight")]
    pub height: f64,
}

/// Options for a capture run
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Page to load
    pub url: String,

    /// Where the base selectors come from
    pub source: SelectorSource,

    /// Parent whose direct children become capture targets
    pub parent_selector: Option<String>,

    pub devices: DeviceChoice,

    /// Pause before each capture
    pub wait: Duration,

    /// Center each element in the viewport before capture
    pub animate: bool,

    pub output_dir: PathBuf,

    pub navigation_timeout: Duration,

    pub wait_until: WaitUntil,

    /// Whether to write manifest.json after the run
    pub emit_manifest: bool,
}

impl CaptureOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            source: SelectorSource::None,
            parent_selector: None,
            devices: DeviceChoice::Both,
            wait: Duration::from_millis(500),
            animate: false,
            output_dir: PathBuf::from("screenshots"),
            navigation_timeout: Duration::from_millis(30_000),
            wait_until: WaitUntil::Load,
            emit_manifest: true,
        }
    }
}

/// Outcome of a single selector capture
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CaptureOutcome {
    Saved {
        path: PathBuf,
        width: u32,
        height: u32,
    },
    Failed {
        reason: String,
    },
}

/// One selector on one device
#[derive(Debug, Clone, Serialize)]
pub struct CaptureRecord {
    /// Selector as resolved, before stabilization
    pub selector: String,

    pub device: String,

    #[serde(flatten)]
    pub outcome: CaptureOutcome,
}

impl CaptureRecord {
    pub fn is_saved(&self) -> bool {
        matches!(self.outcome, CaptureOutcome::Saved { .. })
    }
}

/// Result of a whole run, written as manifest.json
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub url: String,

    pub records: Vec<CaptureRecord>,

    pub started_at: String,

    pub finished_at: String,
}

impl RunReport {
    pub fn new(url: String) -> Self {
        Self {
            url,
            records: Vec::new(),
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: String::new(),
        }
    }

    pub fn add_record(&mut self, record: CaptureRecord) {
        self.records.push(record);
    }

    pub fn finish(&mut self) {
        self.finished_at = chrono::Utc::now().to_rfc3339();
    }

    pub fn saved_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_saved()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.records.len() - self.saved_count()
    }
}
