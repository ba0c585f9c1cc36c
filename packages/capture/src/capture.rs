//! Capture orchestration across device profiles

use crate::centering::center_element;
use crate::filename::generate_filename;
use crate::locator::SelectorStabilizer;
use crate::page::{Browser, Page};
use crate::resolver::resolve_selectors;
use crate::types::{CaptureOptions, CaptureOutcome, CaptureRecord, DeviceProfile, RunReport};
use crate::{CaptureError, Result};
use std::path::PathBuf;
use tracing::{error, info, instrument, warn};

/// A capture run. Owns the browser from construction until the run ends.
pub struct CaptureRun<B: Browser> {
    browser: B,
    options: CaptureOptions,
}

impl<B: Browser> CaptureRun<B> {
    pub fn new(browser: B, options: CaptureOptions) -> Self {
        Self { browser, options }
    }

    /// Capture every resolved selector on every requested device.
    ///
    /// Per-selector failures are recorded in the report. A device pass that
    /// cannot open its context, load the page or resolve its selectors fails
    /// the whole run. The browser is shut down either way. A manifest that
    /// cannot be written is logged and does not fail the run.
    pub fn execute(mut self) -> Result<RunReport> {
        let result = self.capture_all();
        self.browser.shutdown();
        result
    }

    fn capture_all(&self) -> Result<RunReport> {
        let mut report = RunReport::new(self.options.url.clone());
        let base = self.options.source.base_selectors();

        for profile in self.options.devices.profiles() {
            let records = self.capture_device(&profile, &base).map_err(|e| {
                error!(device = %profile.name, error = %e, "Device pass failed");
                e
            })?;
            for record in records {
                report.add_record(record);
            }
        }

        report.finish();
        if self.options.emit_manifest {
            if let Err(e) = self.write_manifest(&report) {
                error!(error = %e, "Failed to write manifest");
            }
        }

        info!(
            saved = report.saved_count(),
            failed = report.failed_count(),
            "Capture run complete"
        );
        Ok(report)
    }

    /// One device pass in its own browsing context
    #[instrument(skip(self, profile, base), fields(device = %profile.name))]
    fn capture_device(&self, profile: &DeviceProfile, base: &[String]) -> Result<Vec<CaptureRecord>> {
        info!(width = profile.width, height = profile.height, "Starting device pass");

        let page = self
            .browser
            .open_page(profile, self.options.navigation_timeout)?;

        let records = self.capture_on_page(&page, profile, base);

        if let Err(e) = self.browser.close_page(page) {
            warn!(error = %e, "Failed to close browsing context");
        }
        records
    }

    fn capture_on_page(
        &self,
        page: &B::Page,
        profile: &DeviceProfile,
        base: &[String],
    ) -> Result<Vec<CaptureRecord>> {
        let options = &self.options;

        info!(url = %options.url, wait_until = %options.wait_until, "Navigating");
        page.navigate(&options.url, options.wait_until, options.navigation_timeout)?;

        let selectors = resolve_selectors(page, base.to_vec(), options.parent_selector.as_deref())?;
        info!(count = selectors.len(), "Resolved selectors");

        std::fs::create_dir_all(&options.output_dir)?;

        let mut stabilizer = SelectorStabilizer::new();
        let records = selectors
            .into_iter()
            .map(|selector| {
                info!(selector = %selector, "Processing selector");
                let outcome = match self.capture_selector(page, &mut stabilizer, &selector, profile) {
                    Ok((path, width, height)) => {
                        info!(selector = %selector, path = %path.display(), "Saved screenshot");
                        CaptureOutcome::Saved { path, width, height }
                    }
                    Err(e) => {
                        error!(selector = %selector, device = %profile.name, error = %e, "Capture failed");
                        CaptureOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                CaptureRecord {
                    selector,
                    device: profile.name.to_string(),
                    outcome,
                }
            })
            .collect();

        Ok(records)
    }

    /// Stabilize, optionally center, wait, then write the PNG
    fn capture_selector(
        &self,
        page: &B::Page,
        stabilizer: &mut SelectorStabilizer,
        selector: &str,
        profile: &DeviceProfile,
    ) -> Result<(PathBuf, u32, u32)> {
        let locator = stabilizer.stabilize(page, selector)?;

        if self.options.animate {
            center_element(page, &locator)?;
        }

        page.pause(self.options.wait);

        let png = page.capture_element(&locator)?;
        let (width, height) = png_dimensions(&png)?;

        let path = self
            .options
            .output_dir
            .join(generate_filename(selector, profile.name));
        std::fs::write(&path, &png)?;

        Ok((path, width, height))
    }

    /// Write manifest.json next to the screenshots
    fn write_manifest(&self, report: &RunReport) -> Result<()> {
        std::fs::create_dir_all(&self.options.output_dir)?;
        let manifest_path = self.options.output_dir.join("manifest.json");
        let json = serde_json::to_string_pretty(report).map_err(|e| {
            CaptureError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;

        std::fs::write(&manifest_path, json)?;
        info!(path = %manifest_path.display(), "Wrote manifest");
        Ok(())
    }
}

fn png_dimensions(png: &[u8]) -> Result<(u32, u32)> {
    let image = image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .map_err(|e| CaptureError::Browser(format!("invalid screenshot data: {}", e)))?;
    Ok((image.width(), image.height()))
}
