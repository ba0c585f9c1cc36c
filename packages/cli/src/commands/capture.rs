use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use sectionshot_capture::{
    CaptureOptions, CaptureOutcome, CaptureRun, ChromeBrowser, DeviceChoice, RunReport,
    SelectorSource, WaitUntil,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Args)]
pub struct CaptureArgs {
    /// Page to capture
    pub url: String,

    /// CSS selectors to capture, comma separated
    #[arg(short, long, value_delimiter = ',')]
    pub selectors: Vec<String>,

    /// Capture every direct child of this element
    #[arg(short, long)]
    pub parent: Option<String>,

    /// JSON file with a "selectors" array (takes precedence over --selectors)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Milliseconds to wait before each capture
    #[arg(short, long, default_value_t = 500)]
    pub wait: u64,

    /// Scroll each section to the viewport center first, triggering scroll animations
    #[arg(short, long)]
    pub animate: bool,

    /// Output directory for screenshots
    #[arg(short, long, default_value = "screenshots")]
    pub output: PathBuf,

    /// Navigation timeout in milliseconds
    #[arg(short, long, default_value_t = 30_000)]
    pub timeout: u64,

    /// When navigation counts as done (load, domcontentloaded, networkidle, commit)
    #[arg(long, default_value = "load")]
    pub wait_until: WaitUntil,

    /// Device profiles to capture (desktop, mobile, both)
    #[arg(short, long, default_value = "both")]
    pub device: DeviceChoice,

    /// Skip writing manifest.json
    #[arg(long)]
    pub no_manifest: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

impl CaptureArgs {
    fn selector_source(&self) -> SelectorSource {
        match &self.config {
            Some(path) => {
                if !self.selectors.is_empty() {
                    warn!("Both --config and --selectors given, using --config");
                }
                SelectorSource::Config(path.clone())
            }
            None if !self.selectors.is_empty() => SelectorSource::Direct(self.selectors.clone()),
            None => SelectorSource::None,
        }
    }

    pub fn to_options(&self) -> CaptureOptions {
        CaptureOptions {
            url: self.url.clone(),
            source: self.selector_source(),
            parent_selector: self.parent.clone(),
            devices: self.device,
            wait: Duration::from_millis(self.wait),
            animate: self.animate,
            output_dir: self.output.clone(),
            navigation_timeout: Duration::from_millis(self.timeout),
            wait_until: self.wait_until,
            emit_manifest: !self.no_manifest,
        }
    }
}

pub fn capture(args: CaptureArgs) -> Result<()> {
    let options = args.to_options();

    println!("{}", "📸 Capturing page sections...".bright_blue().bold());
    println!("   URL:    {}", options.url);
    println!("   Output: {}", options.output_dir.display());
    println!();

    let browser = ChromeBrowser::launch(!args.headed).context("Failed to launch Chrome")?;
    let report = CaptureRun::new(browser, options)
        .execute()
        .context("Capture run aborted")?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    for record in &report.records {
        match &record.outcome {
            CaptureOutcome::Saved { path, width, height } => println!(
                "  {} [{}] {} → {} ({}x{})",
                "✓".green(),
                record.device,
                record.selector,
                path.display(),
                width,
                height
            ),
            CaptureOutcome::Failed { reason } => eprintln!(
                "  {} [{}] {} - {}",
                "✗".red(),
                record.device,
                record.selector,
                reason
            ),
        }
    }

    println!();
    if report.records.is_empty() {
        println!("{}", "⚠️  No selectors to capture".yellow());
    } else if report.failed_count() == 0 {
        println!(
            "✨ {} {} sections captured",
            "Done".green().bold(),
            report.saved_count()
        );
    } else {
        println!(
            "{} {} captured, {} failed",
            "Done with errors:".yellow().bold(),
            report.saved_count(),
            report.failed_count()
        );
    }
}
