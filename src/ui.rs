//! Terminal output: classification tables, a progress bar and the run summary.
//!
//! Uses `comfy-table` for tables, `indicatif` for the progress bar and
//! `console` for colors. [`RunProgress`] follows a run through the
//! [`ProgressReporter`] hooks.

use std::io::{self, Write};
use std::time::Duration;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::{
    Classification, ClassifiedOutage, OutageOutcome, ProgressReporter, RunReport, RunSummary,
    SkipReason,
};
use crate::rules::RuleBook;

fn base_table<const N: usize>(headers: [&str; N]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );
    table
}

/// One row per classified outage, in fetch order.
pub fn classification_table(classification: &Classification) -> Table {
    let mut table = base_table([
        "Outage ID",
        "Substation",
        "Feeder",
        "Type",
        "Duration",
        "Hours",
        "Bucket",
        "Reason",
    ]);
    for outage in &classification.classified {
        let record = &outage.record;
        let feeder = if record.feeder_category.is_empty() {
            record.feeder_name.clone()
        } else {
            format!("{} ({})", record.feeder_name, record.feeder_category)
        };
        let kind = [&record.outage_type_name, &record.interruption_type]
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" / ");
        table.add_row(vec![
            Cell::new(&record.id),
            Cell::new(&record.ss_name),
            Cell::new(feeder),
            Cell::new(kind),
            Cell::new(&record.duration),
            Cell::new(format!("{:.2}", outage.elapsed_hours)).set_alignment(CellAlignment::Right),
            Cell::new(&outage.rule.label),
            Cell::new(outage.rule.reason_code).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn skipped_table(classification: &Classification) -> Table {
    let mut table = base_table(["Outage ID", "Duration", "Why skipped"]);
    for skipped in &classification.skipped {
        let why = match &skipped.reason {
            SkipReason::Unresolvable(err) => err.to_string(),
            SkipReason::Unmatched { hours } => format!("{hours:.2}h matches no rule"),
        };
        table.add_row(vec![
            Cell::new(&skipped.record.id),
            Cell::new(&skipped.record.duration),
            Cell::new(why),
        ]);
    }
    table
}

pub fn print_classification(classification: &Classification) {
    println!();
    println!("{}", classification_table(classification));
    if !classification.skipped.is_empty() {
        let yellow = Style::new().yellow();
        println!(
            "{}",
            yellow.apply_to(format!("{} outage(s) skipped:", classification.skipped.len()))
        );
        println!("{}", skipped_table(classification));
    }
}

pub fn rules_table(book: &RuleBook) -> Table {
    let mut table = base_table(["Bucket", "Up to (h)", "Reason"]);
    for rule in book.rules() {
        table.add_row(vec![
            Cell::new(&rule.label),
            Cell::new(format!("{:.2}", rule.max_hours)).set_alignment(CellAlignment::Right),
            Cell::new(rule.reason_code).set_alignment(CellAlignment::Right),
        ]);
    }
    for band in book.bands() {
        table.add_row(vec![
            Cell::new(&band.label),
            Cell::new(format!("{:.2} ± {:.2}", band.hours, band.tolerance_hours))
                .set_alignment(CellAlignment::Right),
            Cell::new(band.reason_code).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn print_rules(book: &RuleBook) {
    println!("{}", rules_table(book));
    println!("Policy past the last bucket: {}", book.policy());
}

pub fn print_summary(summary: &RunSummary) {
    let bold = Style::new().bold();
    let green = Style::new().green().bold();
    let red = Style::new().red().bold();
    println!();
    if summary.dry_run {
        println!("{}", bold.apply_to("─── Results (dry run) ───"));
    } else {
        println!("{}", bold.apply_to("─── Results ───"));
    }
    println!("  Total:   {}", summary.total);
    println!("  Success: {}", green.apply_to(summary.succeeded));
    println!("  Failed:  {}", red.apply_to(summary.failed));
    println!("  Skipped: {}", summary.skipped);
}

/// Summary counts followed by every outage that failed and why.
pub fn print_report(report: &RunReport) {
    print_summary(&report.summary);
    let red = Style::new().red();
    for outage in &report.outages {
        if let OutageOutcome::Failed(err) = &outage.outcome {
            println!(
                "  {} {} (reason {}): {err}",
                red.apply_to("✗"),
                outage.outage_id,
                outage.reason_code
            );
        }
    }
}

pub fn print_fatal(err: &anyhow::Error) {
    let red = Style::new().red().bold();
    eprintln!("{} {err:#}", red.apply_to("✗ fatal:"));
}

/// Progress bar over the classified outages of a run.
///
/// Shows a spinner until the outage count is known, then a bar with one
/// colored line per finished outage: green for success, red for failure.
/// Nothing is drawn before [`RunProgress::start`].
pub struct RunProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
}

impl RunProgress {
    pub fn new() -> Self {
        Self {
            pb: ProgressBar::new_spinner(),
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    pub fn start(&self, message: &str) {
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            self.pb.set_style(style);
        }
        self.pb.set_message(message.to_string());
        self.pb.enable_steady_tick(Duration::from_millis(100));
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }

    /// Writer for the log subscriber that hides the bar around each line.
    pub fn log_writer(&self) -> LogWriter {
        LogWriter {
            pb: self.pb.clone(),
        }
    }
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Stderr writer that clears the progress bar while a log line is written.
#[derive(Clone)]
pub struct LogWriter {
    pb: ProgressBar,
}

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pb.suspend(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl ProgressReporter for RunProgress {
    fn classified(&self, classification: &Classification) {
        self.pb.suspend(|| print_classification(classification));
        self.pb.set_length(classification.classified.len() as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:30}] {pos}/{len} {msg}")
        {
            self.pb.set_style(style);
        }
    }

    fn outage_started(&self, _index: usize, _total: usize, outage: &ClassifiedOutage) {
        self.pb.set_message(format!(
            "outage {} ({:.2}h → reason {})",
            outage.record.id, outage.elapsed_hours, outage.rule.reason_code
        ));
    }

    fn outage_finished(&self, outage: &ClassifiedOutage, outcome: &OutageOutcome) {
        let line = match outcome {
            OutageOutcome::Submitted { location_id } => format!(
                "  {} {} → loc_id={location_id}",
                self.green.apply_to("✓"),
                outage.record.id
            ),
            OutageOutcome::DryRun { location_id } => format!(
                "  {} {} → loc_id={location_id} (dry run)",
                self.green.apply_to("✓"),
                outage.record.id
            ),
            OutageOutcome::Failed(err) => format!("  {} {err}", self.red.apply_to("✗")),
        };
        self.pb.println(line);
        self.pb.inc(1);
        if !outcome.is_success() {
            self.pb.set_message(format!("last failure: {}", outage.record.id));
        }
    }
}
