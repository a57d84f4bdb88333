use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use webinstall_common::{InstallStep, Level, Message};

use crate::sequencer::{ProgressSink, SequenceReport};
use crate::ui::icons::{CHECK, CROSS, RETRY, SPARKLE, WARN};
use crate::util::strip_tags;

/// Terminal UI for a sequencer run: one step bar with the current label and
/// the messages of every response printed above it.
pub struct InstallerUI {
    bar: ProgressBar,
}

impl InstallerUI {
    pub fn new(total_steps: u64) -> Self {
        let bar_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} {spinner} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let bar = ProgressBar::new(total_steps);
        bar.set_style(bar_style);
        bar.set_prefix("Install");
        Self { bar }
    }

    /// Print above the bar without tearing it.
    fn print_line(&self, msg: impl AsRef<str>) {
        self.bar.suspend(|| eprintln!("{}", msg.as_ref()));
    }

    /// Stop the bar and print the run summary.
    pub fn finish(&self, report: &SequenceReport) {
        self.bar.set_position(report.completed as u64);
        let elapsed = report.duration().num_milliseconds() as f64 / 1000.0;
        if report.success() {
            self.bar.finish_with_message(format!(
                "{}{} ({:.1}s)",
                SPARKLE,
                style("Installation complete").green().bold(),
                elapsed
            ));
        } else {
            let step = report.halted_at.map(|s| s.label()).unwrap_or("installation");
            self.bar.abandon_with_message(format!(
                "{}{} {}",
                CROSS,
                style("Stopped at").red().bold(),
                step
            ));
            self.print_line(format!(
                "{}Fix the problem above and run the installer again to resume from this step.",
                RETRY
            ));
        }
    }
}

impl ProgressSink for InstallerUI {
    fn step_started(&self, step: InstallStep, done: usize, _total: usize) {
        self.bar.set_position(done as u64);
        self.bar.set_message(step.label().to_string());
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn step_finished(&self, _step: InstallStep, success: bool, messages: &[Message]) {
        for message in messages {
            self.print_line(format_message(message));
        }
        if success {
            self.bar.inc(1);
        }
    }
}

/// One terminal line per message, markup reduced to plain text.
pub fn format_message(message: &Message) -> String {
    let text = strip_tags(&message.text);
    let text = text.trim();
    match message.level {
        Level::Success => format!("{}{}", CHECK, style(text).green()),
        Level::Warning => format!("{}{}", WARN, style(text).yellow()),
        Level::Danger => format!("{}{}", CROSS, style(text).red()),
    }
}
