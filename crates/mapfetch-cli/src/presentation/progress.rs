//! Terminal progress rendering for transfers.
//!
//! Uses an indicatif bar on a terminal and throttled single-line updates
//! otherwise (pipes, CI logs).

use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};

/// Longest label shown before truncation.
const MAX_LABEL: usize = 32;

/// Progress display that selects terminal or plain output.
pub struct ProgressPrinter {
    inner: ProgressRender,
}

enum ProgressRender {
    Fancy(FancyProgress),
    Plain(PlainProgress),
}

impl ProgressPrinter {
    /// Create a printer, auto-detecting terminal capability.
    pub fn new() -> Self {
        if io::stdout().is_terminal() {
            Self::fancy()
        } else {
            Self::plain()
        }
    }

    fn fancy() -> Self {
        Self {
            inner: ProgressRender::Fancy(FancyProgress::new()),
        }
    }

    /// Printer that never draws a bar.
    pub fn plain() -> Self {
        Self {
            inner: ProgressRender::Plain(PlainProgress::new()),
        }
    }

    /// Show `downloaded` of `total` bytes for `label`.
    pub fn update(&mut self, label: &str, downloaded: u64, total: u64) {
        match &mut self.inner {
            ProgressRender::Fancy(inner) => inner.update(label, downloaded, total),
            ProgressRender::Plain(inner) => inner.update(label, downloaded, total),
        }
    }

    /// Print a line without tearing the bar.
    pub fn println(&self, line: &str) {
        match &self.inner {
            ProgressRender::Fancy(inner) => inner.bar.println(line),
            ProgressRender::Plain(inner) => inner.println(line),
        }
    }

    /// Finish and clear the display.
    pub fn finish(&mut self) {
        match &mut self.inner {
            ProgressRender::Fancy(inner) => inner.finish(),
            ProgressRender::Plain(inner) => inner.finish(),
        }
    }
}

impl Default for ProgressPrinter {
    fn default() -> Self {
        Self::new()
    }
}

struct FancyProgress {
    bar: ProgressBar,
    saw_length: bool,
    last_label: Option<String>,
}

impl FancyProgress {
    fn new() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        bar.set_style(Self::spinner_style());
        bar.set_message("Waiting");
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            saw_length: false,
            last_label: None,
        }
    }

    fn update(&mut self, label: &str, downloaded: u64, total: u64) {
        if self.last_label.as_deref() != Some(label) {
            self.bar.set_message(format_label(label));
            self.bar.reset();
            self.last_label = Some(label.to_string());
        }

        if total == 0 {
            self.bar.tick();
            return;
        }
        if !self.saw_length {
            self.bar.set_style(Self::bar_style());
            self.saw_length = true;
        }
        if self.bar.length() != Some(total) {
            self.bar.set_length(total);
        }
        self.bar.set_position(downloaded.min(total));
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{msg:<32} {bar:28.cyan/blue} {human_bytes:>9} / {human_total:>9} ({percent:>3}%) ETA {eta}",
        )
        .map_or_else(
            |_| ProgressStyle::default_bar(),
            |style| {
                style
                    .with_key("human_bytes", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                        let _ = write!(w, "{}", HumanBytes(state.pos()));
                    })
                    .with_key("human_total", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                        let value = state
                            .len()
                            .map_or_else(|| "?".to_string(), |len| HumanBytes(len).to_string());
                        let _ = write!(w, "{value}");
                    })
            },
        )
    }
}

struct PlainProgress {
    last_emit: Option<Instant>,
    last_line_len: usize,
    printed: bool,
}

impl PlainProgress {
    const fn new() -> Self {
        Self {
            last_emit: None,
            last_line_len: 0,
            printed: false,
        }
    }

    fn update(&mut self, label: &str, downloaded: u64, total: u64) {
        const MIN_INTERVAL: Duration = Duration::from_millis(250);
        let now = Instant::now();
        if downloaded < total
            && self
                .last_emit
                .is_some_and(|last| now.duration_since(last) < MIN_INTERVAL)
        {
            return;
        }
        self.last_emit = Some(now);

        let line = format_plain_line(label, downloaded, total);
        let pad = self.last_line_len.saturating_sub(line.len());
        print!("\r{line}{}", " ".repeat(pad));
        io::stdout().flush().ok();

        self.last_line_len = line.len();
        self.printed = true;
    }

    fn println(&self, line: &str) {
        if self.printed {
            println!();
        }
        println!("{line}");
    }

    fn finish(&mut self) {
        if self.printed {
            println!();
            self.printed = false;
            self.last_line_len = 0;
        }
    }
}

fn format_label(raw: &str) -> String {
    if raw.chars().count() <= MAX_LABEL {
        return raw.to_string();
    }
    let mut buf: String = raw.chars().take(MAX_LABEL - 1).collect();
    buf.push('…');
    buf
}

/// One line of non-terminal progress.
pub fn format_plain_line(label: &str, downloaded: u64, total: u64) -> String {
    let label = format_label(label);
    if total == 0 {
        return format!("{label}: {} downloaded", HumanBytes(downloaded));
    }
    format!(
        "{label}: {} / {} ({}%)",
        HumanBytes(downloaded),
        HumanBytes(total),
        percent(downloaded, total)
    )
}

/// Whole percent of `current` in `total`, clamped to 100.
pub const fn percent(current: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let pct = (current as u128 * 100 / total as u128) as u64;
    if pct > 100 { 100 } else { pct }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(400, 1000), 40);
        assert_eq!(percent(999, 1000), 99);
        assert_eq!(percent(1500, 1000), 100);
        assert_eq!(percent(u64::MAX, u64::MAX), 100);
    }

    #[test]
    fn test_plain_line() {
        assert_eq!(format_plain_line("FR", 512, 1024), "FR: 512 B / 1.00 KiB (50%)");
        assert_eq!(format_plain_line("FR", 512, 0), "FR: 512 B downloaded");
    }

    #[test]
    fn test_long_labels_are_truncated() {
        let label = "x".repeat(40);
        let shown = format_label(&label);
        assert_eq!(shown.chars().count(), MAX_LABEL);
        assert!(shown.ends_with('…'));
        assert_eq!(format_label("Berlin"), "Berlin");
    }
}
