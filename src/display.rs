use crate::config::{Position, Settings};
use crate::constants::LABEL_ICON;
use crate::summary::ChangeSummary;
use crate::ui;
use num_format::{Locale, ToFormattedString};
use std::io::{self, IsTerminal, Write};

/// what the status indicator should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub label: String,
    pub tooltip: String,
    pub badge: usize,
    pub visible: bool,
}

impl Indicator {
    pub fn render(summary: &ChangeSummary, settings: &Settings) -> Self {
        let total = summary.total();

        if summary.is_empty() {
            return Self {
                label: format!("{LABEL_ICON} 0"),
                tooltip: "git changed files: 0".to_string(),
                badge: 0,
                visible: settings.show_when_zero,
            };
        }

        if !settings.show_details {
            return Self {
                label: format!("{LABEL_ICON} {total}"),
                tooltip: format!("git changed files: {}", total.to_formatted_string(&Locale::en)),
                badge: total,
                visible: true,
            };
        }

        let mut parts = Vec::new();
        let mut tooltip_parts = Vec::new();
        for (abbreviation, name, count) in summary.categories() {
            if count > 0 {
                parts.push(format!("{abbreviation}:{count}"));
                tooltip_parts.push(format!(
                    "{name}: {}",
                    count.to_formatted_string(&Locale::en)
                ));
            }
        }

        let file_word = if total == 1 { "file" } else { "files" };
        Self {
            label: format!("{LABEL_ICON} {}", parts.join(" ")),
            tooltip: format!(
                "git changes:\n{}\n\ntotal: {} {file_word}",
                tooltip_parts.join("\n"),
                total.to_formatted_string(&Locale::en)
            ),
            badge: total,
            visible: true,
        }
    }
}

/// somewhere to publish the indicator
pub trait DisplaySink {
    fn publish(&mut self, indicator: &Indicator);

    /// show the tooltip of the last published indicator
    fn show_tooltip(&mut self);
}

/// redraws a single status line on stdout
///
/// when stdout is not a terminal each changed label is printed on its own line instead
pub struct TerminalSink {
    position: Position,
    redraw: bool,
    last: Option<Indicator>,
}

impl TerminalSink {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            redraw: io::stdout().is_terminal(),
            last: None,
        }
    }

    fn aligned(&self, label: &str) -> String {
        match self.position {
            Position::Left => label.to_string(),
            Position::Right => {
                let width = crossterm::terminal::size().map_or(80, |(cols, _)| usize::from(cols));
                let len = label.chars().count();
                // leave the last column free so the cursor doesn't wrap
                let pad = width.saturating_sub(len + 1);
                format!("{}{label}", " ".repeat(pad))
            }
        }
    }
}

impl DisplaySink for TerminalSink {
    fn publish(&mut self, indicator: &Indicator) {
        use colored::Colorize;

        if !self.redraw {
            if indicator.visible && self.last.as_ref() != Some(indicator) {
                crate::info!(indicator.label);
            }
            self.last = Some(indicator.clone());
            return;
        }

        let mut stdout = io::stdout();
        let _ = write!(stdout, "\r\x1b[2K");
        if indicator.visible {
            let text = self.aligned(&indicator.label);
            let styled = if indicator.badge == 0 {
                text.dimmed()
            } else {
                text.yellow()
            };
            let _ = write!(stdout, "{styled}");
        }
        let _ = stdout.flush();
        ui::set_status_line(indicator.visible);
        self.last = Some(indicator.clone());
    }

    fn show_tooltip(&mut self) {
        let Some(last) = self.last.clone() else {
            return;
        };
        for line in last.tooltip.lines() {
            crate::info!(line);
        }
        self.publish(&last);
    }
}

impl Drop for TerminalSink {
    fn drop(&mut self) {
        // leave the final status on its own line
        if self.redraw && self.last.as_ref().is_some_and(|i| i.visible) {
            let _ = write!(io::stdout(), "{}", ui::line_end());
            let _ = io::stdout().flush();
            ui::set_status_line(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detailed_label() {
        let summary = ChangeSummary::new(2, 1, 0, 0, 3);
        let indicator = Indicator::render(&summary, &Settings::default());
        assert_eq!(indicator.label, format!("{LABEL_ICON} M:2 A:1 U:3"));
        assert_eq!(
            indicator.tooltip,
            "git changes:\nmodified: 2\nadded: 1\nuntracked: 3\n\ntotal: 6 files"
        );
        assert_eq!(indicator.badge, 6);
        assert!(indicator.visible);
    }

    #[test]
    fn test_label_category_order() {
        let summary = ChangeSummary::new(1, 1, 1, 1, 1);
        let indicator = Indicator::render(&summary, &Settings::default());
        assert_eq!(indicator.label, format!("{LABEL_ICON} M:1 A:1 D:1 R:1 U:1"));
    }

    #[test]
    fn test_single_file_tooltip() {
        let summary = ChangeSummary::new(0, 0, 0, 1, 0);
        let indicator = Indicator::render(&summary, &Settings::default());
        assert!(indicator.tooltip.ends_with("total: 1 file"));
        assert!(indicator.tooltip.contains("renamed: 1"));
    }

    #[test]
    fn test_concise_label() {
        let settings = Settings {
            show_details: false,
            ..Settings::default()
        };
        let summary = ChangeSummary::new(1200, 34, 0, 0, 0);
        let indicator = Indicator::render(&summary, &settings);
        assert_eq!(indicator.label, format!("{LABEL_ICON} 1234"));
        assert_eq!(indicator.tooltip, "git changed files: 1,234");
        assert_eq!(indicator.badge, 1234);
    }

    #[test]
    fn test_zero_state() {
        let indicator = Indicator::render(&ChangeSummary::default(), &Settings::default());
        assert_eq!(indicator.label, format!("{LABEL_ICON} 0"));
        assert_eq!(indicator.badge, 0);
        assert!(indicator.visible);

        let hidden = Settings {
            show_when_zero: false,
            ..Settings::default()
        };
        let indicator = Indicator::render(&ChangeSummary::default(), &hidden);
        assert!(!indicator.visible);
    }

    #[test]
    fn test_right_alignment_pads() {
        let sink = TerminalSink::new(Position::Right);
        let aligned = sink.aligned("abc");
        assert!(aligned.ends_with("abc"));
        assert!(aligned.len() >= 3);

        let sink = TerminalSink::new(Position::Left);
        assert_eq!(sink.aligned("abc"), "abc");
    }
}
