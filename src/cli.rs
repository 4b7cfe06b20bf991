use crate::config::{Position, Scope, Settings};
use clap::Parser;
use std::path::PathBuf;

/// git-change-count: show a live count of uncommitted git changes
#[derive(Parser, Debug)]
#[command(name = "git-change-count", about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// folders to track (default: current directory)
    pub folders: Vec<PathBuf>,

    /// settings file (default: <config dir>/git-change-count/config.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// debounce for file changes in ms
    #[arg(long, value_name = "MS")]
    pub interval: Option<u64>,

    /// git status timeout in ms
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// only count the selected repository
    #[arg(long)]
    pub selected: bool,

    /// only show the total
    #[arg(long)]
    pub no_details: bool,

    /// hide the indicator when there are no changes
    #[arg(long)]
    pub hide_zero: bool,

    /// right-align the indicator
    #[arg(long)]
    pub right: bool,

    /// print the counts once and exit
    #[arg(long)]
    pub once: bool,

    /// with --once, print json instead of the label
    #[arg(long, requires = "once")]
    pub json: bool,

    /// print debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// tracked folders, the current directory when none were given
    pub fn folders(&self) -> Vec<PathBuf> {
        if self.folders.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.folders.clone()
        }
    }

    /// command line flags take precedence over the settings file
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(interval) = self.interval {
            settings.update_interval = interval;
        }
        if let Some(timeout) = self.timeout {
            settings.query_timeout = timeout;
        }
        if self.selected {
            settings.scope = Scope::Selected;
        }
        if self.no_details {
            settings.show_details = false;
        }
        if self.hide_zero {
            settings.show_when_zero = false;
        }
        if self.right {
            settings.position = Position::Right;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::parse_from([
            "git-change-count",
            "--interval",
            "250",
            "--selected",
            "--hide-zero",
            "--right",
            "a",
            "b",
        ]);
        let mut settings = Settings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.update_interval, 250);
        assert_eq!(settings.scope, Scope::Selected);
        assert!(!settings.show_when_zero);
        assert!(settings.show_details);
        assert_eq!(settings.position, Position::Right);
        assert_eq!(cli.folders(), vec![PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn test_default_folder() {
        let cli = Cli::parse_from(["git-change-count"]);
        assert_eq!(cli.folders(), vec![PathBuf::from(".")]);
    }

    #[test]
    fn test_json_requires_once() {
        assert!(Cli::try_parse_from(["git-change-count", "--json"]).is_err());
        assert!(Cli::try_parse_from(["git-change-count", "--once", "--json"]).is_ok());
    }
}
