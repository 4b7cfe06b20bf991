use crate::cli::Cli;
use crate::config::{Scope, Settings, default_config_path};
use crate::constants::{STARTUP_RECHECK_MS, WATCH_POLL_MS};
use crate::display::{DisplaySink, Indicator, TerminalSink};
use crate::git::{GitCli, StatusQuery, summarize_root, summarize_roots};
use crate::repos::{RepositorySource, TrackedRepo, Workspace};
use crate::scheduler::{Scheduler, Trigger};
use crate::summary::ChangeSummary;
use crate::ui::KeyReader;
use crate::watcher::{FolderWatcher, WatchSet};
use crate::{debug, info, status, warning};
use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// everything the refresh loop reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Trigger(Trigger),
    SelectNext,
    ShowTooltip,
    Quit,
}

/// counts for whatever the settings say should be counted
pub fn summarize(
    settings: &Settings,
    repos: &dyn RepositorySource,
    query: &dyn StatusQuery,
) -> ChangeSummary {
    if !settings.enabled {
        return ChangeSummary::default();
    }
    match settings.scope {
        Scope::All => {
            let tracked = repos.list_repositories();
            summarize_roots(query, tracked.iter().map(|repo| repos.root_path(repo)))
        }
        Scope::Selected => repos
            .selected()
            .map(|repo| summarize_root(query, repos.root_path(&repo)))
            .unwrap_or_default(),
    }
}

/// keys worth advertising, switching repository only matters when one is counted
fn key_help(settings: &Settings) -> &'static str {
    match settings.scope {
        Scope::Selected => "[r]efresh [n]ext repository [i]nfo [q]uit",
        Scope::All => "[r]efresh [i]nfo [q]uit",
    }
}

fn load_settings(cli: &Cli, path: Option<&PathBuf>) -> Result<Settings> {
    let mut settings = match path {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    cli.apply(&mut settings);
    Ok(settings)
}

/// print the counts once, as a label and tooltip or as json
pub fn run_once(cli: &Cli) -> Result<()> {
    let config_path = cli.config.clone().or_else(default_config_path);
    let settings = load_settings(cli, config_path.as_ref())?;
    let workspace = Workspace::open(&cli.folders())?;
    let query = GitCli::new(settings.query_timeout());

    let summary = summarize(&settings, &workspace, &query);
    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("failed to encode summary")?;
        info!(json);
        return Ok(());
    }

    let indicator = Indicator::render(&summary, &settings);
    if indicator.visible {
        info!(indicator.label);
        info!(indicator.tooltip);
    }
    Ok(())
}

/// the live indicator: owns the sink, the background threads and the current summary
///
/// fields drop in order, so the key reader restores the terminal before the
/// sink writes its final newline
pub struct App {
    keys: Option<KeyReader>,
    watcher: Option<FolderWatcher>,
    sink: Box<dyn DisplaySink>,
    query: Box<dyn StatusQuery>,
    workspace: Workspace,
    scheduler: Scheduler,
    settings: Settings,
    cli: Cli,
    config_path: Option<PathBuf>,
    current: ChangeSummary,
    tx: Sender<Message>,
    rx: Receiver<Message>,
}

impl App {
    pub fn activate(cli: Cli) -> Result<Self> {
        let config_path = cli.config.clone().or_else(default_config_path);
        let settings = load_settings(&cli, config_path.as_ref())?;
        let mut workspace = Workspace::open(&cli.folders())?;
        let (tx, rx) = mpsc::channel();

        let selection_tx = tx.clone();
        workspace.on_change(Box::new(move |repo: Option<&TrackedRepo>| {
            if let Some(repo) = repo {
                status!("selected {}", repo.name);
            }
            let _ = selection_tx.send(Message::Trigger(Trigger::SelectionChanged));
        }));

        let now = Instant::now();
        let mut scheduler = Scheduler::new(settings.periodic(), settings.debounce(), now);
        scheduler.schedule_recheck(now + Duration::from_millis(STARTUP_RECHECK_MS));

        let interactive = std::io::stdin().is_terminal() && std::io::stdout().is_terminal();
        let keys = if interactive {
            Some(KeyReader::start(tx.clone())?)
        } else {
            None
        };

        let mut app = Self {
            keys,
            watcher: None,
            sink: Box::new(TerminalSink::new(settings.position)),
            query: Box::new(GitCli::new(settings.query_timeout())),
            workspace,
            scheduler,
            settings,
            cli,
            config_path,
            current: ChangeSummary::default(),
            tx,
            rx,
        };
        app.start_watcher()?;

        if app.keys.is_some() {
            status!(key_help(&app.settings));
        }
        for repo in app.workspace.list_repositories() {
            debug!("tracking {}", app.workspace.root_path(&repo).display());
        }
        Ok(app)
    }

    fn start_watcher(&mut self) -> Result<()> {
        // stop the old thread before starting a new one
        self.watcher = None;
        let watch = WatchSet {
            roots: self.workspace.folders(),
            exclude: self.settings.watch_exclude.clone(),
            config: self.config_path.clone(),
        };
        let watcher = FolderWatcher::start(
            watch,
            Duration::from_millis(WATCH_POLL_MS),
            self.tx.clone(),
        )
        .context("failed to start file watcher")?;
        self.watcher = Some(watcher);
        Ok(())
    }

    /// run until quit is requested
    pub fn run(&mut self) -> Result<()> {
        self.refresh();

        loop {
            let wait = self.scheduler.wait_time(Instant::now());
            match self.rx.recv_timeout(wait) {
                Ok(message) => {
                    if !self.handle(message)? {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if self.scheduler.is_due(Instant::now()) {
                self.refresh();
            }
        }

        Ok(())
    }

    /// react to one message, false when the loop should stop
    fn handle(&mut self, message: Message) -> Result<bool> {
        match message {
            Message::Trigger(trigger) => {
                match trigger {
                    Trigger::RepositoriesChanged => {
                        if self.workspace.rescan() {
                            debug!("repositories changed");
                        }
                    }
                    Trigger::ConfigChanged => self.reload_settings()?,
                    _ => {}
                }
                if self.scheduler.trigger(trigger, Instant::now()) {
                    debug!("refresh: {:?}", trigger);
                    self.refresh();
                }
            }
            Message::SelectNext => {
                if !self.workspace.select_next() {
                    debug!("no other repository to select");
                }
            }
            Message::ShowTooltip => self.sink.show_tooltip(),
            Message::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn refresh(&mut self) {
        let summary = summarize(&self.settings, &self.workspace, self.query.as_ref());
        self.current = summary;
        self.sink
            .publish(&Indicator::render(&self.current, &self.settings));
        self.scheduler.mark_refreshed(Instant::now());
    }

    fn reload_settings(&mut self) -> Result<()> {
        let settings = match load_settings(&self.cli, self.config_path.as_ref()) {
            Ok(settings) => settings,
            Err(e) => {
                warning!("{:#}, keeping previous settings", e);
                return Ok(());
            }
        };
        if settings == self.settings {
            return Ok(());
        }

        self.scheduler
            .reconfigure(settings.periodic(), settings.debounce(), Instant::now());
        self.query = Box::new(GitCli::new(settings.query_timeout()));
        self.sink = Box::new(TerminalSink::new(settings.position));
        let restart_watcher = settings.watch_exclude != self.settings.watch_exclude;
        self.settings = settings;
        if restart_watcher {
            self.start_watcher()?;
        }
        status!("settings reloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::repos::ChangeListener;
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::path::Path;

    /// canned porcelain output per root, roots without output fail
    struct FakeQuery {
        outputs: HashMap<PathBuf, String>,
        calls: Cell<usize>,
    }

    impl FakeQuery {
        fn new(outputs: &[(&TrackedRepo, &str)], repos: &FakeRepos) -> Self {
            Self {
                outputs: outputs
                    .iter()
                    .map(|(repo, out)| (repos.root_path(repo).to_path_buf(), (*out).to_string()))
                    .collect(),
                calls: Cell::new(0),
            }
        }
    }

    impl StatusQuery for FakeQuery {
        fn query_status(&self, dir: &Path) -> Result<String, QueryError> {
            self.calls.set(self.calls.get() + 1);
            self.outputs
                .get(dir)
                .cloned()
                .ok_or_else(|| QueryError::failed(dir, "timed out after 2000ms"))
        }
    }

    struct FakeRepos {
        repos: Vec<TrackedRepo>,
        selected: Option<usize>,
    }

    impl RepositorySource for FakeRepos {
        fn list_repositories(&self) -> Vec<TrackedRepo> {
            self.repos.clone()
        }

        fn selected(&self) -> Option<TrackedRepo> {
            self.selected.map(|i| self.repos[i].clone())
        }

        fn on_change(&mut self, _listener: ChangeListener) {}

        fn root_path<'a>(&self, repo: &'a TrackedRepo) -> &'a Path {
            Path::new(repo.name.as_str())
        }
    }

    fn fake_repos(names: &[&str], selected: Option<usize>) -> FakeRepos {
        FakeRepos {
            repos: names.iter().map(|n| TrackedRepo::named(n)).collect(),
            selected,
        }
    }

    #[test]
    fn test_all_roots_are_summed() {
        let repos = fake_repos(&["one", "two"], Some(0));
        let query = FakeQuery::new(
            &[(&repos.repos[0], "M  a\n"), (&repos.repos[1], "A  b\nA  c\n")],
            &repos,
        );
        let summary = summarize(&Settings::default(), &repos, &query);
        assert_eq!(summary, ChangeSummary::new(1, 2, 0, 0, 0));
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn test_failing_root_contributes_zero() {
        let repos = fake_repos(&["ok", "broken", "also-ok"], Some(0));
        let query = FakeQuery::new(
            &[(&repos.repos[0], "?? x\n"), (&repos.repos[2], "D  y\n")],
            &repos,
        );
        let summary = summarize(&Settings::default(), &repos, &query);
        assert_eq!(summary, ChangeSummary::new(0, 0, 1, 0, 1));
        assert_eq!(query.calls.get(), 3);
    }

    #[test]
    fn test_selected_scope() {
        let repos = fake_repos(&["one", "two"], Some(1));
        let query = FakeQuery::new(
            &[(&repos.repos[0], "M  a\n"), (&repos.repos[1], "R  b -> c\n")],
            &repos,
        );
        let settings = Settings {
            scope: Scope::Selected,
            ..Settings::default()
        };
        assert_eq!(
            summarize(&settings, &repos, &query),
            ChangeSummary::new(0, 0, 0, 1, 0)
        );
    }

    #[test]
    fn test_selected_scope_without_selection() {
        let repos = fake_repos(&["one"], None);
        let query = FakeQuery::new(&[(&repos.repos[0], "M  a\n")], &repos);
        let settings = Settings {
            scope: Scope::Selected,
            ..Settings::default()
        };
        assert!(summarize(&settings, &repos, &query).is_empty());
        assert_eq!(query.calls.get(), 0);
    }

    #[test]
    fn test_next_repository_only_advertised_for_selected_scope() {
        assert!(!key_help(&Settings::default()).contains("[n]ext"));
        let settings = Settings {
            scope: Scope::Selected,
            ..Settings::default()
        };
        assert!(key_help(&settings).contains("[n]ext"));
    }

    #[test]
    fn test_disabled_skips_query() {
        let repos = fake_repos(&["one"], Some(0));
        let query = FakeQuery::new(&[(&repos.repos[0], "M  a\n")], &repos);
        let settings = Settings {
            enabled: false,
            ..Settings::default()
        };
        assert!(summarize(&settings, &repos, &query).is_empty());
        assert_eq!(query.calls.get(), 0);
    }
}
