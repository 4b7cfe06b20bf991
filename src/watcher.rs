use crate::app::Message;
use crate::git;
use crate::scheduler::Trigger;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};
use walkdir::{DirEntry, WalkDir};

/// files inside .git whose changes affect `git status`
const GIT_STATE_FILES: [&str; 2] = ["index", "HEAD"];

/// snapshot of everything the watcher compares between polls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    files: u64,
    repositories: Vec<bool>,
    config: Option<SystemTime>,
}

/// what changed between two snapshots
pub fn changes(before: &Snapshot, after: &Snapshot) -> Vec<Trigger> {
    let mut triggers = Vec::new();
    if before.repositories != after.repositories {
        triggers.push(Trigger::RepositoriesChanged);
    } else if before.files != after.files {
        triggers.push(Trigger::FileChanged);
    }
    if before.config != after.config {
        triggers.push(Trigger::ConfigChanged);
    }
    triggers
}

/// what to look at on each poll
#[derive(Debug, Clone)]
pub struct WatchSet {
    pub roots: Vec<PathBuf>,
    pub exclude: Vec<String>,
    pub config: Option<PathBuf>,
}

impl WatchSet {
    pub fn snapshot(&self) -> Snapshot {
        let mut hasher = DefaultHasher::new();
        for root in &self.roots {
            self.hash_tree(root, &mut hasher);
        }
        Snapshot {
            files: hasher.finish(),
            repositories: self.roots.iter().map(|r| git::is_repository(r)).collect(),
            config: self.config.as_deref().and_then(modified_time),
        }
    }

    fn hash_tree(&self, root: &Path, hasher: &mut DefaultHasher) {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry));
        for entry in walker.flatten() {
            hash_entry(entry.path(), hasher);
        }

        // .git itself is skipped, but its index and HEAD change on stage, commit and checkout
        if let Some(git_dir) = git::git_dir(root) {
            for name in GIT_STATE_FILES {
                hash_entry(&git_dir.join(name), hasher);
            }
        }
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        name == ".git" || self.exclude.iter().any(|e| *e == name)
    }
}

fn hash_entry(path: &Path, hasher: &mut DefaultHasher) {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return;
    };
    path.hash(hasher);
    metadata.len().hash(hasher);
    if let Ok(modified) = metadata.modified() {
        modified.hash(hasher);
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// polls the watch set on a background thread and posts triggers on change
///
/// the thread runs until the watcher is dropped
pub struct FolderWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FolderWatcher {
    pub fn start(watch: WatchSet, interval: Duration, tx: Sender<Message>) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        // baseline taken before returning so changes made right after start are seen
        let mut previous = watch.snapshot();
        let handle = thread::Builder::new()
            .name("watcher".to_string())
            .spawn(move || {
                while !thread_stop.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    if thread_stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let current = watch.snapshot();
                    for trigger in changes(&previous, &current) {
                        if tx.send(Message::Trigger(trigger)).is_err() {
                            return;
                        }
                    }
                    previous = current;
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for FolderWatcher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn watch(root: &Path) -> WatchSet {
        WatchSet {
            roots: vec![root.to_path_buf()],
            exclude: vec!["target".to_string()],
            config: None,
        }
    }

    #[test]
    fn test_new_file_changes_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let set = watch(temp_dir.path());
        let before = set.snapshot();
        assert_eq!(before, set.snapshot());

        fs::write(temp_dir.path().join("new.txt"), "hello").unwrap();
        let after = set.snapshot();
        assert_eq!(changes(&before, &after), vec![Trigger::FileChanged]);
    }

    #[test]
    fn test_excluded_directories_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("target")).unwrap();
        let set = watch(temp_dir.path());
        let before = set.snapshot();

        fs::write(temp_dir.path().join("target").join("build.o"), "obj").unwrap();
        assert!(changes(&before, &set.snapshot()).is_empty());
    }

    #[test]
    fn test_repository_appearing() {
        let temp_dir = TempDir::new().unwrap();
        let set = watch(temp_dir.path());
        let before = set.snapshot();

        git2::Repository::init(temp_dir.path()).unwrap();
        let after = set.snapshot();
        if before.repositories == vec![true] {
            // temp dir already lives inside a repository on this machine
            return;
        }
        assert_eq!(changes(&before, &after), vec![Trigger::RepositoriesChanged]);
    }

    #[test]
    fn test_config_change() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("root");
        fs::create_dir(&root).unwrap();
        let config = temp_dir.path().join("config.json");
        let set = WatchSet {
            roots: vec![root],
            exclude: Vec::new(),
            config: Some(config.clone()),
        };
        let before = set.snapshot();
        fs::write(&config, "{}").unwrap();
        assert_eq!(changes(&before, &set.snapshot()), vec![Trigger::ConfigChanged]);
    }

    #[test]
    fn test_staging_seen_from_repository_subfolder() {
        let temp_dir = TempDir::new().unwrap();
        let repo = git2::Repository::init(temp_dir.path()).unwrap();
        let sub = temp_dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(temp_dir.path().join("outside.txt"), "outside").unwrap();

        let set = watch(&sub);
        let before = set.snapshot();

        // only the index changes, nothing under the watched folder
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("outside.txt")).unwrap();
        index.write().unwrap();

        assert_eq!(changes(&before, &set.snapshot()), vec![Trigger::FileChanged]);
    }

    #[test]
    fn test_watcher_posts_and_stops() {
        let temp_dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let watcher =
            FolderWatcher::start(watch(temp_dir.path()), Duration::from_millis(20), tx).unwrap();

        fs::write(temp_dir.path().join("file.txt"), "content").unwrap();
        let message = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(message, Message::Trigger(Trigger::FileChanged));

        drop(watcher);
        // sender is dropped with the thread
        while rx.recv_timeout(Duration::from_secs(5)).is_ok() {}
        assert!(rx.try_recv().is_err());
    }
}
