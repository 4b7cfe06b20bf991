use crate::git;
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

/// a git working tree being counted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedRepo {
    pub name: String,
    root: PathBuf,
}

impl TrackedRepo {
    fn new(root: PathBuf) -> Self {
        let name = root
            .file_name()
            .map_or_else(|| root.display().to_string(), |n| n.to_string_lossy().to_string());
        Self { name, root }
    }

    #[cfg(test)]
    pub(crate) fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            root: PathBuf::from(name),
        }
    }
}

pub type ChangeListener = Box<dyn FnMut(Option<&TrackedRepo>)>;

/// the only view of repositories the refresh loop needs
pub trait RepositorySource {
    /// repositories currently known, without duplicates
    fn list_repositories(&self) -> Vec<TrackedRepo>;

    /// the active repository, if any folder is one
    fn selected(&self) -> Option<TrackedRepo>;

    /// called with the new selection whenever it changes
    fn on_change(&mut self, listener: ChangeListener);

    fn root_path<'a>(&self, repo: &'a TrackedRepo) -> &'a Path;
}

#[derive(Debug)]
struct Folder {
    path: PathBuf,
    repo: Option<TrackedRepo>,
}

/// the folders given on the command line and the repositories they live in
pub struct Workspace {
    folders: Vec<Folder>,
    selected: Option<PathBuf>,
    listeners: Vec<ChangeListener>,
}

impl Workspace {
    /// track `folders`, each must be an existing directory
    pub fn open(folders: &[PathBuf]) -> Result<Self> {
        if folders.is_empty() {
            bail!("no folders to track");
        }

        let mut tracked: Vec<Folder> = Vec::new();
        for folder in folders {
            let path = fs::canonicalize(folder)
                .with_context(|| format!("cannot open folder {}", folder.display()))?;
            if !path.is_dir() {
                bail!("not a directory: {}", folder.display());
            }
            if tracked.iter().any(|f| f.path == path) {
                continue;
            }
            let repo = git::repository_root(&path).map(TrackedRepo::new);
            tracked.push(Folder { path, repo });
        }

        let mut workspace = Self {
            folders: tracked,
            selected: None,
            listeners: Vec::new(),
        };
        workspace.selected = workspace.list_repositories().first().map(|r| r.root.clone());
        Ok(workspace)
    }

    /// canonical paths of every tracked folder, repository or not
    pub fn folders(&self) -> Vec<PathBuf> {
        self.folders.iter().map(|f| f.path.clone()).collect()
    }

    /// re-check which folders are repositories, true if anything changed
    pub fn rescan(&mut self) -> bool {
        let mut changed = false;
        for folder in &mut self.folders {
            let repo = git::repository_root(&folder.path).map(TrackedRepo::new);
            if repo != folder.repo {
                folder.repo = repo;
                changed = true;
            }
        }

        // keep the selection if it still exists, otherwise fall back to the first repository
        let repos = self.list_repositories();
        let still_there = self
            .selected
            .as_ref()
            .is_some_and(|root| repos.iter().any(|r| &r.root == root));
        if !still_there {
            let next = repos.first().map(|r| r.root.clone());
            if next != self.selected {
                self.selected = next;
                self.notify();
            }
        }
        changed
    }

    /// move the selection to the next repository, wrapping around
    pub fn select_next(&mut self) -> bool {
        let repos = self.list_repositories();
        if repos.len() < 2 {
            return false;
        }
        let current = self
            .selected
            .as_ref()
            .and_then(|root| repos.iter().position(|r| &r.root == root));
        let next = current.map_or(0, |i| (i + 1) % repos.len());
        self.selected = Some(repos[next].root.clone());
        self.notify();
        true
    }

    fn notify(&mut self) {
        let selected = self.selected();
        for listener in &mut self.listeners {
            listener(selected.as_ref());
        }
    }
}

impl RepositorySource for Workspace {
    fn list_repositories(&self) -> Vec<TrackedRepo> {
        let mut repos: Vec<TrackedRepo> = Vec::new();
        for repo in self.folders.iter().filter_map(|f| f.repo.as_ref()) {
            if !repos.iter().any(|r| r.root == repo.root) {
                repos.push(repo.clone());
            }
        }
        repos
    }

    fn selected(&self) -> Option<TrackedRepo> {
        let root = self.selected.as_ref()?;
        self.folders
            .iter()
            .filter_map(|f| f.repo.as_ref())
            .find(|r| &r.root == root)
            .cloned()
    }

    fn on_change(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }

    fn root_path<'a>(&self, repo: &'a TrackedRepo) -> &'a Path {
        &repo.root
    }
}
