use crate::debug;
use crate::error::QueryError;
use crate::summary::ChangeSummary;
use git2::Repository;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// something that can produce porcelain status text for a directory
pub trait StatusQuery {
    fn query_status(&self, dir: &Path) -> Result<String, QueryError>;
}

/// runs `git status --porcelain` through the git binary, bounded by a timeout
pub struct GitCli {
    program: OsString,
    timeout: Duration,
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self::with_program("git", timeout)
    }

    pub fn with_program(program: impl Into<OsString>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl StatusQuery for GitCli {
    fn query_status(&self, dir: &Path) -> Result<String, QueryError> {
        if !is_repository(dir) {
            return Err(QueryError::NotARepository(dir.to_path_buf()));
        }

        // optional locks off so polling never contends with the user's own git commands
        let mut child = Command::new(&self.program)
            .args(["status", "--porcelain"])
            .env("GIT_OPTIONAL_LOCKS", "0")
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| QueryError::failed(dir, format!("failed to spawn git: {e}")))?;

        // drain both pipes while waiting, a chatty git would otherwise block on a full pipe
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(QueryError::failed(dir, "failed to capture git output"));
        };
        let stdout_reader = drain(stdout);
        let stderr_reader = drain(stderr);

        match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => {
                let stdout_data = stdout_reader
                    .join()
                    .map_err(|_| QueryError::failed(dir, "git stdout reader panicked"))?
                    .map_err(|e| QueryError::failed(dir, format!("failed to read git stdout: {e}")))?;

                if !status.success() {
                    let stderr_data = stderr_reader
                        .join()
                        .ok()
                        .and_then(Result::ok)
                        .unwrap_or_default();
                    let stderr_text = String::from_utf8_lossy(&stderr_data);
                    return Err(QueryError::failed(
                        dir,
                        format!("{status}: {}", stderr_text.trim()),
                    ));
                }

                Ok(String::from_utf8_lossy(&stdout_data).into_owned())
            }
            Ok(None) => {
                // readers are left detached, they finish once the pipes close
                if let Err(e) = child.kill() {
                    debug!("failed to kill git process: {}", e);
                }
                let _ = child.wait();
                Err(QueryError::failed(
                    dir,
                    format!("timed out after {}ms", self.timeout.as_millis()),
                ))
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(QueryError::failed(
                    dir,
                    format!("failed to wait for git: {e}"),
                ))
            }
        }
    }
}

/// read a child pipe to the end on its own thread
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut data = Vec::new();
        pipe.read_to_end(&mut data).map(|_| data)
    })
}

/// whether `dir` is inside a git working tree (searching parent directories)
pub fn is_repository(dir: &Path) -> bool {
    Repository::discover(dir).is_ok_and(|repo| !repo.is_bare())
}

/// the repository's own directory, `.git` or a linked worktree's admin dir
pub fn git_dir(dir: &Path) -> Option<PathBuf> {
    let repo = Repository::discover(dir).ok()?;
    Some(repo.path().to_path_buf())
}

/// canonical working tree root of the repository containing `dir`
pub fn repository_root(dir: &Path) -> Option<PathBuf> {
    let repo = Repository::discover(dir).ok()?;
    let workdir = repo.workdir()?;
    Some(fs::canonicalize(workdir).unwrap_or_else(|_| workdir.to_path_buf()))
}

/// summary for a single root, empty if the query fails
pub fn summarize_root(query: &dyn StatusQuery, dir: &Path) -> ChangeSummary {
    match query.query_status(dir) {
        Ok(output) => ChangeSummary::from_porcelain(&output),
        Err(e) => {
            debug!("{}", e);
            ChangeSummary::default()
        }
    }
}

/// summaries of every root added together, failing roots count as zero
pub fn summarize_roots<'a, I>(query: &dyn StatusQuery, dirs: I) -> ChangeSummary
where
    I: IntoIterator<Item = &'a Path>,
{
    dirs.into_iter()
        .map(|dir| summarize_root(query, dir))
        .sum()
}
