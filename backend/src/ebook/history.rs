use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use chrono::DateTime;
use thiserror::Error;

use crate::ebook::model::CommitRecord;
use crate::logger::warn;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to run git: {0}")]
    Io(#[from] std::io::Error),

    #[error("git exited with {0}")]
    ExitStatus(String),

    #[error("git timed out after {0:?}")]
    Timeout(Duration),
}

/// Source of a title's recent commits, most recent first.
pub trait HistoryReader: Send + Sync {
    fn recent_commits(&self, repo_path: &Path, count: usize) -> Result<Vec<CommitRecord>, HistoryError>;
}

/// Reads history by running `git log` against the repository.
#[derive(Debug, Clone)]
pub struct GitHistoryReader {
    git_bin: String,
    timeout: Duration,
}

impl GitHistoryReader {
    pub fn new(timeout: Duration) -> Self {
        GitHistoryReader {
            git_bin: "git".to_string(),
            timeout,
        }
    }

    pub fn with_git_bin(mut self, git_bin: &str) -> Self {
        self.git_bin = git_bin.to_string();
        self
    }
}

impl HistoryReader for GitHistoryReader {
    fn recent_commits(&self, repo_path: &Path, count: usize) -> Result<Vec<CommitRecord>, HistoryError> {
        let mut child = Command::new(&self.git_bin)
            .arg("-C")
            .arg(repo_path)
            .arg("log")
            .arg(format!("-n{}", count))
            .arg("--pretty=format:%ct %H %s")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        // Drain stdout while waiting, so a full pipe can't stall git until the timeout.
        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                stdout.read_to_end(&mut buf).map(|_| buf)
            })
        });

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(HistoryError::Timeout(self.timeout));
            }
            thread::sleep(Duration::from_millis(20));
        };

        if !status.success() {
            return Err(HistoryError::ExitStatus(status.to_string()));
        }

        let bytes = match reader {
            Some(handle) => handle
                .join()
                .map_err(|_| HistoryError::ExitStatus("stdout reader panicked".to_string()))??,
            None => Vec::new(),
        };
        let output = String::from_utf8_lossy(&bytes);

        Ok(parse_log_output(&output))
    }
}

/// One line of `git log --pretty=format:"%ct %H %s"`.
pub fn parse_log_line(line: &str) -> Option<CommitRecord> {
    let mut parts = line.trim_end_matches('\r').splitn(3, ' ');

    let timestamp = parts.next()?.parse::<i64>().ok()?;
    let hash = parts.next()?;
    if hash.len() < 7 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let message = parts.next().unwrap_or("");

    Some(CommitRecord {
        created: DateTime::from_timestamp(timestamp, 0)?,
        hash: hash.to_string(),
        message: message.to_string(),
    })
}

pub fn parse_log_output(output: &str) -> Vec<CommitRecord> {
    output.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let commit = parse_log_line(line);
            if commit.is_none() {
                warn(&format!("Skipping malformed git log line: {}", line));
            }
            commit
        })
        .collect()
}

/// Recent commits, or an empty history if the reader fails for any reason.
pub fn load_history(reader: &dyn HistoryReader, repo_path: &Path, count: usize) -> Vec<CommitRecord> {
    match reader.recent_commits(repo_path, count) {
        Ok(mut commits) => {
            commits.truncate(count);
            commits
        }
        Err(e) => {
            warn(&format!("No history for {}: {}", repo_path.display(), e));
            Vec::new()
        }
    }
}
