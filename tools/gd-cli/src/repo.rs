//! Repository reader — shells out to `git log` and yields commit
//! records oldest-first. This is the host side of the engine's
//! commit-record boundary; the engine itself never touches a repo.

use std::path::Path;
use std::process::Command;

use gd_types::{CommitRecord, EngineError};

const FIELD_SEP: char = '\u{1f}';

/// Read the linear history of `path`, oldest first.
pub fn read_commits(path: &Path) -> Result<Vec<CommitRecord>, EngineError> {
    if !path.exists() {
        return Err(EngineError::repository(format!("path not found: {}", path.display())));
    }

    let output = Command::new("git")
        .arg("-C")
        .arg(path)
        .args([
            "log",
            "--reverse",
            "--numstat",
            &format!("--pretty=format:%x02%H{FIELD_SEP}%h{FIELD_SEP}%s{FIELD_SEP}%an{FIELD_SEP}%at{FIELD_SEP}%P"),
        ])
        .output()
        .map_err(|e| EngineError::repository(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EngineError::repository(format!(
            "not a readable repository: {}",
            stderr.trim()
        )));
    }

    parse_log(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the `%x02`-delimited log format produced above.
pub fn parse_log(log: &str) -> Result<Vec<CommitRecord>, EngineError> {
    let mut commits = Vec::new();
    for block in log.split('\u{02}').filter(|b| !b.trim().is_empty()) {
        let mut lines = block.lines();
        let Some(header) = lines.next() else { continue };
        let fields: Vec<&str> = header.split(FIELD_SEP).collect();
        if fields.len() < 6 {
            return Err(EngineError::repository(format!("unparseable log header: {header}")));
        }

        let message = fields[2].to_owned();
        let timestamp: i64 = fields[4].parse().unwrap_or(0);
        let parent_count = fields[5].split_whitespace().count();

        let mut additions = 0u32;
        let mut deletions = 0u32;
        for line in lines {
            let mut cols = line.split_whitespace();
            let (Some(a), Some(d)) = (cols.next(), cols.next()) else { continue };
            // Binary files report "-": counted as zero.
            additions += a.parse::<u32>().unwrap_or(0);
            deletions += d.parse::<u32>().unwrap_or(0);
        }

        commits.push(CommitRecord {
            hash: fields[0].into(),
            short_hash: fields[1].into(),
            is_revert: message.to_lowercase().starts_with("revert"),
            is_merge: parent_count > 1,
            message: message.into(),
            author: fields[3].into(),
            timestamp,
            additions,
            deletions,
        });
    }
    if commits.is_empty() {
        return Err(EngineError::repository("repository has no commits"));
    }
    Ok(commits)
}
