//! Clone manager: materialize candidate repositories on disk.
//!
//! Each repository gets one directory keyed by a deterministic name derived
//! from its URL, so re-evaluations reuse the same clone. Failures never abort
//! the batch; the caller records an all-zero row instead.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::process::run_command_with_timeout;

const CLONE_MAX_RETRIES: u32 = 3;
const CLONE_RETRY_DELAY: Duration = Duration::from_secs(2);
const CLONE_TIMEOUT: Duration = Duration::from_secs(120);
const PULL_TIMEOUT: Duration = Duration::from_secs(60);
const GIT_OUTPUT_LIMIT: usize = 16 * 1024;

static URL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // https://host/user/repo or git@host:user/repo.git
    Regex::new(r"(?:/|:)([^/]+)/([^/]+?)(?:\.git)?$").expect("url pattern")
});

/// Derive a stable directory name from a repository URL
/// (e.g. `https://github.com/user/project` becomes `user_project`).
pub fn repo_name_from_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if let Some(captures) = URL_NAME_RE.captures(url) {
        return format!("{}_{}", &captures[1], &captures[2]);
    }
    // Fallback: sanitized last segment plus a short digest so distinct URLs
    // cannot collide.
    let last = url.rsplit('/').next().unwrap_or(url).replace(".git", "");
    let sanitized: String = last
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let digest = Sha256::digest(url.as_bytes());
    let short = &hex::encode(digest)[..8];
    if sanitized.is_empty() {
        format!("repo_{short}")
    } else {
        format!("{sanitized}_{short}")
    }
}

/// Clone `url` into `base/<name>`. If the clone already exists, pull the
/// latest state when `pull_if_exists`. Returns the local path, or `None` on
/// failure.
pub fn clone_repo(url: &str, base: &Path, pull_if_exists: bool) -> Option<PathBuf> {
    if let Err(err) = std::fs::create_dir_all(base) {
        warn!(base = %base.display(), error = %err, "could not create clone dir");
        return None;
    }
    let dest = base.join(repo_name_from_url(url));

    if dest.join(".git").exists() {
        if pull_if_exists
            && let Err(err) = run_git(&["pull", "--quiet"], Some(&dest), PULL_TIMEOUT)
        {
            warn!(dest = %dest.display(), error = %err, "git pull failed, using existing clone");
        }
        return Some(dest);
    }

    let dest_arg = dest.to_string_lossy().into_owned();
    for attempt in 1..=CLONE_MAX_RETRIES {
        match run_git(
            &["clone", "--quiet", url, dest_arg.as_str()],
            None,
            CLONE_TIMEOUT,
        ) {
            Ok(()) => {
                info!(url, dest = %dest.display(), "cloned repository");
                return Some(dest);
            }
            Err(err) => {
                warn!(url, attempt, max = CLONE_MAX_RETRIES, error = %err, "clone attempt failed");
                if dest.exists()
                    && let Err(rm_err) = std::fs::remove_dir_all(&dest)
                {
                    warn!(dest = %dest.display(), error = %rm_err, "could not remove partial clone");
                }
                if attempt < CLONE_MAX_RETRIES {
                    thread::sleep(CLONE_RETRY_DELAY);
                }
            }
        }
    }
    None
}

fn run_git(args: &[&str], cwd: Option<&Path>, timeout: Duration) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let output = run_command_with_timeout(cmd, None, timeout, GIT_OUTPUT_LIMIT)
        .with_context(|| format!("run git {args:?}"))?;
    if output.timed_out {
        bail!("git {args:?} timed out");
    }
    if !output.status.success() {
        bail!("git {args:?} failed: {}", output.stderr_lossy().trim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn https_and_ssh_urls_share_the_naming_scheme() {
        assert_eq!(
            repo_name_from_url("https://github.com/user/project1"),
            "user_project1"
        );
        assert_eq!(
            repo_name_from_url("git@github.com:user/project1.git"),
            "user_project1"
        );
        assert_eq!(
            repo_name_from_url("https://github.com/user/project1/"),
            "user_project1"
        );
    }

    #[test]
    fn unparseable_urls_get_a_digest_suffix() {
        let first = repo_name_from_url("weird");
        let second = repo_name_from_url("weird");
        assert_eq!(first, second);
        assert!(first.starts_with("weird_"));
        assert_ne!(first, repo_name_from_url("weirder"));
    }

    #[test]
    fn existing_clone_is_reused_without_pull() {
        let temp = tempdir().expect("tempdir");
        let dest = temp.path().join("user_project1");
        fs::create_dir_all(dest.join(".git")).expect("fake clone");

        let path = clone_repo("https://github.com/user/project1", temp.path(), false);
        assert_eq!(path, Some(dest));
    }

    #[test]
    fn failed_clone_returns_none() {
        let temp = tempdir().expect("tempdir");
        // File path that is not a git repository; clone fails on every retry.
        let url = format!("file://{}/does-not-exist", temp.path().display());
        let path = clone_repo(&url, temp.path(), true);
        assert_eq!(path, None);
    }
}
