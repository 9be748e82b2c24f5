//! Git backend abstraction
//!
//! The executor only needs four git operations. Keeping them behind a trait
//! lets the coordinator run against the system `git` in production and a
//! scripted backend in tests.

use crate::error::{CmcError, CmcResult};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Git operations used by the clone/fetch executor
#[async_trait]
pub trait GitBackend: Send + Sync {
    /// Check if git is usable on this system
    async fn is_available(&self) -> bool;

    /// Shallow clone of the default branch of `url` into `dest`
    async fn clone_shallow(&self, url: &str, dest: &Path) -> CmcResult<()>;

    /// Shallow fetch from origin inside an existing working tree
    async fn fetch_shallow(&self, repo: &Path) -> CmcResult<()>;

    /// Check out `origin/HEAD` (the remote default branch)
    async fn checkout_remote_head(&self, repo: &Path) -> CmcResult<()>;
}

/// Backend that shells out to the system `git`
///
/// Uses whatever authentication is configured for git itself (SSH agent,
/// credential helpers). Prompts are disabled so a missing credential fails
/// the attempt instead of hanging the process.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    fn command() -> Command {
        let mut cmd = Command::new("git");
        cmd.env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if std::env::var_os("GIT_SSH_COMMAND").is_none() {
            cmd.env("GIT_SSH_COMMAND", "ssh -o BatchMode=yes");
        }
        cmd
    }

    /// Arguments for a shallow clone; `dest` is passed through as an OS string
    fn clone_args<'a>(url: &'a str, dest: &'a Path) -> Vec<&'a OsStr> {
        let mut args: Vec<&OsStr> = ["clone", "--depth=1", "--single-branch", "--quiet", url]
            .into_iter()
            .map(OsStr::new)
            .collect();
        args.push(dest.as_os_str());
        args
    }

    /// Run git with `args`, mapping a non-zero exit to `GitCommand`
    async fn exec<S: AsRef<OsStr>>(&self, args: &[S], cwd: Option<&Path>) -> CmcResult<()> {
        let joined = args
            .iter()
            .map(|a| a.as_ref().to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        debug!("Executing: git {}", joined);

        let mut cmd = Self::command();
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let output = cmd
            .args(args)
            .output()
            .await
            .map_err(|e| CmcError::command_failed(format!("git {}", joined), e))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(CmcError::git_command(joined, stderr.trim()))
        }
    }
}

#[async_trait]
impl GitBackend for GitCli {
    async fn is_available(&self) -> bool {
        Command::new("git")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn clone_shallow(&self, url: &str, dest: &Path) -> CmcResult<()> {
        self.exec(&Self::clone_args(url, dest), None).await
    }

    async fn fetch_shallow(&self, repo: &Path) -> CmcResult<()> {
        self.exec(&["fetch", "--depth=1", "--quiet", "origin"], Some(repo))
            .await
    }

    async fn checkout_remote_head(&self, repo: &Path) -> CmcResult<()> {
        self.exec(
            &["checkout", "--force", "--quiet", "--detach", "origin/HEAD"],
            Some(repo),
        )
        .await
    }
}
