//! Remote reference parsing
//!
//! A remote reference names a versioned artifact inside a git repository:
//! `github:<owner>/<repo>[/<path>]@<version>`.

use crate::error::{CmcError, CmcResult};
use std::fmt;

const USAGE_EXAMPLE: &str = "github:owner/repo/path@version";

/// Git hosts a reference may point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Host {
    /// github.com
    Github,
}

impl Host {
    /// The scheme prefix used in reference strings
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Github => "github",
        }
    }

    /// Network domain used to build clone URLs
    pub fn domain(&self) -> &'static str {
        match self {
            Self::Github => "github.com",
        }
    }

    fn all() -> &'static [Self] {
        &[Self::Github]
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::all().iter().copied().find(|h| h.prefix() == prefix)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// A parsed `host:owner/repo[/path]@version` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteReference {
    pub host: Host,
    pub owner: String,
    pub repo: String,
    /// Path inside the repository; empty when omitted
    pub path: String,
    pub version: String,
}

impl RemoteReference {
    /// Parse a reference string
    pub fn parse(input: &str) -> CmcResult<Self> {
        let fail = |reason: &str| CmcError::ReferenceFormat {
            input: input.to_string(),
            reason: reason.to_string(),
            example: USAGE_EXAMPLE,
        };

        if input.is_empty() {
            return Err(fail("reference is empty"));
        }

        let (prefix, rest) = input
            .split_once(':')
            .ok_or_else(|| fail("missing host prefix"))?;
        let host = Host::from_prefix(prefix)
            .ok_or_else(|| fail(&format!("unsupported host '{}'", prefix)))?;

        // Branch names may contain '/', so the version is everything after the first '@'
        let (location, version) = rest
            .split_once('@')
            .ok_or_else(|| fail("missing @version"))?;
        if version.is_empty() {
            return Err(fail("missing @version"));
        }

        let mut segments = location.splitn(3, '/');
        let owner = segments.next().unwrap_or_default();
        if owner.is_empty() {
            return Err(fail("missing owner"));
        }
        let repo = segments.next().unwrap_or_default();
        if repo.is_empty() {
            return Err(fail("missing repository"));
        }
        let path = segments.next().unwrap_or_default();

        Ok(Self {
            host,
            owner: owner.to_string(),
            repo: repo.to_string(),
            path: path.to_string(),
            version: version.to_string(),
        })
    }

    /// `owner/repo` for messages
    pub fn repo_slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RemoteReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.owner, self.repo)?;
        if !self.path.is_empty() {
            write!(f, "/{}", self.path)?;
        }
        write!(f, "@{}", self.version)
    }
}

/// Whether a string looks like a remote reference rather than a local path
pub fn is_remote_reference(value: &str) -> bool {
    Host::all()
        .iter()
        .any(|h| value.strip_prefix(h.prefix()).is_some_and(|r| r.starts_with(':')))
}
