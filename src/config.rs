use anyhow::Result;
use anyhow::bail;

use crate::clients::git::GitOps;

const KEY_REMOTE: &str = "publish.remote";
const KEY_REMOTE_URL: &str = "publish.remoteUrl";
const KEY_BRANCH: &str = "publish.branch";
const KEY_MESSAGE: &str = "publish.message";

pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_MESSAGE: &str = "Initial commit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub remote: String,
    pub remote_url: String,
    pub branch: String,
    pub commit_message: String,
}

/// Values given on the command line. Each one wins over the stored config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub remote: Option<String>,
    pub remote_url: Option<String>,
    pub branch: Option<String>,
    pub commit_message: Option<String>,
}

impl Config {
    /// Load config from `publish.*` git config keys, applying overrides.
    pub async fn load(git: &impl GitOps, overrides: Overrides) -> Result<Self> {
        let remote = match overrides.remote {
            Some(remote) => remote,
            None => git
                .config_get(KEY_REMOTE)
                .await?
                .unwrap_or_else(|| DEFAULT_REMOTE.to_string()),
        };
        let remote_url = match overrides.remote_url {
            Some(url) => url,
            None => match git.config_get(KEY_REMOTE_URL).await? {
                Some(url) => url,
                None => bail!(
                    "No remote URL configured. Pass --remote-url or run 'publish init --remote-url <url>'."
                ),
            },
        };
        let branch = match overrides.branch {
            Some(branch) => branch,
            None => git
                .config_get(KEY_BRANCH)
                .await?
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
        };
        let commit_message = match overrides.commit_message {
            Some(message) => message,
            None => git
                .config_get(KEY_MESSAGE)
                .await?
                .unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
        };

        let config = Self {
            remote,
            remote_url,
            branch,
            commit_message,
        };
        config.validate()?;
        Ok(config)
    }

    /// Save config to .git/config
    pub async fn save(&self, git: &impl GitOps) -> Result<()> {
        git.config_set(KEY_REMOTE, &self.remote).await?;
        git.config_set(KEY_REMOTE_URL, &self.remote_url).await?;
        git.config_set(KEY_BRANCH, &self.branch).await?;
        git.config_set(KEY_MESSAGE, &self.commit_message).await?;
        Ok(())
    }

    /// Create a new config with default remote, branch and message
    pub fn new(remote_url: String) -> Self {
        Self {
            remote: DEFAULT_REMOTE.to_string(),
            remote_url,
            branch: DEFAULT_BRANCH.to_string(),
            commit_message: DEFAULT_MESSAGE.to_string(),
        }
    }

    /// Build a config from overrides alone, for `publish init`.
    pub fn from_overrides(overrides: Overrides) -> Result<Self> {
        let Some(remote_url) = overrides.remote_url else {
            bail!("--remote-url is required");
        };
        let config = Self {
            remote: overrides.remote.unwrap_or_else(|| DEFAULT_REMOTE.to_string()),
            remote_url,
            branch: overrides.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            commit_message: overrides
                .commit_message
                .unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Default config for tests
    pub fn default_for_tests() -> Self {
        Self::new("git@github.com:test/repo.git".to_string())
    }

    /// Browser URL for the remote, when the remote URL has a recognizable
    /// host/path shape.
    ///
    /// Handles `https://host/owner/repo`, `git@host:owner/repo` and
    /// `ssh://git@host/owner/repo`, with or without a trailing `.git`.
    pub fn web_url(&self) -> Option<String> {
        let url = self.remote_url.trim();
        let (host, path) = if let Some(rest) = url.strip_prefix("https://") {
            rest.split_once('/')?
        } else if let Some(rest) = url.strip_prefix("ssh://") {
            let rest = rest.split_once('@').map_or(rest, |(_, rest)| rest);
            rest.split_once('/')?
        } else if let Some((user_host, path)) = url.split_once(':') {
            // scp-like syntax requires a user@ part to tell it from a path
            let (_, host) = user_host.split_once('@')?;
            (host, path)
        } else {
            return None;
        };

        // Drop any port and credentials from the host
        let host = host.rsplit_once('@').map_or(host, |(_, host)| host);
        let host = host.split_once(':').map_or(host, |(host, _)| host);
        let path = path.trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);

        if host.is_empty() || path.is_empty() {
            return None;
        }
        Some(format!("https://{}/{}", host, path))
    }

    fn validate(&self) -> Result<()> {
        if self.remote.trim().is_empty() {
            bail!("Remote name must not be empty");
        }
        if self.remote_url.trim().is_empty() {
            bail!("Remote URL must not be empty");
        }
        if self.branch.trim().is_empty() {
            bail!("Branch name must not be empty");
        }
        if self.commit_message.trim().is_empty() {
            bail!("Commit message must not be empty");
        }
        Ok(())
    }
}
