use std::path;

use crate::clients::git::GitClient;
use crate::clients::git::GitOps;
use crate::config::Config;

/// Width of the banner rule printed around a run.
pub const RULE_WIDTH: usize = 50;

pub struct App<G: GitOps = GitClient> {
    pub config: Config,
    pub git: G,
    /// Working directory being published, for display.
    pub path: path::PathBuf,
}

impl App<GitClient> {
    pub fn new(config: Config, path: path::PathBuf) -> Self {
        Self {
            config,
            git: GitClient::new(path.clone()),
            path,
        }
    }
}

impl<G: GitOps> App<G> {
    /// Build an app around any git implementation (used by tests).
    pub fn with_git(config: Config, git: G, path: path::PathBuf) -> Self {
        Self { config, git, path }
    }
}
