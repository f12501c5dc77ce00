#![allow(async_fn_in_trait)]

use std::path;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::debug;
use tracing::instrument;

// -----------------------------------------------------------------------------
// Types

/// Name of the repository metadata directory.
pub const METADATA_DIR: &str = ".git";

/// Result of a single git invocation.
///
/// A non-zero exit is not an error at this level; the caller decides whether
/// the step it belongs to may fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Successful output with the given stdout (for tests and mocks).
    pub fn ok(stdout: &str) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given stderr (for tests and mocks).
    pub fn failed(exit_code: i32, stderr: &str) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

/// Git client.
pub struct GitClient {
    path: path::PathBuf,
}

// -----------------------------------------------------------------------------
// GitOps trait

/// Operations the publish pipeline needs from git.
#[cfg_attr(test, automock)]
pub trait GitOps {
    /// Whether the working directory already holds repository metadata.
    async fn is_repository(&self) -> Result<bool>;
    async fn init(&self) -> Result<CommandOutput>;
    /// `git remote -v`
    async fn remote_list(&self) -> Result<CommandOutput>;
    async fn remote_add(&self, name: &str, url: &str) -> Result<CommandOutput>;
    async fn remote_set_url(&self, name: &str, url: &str) -> Result<CommandOutput>;
    /// Stage everything under the working directory.
    async fn add_all(&self) -> Result<CommandOutput>;
    async fn status_porcelain(&self) -> Result<CommandOutput>;
    async fn commit(&self, message: &str) -> Result<CommandOutput>;
    async fn current_branch(&self) -> Result<CommandOutput>;
    /// Create `branch` from HEAD and switch to it.
    async fn create_branch(&self, branch: &str) -> Result<CommandOutput>;
    /// Push `branch` to `remote` and set it as upstream.
    async fn push_upstream(&self, remote: &str, branch: &str) -> Result<CommandOutput>;
    /// Read a config value, `None` when the key is unset.
    async fn config_get(&self, key: &str) -> Result<Option<String>>;
    async fn config_set(&self, key: &str, value: &str) -> Result<()>;
}

// -----------------------------------------------------------------------------
// GitClient impl

impl GitClient {
    pub fn new(path: path::PathBuf) -> Self {
        Self { path }
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::new("git")
            .current_dir(&self.path)
            .args(args)
            .output()
            .await
            .context("Failed to execute git command. Is git installed?")?;

        // Killed by a signal
        let exit_code = output.status.code().unwrap_or(-1);
        debug!(exit_code, "git exited");

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl GitOps for GitClient {
    async fn is_repository(&self) -> Result<bool> {
        let metadata = self.path.join(METADATA_DIR);
        tokio::fs::try_exists(&metadata)
            .await
            .with_context(|| format!("Failed to inspect {}", metadata.display()))
    }

    async fn init(&self) -> Result<CommandOutput> {
        self.run(&["init"]).await
    }

    async fn remote_list(&self) -> Result<CommandOutput> {
        self.run(&["remote", "-v"]).await
    }

    async fn remote_add(&self, name: &str, url: &str) -> Result<CommandOutput> {
        self.run(&["remote", "add", name, url]).await
    }

    async fn remote_set_url(&self, name: &str, url: &str) -> Result<CommandOutput> {
        self.run(&["remote", "set-url", name, url]).await
    }

    async fn add_all(&self) -> Result<CommandOutput> {
        self.run(&["add", "."]).await
    }

    async fn status_porcelain(&self) -> Result<CommandOutput> {
        self.run(&["status", "--porcelain"]).await
    }

    async fn commit(&self, message: &str) -> Result<CommandOutput> {
        self.run(&["commit", "-m", message]).await
    }

    async fn current_branch(&self) -> Result<CommandOutput> {
        self.run(&["branch", "--show-current"]).await
    }

    async fn create_branch(&self, branch: &str) -> Result<CommandOutput> {
        self.run(&["checkout", "-b", branch]).await
    }

    async fn push_upstream(&self, remote: &str, branch: &str) -> Result<CommandOutput> {
        self.run(&["push", "-u", remote, branch]).await
    }

    async fn config_get(&self, key: &str) -> Result<Option<String>> {
        let output = self.run(&["config", "--get", key]).await?;

        // Exit code 1 means the key is not set
        match output.exit_code {
            0 => Ok(Some(output.stdout.trim().to_string())),
            1 => Ok(None),
            _ => bail!("git config --get {} failed: {}", key, output.stderr.trim()),
        }
    }

    async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        let output = self.run(&["config", key, value]).await?;

        if !output.success() {
            bail!("git config {} failed: {}", key, output.stderr.trim());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_output_success() {
        assert!(CommandOutput::ok("").success());
        assert!(!CommandOutput::failed(128, "fatal: not a git repository").success());
    }

    #[tokio::test]
    async fn test_is_repository_after_init() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitClient::new(dir.path().to_path_buf());

        assert!(!git.is_repository().await.unwrap());
        let output = git.init().await.unwrap();
        assert!(output.success(), "git init failed: {}", output.stderr);
        assert!(git.is_repository().await.unwrap());
    }

    #[tokio::test]
    async fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitClient::new(dir.path().to_path_buf());
        git.init().await.unwrap();

        assert_eq!(git.config_get("publish.remoteUrl").await.unwrap(), None);
        git.config_set("publish.remoteUrl", "git@example.com:me/repo.git")
            .await
            .unwrap();
        assert_eq!(
            git.config_get("publish.remoteUrl").await.unwrap(),
            Some("git@example.com:me/repo.git".to_string())
        );
    }

    #[tokio::test]
    async fn test_remote_add_then_set_url() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitClient::new(dir.path().to_path_buf());
        git.init().await.unwrap();

        assert!(git.remote_add("origin", "/tmp/one.git").await.unwrap().success());
        // Adding twice fails, set-url succeeds
        assert!(!git.remote_add("origin", "/tmp/two.git").await.unwrap().success());
        assert!(
            git.remote_set_url("origin", "/tmp/two.git")
                .await
                .unwrap()
                .success()
        );

        let remotes = git.remote_list().await.unwrap();
        assert!(remotes.stdout.contains("/tmp/two.git"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitClient::new(dir.path().join("does-not-exist"));
        assert!(git.init().await.is_err());
    }
}
