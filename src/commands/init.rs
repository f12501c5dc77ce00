use anyhow::Result;
use anyhow::bail;

use crate::App;
use crate::clients::git::GitOps;
use crate::report::PublishReport;

impl<G: GitOps> App<G> {
    /// Make sure the repository exists and store this app's config in it, so
    /// that later runs need no arguments.
    pub async fn cmd_init(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        let mut report = PublishReport::default();
        if !self.ensure_repository(&mut report, stdout).await? {
            bail!("Cannot save configuration without a git repository");
        }

        self.config.save(&self.git).await?;

        writeln!(stdout)?;
        writeln!(stdout, "Configuration saved to .git/config:")?;
        writeln!(stdout, "  remote:  {}", self.config.remote)?;
        writeln!(stdout, "  url:     {}", self.config.remote_url)?;
        writeln!(stdout, "  branch:  {}", self.config.branch)?;
        writeln!(stdout, "  message: {}", self.config.commit_message)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::App;
    use crate::clients::git::CommandOutput;
    use crate::clients::git::MockGitOps;
    use crate::config::Config;

    #[tokio::test]
    async fn test_cmd_init_saves_config() {
        let mut git = MockGitOps::new();
        git.expect_is_repository().returning(|| Ok(false));
        git.expect_init()
            .times(1)
            .returning(|| Ok(CommandOutput::ok("Initialized empty Git repository\n")));
        git.expect_config_set().times(4).returning(|_, _| Ok(()));

        let app = App::with_git(Config::default_for_tests(), git, PathBuf::from("/work/site"));
        let mut stdout = Vec::new();
        app.cmd_init(&mut stdout).await.unwrap();

        // The step output opens with a blank line
        let out = String::from_utf8(stdout).unwrap();
        insta::assert_snapshot!(out.trim_start(), @r"
        🔄 Initializing git repository...
        Initialized empty Git repository

        Configuration saved to .git/config:
          remote:  origin
          url:     git@github.com:test/repo.git
          branch:  main
          message: Initial commit
        ");
    }

    #[tokio::test]
    async fn test_cmd_init_fails_without_repository() {
        let mut git = MockGitOps::new();
        git.expect_is_repository().returning(|| Ok(false));
        git.expect_init()
            .returning(|| Ok(CommandOutput::failed(128, "fatal: permission denied")));
        git.expect_config_set().never();

        let app = App::with_git(Config::default_for_tests(), git, PathBuf::from("/work/site"));
        let mut stdout = Vec::new();
        assert!(app.cmd_init(&mut stdout).await.is_err());
    }
}
