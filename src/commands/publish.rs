use std::future::Future;

use anyhow::Result;
use colored::Colorize;
use tracing::debug;
use tracing::info;

use crate::App;
use crate::app::RULE_WIDTH;
use crate::clients::git::CommandOutput;
use crate::clients::git::GitOps;
use crate::report::PublishReport;
use crate::report::Step;
use crate::report::StepOutcome;

impl<G: GitOps> App<G> {
    /// Publish the working directory to the configured remote.
    ///
    /// 1. Initialize a repository if there is none.
    /// 2. Add the remote, or point the existing one at the configured URL.
    /// 3. Stage everything and commit if anything changed.
    /// 4. Make sure we are on the target branch.
    /// 5. Push it with upstream tracking.
    ///
    /// Steps that must not fail stop the run early. The returned report says
    /// whether the run succeeded; `Err` is reserved for git not being runnable
    /// at all or the console not being writable.
    pub async fn cmd_publish(&self, stdout: &mut impl std::io::Write) -> Result<PublishReport> {
        let mut report = PublishReport::default();
        let rule = "=".repeat(RULE_WIDTH);

        writeln!(
            stdout,
            "{}",
            format!("🚀 Publishing to {}...", self.config.remote_url).bold()
        )?;
        writeln!(stdout, "{}", rule)?;
        writeln!(stdout, "📁 Project directory: {}", self.path.display())?;

        if !self.ensure_repository(&mut report, stdout).await? {
            return Ok(report);
        }

        self.ensure_remote(&mut report, stdout).await?;

        if !self.commit_changes(&mut report, stdout).await? {
            return Ok(report);
        }

        let branch = self.ensure_branch(&mut report, stdout).await?;
        report.branch = Some(branch.clone());

        if !self.push(&branch, &mut report, stdout).await? {
            return Ok(report);
        }

        writeln!(stdout)?;
        writeln!(stdout, "{}", rule)?;
        writeln!(stdout, "{}", "✅ Publish complete!".green().bold())?;
        if let Some(web_url) = self.config.web_url() {
            writeln!(stdout, "🌐 Visit: {}", web_url)?;
        }

        Ok(report)
    }

    /// Run `git init` unless the directory already holds a repository.
    /// Returns false if the run must stop.
    pub(crate) async fn ensure_repository(
        &self,
        report: &mut PublishReport,
        stdout: &mut impl std::io::Write,
    ) -> Result<bool> {
        if self.git.is_repository().await? {
            writeln!(stdout)?;
            writeln!(stdout, "{}", "✅ Git repository already exists".green())?;
            report.record(Step::Init, StepOutcome::Skipped);
            return Ok(true);
        }

        let outcome = self
            .run_step(
                Step::Init,
                "Initializing git repository",
                self.git.init(),
                report,
                stdout,
            )
            .await?;
        if outcome.is_fatal() {
            writeln!(stdout, "{}", "❌ Git initialization failed".red())?;
            return Ok(false);
        }

        Ok(true)
    }

    async fn ensure_remote(
        &self,
        report: &mut PublishReport,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let remote = &self.config.remote;
        let url = &self.config.remote_url;

        let remotes = self.git.remote_list().await?;
        report.record(Step::RemoteCheck, Step::RemoteCheck.outcome(&remotes));

        if !remotes.stdout.contains(remote.as_str()) {
            let outcome = self
                .run_step(
                    Step::RemoteAdd,
                    &format!("Adding remote {}", remote),
                    self.git.remote_add(remote, url),
                    report,
                    stdout,
                )
                .await?;
            if outcome != StepOutcome::Done {
                let msg = format!("⚠️  Failed to add remote {}, it may already exist", remote);
                writeln!(stdout, "{}", msg.yellow())?;
            }
        } else {
            writeln!(stdout)?;
            writeln!(
                stdout,
                "{}",
                format!("✅ Remote {} already configured", remote).green()
            )?;
            let outcome = self
                .run_step(
                    Step::RemoteSetUrl,
                    &format!("Updating remote {} URL", remote),
                    self.git.remote_set_url(remote, url),
                    report,
                    stdout,
                )
                .await?;
            if outcome != StepOutcome::Done {
                let msg = format!("⚠️  Failed to update remote {} URL", remote);
                writeln!(stdout, "{}", msg.yellow())?;
            }
        }

        Ok(())
    }

    /// Stage everything and commit if the working tree changed.
    /// Returns false if the run must stop.
    async fn commit_changes(
        &self,
        report: &mut PublishReport,
        stdout: &mut impl std::io::Write,
    ) -> Result<bool> {
        let outcome = self
            .run_step(
                Step::Stage,
                "Staging files",
                self.git.add_all(),
                report,
                stdout,
            )
            .await?;
        if outcome.is_fatal() {
            writeln!(stdout, "{}", "❌ Failed to stage files".red())?;
            return Ok(false);
        }

        let status = self.git.status_porcelain().await?;
        report.record(Step::ChangeDetection, Step::ChangeDetection.outcome(&status));

        if status.stdout.trim().is_empty() {
            writeln!(stdout)?;
            writeln!(stdout, "{}", "✅ No new changes to commit".green())?;
            report.record(Step::Commit, StepOutcome::Skipped);
            return Ok(true);
        }

        let outcome = self
            .run_step(
                Step::Commit,
                "Committing changes",
                self.git.commit(&self.config.commit_message),
                report,
                stdout,
            )
            .await?;
        if outcome.is_fatal() {
            writeln!(stdout, "{}", "❌ Commit failed".red())?;
            return Ok(false);
        }

        Ok(true)
    }

    /// Make the target branch current. Returns the branch to push.
    async fn ensure_branch(
        &self,
        report: &mut PublishReport,
        stdout: &mut impl std::io::Write,
    ) -> Result<String> {
        let target = &self.config.branch;

        let output = self.git.current_branch().await?;
        report.record(Step::BranchDetection, Step::BranchDetection.outcome(&output));

        // Detached HEAD or failed query
        let current = match output.stdout.trim() {
            "" => target.as_str(),
            current => current,
        };

        if current == target.as_str() {
            report.record(Step::BranchNormalization, StepOutcome::Skipped);
            return Ok(target.clone());
        }

        let outcome = self
            .run_step(
                Step::BranchNormalization,
                &format!("Switching to branch {} (current: {})", target, current),
                self.git.create_branch(target),
                report,
                stdout,
            )
            .await?;
        if outcome != StepOutcome::Done {
            let msg = format!("⚠️  Could not create branch {}", target);
            writeln!(stdout, "{}", msg.yellow())?;
        }

        Ok(target.clone())
    }

    /// Push with upstream tracking. Returns false if the push failed.
    async fn push(
        &self,
        branch: &str,
        report: &mut PublishReport,
        stdout: &mut impl std::io::Write,
    ) -> Result<bool> {
        let remote = &self.config.remote;

        writeln!(stdout)?;
        writeln!(
            stdout,
            "{}",
            "⚠️  Note: the first push may require authentication".yellow()
        )?;
        writeln!(stdout, "   Have a personal access token or SSH key ready")?;

        let outcome = self
            .run_step(
                Step::Push,
                &format!("Pushing {} to {}", branch, remote),
                self.git.push_upstream(remote, branch),
                report,
                stdout,
            )
            .await?;
        if !outcome.is_fatal() {
            return Ok(true);
        }

        writeln!(stdout)?;
        writeln!(stdout, "{}", "⚠️  Push failed. Common causes:".yellow())?;
        writeln!(
            stdout,
            "   1. Authentication required (use a personal access token or SSH key)"
        )?;
        writeln!(
            stdout,
            "   2. The remote already has content that must be pulled first"
        )?;
        writeln!(stdout, "   3. Insufficient permissions on the remote")?;
        writeln!(stdout)?;
        writeln!(stdout, "💡 Try running manually:")?;
        writeln!(
            stdout,
            "   git pull {} {} --allow-unrelated-histories",
            remote, branch
        )?;
        writeln!(stdout, "   git push -u {} {}", remote, branch)?;

        Ok(false)
    }

    /// Announce a step, run it, echo git's output and record the outcome.
    async fn run_step(
        &self,
        step: Step,
        description: &str,
        command: impl Future<Output = Result<CommandOutput>>,
        report: &mut PublishReport,
        stdout: &mut impl std::io::Write,
    ) -> Result<StepOutcome> {
        writeln!(stdout)?;
        writeln!(stdout, "🔄 {}...", description)?;

        let output = command.await?;

        let out = output.stdout.trim_end();
        if !out.is_empty() {
            writeln!(stdout, "{}", out)?;
        }
        let err = output.stderr.trim_end();
        if !output.success() && !err.is_empty() {
            writeln!(stdout, "{}", format!("⚠️  {}", err).yellow())?;
        }

        let outcome = step.outcome(&output);
        match &outcome {
            StepOutcome::Fatal(_) => info!(%step, exit_code = output.exit_code, "step failed"),
            StepOutcome::Tolerated(_) => {
                info!(%step, exit_code = output.exit_code, "step failed, continuing")
            }
            _ => debug!(%step, "step done"),
        }
        report.record(step, outcome.clone());

        Ok(outcome)
    }
}
