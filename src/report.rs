use std::fmt::Display;

use serde::Serialize;

use crate::clients::git::CommandOutput;

// -----------------------------------------------------------------------------
// Types

/// The steps of the publish pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Init,
    RemoteCheck,
    RemoteAdd,
    RemoteSetUrl,
    Stage,
    ChangeDetection,
    Commit,
    BranchDetection,
    BranchNormalization,
    Push,
}

/// What a non-zero exit from a step means for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the pipeline and report failure.
    Abort,
    /// Warn and carry on.
    Tolerate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Done,
    /// The step's precondition did not hold (e.g. nothing to commit).
    Skipped,
    /// Failed, but the step is allowed to fail. Holds git's stderr.
    Tolerated(String),
    /// Failed and ended the run. Holds git's stderr.
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: Step,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Success,
    Failure,
}

/// Everything that happened during one publish run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishReport {
    pub steps: Vec<StepRecord>,
    /// Branch that was (or would have been) pushed.
    pub branch: Option<String>,
}

// -----------------------------------------------------------------------------
// Step impl

impl Step {
    pub fn policy(self) -> FailurePolicy {
        match self {
            Step::Init | Step::Stage | Step::Commit | Step::Push => FailurePolicy::Abort,
            Step::RemoteCheck
            | Step::RemoteAdd
            | Step::RemoteSetUrl
            | Step::ChangeDetection
            | Step::BranchDetection
            | Step::BranchNormalization => FailurePolicy::Tolerate,
        }
    }

    /// Classify a git invocation according to this step's policy.
    pub fn outcome(self, output: &CommandOutput) -> StepOutcome {
        if output.success() {
            return StepOutcome::Done;
        }

        let stderr = output.stderr.trim().to_string();
        match self.policy() {
            FailurePolicy::Abort => StepOutcome::Fatal(stderr),
            FailurePolicy::Tolerate => StepOutcome::Tolerated(stderr),
        }
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Init => "init",
            Step::RemoteCheck => "remote check",
            Step::RemoteAdd => "remote add",
            Step::RemoteSetUrl => "remote set-url",
            Step::Stage => "stage",
            Step::ChangeDetection => "change detection",
            Step::Commit => "commit",
            Step::BranchDetection => "branch detection",
            Step::BranchNormalization => "branch normalization",
            Step::Push => "push",
        };
        f.write_str(name)
    }
}

impl StepOutcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StepOutcome::Fatal(_))
    }
}

// -----------------------------------------------------------------------------
// PublishReport impl

impl PublishReport {
    pub fn record(&mut self, step: Step, outcome: StepOutcome) {
        self.steps.push(StepRecord { step, outcome });
    }

    /// Outcome of the most recent run of `step`, if it ran.
    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .rev()
            .find(|record| record.step == step)
            .map(|record| &record.outcome)
    }

    /// Success only if the push ran and nothing was fatal.
    pub fn status(&self) -> PublishStatus {
        let aborted = self.steps.iter().any(|record| record.outcome.is_fatal());
        let pushed = self.outcome(Step::Push) == Some(&StepOutcome::Done);
        if pushed && !aborted {
            PublishStatus::Success
        } else {
            PublishStatus::Failure
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == PublishStatus::Success
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Json<'a> {
            status: PublishStatus,
            #[serde(flatten)]
            report: &'a PublishReport,
        }

        serde_json::to_string_pretty(&Json {
            status: self.status(),
            report: self,
        })
    }
}
