use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::job::BatchJobStatus;
use crate::models::workflow::{TableId, WorkflowStep};

/// Whether entering the monitoring step depends on the job status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NavigationPolicy {
    /// Any step may be entered at any time.
    #[default]
    Free,
    /// Monitoring cannot be entered while the last known status is processing.
    Gated,
}

/// A completed step change and the tables the new step must reload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StepChange {
    pub from: WorkflowStep,
    pub to: WorkflowStep,
    pub reload: &'static [TableId],
}

/// Current wizard step of one session. Only user navigation moves it.
#[derive(Debug, Clone)]
pub struct WorkflowStepper {
    step: WorkflowStep,
    policy: NavigationPolicy,
}

impl WorkflowStepper {
    pub fn new(policy: NavigationPolicy) -> Self {
        Self {
            step: WorkflowStep::Import,
            policy,
        }
    }

    pub fn current(&self) -> WorkflowStep {
        self.step
    }

    pub fn policy(&self) -> NavigationPolicy {
        self.policy
    }

    /// Move to `target`. Re-entering the current step still reloads its tables.
    pub fn navigate(
        &mut self,
        target: WorkflowStep,
        status: Option<&BatchJobStatus>,
    ) -> Result<StepChange, NavigationError> {
        let processing = status.is_some_and(BatchJobStatus::is_processing);
        if self.policy == NavigationPolicy::Gated
            && target == WorkflowStep::Monitor
            && self.step != WorkflowStep::Monitor
            && processing
        {
            return Err(NavigationError::JobProcessing);
        }

        let change = StepChange {
            from: self.step,
            to: target,
            reload: target.tables(),
        };
        self.step = target;
        info!(from = %change.from, to = %change.to, "Workflow step changed");
        Ok(change)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("A batch is still being processed; wait until it finishes before monitoring")]
    JobProcessing,
}
