//! Sequential, fail-fast execution of a [`BuildPlan`]

use std::process::Command;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info};

use crate::error::{BuildError, BuildResult};
use crate::plan::{BuildPlan, EnvChange, Step};
use crate::platform::Platform;

/// Something that can run one step to completion and report its exit code.
pub trait CommandRunner {
    fn run(&mut self, step: &Step) -> BuildResult<i32>;
}

/// Runs steps as child processes with inherited stdio.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, step: &Step) -> BuildResult<i32> {
        let mut cmd = Command::new(&step.program);
        cmd.args(&step.args).current_dir(&step.cwd);
        for change in &step.env {
            match change {
                EnvChange::Set { key, value } => {
                    cmd.env(key, value);
                }
                EnvChange::Unset { key } => {
                    cmd.env_remove(key);
                }
            }
        }

        let status = cmd.status().map_err(|source| BuildError::Spawn {
            step: step.name.clone(),
            program: step.program.clone(),
            source,
        })?;

        // Killed by a signal: no code to hand through.
        Ok(status.code().unwrap_or(1))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub name: String,
    pub code: i32,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub platform: Platform,
    pub steps: Vec<StepOutcome>,
}

/// Run every step of `plan` in order, stopping at the first non-zero exit.
pub fn execute(plan: &BuildPlan, runner: &mut dyn CommandRunner) -> BuildResult<RunReport> {
    let mut outcomes = Vec::with_capacity(plan.steps.len());

    for step in &plan.steps {
        info!(step = %step.name, cwd = %step.cwd.display(), "+ {}", step.command_line());
        let started = Instant::now();
        let code = runner.run(step)?;
        let elapsed_ms = started.elapsed().as_millis();

        if code != 0 {
            error!(step = %step.name, code, "step failed");
            return Err(BuildError::StepFailed {
                step: step.name.clone(),
                code,
            });
        }

        outcomes.push(StepOutcome {
            name: step.name.clone(),
            code,
            elapsed_ms,
        });
    }

    Ok(RunReport {
        platform: plan.platform,
        steps: outcomes,
    })
}
