//! The fail-fast check driver.

use simstage_types::{Severity, ValidationOutcome};

use crate::workspace::Workspace;

type CheckFn = dyn Fn(&Workspace) -> ValidationOutcome;

/// A named validation step.
pub struct Check {
    name: String,
    run: Box<CheckFn>,
}

impl Check {
    pub fn new(
        name: impl Into<String>,
        run: impl Fn(&Workspace) -> ValidationOutcome + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, workspace: &Workspace) -> ValidationOutcome {
        (self.run)(workspace)
    }
}

impl std::fmt::Debug for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check").field("name", &self.name).finish_non_exhaustive()
    }
}

/// One executed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub name: String,
    pub outcome: ValidationOutcome,
}

/// Outcomes of every check that ran, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub entries: Vec<ReportEntry>,
    /// False iff some check reported an error.
    pub passed: bool,
}

impl ValidationReport {
    pub fn warnings(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|e| e.outcome.severity == Severity::Warning)
    }

    /// The error that stopped the run, if any.
    pub fn failure(&self) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.outcome.is_error())
    }
}

/// Runs checks in order, stopping at the first error.
#[derive(Debug)]
pub struct Validator {
    checks: Vec<Check>,
}

impl Validator {
    pub fn new(checks: Vec<Check>) -> Self {
        Self { checks }
    }

    /// The five standard checks.
    pub fn standard() -> Self {
        Self::new(super::standard_checks())
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Run the checks, handing each outcome to `observer` as soon as it is
    /// known. Returns true when no check reported an error.
    pub fn run_with(
        &self,
        workspace: &Workspace,
        mut observer: impl FnMut(&str, &ValidationOutcome),
    ) -> bool {
        for check in &self.checks {
            let outcome = check.run(workspace);

            // The report is the user-facing output; logs only trace it.
            match outcome.severity {
                Severity::Ok => tracing::debug!(check = check.name(), "{}", outcome.message),
                Severity::Warning | Severity::Error => tracing::info!(
                    check = check.name(),
                    severity = ?outcome.severity,
                    "{}",
                    outcome.message
                ),
            }
            observer(check.name(), &outcome);

            if outcome.is_error() {
                return false;
            }
        }
        true
    }

    /// Run the checks and collect every outcome.
    pub fn run(&self, workspace: &Workspace) -> ValidationReport {
        let mut entries = Vec::new();
        let passed = self.run_with(workspace, |name, outcome| {
            entries.push(ReportEntry {
                name: name.to_string(),
                outcome: outcome.clone(),
            });
        });
        ValidationReport { entries, passed }
    }
}
