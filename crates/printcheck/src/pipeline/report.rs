use crate::distribution::CleanupReport;
use crate::drive::CleanupError;
use crate::error::PrintCheckError;
use crate::inspection::PermissionSet;
use crate::retrieval::DownloadedArtifact;

/// What one fixture produced after going through every stage.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub fixture: String,
    pub artifact: DownloadedArtifact,
    pub permissions: PermissionSet,
    pub printable: bool,
    pub expected: bool,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.printable == self.expected
    }
}

#[derive(Debug)]
pub struct CaseReport {
    pub fixture: String,
    pub result: Result<CaseOutcome, PrintCheckError>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        matches!(&self.result, Ok(outcome) if outcome.passed())
    }

    /// Why the case did not pass, if it did not.
    pub fn failure(&self) -> Option<String> {
        match &self.result {
            Ok(outcome) if outcome.passed() => None,
            Ok(outcome) => Some(format!(
                "expected can_print = {}, got {}",
                outcome.expected, outcome.printable
            )),
            Err(e) => Some(e.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
    pub cleanup: Result<CleanupReport, CleanupError>,
    /// Children left in the folder after cleanup.
    pub remaining: Result<usize, CleanupError>,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.cases.iter().all(CaseReport::passed)
            && self.cleanup.is_ok()
            && matches!(self.remaining, Ok(0))
    }

    pub fn case(&self, fixture: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.fixture == fixture)
    }

    /// One line per problem, cases first, then teardown.
    pub fn failures(&self) -> Vec<String> {
        let mut failures: Vec<String> = self
            .cases
            .iter()
            .filter_map(|c| c.failure().map(|reason| format!("{}: {}", c.fixture, reason)))
            .collect();

        if let Err(e) = &self.cleanup {
            failures.push(format!("cleanup: {}", e));
        }
        match &self.remaining {
            Ok(0) => {}
            Ok(n) => failures.push(format!("teardown: {} file(s) left in the folder", n)),
            Err(e) => failures.push(format!("teardown: {}", e)),
        }
        failures
    }
}
