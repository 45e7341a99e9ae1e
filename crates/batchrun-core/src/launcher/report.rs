use std::{collections::BTreeMap, fmt, time::Duration};

use batchrun_model::TaskResult;

/// Results of one [`crate::Launcher::run`], one entry per submitted task in submission order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub results: Vec<TaskResult>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// First result carrying `identifier`.
    pub fn get(&self, identifier: &str) -> Option<&TaskResult> {
        self.results.iter().find(|r| r.identifier == identifier)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(TaskResult::is_success)
    }

    /// Results keyed by identifier. With duplicate identifiers the later submission wins.
    pub fn into_map(self) -> BTreeMap<String, TaskResult> {
        self.results
            .into_iter()
            .map(|r| (r.identifier.clone(), r))
            .collect()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} tasks, {} succeeded, {} failed in {}",
            self.len(),
            self.succeeded().count(),
            self.failed().count(),
            readable_duration(self.elapsed)
        )?;
        for r in &self.results {
            write!(f, "  [{}] {:<7} {}", r.index, r.status.as_str(), r.identifier)?;
            if let Some(err) = &r.error {
                write!(f, " ({err})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// `HH:MM:SS`, hours not wrapped.
pub fn readable_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}
