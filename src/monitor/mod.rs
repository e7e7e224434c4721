//! Process monitoring: liveness queries and the mode decision

pub mod decision;
pub mod liveness;

pub use decision::effective_mode;
pub use liveness::{LivenessOracle, PgrepOracle, ProcessTableOracle};

/// Oracle answering from a fixed set of names and recording every query
#[cfg(test)]
pub(crate) struct FakeOracle {
    pub running: std::collections::HashSet<String>,
    pub queries: Vec<String>,
    pub refreshes: usize,
}

#[cfg(test)]
impl FakeOracle {
    pub fn running(names: &[&str]) -> Self {
        Self {
            running: names.iter().map(|name| name.to_string()).collect(),
            queries: Vec::new(),
            refreshes: 0,
        }
    }
}

#[cfg(test)]
impl LivenessOracle for FakeOracle {
    fn refresh(&mut self) {
        self.refreshes += 1;
    }

    fn is_running(&mut self, name: &str) -> bool {
        self.queries.push(name.to_string());
        self.running.contains(name)
    }
}
