//! Validation helpers that collect problems instead of failing fast.
//!
//! Configuration is validated once, up front, and every missing or invalid
//! field is reported together:
//!
//! ```ignore
//! let mut problems = Problems::new();
//! let name = problems.require_non_empty(raw.db_name, "db_name");
//! let kind = problems.require_non_empty(raw.db_type, "db_type");
//! problems.finish()?;
//! ```

use crate::error::{ConfigProblem, Error, Result};

#[derive(Debug, Default)]
pub struct Problems {
    problems: Vec<ConfigProblem>,
}

impl Problems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, problem: impl Into<String>) {
        self.problems.push(ConfigProblem {
            key: key.to_string(),
            problem: problem.into(),
        });
    }

    /// Record a problem when `opt` is `None`; pass the value through otherwise.
    pub fn require<T>(&mut self, opt: Option<T>, key: &str) -> Option<T> {
        if opt.is_none() {
            self.push(key, format!("'{}' is required", key));
        }
        opt
    }

    /// Like [`require`](Self::require), but blank strings count as missing.
    pub fn require_non_empty(&mut self, opt: Option<String>, key: &str) -> Option<String> {
        let value = opt.filter(|v| !v.trim().is_empty());
        self.require(value, key)
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn finish(self) -> Result<()> {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(Error::config_problems(self.problems))
        }
    }
}
