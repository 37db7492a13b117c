//! Counter kind configuration.
//!
//! Every entity carries one counter per configured kind, and all entities
//! share the same set. The set is injected rather than hard-coded so the
//! shape of the store is a parameter of the engine.

use crate::{error::Result, CounterName, Error};
use serde::{Deserialize, Serialize};

/// Counter kinds used when no configuration is supplied.
pub const DEFAULT_COUNTER_KINDS: [&str; 3] = ["gold", "silver", "bronze"];

/// Ordered, duplicate-free set of counter names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CounterKinds {
    names: Vec<CounterName>,
}

impl CounterKinds {
    /// Create a counter kind set, rejecting empty or duplicate names.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<CounterName>,
    {
        let mut collected: Vec<CounterName> = Vec::new();
        for name in names {
            let name = name.into();
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(Error::InvalidCounterKinds("empty counter name".into()));
            }
            if collected.iter().any(|n| n == trimmed) {
                return Err(Error::InvalidCounterKinds(format!(
                    "duplicate counter name: {trimmed}"
                )));
            }
            collected.push(trimmed.to_string());
        }

        if collected.is_empty() {
            return Err(Error::InvalidCounterKinds(
                "at least one counter kind is required".into(),
            ));
        }

        Ok(Self { names: collected })
    }

    /// Parse a comma separated list, e.g. `"gold,silver,bronze"`.
    pub fn parse(list: &str) -> Result<Self> {
        Self::new(list.split(','))
    }

    /// Counter names in configured order.
    pub fn names(&self) -> &[CounterName] {
        &self.names
    }

    /// Iterate counter names in configured order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Fail with [`Error::UnknownCounter`] unless `name` is configured.
    pub fn require(&self, name: &str) -> Result<()> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(Error::UnknownCounter(name.to_string()))
        }
    }
}

impl Default for CounterKinds {
    fn default() -> Self {
        Self {
            names: DEFAULT_COUNTER_KINDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for CounterKinds {
    type Error = Error;

    fn try_from(names: Vec<String>) -> Result<Self> {
        Self::new(names)
    }
}

impl From<CounterKinds> for Vec<String> {
    fn from(kinds: CounterKinds) -> Self {
        kinds.names
    }
}
