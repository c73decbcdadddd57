//! Worker roles.
//!
//! A role is the behavioral stance a worker adopts for one dispatch. The set is
//! closed; anything else is rejected where it enters the system.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FactoryError;

/// The fixed set of worker roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Coder,
    Reviewer,
    Qa,
    Security,
    Devops,
    Docs,
    Architect,
    Pm,
    Retrospective,
}

impl Role {
    /// Every role, in declaration order
    pub const ALL: [Role; 9] = [
        Role::Coder,
        Role::Reviewer,
        Role::Qa,
        Role::Security,
        Role::Devops,
        Role::Docs,
        Role::Architect,
        Role::Pm,
        Role::Retrospective,
    ];

    /// Lowercase name used in logs, file names and the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Coder => "coder",
            Role::Reviewer => "reviewer",
            Role::Qa => "qa",
            Role::Security => "security",
            Role::Devops => "devops",
            Role::Docs => "docs",
            Role::Architect => "architect",
            Role::Pm => "pm",
            Role::Retrospective => "retrospective",
        }
    }

    /// Comma-separated list of valid names, for usage messages
    pub fn valid_names() -> String {
        Self::ALL.iter().map(Role::as_str).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = FactoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| FactoryError::InvalidRole(s.to_string()))
    }
}
