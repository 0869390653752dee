//! Component types eligible for interaction counting

use serde::{Deserialize, Serialize};
use std::fmt;

/// UI component type whose interactions may be recorded
///
/// Apps may register other component types; those can be read back but
/// never incremented through the interaction endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    StacktraceLink,
    IssueLink,
}

impl ComponentType {
    pub const ALL: [ComponentType; 2] = [ComponentType::StacktraceLink, ComponentType::IssueLink];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::StacktraceLink => "stacktrace-link",
            ComponentType::IssueLink => "issue-link",
        }
    }

    pub fn from_name(name: &str) -> Option<ComponentType> {
        Self::ALL.into_iter().find(|ty| ty.as_str() == name)
    }

    /// Allowed names rendered as `['stacktrace-link', 'issue-link']`
    pub fn allowed_list() -> String {
        let names: Vec<String> = Self::ALL
            .iter()
            .map(|ty| format!("'{}'", ty.as_str()))
            .collect();
        format!("[{}]", names.join(", "))
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
