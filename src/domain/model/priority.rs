use serde::{Deserialize, Serialize};
use std::fmt;

/// Submission priority. Declaration order is drain order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[serde(alias = "HIGH", alias = "immediate", alias = "IMMEDIATE")]
    High,
    #[default]
    #[serde(alias = "NORMAL")]
    Normal,
    #[serde(alias = "CHAINED", alias = "low", alias = "LOW")]
    Chained,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Chained];

    /// Queue tier index, 0 drains first.
    pub fn tier(self) -> usize {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Chained => 2,
        }
    }

    /// Whether a request at this priority may take a resource from another owner.
    pub fn preempts(self) -> bool {
        matches!(self, Priority::High)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Normal => "NORMAL",
            Priority::Chained => "CHAINED",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
