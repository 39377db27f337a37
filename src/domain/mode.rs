use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which page a run collects from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionMode {
    /// A single user's profile page, scrolled until its post grid runs out
    #[default]
    Profile,
    /// The generic discovery feed, collected up to a quota
    Feed,
}

impl fmt::Display for CollectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionMode::Profile => write!(f, "profile"),
            CollectionMode::Feed => write!(f, "feed"),
        }
    }
}

impl FromStr for CollectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "profile" => Ok(CollectionMode::Profile),
            "feed" | "discovery" => Ok(CollectionMode::Feed),
            other => Err(format!("Unknown mode: {}. Use 'profile' or 'feed'", other)),
        }
    }
}
