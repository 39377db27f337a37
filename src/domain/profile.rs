use serde::{Deserialize, Serialize};

/// Header information of the profile page a profile-mode run is anchored to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSummary {
    pub unique_id: String,
    pub nickname: String,
    pub site_id: String,
    pub ip_location: Option<String>,
    pub description: String,
    pub stats: ProfileStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileStats {
    pub follows: Option<String>,
    pub fans: Option<String>,
    pub likes_and_collects: Option<String>,
}

impl ProfileSummary {
    pub fn display_name(&self) -> &str {
        if self.nickname.is_empty() {
            &self.unique_id
        } else {
            &self.nickname
        }
    }
}
