use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::DelayRange;

/// Configuration for the controlled browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Whether to run the browser in headless mode (default: false, the site needs a logged-in window)
    pub headless: bool,

    /// Page load timeout in seconds (default: 30)
    pub timeout_secs: u64,

    /// Wait time after page load for dynamic content in milliseconds (default: 2000)
    pub wait_after_load_ms: u64,

    /// Browser profile directory, so a login survives between runs
    pub user_data_dir: Option<std::path::PathBuf>,

    /// User agent string to use
    pub user_agent: Option<String>,

    /// Page opened when no URL is given on the command line
    pub start_url: Option<String>,

    /// Times the comment list is scrolled to its end before extraction (default: 3)
    pub comment_scroll_rounds: u32,
    pub comment_scroll_delay: DelayRange,
    pub reply_expand_delay: DelayRange,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            timeout_secs: 30,
            wait_after_load_ms: 2000,
            user_data_dir: None,
            user_agent: Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            start_url: None,
            comment_scroll_rounds: 3,
            comment_scroll_delay: DelayRange::new(800, 1500),
            reply_expand_delay: DelayRange::new(500, 1000),
        }
    }
}

impl BrowserConfig {
    /// Get the page load timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the wait time after load as a Duration
    pub fn wait_after_load(&self) -> Duration {
        Duration::from_millis(self.wait_after_load_ms)
    }
}

/// CSS selectors the page adapter uses, each list tried in priority order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSelectors {
    /// Post cards in the grid or feed
    pub candidates: Vec<String>,
    /// Element inside a card that opens its detail overlay
    pub open_targets: Vec<String>,
    /// Dedicated overlay close controls
    pub close_controls: Vec<String>,
    /// Generic dismiss targets such as the backdrop
    pub dismiss_controls: Vec<String>,

    pub title: String,
    pub description: String,
    pub publish_date: String,
    pub images: String,

    pub comment_containers: Vec<String>,
    pub show_more_replies: String,
    pub parent_comment: String,
    pub comment_item: String,
    pub reply_container: String,

    pub profile_name: Vec<String>,
    pub profile_description: String,
    pub profile_ip: String,
    pub profile_site_id: String,
    pub profile_stats: String,

    /// Label prefixes stripped from the profile's IP location text
    pub ip_label_prefixes: Vec<String>,
    /// Label prefixes stripped from the profile's site id text
    pub site_id_label_prefixes: Vec<String>,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            candidates: vec![
                ".note-item".to_string(),
                "section.note-item".to_string(),
                ".feed-item".to_string(),
                ".feeds-container section".to_string(),
                ".reds-note-item".to_string(),
            ],
            open_targets: vec![".cover".to_string(), "a".to_string()],
            close_controls: vec![".close-circle".to_string(), ".close".to_string()],
            dismiss_controls: vec![".mask".to_string()],
            title: ".title".to_string(),
            description: ".desc".to_string(),
            publish_date: ".bottom-container .date".to_string(),
            images: ".swiper-slide img".to_string(),
            comment_containers: vec![
                ".comments-container".to_string(),
                ".comment-list".to_string(),
                ".note-comments".to_string(),
            ],
            show_more_replies: ".show-more".to_string(),
            parent_comment: ".parent-comment".to_string(),
            comment_item: ".comment-item".to_string(),
            reply_container: ".reply-container".to_string(),
            profile_name: vec![
                ".user-name".to_string(),
                ".name".to_string(),
                ".user-nickname".to_string(),
            ],
            profile_description: ".user-desc".to_string(),
            profile_ip: ".user-IP".to_string(),
            profile_site_id: ".user-redId".to_string(),
            profile_stats: ".user-interactions div".to_string(),
            ip_label_prefixes: vec!["IP属地：".to_string(), "IP属地:".to_string()],
            site_id_label_prefixes: vec!["小红书号：".to_string(), "小红书号:".to_string()],
        }
    }
}
