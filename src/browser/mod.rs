//! Chrome adapter for the collection engine.
//!
//! ```text
//! ChromeBrowser → Page → ChromeSource (DetailSource) → engine
//! ```
//!
//! All DOM work happens in scripts built by [`PageScripts`] and evaluated
//! through chromiumoxide; their raw output is turned into domain records
//! by [`parse`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use notecrawl::browser::{BrowserConfig, ChromeBrowser, ChromeSource, PageKind, PageSelectors};
//!
//! let browser = ChromeBrowser::launch(BrowserConfig::default()).await?;
//! let page = browser.open_page("https://www.xiaohongshu.com/explore").await?;
//! let source = ChromeSource::new(page, PageSelectors::default(), PageKind::Feed, pacer, config);
//! ```

mod chrome;
mod config;
pub mod parse;
mod scripts;

pub use chrome::{ChromeBrowser, ChromeSource, ChromeTab};
pub use config::{BrowserConfig, PageSelectors};
pub use scripts::{PageScripts, HANDLE_ATTR};

use crate::domain::CollectionMode;

/// Which kind of page the tab shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// A user's profile grid; has a header summary
    Profile,
    /// The discovery feed
    Feed,
}

impl From<CollectionMode> for PageKind {
    fn from(mode: CollectionMode) -> Self {
        match mode {
            CollectionMode::Profile => PageKind::Profile,
            CollectionMode::Feed => PageKind::Feed,
        }
    }
}
