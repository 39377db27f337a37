use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::app::{CrawlError, Result};
use crate::browser::config::{BrowserConfig, PageSelectors};
use crate::browser::parse::{RawNote, RawProfile};
use crate::browser::scripts::PageScripts;
use crate::browser::PageKind;
use crate::control::SourceProvider;
use crate::domain::{CollectionMode, NoteDetail, ProfileSummary};
use crate::engine::{
    Candidate, CloseAction, ContainerHandle, DetailSource, Pacer, ScrollStep,
};

/// A launched Chrome instance and the task pumping its CDP events
pub struct ChromeBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
    config: BrowserConfig,
}

impl ChromeBrowser {
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        let mut builder = LaunchConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer")
            .request_timeout(config.timeout());

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(ref dir) = config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }

        let launch_config = builder
            .build()
            .map_err(|e| CrawlError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(launch_config).await.map_err(|e| {
            CrawlError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        Ok(Self {
            browser,
            handler,
            config,
        })
    }

    /// Open `url` in a new tab and wait for it to settle
    pub async fn open_page(&self, url: &str) -> Result<Page> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| CrawlError::Browser(format!("Failed to create page: {}", e)))?;

        if let Some(ref ua) = self.config.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| CrawlError::Browser(format!("Failed to set user agent: {}", e)))?;
        }

        page.wait_for_navigation()
            .await
            .map_err(|e| CrawlError::Browser(format!("Navigation failed: {}", e)))?;

        // Cards render after the initial load
        tokio::time::sleep(self.config.wait_after_load()).await;

        info!("Opened {}", url);
        Ok(page)
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| CrawlError::Browser(format!("Failed to close browser: {}", e)))?;
        self.handler.abort();
        Ok(())
    }
}

/// Drives one open tab as a [`DetailSource`]
pub struct ChromeSource {
    page: Page,
    scripts: PageScripts,
    kind: PageKind,
    pacer: Arc<dyn Pacer>,
    config: BrowserConfig,
}

impl ChromeSource {
    pub fn new(
        page: Page,
        selectors: PageSelectors,
        kind: PageKind,
        pacer: Arc<dyn Pacer>,
        config: BrowserConfig,
    ) -> Self {
        Self {
            page,
            scripts: PageScripts::new(selectors),
            kind,
            pacer,
            config,
        }
    }

    async fn eval<T: DeserializeOwned>(&self, script: String, what: &str) -> Result<T> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| CrawlError::Browser(format!("{} script failed: {}", what, e)))?
            .into_value()
            .map_err(|e| CrawlError::Browser(format!("Failed to parse {} result: {:?}", what, e)))
    }

    /// Load more of the comment thread before it's read
    async fn expand_comments(&self, container: &ContainerHandle) -> Result<()> {
        for _ in 0..self.config.comment_scroll_rounds {
            let scrolled: bool = self
                .eval(self.scripts.scroll_comments(&container.selector), "comment scroll")
                .await?;
            if !scrolled {
                return Ok(());
            }
            self.pacer.pause(self.config.comment_scroll_delay).await;
        }

        let clicked: u32 = self
            .eval(self.scripts.expand_replies(&container.selector), "reply expansion")
            .await?;
        debug!("Expanded {} reply threads", clicked);
        for _ in 0..clicked {
            self.pacer.pause(self.config.reply_expand_delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl DetailSource for ChromeSource {
    async fn list_candidates(&self) -> Result<Vec<Candidate>> {
        self.eval(self.scripts.list_candidates(), "candidate listing")
            .await
    }

    async fn reveal(&self, candidate: &Candidate) -> Result<()> {
        let present: bool = self.eval(self.scripts.reveal(&candidate.handle), "reveal").await?;
        if present {
            Ok(())
        } else {
            Err(CrawlError::Browser(format!(
                "candidate {} left the page",
                candidate.handle
            )))
        }
    }

    async fn open(&self, candidate: &Candidate) -> Result<()> {
        let clicked: bool = self.eval(self.scripts.open(&candidate.handle), "open").await?;
        if clicked {
            Ok(())
        } else {
            Err(CrawlError::Browser(format!(
                "candidate {} left the page",
                candidate.handle
            )))
        }
    }

    async fn probe_container(&self, selectors: &[String]) -> Result<Option<ContainerHandle>> {
        let selector: String = self
            .eval(self.scripts.probe_container(selectors), "container probe")
            .await?;
        Ok((!selector.is_empty()).then_some(ContainerHandle { selector }))
    }

    async fn extract(&self, container: &ContainerHandle) -> Result<NoteDetail> {
        self.expand_comments(container).await?;

        let raw: RawNote = self
            .eval(self.scripts.extract_note(&container.selector), "extraction")
            .await?;
        if !raw.found {
            return Err(CrawlError::Extraction(format!(
                "container {} disappeared",
                container.selector
            )));
        }
        Ok(raw.into_detail())
    }

    async fn close(&self, action: CloseAction) -> Result<bool> {
        self.eval(self.scripts.close(action), "close").await
    }

    async fn advance(&self, step: ScrollStep) -> Result<()> {
        let _: bool = self.eval(self.scripts.advance(step), "scroll").await?;
        Ok(())
    }

    async fn profile_summary(&self) -> Result<Option<ProfileSummary>> {
        if self.kind != PageKind::Profile {
            return Ok(None);
        }

        let raw: RawProfile = self
            .eval(self.scripts.profile_summary(), "profile summary")
            .await?;
        let selectors = self.scripts.selectors();
        Ok(Some(raw.into_summary(
            &selectors.ip_label_prefixes,
            &selectors.site_id_label_prefixes,
        )))
    }
}

/// One open tab handed to every run the control channel starts
pub struct ChromeTab {
    page: Page,
    selectors: PageSelectors,
    pacer: Arc<dyn Pacer>,
    config: BrowserConfig,
}

impl ChromeTab {
    pub fn new(page: Page, selectors: PageSelectors, pacer: Arc<dyn Pacer>, config: BrowserConfig) -> Self {
        Self {
            page,
            selectors,
            pacer,
            config,
        }
    }
}

#[async_trait]
impl SourceProvider for ChromeTab {
    async fn source_for(&self, mode: CollectionMode) -> Result<Arc<dyn DetailSource>> {
        let source: Arc<dyn DetailSource> = Arc::new(ChromeSource::new(
            self.page.clone(),
            self.selectors.clone(),
            mode.into(),
            self.pacer.clone(),
            self.config.clone(),
        ));
        Ok(source)
    }
}
