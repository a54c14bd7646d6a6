//! Headless Chrome 浏览器句柄
//!
//! 需启用 feature "browser" 且系统已安装 Chrome/Chromium。
//! 每个句柄启动独立的 Chrome 进程（临时 profile，不共享 cookie），同步 API 放在 spawn_blocking 中执行。

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::browser::{
    truncate_chars, validate_url, BrowserError, BrowserFactory, BrowserHandle, PageSnapshot,
};

struct ChromeSession {
    // 持有 Browser 以保持进程存活
    _browser: Browser,
    tab: Arc<Tab>,
}

pub struct ChromeBrowser {
    session: Arc<Mutex<Option<ChromeSession>>>,
    max_chars: usize,
}

fn snapshot(tab: &Tab, max_chars: usize) -> Result<PageSnapshot, String> {
    let title = tab.get_title().map_err(|e| format!("Get title failed: {e}"))?;
    let content = tab
        .get_content()
        .map_err(|e| format!("Get content failed: {e}"))?;
    let text = html2text::from_read(content.as_bytes(), 120).unwrap_or(content);
    Ok(PageSnapshot {
        url: tab.get_url(),
        title,
        text: truncate_chars(&text, max_chars),
    })
}

impl ChromeBrowser {
    /// 启动新的 Chrome 进程并打开一个 Tab
    pub async fn launch(
        headless: bool,
        viewport: (u32, u32),
        max_chars: usize,
    ) -> Result<Self, BrowserError> {
        let session = tokio::task::spawn_blocking(move || {
            let options = LaunchOptions::default_builder()
                .headless(headless)
                .window_size(Some(viewport))
                .build()
                .map_err(|e| e.to_string())?;
            let browser = Browser::new(options).map_err(|e| format!("Chrome launch failed: {e}"))?;
            let tab = browser
                .new_tab()
                .map_err(|e| format!("Browser tab failed: {e}"))?;
            Ok::<_, String>(ChromeSession {
                _browser: browser,
                tab,
            })
        })
        .await
        .map_err(|e| BrowserError::Launch(format!("Task join: {e}")))?
        .map_err(BrowserError::Launch)?;

        Ok(Self {
            session: Arc::new(Mutex::new(Some(session))),
            max_chars,
        })
    }

    fn tab(&self) -> Result<Arc<Tab>, BrowserError> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| Arc::clone(&s.tab))
            .ok_or(BrowserError::Closed)
    }
}

#[async_trait]
impl BrowserHandle for ChromeBrowser {
    async fn navigate(&self, url: &str) -> Result<PageSnapshot, BrowserError> {
        let url = validate_url(url)?;
        let tab = self.tab()?;
        let max_chars = self.max_chars;
        tracing::info!(url = %url, "chrome navigate");
        let target = url.clone();
        tokio::task::spawn_blocking(move || {
            tab.navigate_to(&target)
                .map_err(|e| format!("Navigate failed: {e}"))?;
            tab.wait_until_navigated()
                .map_err(|e| format!("Page load failed: {e}"))?;
            snapshot(&tab, max_chars)
        })
        .await
        .map_err(|e| BrowserError::Navigation {
            url: url.clone(),
            reason: format!("Task join: {e}"),
        })?
        .map_err(|reason| BrowserError::Navigation { url, reason })
    }

    async fn read_page(&self) -> Result<PageSnapshot, BrowserError> {
        let tab = self.tab()?;
        let max_chars = self.max_chars;
        tokio::task::spawn_blocking(move || snapshot(&tab, max_chars))
            .await
            .map_err(|e| BrowserError::Launch(format!("Task join: {e}")))?
            .map_err(|reason| BrowserError::Navigation {
                url: String::new(),
                reason,
            })
    }

    async fn current_url(&self) -> Option<String> {
        self.tab()
            .ok()
            .map(|t| t.get_url())
            .filter(|u| !u.is_empty() && u != "about:blank")
    }

    async fn close(&self) {
        // Drop Browser 即结束 Chrome 进程
        let session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if session.is_some() {
            tracing::debug!("chrome session closed");
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChromeBrowserFactory {
    headless: bool,
    viewport: (u32, u32),
    max_chars: usize,
}

impl ChromeBrowserFactory {
    pub fn new(headless: bool, viewport: (u32, u32), max_chars: usize) -> Self {
        Self {
            headless,
            viewport,
            max_chars,
        }
    }
}

#[async_trait]
impl BrowserFactory for ChromeBrowserFactory {
    async fn open_isolated(&self) -> Result<Arc<dyn BrowserHandle>, BrowserError> {
        let browser = ChromeBrowser::launch(self.headless, self.viewport, self.max_chars).await?;
        Ok(Arc::new(browser))
    }
}
