//! 内存固定页面浏览器（测试 / 演练用）

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::browser::{validate_url, BrowserError, BrowserFactory, BrowserHandle, PageSnapshot};

pub struct StaticBrowser {
    pages: Arc<HashMap<String, PageSnapshot>>,
    current: RwLock<Option<String>>,
    closed: RwLock<bool>,
}

impl StaticBrowser {
    pub fn new(pages: Arc<HashMap<String, PageSnapshot>>) -> Self {
        Self {
            pages,
            current: RwLock::new(None),
            closed: RwLock::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn page(&self, url: &str) -> Result<PageSnapshot, BrowserError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| BrowserError::Navigation {
                url: url.to_string(),
                reason: "HTTP 404".to_string(),
            })
    }
}

#[async_trait]
impl BrowserHandle for StaticBrowser {
    async fn navigate(&self, url: &str) -> Result<PageSnapshot, BrowserError> {
        if self.is_closed() {
            return Err(BrowserError::Closed);
        }
        let url = validate_url(url)?;
        let page = self.page(&url)?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(url);
        Ok(page)
    }

    async fn read_page(&self) -> Result<PageSnapshot, BrowserError> {
        if self.is_closed() {
            return Err(BrowserError::Closed);
        }
        let url = self.current_url().await.ok_or(BrowserError::NoPage)?;
        self.page(&url)
    }

    async fn current_url(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn close(&self) {
        *self.closed.write().unwrap_or_else(PoisonError::into_inner) = true;
    }
}

/// 每次 open_isolated 返回新的 StaticBrowser（页面共享、导航状态独立），并计数
#[derive(Default)]
pub struct StaticBrowserFactory {
    pages: Arc<HashMap<String, PageSnapshot>>,
    opened: AtomicUsize,
}

impl StaticBrowserFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, title: &str, text: &str) -> Self {
        Arc::make_mut(&mut self.pages).insert(
            url.to_string(),
            PageSnapshot {
                url: url.to_string(),
                title: title.to_string(),
                text: text.to_string(),
            },
        );
        self
    }

    /// 已打开的句柄数
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn open(&self) -> Arc<StaticBrowser> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Arc::new(StaticBrowser::new(Arc::clone(&self.pages)))
    }
}

#[async_trait]
impl BrowserFactory for StaticBrowserFactory {
    async fn open_isolated(&self) -> Result<Arc<dyn BrowserHandle>, BrowserError> {
        Ok(self.open())
    }
}
