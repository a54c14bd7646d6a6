//! 浏览器控制句柄
//!
//! BrowserHandle 是单个 Agent 独占的浏览器会话；BrowserFactory::open_isolated 每次返回一个
//! 不共享 cookie / 配置目录的新句柄（相当于无痕窗口），外层运行与升级子运行永不共用同一句柄。
//!
//! - FetchBrowser：reqwest + html2text，无需 Chrome（默认）
//! - ChromeBrowser：Headless Chrome，需启用 feature "browser"
//! - StaticBrowser：内存中的固定页面，用于测试与演练

pub mod fetch;
pub mod fixed;

#[cfg(feature = "browser")]
pub mod chrome;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::AppConfig;

pub use fetch::{FetchBrowser, FetchBrowserFactory};
pub use fixed::{StaticBrowser, StaticBrowserFactory};

#[cfg(feature = "browser")]
pub use chrome::{ChromeBrowser, ChromeBrowserFactory};

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("No page loaded")]
    NoPage,

    #[error("Invalid url: {0}")]
    InvalidUrl(String),

    #[error("Browser closed")]
    Closed,
}

/// 页面快照：URL、标题与可读文本（已截断）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub text: String,
}

impl PageSnapshot {
    /// 渲染为给 LLM 的观察文本
    pub fn render(&self) -> String {
        format!("# {}\nURL: {}\n\n{}", self.title, self.url, self.text)
    }
}

#[async_trait]
pub trait BrowserHandle: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<PageSnapshot, BrowserError>;

    /// 重新读取当前页面
    async fn read_page(&self) -> Result<PageSnapshot, BrowserError>;

    async fn current_url(&self) -> Option<String>;

    /// 释放底层资源；之后的调用返回 Closed
    async fn close(&self);
}

#[async_trait]
pub trait BrowserFactory: Send + Sync {
    async fn open_isolated(&self) -> Result<Arc<dyn BrowserHandle>, BrowserError>;
}

/// 按 [browser].engine 选择浏览器实现；chrome 未编译进来时退回 fetch
pub fn create_browser_factory(cfg: &AppConfig) -> Arc<dyn BrowserFactory> {
    let max_chars = cfg.agent.max_page_chars;
    match cfg.browser.engine.to_lowercase().as_str() {
        #[cfg(feature = "browser")]
        "chrome" => Arc::new(ChromeBrowserFactory::new(
            cfg.browser.headless,
            (cfg.browser.viewport_width, cfg.browser.viewport_height),
            max_chars,
        )),
        "fetch" => Arc::new(FetchBrowserFactory::new(cfg.browser.timeout_secs, max_chars)),
        other => {
            tracing::warn!(engine = %other, "browser engine unavailable, using fetch");
            Arc::new(FetchBrowserFactory::new(cfg.browser.timeout_secs, max_chars))
        }
    }
}

/// 按字符数截断，并标注 ...[truncated]
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect::<String>() + "\n...[truncated]"
    } else {
        text.to_string()
    }
}

/// 只接受 http(s) URL
pub(crate) fn validate_url(url: &str) -> Result<String, BrowserError> {
    let url = url.trim();
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(url.to_string())
    } else {
        Err(BrowserError::InvalidUrl(url.to_string()))
    }
}
