//! 基于 HTTP 抓取的浏览器句柄
//!
//! GET 请求带超时与 User-Agent；HTML 经 html2text 转为可读文本，超出 max_chars 截断。
//! 每个句柄持有独立的 reqwest::Client 且不启用 cookie store，句柄之间互不可见。

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use html2text::from_read;
use reqwest::Client;

use crate::browser::{
    truncate_chars, validate_url, BrowserError, BrowserFactory, BrowserHandle, PageSnapshot,
};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// 简易去除 HTML 标签（html2text 失败时的回退）
fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 从 <title> 中提取标题
fn extract_title(html: &str) -> String {
    let lower = html.to_lowercase();
    let Some(start) = lower.find("<title") else {
        return String::new();
    };
    let Some(open_end) = lower[start..].find('>').map(|i| start + i + 1) else {
        return String::new();
    };
    let close = lower[open_end..]
        .find("</title>")
        .map(|i| open_end + i)
        .unwrap_or(open_end);
    html.get(open_end..close).unwrap_or("").trim().to_string()
}

fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("<!") || s.starts_with("<html") || s.starts_with("<HTML") || s.contains("</")
}

pub struct FetchBrowser {
    client: Client,
    max_chars: usize,
    current: RwLock<Option<PageSnapshot>>,
    closed: RwLock<bool>,
}

impl FetchBrowser {
    pub fn new(timeout_secs: u64, max_chars: usize) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        Ok(Self {
            client,
            max_chars,
            current: RwLock::new(None),
            closed: RwLock::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), BrowserError> {
        if *self.closed.read().unwrap_or_else(PoisonError::into_inner) {
            Err(BrowserError::Closed)
        } else {
            Ok(())
        }
    }

    async fn fetch(&self, url: &str) -> Result<PageSnapshot, BrowserError> {
        let nav_err = |reason: String| BrowserError::Navigation {
            url: url.to_string(),
            reason,
        };
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| nav_err(format!("Request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(nav_err(format!("HTTP {}", resp.status())));
        }
        let final_url = resp.url().to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| nav_err(format!("Read body: {e}")))?;
        let body = body.trim_start_matches('\u{FEFF}');

        let (title, text) = if looks_like_html(body) {
            let text = match from_read(body.as_bytes(), 120) {
                Ok(t) if !t.trim().is_empty() => t,
                _ => strip_html_tags(body),
            };
            (extract_title(body), text)
        } else {
            (String::new(), body.to_string())
        };

        Ok(PageSnapshot {
            url: final_url,
            title,
            text: truncate_chars(&text, self.max_chars),
        })
    }
}

#[async_trait]
impl BrowserHandle for FetchBrowser {
    async fn navigate(&self, url: &str) -> Result<PageSnapshot, BrowserError> {
        self.ensure_open()?;
        let url = validate_url(url)?;
        tracing::info!(url = %url, "browser navigate");
        let snapshot = self.fetch(&url).await?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(snapshot)
    }

    async fn read_page(&self) -> Result<PageSnapshot, BrowserError> {
        self.ensure_open()?;
        let url = self
            .current_url()
            .await
            .ok_or(BrowserError::NoPage)?;
        let snapshot = self.fetch(&url).await?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(snapshot)
    }

    async fn current_url(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|p| p.url.clone())
    }

    async fn close(&self) {
        *self.closed.write().unwrap_or_else(PoisonError::into_inner) = true;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// 每次 open_isolated 新建一个 FetchBrowser（独立连接池，无 cookie）
#[derive(Debug, Clone)]
pub struct FetchBrowserFactory {
    timeout_secs: u64,
    max_chars: usize,
}

impl FetchBrowserFactory {
    pub fn new(timeout_secs: u64, max_chars: usize) -> Self {
        Self {
            timeout_secs,
            max_chars,
        }
    }
}

#[async_trait]
impl BrowserFactory for FetchBrowserFactory {
    async fn open_isolated(&self) -> Result<Arc<dyn BrowserHandle>, BrowserError> {
        Ok(Arc::new(FetchBrowser::new(self.timeout_secs, self.max_chars)?))
    }
}
