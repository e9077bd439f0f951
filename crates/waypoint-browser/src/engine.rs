use crate::actions::{ElementHandle, PageDriver};
use crate::error::{BrowserError, Result};
use crate::fingerprint::Fingerprint;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

fn map_cdp(err: CdpError) -> BrowserError {
    match err {
        CdpError::Timeout => BrowserError::Timeout(err.to_string()),
        CdpError::NotFound => BrowserError::SelectorNotFound(err.to_string()),
        CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            BrowserError::SessionClosed(err.to_string())
        }
        other => BrowserError::Command(other.to_string()),
    }
}

/// Headless Chromium session driving a single page.
///
/// Elements found on the page are kept in a registry keyed by
/// [`ElementHandle`]; navigating away drops every entry.
pub struct BrowserEngine {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: JoinHandle<()>,
    elements: Mutex<HashMap<u64, Element>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    fingerprint: Fingerprint,
}

impl BrowserEngine {
    /// Launch Chromium with the given settings and open a blank page.
    pub async fn launch(settings: &waypoint_core::BrowserConfig) -> Result<Self> {
        let fingerprint = Fingerprint::for_config(settings);

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .request_timeout(Duration::from_secs(settings.request_timeout_secs))
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        page.set_user_agent(fingerprint.user_agent.as_str())
            .await
            .map_err(map_cdp)?;

        tracing::info!(
            headless = settings.headless,
            width = fingerprint.viewport_width,
            height = fingerprint.viewport_height,
            "Browser launched"
        );

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler,
            elements: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            fingerprint,
        })
    }

    /// Identity this session presents.
    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::SessionClosed("browser already closed".into()));
        }
        Ok(())
    }

    fn register(&self, registry: &mut HashMap<u64, Element>, found: Vec<Element>) -> Vec<ElementHandle> {
        found
            .into_iter()
            .map(|element| {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                registry.insert(id, element);
                ElementHandle::new(id)
            })
            .collect()
    }

    async fn call_on(&self, handle: ElementHandle, function: &str) -> Result<Option<serde_json::Value>> {
        self.ensure_open()?;
        let registry = self.elements.lock().await;
        let element = registry
            .get(&handle.id())
            .ok_or(BrowserError::StaleHandle(handle.id()))?;
        let returns = element
            .call_js_fn(function, false)
            .await
            .map_err(map_cdp)?;
        Ok(returns.result.value)
    }
}

#[async_trait::async_trait]
impl PageDriver for BrowserEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.ensure_open()?;
        self.elements.lock().await.clear();
        tracing::debug!("Navigating to {}", url);
        self.page.goto(url).await.map_err(|e| match map_cdp(e) {
            BrowserError::Command(msg) => BrowserError::NavigationError(format!("{url}: {msg}")),
            other => other,
        })?;
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        self.ensure_open()?;
        let found = match self.page.find_elements(selector).await {
            Ok(found) => found,
            Err(CdpError::NotFound) => Vec::new(),
            Err(e) => return Err(map_cdp(e)),
        };
        let mut registry = self.elements.lock().await;
        Ok(self.register(&mut registry, found))
    }

    async fn find_all_in(
        &self,
        parent: ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>> {
        self.ensure_open()?;
        let mut registry = self.elements.lock().await;
        let element = registry
            .get(&parent.id())
            .ok_or(BrowserError::StaleHandle(parent.id()))?;
        let found = match element.find_elements(selector).await {
            Ok(found) => found,
            Err(CdpError::NotFound) => Vec::new(),
            Err(e) => return Err(map_cdp(e)),
        };
        Ok(self.register(&mut registry, found))
    }

    async fn click(&self, handle: ElementHandle) -> Result<()> {
        // script click works on elements hidden behind overlays
        self.call_on(handle, "function() { this.click(); }").await?;
        Ok(())
    }

    async fn submit_text(&self, handle: ElementHandle, text: &str) -> Result<()> {
        self.ensure_open()?;
        let registry = self.elements.lock().await;
        let element = registry
            .get(&handle.id())
            .ok_or(BrowserError::StaleHandle(handle.id()))?;
        element.click().await.map_err(map_cdp)?;
        element.type_str(text).await.map_err(map_cdp)?;
        element.press_key("Enter").await.map_err(map_cdp)?;
        Ok(())
    }

    async fn scroll_into_view(&self, handle: ElementHandle) -> Result<()> {
        self.call_on(handle, "function() { this.scrollIntoView({block: 'center'}); }")
            .await?;
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.ensure_open()?;
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight);")
            .await
            .map_err(map_cdp)?;
        Ok(())
    }

    async fn document_height(&self) -> Result<f64> {
        self.ensure_open()?;
        let result = self
            .page
            .evaluate("document.body.scrollHeight")
            .await
            .map_err(map_cdp)?;
        result
            .into_value::<f64>()
            .map_err(|e| BrowserError::Command(format!("scroll height: {e}")))
    }

    async fn text(&self, handle: ElementHandle) -> Result<String> {
        let value = self
            .call_on(handle, "function() { return this.innerText || this.textContent || ''; }")
            .await?;
        Ok(value
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default())
    }

    async fn attribute(&self, handle: ElementHandle, name: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        let registry = self.elements.lock().await;
        let element = registry
            .get(&handle.id())
            .ok_or(BrowserError::StaleHandle(handle.id()))?;
        element.attribute(name).await.map_err(map_cdp)
    }

    async fn tag_name(&self, handle: ElementHandle) -> Result<String> {
        let value = self
            .call_on(handle, "function() { return this.tagName.toLowerCase(); }")
            .await?;
        Ok(value
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.elements.lock().await.clear();

        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!("Browser close failed: {}", e);
            }
            if let Err(e) = browser.wait().await {
                tracing::warn!("Browser process wait failed: {}", e);
            }
        }
        self.handler.abort();
        tracing::info!("Browser closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdp_error_mapping() {
        assert!(map_cdp(CdpError::Timeout).is_timeout());
        assert!(map_cdp(CdpError::NoResponse).is_fatal());
        assert!(matches!(
            map_cdp(CdpError::NotFound),
            BrowserError::SelectorNotFound(_)
        ));
        assert!(matches!(
            map_cdp(CdpError::ChromeMessage("boom".into())),
            BrowserError::Command(_)
        ));
    }
}
