use crate::error::{BrowserError, Result};
use std::time::Duration;

/// Interval between condition probes while waiting.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Opaque reference to an element of the current document.
///
/// Handles are invalidated by navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(u64);

impl ElementHandle {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Where a selector is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Document,
    Within(ElementHandle),
}

/// Condition a bounded wait polls for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// At least one element matches; yields every match
    Present { scope: Scope, selector: String },
    /// The first match is enabled; yields that element
    Clickable { scope: Scope, selector: String },
}

impl WaitCondition {
    pub fn present(selector: impl Into<String>) -> Self {
        Self::Present {
            scope: Scope::Document,
            selector: selector.into(),
        }
    }

    pub fn present_in(parent: ElementHandle, selector: impl Into<String>) -> Self {
        Self::Present {
            scope: Scope::Within(parent),
            selector: selector.into(),
        }
    }

    pub fn clickable(selector: impl Into<String>) -> Self {
        Self::Clickable {
            scope: Scope::Document,
            selector: selector.into(),
        }
    }

    pub fn clickable_in(parent: ElementHandle, selector: impl Into<String>) -> Self {
        Self::Clickable {
            scope: Scope::Within(parent),
            selector: selector.into(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Present { selector, .. } => format!("presence of '{selector}'"),
            Self::Clickable { selector, .. } => format!("clickable '{selector}'"),
        }
    }
}

/// The capability surface the scrape pipeline needs from a browser.
///
/// One driver owns one navigation context; callers serialize all use.
#[async_trait::async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to a URL and wait for the load event.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// All elements matching a CSS selector in the document.
    async fn find_all(&self, selector: &str) -> Result<Vec<ElementHandle>>;

    /// All elements matching a CSS selector below `parent`.
    async fn find_all_in(&self, parent: ElementHandle, selector: &str)
        -> Result<Vec<ElementHandle>>;

    /// Click an element.
    async fn click(&self, handle: ElementHandle) -> Result<()>;

    /// Type text into an input and submit it with Enter.
    async fn submit_text(&self, handle: ElementHandle, text: &str) -> Result<()>;

    /// Scroll an element into the viewport.
    async fn scroll_into_view(&self, handle: ElementHandle) -> Result<()>;

    /// Scroll the window to the bottom of the document.
    async fn scroll_to_bottom(&self) -> Result<()>;

    /// Current scroll height of the document body.
    async fn document_height(&self) -> Result<f64>;

    /// Rendered text of an element.
    async fn text(&self, handle: ElementHandle) -> Result<String>;

    /// Attribute value of an element, `None` if absent.
    async fn attribute(&self, handle: ElementHandle, name: &str) -> Result<Option<String>>;

    /// Lower-case tag name of an element.
    async fn tag_name(&self, handle: ElementHandle) -> Result<String>;

    /// Close the session. Further calls fail.
    async fn close(&self) -> Result<()>;

    /// First element matching a selector in the document.
    async fn find(&self, selector: &str) -> Result<Option<ElementHandle>> {
        Ok(self.find_all(selector).await?.into_iter().next())
    }

    /// First element matching a selector below `parent`.
    async fn find_in(&self, parent: ElementHandle, selector: &str) -> Result<Option<ElementHandle>> {
        Ok(self.find_all_in(parent, selector).await?.into_iter().next())
    }

    /// Whether an element accepts interaction.
    async fn is_enabled(&self, handle: ElementHandle) -> Result<bool> {
        if self.attribute(handle, "disabled").await?.is_some() {
            return Ok(false);
        }
        let aria = self.attribute(handle, "aria-disabled").await?;
        Ok(aria.as_deref() != Some("true"))
    }

    /// Poll `condition` until it holds or `timeout` expires.
    ///
    /// The condition is always probed at least once, so a zero timeout is a
    /// single check. Non-fatal probe errors count as "not yet".
    async fn wait_until(
        &self,
        condition: &WaitCondition,
        timeout: Duration,
    ) -> Result<Vec<ElementHandle>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.probe(condition).await {
                Ok(Some(found)) => return Ok(found),
                Ok(None) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::trace!("probe failed, retrying: {}", e),
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "{} after {:?}",
                    condition.describe(),
                    timeout
                )));
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Evaluate a wait condition once.
    async fn probe(&self, condition: &WaitCondition) -> Result<Option<Vec<ElementHandle>>> {
        let (scope, selector) = match condition {
            WaitCondition::Present { scope, selector }
            | WaitCondition::Clickable { scope, selector } => (*scope, selector.as_str()),
        };
        let found = match scope {
            Scope::Document => self.find_all(selector).await?,
            Scope::Within(parent) => self.find_all_in(parent, selector).await?,
        };
        match condition {
            WaitCondition::Present { .. } => Ok((!found.is_empty()).then_some(found)),
            WaitCondition::Clickable { .. } => match found.first() {
                Some(&first) if self.is_enabled(first).await? => Ok(Some(vec![first])),
                _ => Ok(None),
            },
        }
    }

    /// Scroll to the bottom repeatedly until lazy loading stops growing the page.
    async fn scroll_to_end(&self, pause: Duration, max_rounds: u32) -> Result<()> {
        let mut last_height = self.document_height().await?;
        for _ in 0..max_rounds {
            self.scroll_to_bottom().await?;
            tokio::time::sleep(pause).await;
            let height = self.document_height().await?;
            if (height - last_height).abs() < f64::EPSILON {
                break;
            }
            last_height = height;
        }
        Ok(())
    }
}
