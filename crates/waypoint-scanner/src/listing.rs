//! Search result listing crawl.

use crate::cancel::RunControl;
use crate::error::{soft, Result, ScanError};
use crate::parser;
use crate::selectors::ListingSelectors;
use waypoint_browser::{ElementHandle, PageDriver, WaitCondition};
use waypoint_core::{ListingEntry, ScrapingConfig};

/// Walks the paginated result listing and collects one entry per card.
pub struct ListingCrawl<'a> {
    driver: &'a dyn PageDriver,
    selectors: &'a ListingSelectors,
    config: &'a ScrapingConfig,
    control: &'a RunControl,
}

impl<'a> ListingCrawl<'a> {
    #[must_use]
    pub fn new(
        driver: &'a dyn PageDriver,
        selectors: &'a ListingSelectors,
        config: &'a ScrapingConfig,
        control: &'a RunControl,
    ) -> Self {
        Self {
            driver,
            selectors,
            config,
            control,
        }
    }

    /// Collect entries across pages, starting from the listing currently shown.
    ///
    /// Fails with [`ScanError::ListingUnavailable`] when the first page never
    /// renders; a later page timing out just ends the crawl. Pagination stops
    /// before loading a page once more than `max_places` entries were seen.
    pub async fn collect(&self) -> Result<Vec<ListingEntry>> {
        let mut entries: Vec<ListingEntry> = Vec::new();
        let mut page = 1u32;

        loop {
            soft(
                self.driver
                    .scroll_to_end(self.config.scroll_pause(), self.config.max_scroll_rounds)
                    .await,
            )?;
            self.control.checkpoint("listing.scrolled")?;

            let cards = WaitCondition::present(self.selectors.result_card.clone());
            match self
                .driver
                .wait_until(&cards, self.config.results_wait())
                .await
            {
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) if page == 1 => {
                    return Err(ScanError::ListingUnavailable(e.to_string()));
                }
                Err(e) => {
                    tracing::warn!(page, "listing page did not load: {}", e);
                    break;
                }
            }

            let found = self.read_page(page).await?;
            tracing::debug!(page, count = found.len(), "read listing page");
            entries.extend(found);
            self.control.checkpoint("listing.page")?;

            if entries.len() > self.config.max_places {
                tracing::warn!(
                    limit = self.config.max_places,
                    "listing exceeded place limit, stopping pagination"
                );
                break;
            }

            let Some(next) = self.next_control().await? else {
                break;
            };
            if soft(self.driver.click(next).await)?.is_none() {
                break;
            }
            page += 1;
        }

        Ok(entries)
    }

    async fn read_page(&self, page: u32) -> Result<Vec<ListingEntry>> {
        let contents = soft(self.driver.find_all(&self.selectors.result_content).await)?
            .unwrap_or_default();

        let mut entries = Vec::with_capacity(contents.len());
        for content in contents {
            if let Some(entry) = self.read_card(content, page).await? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// One listing entry, `None` for cards without a resolvable detail URL.
    async fn read_card(&self, content: ElementHandle, page: u32) -> Result<Option<ListingEntry>> {
        let name = match soft(self.driver.find_in(content, &self.selectors.result_title).await)?
            .flatten()
        {
            Some(title) => soft(self.driver.text(title).await)?.unwrap_or_default(),
            None => String::new(),
        };

        let base = &self.config.base_url;
        let onclick = soft(self.driver.attribute(content, "onclick").await)?.flatten();
        let mut url = onclick.and_then(|js| parser::listing_url_from_onclick(&js, base));
        if url.is_none() {
            let href = soft(self.driver.attribute(content, "href").await)?.flatten();
            url = href.and_then(|h| parser::absolute_url(base, &h));
        }

        let Some(url) = url else {
            tracing::debug!(name = %name, "listing card without detail url, skipping");
            return Ok(None);
        };
        Ok(Some(ListingEntry {
            name: name.trim().to_string(),
            url,
            page,
        }))
    }

    /// The enabled "next" control, if it names a page to go to.
    async fn next_control(&self) -> Result<Option<ElementHandle>> {
        let Some(bar) = soft(self.driver.find(&self.selectors.pagination).await)?.flatten() else {
            return Ok(None);
        };
        let condition = WaitCondition::clickable_in(bar, self.selectors.next_page.clone());
        let Some(next) = soft(
            self.driver
                .wait_until(&condition, self.config.clickable_wait())
                .await,
        )?
        .and_then(|found| found.into_iter().next()) else {
            return Ok(None);
        };

        let target = soft(self.driver.attribute(next, "data-page").await)?.flatten();
        match target {
            Some(target) => {
                tracing::info!("going to page {} of results", target);
                Ok(Some(next))
            }
            None => Ok(None),
        }
    }
}
