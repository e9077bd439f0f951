//! Review extraction for the two detail page layouts.
//!
//! Both layouts share one pagination loop ([`ReviewCrawl`]); what differs is
//! where fields live, how rating and date are encoded, and which control
//! counts as a usable "next page" link. Those differences sit behind
//! [`ReviewExtractor`].

use crate::cancel::RunControl;
use crate::error::{soft, Result};
use crate::parser;
use crate::selectors::{LayoutSelectors, Selectors};
use async_trait::async_trait;
use waypoint_browser::{ElementHandle, PageDriver, WaitCondition};
use waypoint_core::{Mode, Review, ReviewMetadata, ScrapingConfig};

/// Layout-specific half of review scraping.
#[async_trait]
pub trait ReviewExtractor: Send + Sync {
    /// Layout this extractor handles.
    fn mode(&self) -> Mode;

    /// Selectors of the layout.
    fn layout(&self) -> &LayoutSelectors;

    /// Read rating, title, text and date from one review element.
    ///
    /// Fields that cannot be read are left empty; only a dead session errors.
    async fn parse_metadata(
        &self,
        driver: &dyn PageDriver,
        review: ElementHandle,
    ) -> Result<ReviewMetadata>;

    /// Whether a clickable pagination control really leads to another page.
    async fn accepts_next(&self, driver: &dyn PageDriver, control: ElementHandle) -> Result<bool>;
}

/// "Things to do" attraction pages.
#[derive(Debug, Clone)]
pub struct TodoExtractor {
    layout: LayoutSelectors,
}

impl TodoExtractor {
    #[must_use]
    pub fn new(layout: LayoutSelectors) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl ReviewExtractor for TodoExtractor {
    fn mode(&self) -> Mode {
        Mode::Todo
    }

    fn layout(&self) -> &LayoutSelectors {
        &self.layout
    }

    async fn parse_metadata(
        &self,
        driver: &dyn PageDriver,
        review: ElementHandle,
    ) -> Result<ReviewMetadata> {
        let rating = attribute_of(driver, review, &self.layout.rating, "class")
            .await?
            .and_then(|class| parser::rating_from_bubble_class(&class));
        let title = text_of(driver, review, &self.layout.title).await?;
        let text = text_of(driver, review, &self.layout.text)
            .await?
            .map(|t| parser::collapse_newlines(&t));
        let date = text_of(driver, review, &self.layout.date)
            .await?
            .and_then(|d| parser::experience_date(&d));

        let (month, year) = date.map_or((None, None), |(m, y)| (Some(m), Some(y)));
        Ok(ReviewMetadata {
            rating,
            title,
            text,
            day: None,
            month,
            year,
        })
    }

    async fn accepts_next(&self, driver: &dyn PageDriver, control: ElementHandle) -> Result<bool> {
        if !soft(driver.is_enabled(control).await)?.unwrap_or(false) {
            return Ok(false);
        }
        // the last page renders the control as a disabled span
        let tag = soft(driver.tag_name(control).await)?;
        Ok(tag.as_deref() == Some("a"))
    }
}

/// Generic place pages (hotels, restaurants, landmarks).
#[derive(Debug, Clone)]
pub struct PlaceExtractor {
    layout: LayoutSelectors,
}

impl PlaceExtractor {
    #[must_use]
    pub fn new(layout: LayoutSelectors) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl ReviewExtractor for PlaceExtractor {
    fn mode(&self) -> Mode {
        Mode::Place
    }

    fn layout(&self) -> &LayoutSelectors {
        &self.layout
    }

    async fn parse_metadata(
        &self,
        driver: &dyn PageDriver,
        review: ElementHandle,
    ) -> Result<ReviewMetadata> {
        let rating = attribute_of(driver, review, &self.layout.rating, "aria-label")
            .await?
            .and_then(|label| parser::rating_from_label(&label));
        let title = text_of(driver, review, &self.layout.title).await?;
        let text = text_of(driver, review, &self.layout.text)
            .await?
            .map(|t| parser::collapse_newlines(&t));
        let date = text_of(driver, review, &self.layout.date)
            .await?
            .and_then(|d| parser::written_date(&d));

        let (day, month, year) = match date {
            Some((d, m, y)) => (Some(d), Some(m), Some(y)),
            None => (None, None, None),
        };
        Ok(ReviewMetadata {
            rating,
            title,
            text,
            day,
            month,
            year,
        })
    }

    async fn accepts_next(&self, driver: &dyn PageDriver, control: ElementHandle) -> Result<bool> {
        let label = soft(driver.attribute(control, "aria-label").await)?.flatten();
        Ok(label.as_deref() == Some("Next page"))
    }
}

/// Identify the layout of the current detail page by its review tab marker.
///
/// The attraction layout is tried first; `None` means neither marker showed up
/// and the place has no reviews to scrape.
pub async fn detect_layout(
    driver: &dyn PageDriver,
    selectors: &Selectors,
    config: &ScrapingConfig,
) -> Result<Option<Box<dyn ReviewExtractor>>> {
    let todo = WaitCondition::present(selectors.todo.review_tab.clone());
    if soft(driver.wait_until(&todo, config.review_tab_wait()).await)?.is_some() {
        return Ok(Some(Box::new(TodoExtractor::new(selectors.todo.clone()))));
    }

    let place = WaitCondition::present(selectors.place.review_tab.clone());
    if soft(driver.wait_until(&place, config.review_tab_wait()).await)?.is_some() {
        return Ok(Some(Box::new(PlaceExtractor::new(selectors.place.clone()))));
    }

    Ok(None)
}

/// Paginated review scrape of the currently loaded detail page.
pub struct ReviewCrawl<'a> {
    driver: &'a dyn PageDriver,
    extractor: &'a dyn ReviewExtractor,
    config: &'a ScrapingConfig,
    control: &'a RunControl,
}

/// What one review page produced.
struct ReviewPage {
    reviews: Vec<Review>,
    next: Option<ElementHandle>,
}

impl<'a> ReviewCrawl<'a> {
    #[must_use]
    pub fn new(
        driver: &'a dyn PageDriver,
        extractor: &'a dyn ReviewExtractor,
        config: &'a ScrapingConfig,
        control: &'a RunControl,
    ) -> Self {
        Self {
            driver,
            extractor,
            config,
            control,
        }
    }

    /// Scrape pages until the review limit is passed or pagination ends.
    ///
    /// The limit is checked after each page, so the last page may overshoot it.
    pub async fn collect(&self) -> Result<Vec<Review>> {
        let mut reviews = Vec::new();
        let mut page_number = 1u32;

        loop {
            let Some(page) = self.scrape_page().await? else {
                break;
            };
            tracing::debug!(
                page = page_number,
                count = page.reviews.len(),
                mode = %self.extractor.mode(),
                "scraped review page"
            );
            reviews.extend(page.reviews);

            if reviews.len() > self.config.max_reviews {
                tracing::warn!(
                    limit = self.config.max_reviews,
                    "review limit exceeded, stopping pagination"
                );
                break;
            }

            let Some(next) = page.next else {
                break;
            };
            if soft(self.driver.click(next).await)?.is_none() {
                break;
            }
            page_number += 1;
        }

        Ok(reviews)
    }

    /// Scrape the current page; `None` if its reviews never rendered.
    async fn scrape_page(&self) -> Result<Option<ReviewPage>> {
        let layout = self.extractor.layout();

        soft(
            self.driver
                .scroll_to_end(self.config.scroll_pause(), self.config.max_scroll_rounds)
                .await,
        )?;
        self.control.checkpoint("reviews.scrolled")?;

        let tab = WaitCondition::present(layout.review_tab.clone());
        let Some(tab) = soft(
            self.driver
                .wait_until(&tab, self.config.review_tab_wait())
                .await,
        )?
        .and_then(|found| found.into_iter().next()) else {
            tracing::warn!("could not load reviews");
            return Ok(None);
        };
        self.control.checkpoint("reviews.tab")?;

        let containers = WaitCondition::present_in(tab, layout.review_container.clone());
        let Some(mut containers) = soft(
            self.driver
                .wait_until(&containers, self.config.review_tab_wait())
                .await,
        )?
        else {
            tracing::warn!("review tab rendered without reviews");
            return Ok(None);
        };

        let pagination = if layout.trailing_pagination {
            containers.pop()
        } else if let Some(selector) = &layout.pagination {
            soft(self.driver.find_in(tab, selector).await)?.flatten()
        } else {
            None
        };

        for &container in &containers {
            self.expand(container).await?;
        }

        let mut reviews = Vec::with_capacity(containers.len());
        for &container in &containers {
            let metadata = self.extractor.parse_metadata(self.driver, container).await?;
            let images = self.images(container).await?;
            reviews.push(Review { metadata, images });
        }
        self.control.checkpoint("reviews.page")?;

        let next = match pagination {
            Some(bar) => self.next_control(bar).await?,
            None => None,
        };
        Ok(Some(ReviewPage { reviews, next }))
    }

    /// Click a review's "read more" expander if it offers more text.
    async fn expand(&self, container: ElementHandle) -> Result<()> {
        let layout = self.extractor.layout();
        let Some(button) = soft(self.driver.find_in(container, &layout.read_more).await)?.flatten()
        else {
            return Ok(());
        };
        let label = soft(self.driver.text(button).await)?.unwrap_or_default();
        if !label.contains("more") {
            return Ok(());
        }
        if soft(self.driver.is_enabled(button).await)?.unwrap_or(false) {
            soft(self.driver.click(button).await)?;
        }
        Ok(())
    }

    /// High-resolution image URLs of a review, empty when it has none.
    async fn images(&self, container: ElementHandle) -> Result<Vec<String>> {
        let layout = self.extractor.layout();
        let Some(strip) =
            soft(self.driver.find_in(container, &layout.image_container).await)?.flatten()
        else {
            return Ok(Vec::new());
        };

        soft(self.driver.scroll_into_view(strip).await)?;
        let condition = WaitCondition::present_in(strip, layout.image.clone());
        let Some(images) = soft(
            self.driver
                .wait_until(&condition, self.config.image_load_wait())
                .await,
        )?
        else {
            return Ok(Vec::new());
        };

        let mut urls = Vec::with_capacity(images.len());
        for image in images {
            if let Some(src) = soft(self.driver.attribute(image, "src").await)?.flatten() {
                urls.push(parser::upgrade_image_url(&src, self.config.image_max_width));
            }
        }
        Ok(urls)
    }

    /// The next-page control inside `bar`, if it is clickable and accepted.
    async fn next_control(&self, bar: ElementHandle) -> Result<Option<ElementHandle>> {
        let layout = self.extractor.layout();
        let condition = WaitCondition::clickable_in(bar, layout.next_page.clone());
        let Some(control) = soft(
            self.driver
                .wait_until(&condition, self.config.clickable_wait())
                .await,
        )?
        .and_then(|found| found.into_iter().next()) else {
            return Ok(None);
        };

        if self.extractor.accepts_next(self.driver, control).await? {
            Ok(Some(control))
        } else {
            Ok(None)
        }
    }
}

async fn text_of(
    driver: &dyn PageDriver,
    parent: ElementHandle,
    selector: &str,
) -> Result<Option<String>> {
    let Some(element) = soft(driver.find_in(parent, selector).await)?.flatten() else {
        return Ok(None);
    };
    let text = soft(driver.text(element).await)?;
    Ok(text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty()))
}

async fn attribute_of(
    driver: &dyn PageDriver,
    parent: ElementHandle,
    selector: &str,
    name: &str,
) -> Result<Option<String>> {
    let Some(element) = soft(driver.find_in(parent, selector).await)?.flatten() else {
        return Ok(None);
    };
    Ok(soft(driver.attribute(element, name).await)?.flatten())
}
