//! CSS selectors for the review site.
//!
//! Markup changes often; everything the crawler looks for lives here so a
//! layout change is a data change.

use serde::{Deserialize, Serialize};

/// Home page search controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSelectors {
    /// Free-text destination input
    pub search_box: String,
    /// Container holding the category filter tabs
    pub filter_list: String,
    /// Individual filter links, relative to `filter_list`
    pub filter_link: String,
}

/// Search result listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Marker that results have rendered
    pub result_card: String,
    /// One clickable result body per place
    pub result_content: String,
    /// Place name, relative to `result_content`
    pub result_title: String,
    /// Pagination bar
    pub pagination: String,
    /// Next page control, relative to `pagination`
    pub next_page: String,
}

/// One of the two place detail layouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSelectors {
    /// Review section marker; also identifies the layout
    pub review_tab: String,
    /// One element per review, relative to `review_tab`
    pub review_container: String,
    /// Last `review_container` match is the pagination bar, not a review
    pub trailing_pagination: bool,
    /// Truncated-text expander, relative to a review
    pub read_more: String,
    /// Rating element, relative to a review
    pub rating: String,
    /// Review title, relative to a review
    pub title: String,
    /// Review body, relative to a review
    pub text: String,
    /// Review date line, relative to a review
    pub date: String,
    /// Photo strip, relative to a review
    pub image_container: String,
    /// Photos, relative to `image_container`
    pub image: String,
    /// Pagination bar relative to `review_tab`; `None` with `trailing_pagination`
    pub pagination: Option<String>,
    /// Next page control, relative to the pagination bar
    pub next_page: String,
}

/// Every selector the crawler uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selectors {
    pub search: SearchSelectors,
    pub listing: ListingSelectors,
    /// "Things to do" attraction layout
    pub todo: LayoutSelectors,
    /// Generic place layout
    pub place: LayoutSelectors,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            search: SearchSelectors {
                search_box: "input.qjfqs[placeholder='Where to?']".to_string(),
                filter_list: "div.ui_tabs#search-filters > ul:first-of-type".to_string(),
                filter_link: "li a".to_string(),
            },
            listing: ListingSelectors {
                result_card: "div.result-card".to_string(),
                result_content: "div.result-content-columns".to_string(),
                result_title: "div.result-title > span:first-child".to_string(),
                pagination: "div.ui_pagination".to_string(),
                next_page: "a.ui_button.nav.next".to_string(),
            },
            todo: LayoutSelectors {
                review_tab: "div.FTCTN".to_string(),
                review_container: "div.lgfjP".to_string(),
                trailing_pagination: false,
                read_more: "span.Ignyf".to_string(),
                rating: "span.ui_bubble_rating".to_string(),
                title: "div.KgQgP a span span".to_string(),
                text: "div.fIrGe q span".to_string(),
                date: "span.teHYY".to_string(),
                image_container: "div.pDrIj".to_string(),
                image: "img".to_string(),
                pagination: Some("div.ui_pagination".to_string()),
                next_page: ".ui_button.nav.next".to_string(),
            },
            place: LayoutSelectors {
                review_tab: "div.LbPSX".to_string(),
                review_container: ":scope > div".to_string(),
                trailing_pagination: true,
                read_more: "div.lszDU button span".to_string(),
                rating: "svg.UctUV".to_string(),
                title: "div.biGQs._P.fiohW.qWPrE.ncFvv.fOtGX a span".to_string(),
                text: "div.biGQs._P.pZUbB.KxBGd > span".to_string(),
                date: "div.TreSq > div".to_string(),
                image_container: "div.LblVz".to_string(),
                image: "img".to_string(),
                pagination: None,
                next_page: "div.UCacc a".to_string(),
            },
        }
    }
}
