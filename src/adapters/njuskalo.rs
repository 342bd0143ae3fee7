use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::components::SelectElement;
use thirtyfour::{By, WebDriver, WebElement};
use tokio::time::sleep;

use crate::adapters::{AdapterTimings, ConsentOutcome, SiteAdapter};
use crate::domain::criteria::SiteId;
use crate::error::StepError;
use crate::services::wait::{poll_until, wait_clickable, wait_displayed};

const BASE_URL: &str = "https://www.njuskalo.hr";

const CONSENT_AGREE: &str = "#didomi-notice-agree-button";
const SEARCH_INPUT: &str = "#keywords";
const SUGGESTION_BOX: &str = "#search-box-results";
const CATEGORIES_BUTTON: &str = r#"//button[normalize-space(.)="Kategorije"]"#;
const YEAR_MIN: &str = r"#yearManufactured\[min\]";
const YEAR_MAX: &str = r"#yearManufactured\[max\]";
const MILEAGE_MAX: &str = r"#mileage\[max\]";
const SUBMIT_BUTTON: &str = "#submitButton";
const RESULT_CARDS: &str =
    "section.EntityList.EntityList--Standard.EntityList--Regular.EntityList--ListItemRegularAd \
     ul.EntityList-items > li.EntityList-item";
const CARD_DESCRIPTION: &str = ".entity-description-main";

fn option_with_label(label: &str) -> By {
    By::XPath(format!(
        r#"//*[@role="option" and normalize-space(.)="{label}"]"#
    ))
}

pub struct NjuskaloAdapter {
    driver: WebDriver,
    timings: AdapterTimings,
}

impl NjuskaloAdapter {
    pub fn new(driver: WebDriver, timings: AdapterTimings) -> Self {
        NjuskaloAdapter { driver, timings }
    }

    async fn wait_visible(&self, css: &'static str, what: &'static str) -> Result<WebElement, StepError> {
        wait_displayed(
            &self.driver,
            By::Css(css),
            what,
            self.timings.element_timeout,
            self.timings.poll_interval,
        )
        .await
    }
}

#[async_trait]
impl SiteAdapter for NjuskaloAdapter {
    fn site(&self) -> SiteId {
        SiteId::Njuskalo
    }

    async fn open(&self) -> Result<(), StepError> {
        self.driver.goto(BASE_URL).await?;
        Ok(())
    }

    async fn dismiss_consent(&self, timeout: Duration) -> ConsentOutcome {
        let button = wait_displayed(
            &self.driver,
            By::Css(CONSENT_AGREE),
            "consent prompt",
            timeout,
            self.timings.poll_interval,
        )
        .await;
        match button {
            Ok(button) => match button.click().await {
                Ok(()) => ConsentOutcome::Dismissed,
                Err(e) => {
                    log::warn!("njuskalo: consent prompt appeared but dismissal failed: {e}");
                    ConsentOutcome::DismissFailed
                }
            },
            Err(_) => ConsentOutcome::NotPresent,
        }
    }

    async fn focus_search_field(&self) -> Result<(), StepError> {
        let field = self.wait_visible(SEARCH_INPUT, "search field").await?;
        field.scroll_into_view().await?;
        field.click().await?;
        Ok(())
    }

    async fn search_field_visible(&self) -> Result<bool, StepError> {
        match self.driver.find(By::Css(SEARCH_INPUT)).await {
            Ok(elem) => Ok(elem.is_displayed().await?),
            Err(_) => Ok(false),
        }
    }

    async fn search_field_value(&self) -> Result<String, StepError> {
        let field = self.driver.find(By::Css(SEARCH_INPUT)).await?;
        Ok(field.value().await?.unwrap_or_default())
    }

    async fn type_search_term(&self, text: &str) -> Result<(), StepError> {
        let field = self.wait_visible(SEARCH_INPUT, "search field").await?;
        for ch in text.chars() {
            field.send_keys(ch.to_string()).await?;
            sleep(self.timings.type_delay).await;
        }
        Ok(())
    }

    async fn suggestion_box_visible(&self) -> Result<bool, StepError> {
        match self.driver.find(By::Css(SUGGESTION_BOX)).await {
            Ok(elem) => Ok(elem.is_displayed().await?),
            Err(_) => Ok(false),
        }
    }

    async fn open_category_menu(&self) -> Result<(), StepError> {
        let button = wait_displayed(
            &self.driver,
            By::XPath(CATEGORIES_BUTTON),
            "categories button",
            self.timings.element_timeout,
            self.timings.poll_interval,
        )
        .await?;
        button.click().await?;
        Ok(())
    }

    async fn category_option_visible(&self, label: &str) -> Result<bool, StepError> {
        let found = poll_until(self.timings.element_timeout, self.timings.poll_interval, || {
            let driver = self.driver.clone();
            let by = option_with_label(label);
            async move {
                match driver.find(by).await {
                    Ok(elem) => matches!(elem.is_displayed().await, Ok(true)).then_some(()),
                    Err(_) => None,
                }
            }
        })
        .await;
        Ok(found.is_some())
    }

    async fn select_category_option(&self, label: &str) -> Result<(), StepError> {
        let option = poll_until(self.timings.element_timeout, self.timings.poll_interval, || {
            let driver = self.driver.clone();
            let by = option_with_label(label);
            async move {
                match driver.find(by).await {
                    Ok(elem) => match elem.is_displayed().await {
                        Ok(true) => Some(elem),
                        _ => None,
                    },
                    Err(_) => None,
                }
            }
        })
        .await
        .ok_or_else(|| StepError::OptionNotFound {
            label: label.to_string(),
        })?;

        if let Err(e) = option.scroll_into_view().await {
            log::warn!("njuskalo: could not scroll option {label:?} into view: {e}");
        }
        option.click().await?;
        Ok(())
    }

    async fn set_year_range(&self, min: u32, max: u32) -> Result<(), StepError> {
        let year_min = self.wait_visible(YEAR_MIN, "year-from select").await?;
        SelectElement::new(&year_min)
            .await?
            .select_by_value(&min.to_string())
            .await?;

        let year_max = self.wait_visible(YEAR_MAX, "year-to select").await?;
        SelectElement::new(&year_max)
            .await?
            .select_by_value(&max.to_string())
            .await?;
        Ok(())
    }

    async fn year_range_values(&self) -> Result<(String, String), StepError> {
        let min = self.driver.find(By::Css(YEAR_MIN)).await?;
        let max = self.driver.find(By::Css(YEAR_MAX)).await?;
        Ok((
            min.value().await?.unwrap_or_default(),
            max.value().await?.unwrap_or_default(),
        ))
    }

    async fn set_max_mileage(&self, km: u32) -> Result<(), StepError> {
        let field = self.wait_visible(MILEAGE_MAX, "mileage field").await?;
        field.clear().await?;
        field.send_keys(km.to_string()).await?;
        Ok(())
    }

    async fn max_mileage_value(&self) -> Result<String, StepError> {
        let field = self.driver.find(By::Css(MILEAGE_MAX)).await?;
        Ok(field.value().await?.unwrap_or_default())
    }

    async fn submit_enabled(&self) -> Result<bool, StepError> {
        match self.driver.find(By::Css(SUBMIT_BUTTON)).await {
            Ok(elem) => Ok(elem.is_clickable().await?),
            Err(_) => Ok(false),
        }
    }

    async fn submit_filters(&self) -> Result<(), StepError> {
        let button = wait_clickable(
            &self.driver,
            By::Css(SUBMIT_BUTTON),
            "submit button",
            self.timings.element_timeout,
            self.timings.poll_interval,
        )
        .await?;
        button.click().await?;
        Ok(())
    }

    async fn count_results(&self) -> Result<usize, StepError> {
        let cards = self.driver.find_all(By::Css(RESULT_CARDS)).await?;
        Ok(cards.len())
    }

    async fn read_result_description(&self, index: usize) -> Result<String, StepError> {
        let cards = self.driver.find_all(By::Css(RESULT_CARDS)).await?;
        let card = match cards.get(index) {
            Some(card) => card,
            None => return Ok(String::new()),
        };
        match card.find(By::Css(CARD_DESCRIPTION)).await {
            Ok(description) => Ok(description.text().await?.trim().to_string()),
            Err(_) => Ok(card.text().await?.trim().to_string()),
        }
    }
}
