pub mod bolha;
pub mod njuskalo;

use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::WebDriver;

use crate::configuration::RunnerSettings;
use crate::domain::criteria::SiteId;
use crate::error::StepError;

pub use bolha::BolhaAdapter;
pub use njuskalo::NjuskaloAdapter;

/// What happened to the consent prompt. Dismissal is best-effort: the run
/// continues regardless of the outcome, but the distinction stays inspectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    Dismissed,
    /// The prompt never appeared within the optional-element timeout.
    NotPresent,
    /// The prompt appeared but the dismissal click failed; swallowed.
    DismissFailed,
}

/// Bounded-wait and pacing knobs shared by every adapter.
#[derive(Debug, Clone, Copy)]
pub struct AdapterTimings {
    pub element_timeout: Duration,
    pub poll_interval: Duration,
    pub type_delay: Duration,
}

impl AdapterTimings {
    pub fn from_settings(settings: &RunnerSettings) -> Self {
        AdapterTimings {
            element_timeout: settings.element_timeout(),
            poll_interval: settings.poll_interval(),
            type_delay: settings.type_delay(),
        }
    }
}

/// Uniform interaction contract over one marketplace's search UI. One
/// concrete variant per [`SiteId`] translates these abstract actions into
/// site-specific element lookups; the workflow depends only on this trait.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn site(&self) -> SiteId;

    /// Navigate to the landing page.
    async fn open(&self) -> Result<(), StepError>;

    /// Best-effort consent dismissal; never escalates.
    async fn dismiss_consent(&self, timeout: Duration) -> ConsentOutcome;

    async fn focus_search_field(&self) -> Result<(), StepError>;
    async fn search_field_visible(&self) -> Result<bool, StepError>;
    async fn search_field_value(&self) -> Result<String, StepError>;

    /// Enter the brand character-paced so the site's live suggestions fire.
    async fn type_search_term(&self, text: &str) -> Result<(), StepError>;
    async fn suggestion_box_visible(&self) -> Result<bool, StepError>;

    async fn open_category_menu(&self) -> Result<(), StepError>;
    /// Polls up to the element timeout for the exact-label option.
    async fn category_option_visible(&self, label: &str) -> Result<bool, StepError>;
    async fn select_category_option(&self, label: &str) -> Result<(), StepError>;

    async fn set_year_range(&self, min: u32, max: u32) -> Result<(), StepError>;
    async fn year_range_values(&self) -> Result<(String, String), StepError>;
    async fn set_max_mileage(&self, km: u32) -> Result<(), StepError>;
    async fn max_mileage_value(&self) -> Result<String, StepError>;

    async fn submit_enabled(&self) -> Result<bool, StepError>;
    async fn submit_filters(&self) -> Result<(), StepError>;

    /// Number of result cards currently rendered; polled after submission
    /// since rendering is asynchronous.
    async fn count_results(&self) -> Result<usize, StepError>;

    /// Free text of the card at `index`, falling back to the card's full text
    /// when it has no distinguished description region. Empty string when
    /// neither yields text.
    async fn read_result_description(&self, index: usize) -> Result<String, StepError>;
}

pub fn adapter_for(site: SiteId, driver: WebDriver, timings: AdapterTimings) -> Box<dyn SiteAdapter> {
    match site {
        SiteId::Njuskalo => Box::new(NjuskaloAdapter::new(driver, timings)),
        SiteId::Bolha => Box::new(BolhaAdapter::new(driver, timings)),
    }
}
