use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::timeout;

use crate::adapters::{ConsentOutcome, SiteAdapter};
use crate::domain::criteria::SearchCriteria;
use crate::domain::listing::{extract_facts, ExtractedFacts};
use crate::error::{StepError, WorkflowError};
use crate::services::session::Session;
use crate::services::wait::poll_until;

/// Linear state machine of one search-and-filter run. Every transition is an
/// adapter suspension point; nothing branches except the best-effort consent
/// step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    Open,
    Consent,
    FocusSearch,
    EnterTerm,
    OpenCategoryMenu,
    SelectCategory,
    SetYearRange,
    SetMileage,
    SubmitFilters,
    AwaitResults,
    CollectDescriptions,
    Done,
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStep::Open => "open",
            WorkflowStep::Consent => "dismiss-consent",
            WorkflowStep::FocusSearch => "focus-search",
            WorkflowStep::EnterTerm => "enter-term",
            WorkflowStep::OpenCategoryMenu => "open-category-menu",
            WorkflowStep::SelectCategory => "select-category",
            WorkflowStep::SetYearRange => "set-year-range",
            WorkflowStep::SetMileage => "set-mileage",
            WorkflowStep::SubmitFilters => "submit-filters",
            WorkflowStep::AwaitResults => "await-results",
            WorkflowStep::CollectDescriptions => "collect-descriptions",
            WorkflowStep::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Step currently in flight, shared with the timeout wrapper so a cancelled
/// run can still name where it died.
#[derive(Clone)]
struct Progress(Arc<Mutex<WorkflowStep>>);

impl Progress {
    fn new() -> Self {
        Progress(Arc::new(Mutex::new(WorkflowStep::Open)))
    }

    fn set(&self, step: WorkflowStep) {
        *self.0.lock().unwrap() = step;
    }

    fn current(&self) -> WorkflowStep {
        *self.0.lock().unwrap()
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub consent_timeout: Duration,
    pub run_timeout: Duration,
    pub poll_interval: Duration,
    /// How many result cards to read descriptions from, at most.
    pub result_card_limit: usize,
}

/// What one run produced, for the caller's assertions.
#[derive(Debug)]
pub struct RunReport {
    pub consent: ConsentOutcome,
    pub facts: Vec<ExtractedFacts>,
}

async fn step<T, F>(progress: &Progress, at: WorkflowStep, action: F) -> Result<T, WorkflowError>
where
    F: Future<Output = Result<T, StepError>>,
{
    progress.set(at);
    action.await.map_err(|source| WorkflowError { step: at, source })
}

async fn drive(
    adapter: &dyn SiteAdapter,
    criteria: &SearchCriteria,
    opts: &RunOptions,
    progress: &Progress,
) -> Result<RunReport, WorkflowError> {
    let site = adapter.site();
    log::info!("{site}: searching {:?}, year {}..={}, under {} km",
        criteria.brand, criteria.min_year, criteria.max_year, criteria.max_mileage_km);

    step(progress, WorkflowStep::Open, adapter.open()).await?;

    progress.set(WorkflowStep::Consent);
    let consent = adapter.dismiss_consent(opts.consent_timeout).await;
    log::info!("{site}: consent prompt: {consent:?}");

    step(progress, WorkflowStep::FocusSearch, adapter.focus_search_field()).await?;
    step(progress, WorkflowStep::FocusSearch, async {
        match adapter.search_field_visible().await? {
            true => Ok(()),
            false => Err(StepError::CheckpointFailed {
                what: "search field visible after focus",
                detail: "field not displayed".to_string(),
            }),
        }
    })
    .await?;

    step(progress, WorkflowStep::EnterTerm, adapter.type_search_term(&criteria.brand)).await?;
    step(progress, WorkflowStep::EnterTerm, async {
        let value = adapter.search_field_value().await?;
        if value != criteria.brand {
            return Err(StepError::CheckpointFailed {
                what: "search field echoes the term",
                detail: format!("field holds {value:?}, typed {:?}", criteria.brand),
            });
        }
        match adapter.suggestion_box_visible().await? {
            true => Ok(()),
            false => Err(StepError::CheckpointFailed {
                what: "suggestion box visible",
                detail: "no suggestions appeared after typing".to_string(),
            }),
        }
    })
    .await?;

    step(progress, WorkflowStep::OpenCategoryMenu, adapter.open_category_menu()).await?;

    step(progress, WorkflowStep::SelectCategory, async {
        match adapter.category_option_visible(&criteria.brand).await? {
            true => Ok(()),
            false => Err(StepError::OptionNotFound {
                label: criteria.brand.clone(),
            }),
        }
    })
    .await?;
    step(
        progress,
        WorkflowStep::SelectCategory,
        adapter.select_category_option(&criteria.brand),
    )
    .await?;

    step(
        progress,
        WorkflowStep::SetYearRange,
        adapter.set_year_range(criteria.min_year, criteria.max_year),
    )
    .await?;
    step(progress, WorkflowStep::SetYearRange, async {
        let (min, max) = adapter.year_range_values().await?;
        if min != criteria.min_year.to_string() || max != criteria.max_year.to_string() {
            return Err(StepError::CheckpointFailed {
                what: "year controls echo the range",
                detail: format!("controls hold ({min:?}, {max:?})"),
            });
        }
        Ok(())
    })
    .await?;

    step(
        progress,
        WorkflowStep::SetMileage,
        adapter.set_max_mileage(criteria.max_mileage_km),
    )
    .await?;
    step(progress, WorkflowStep::SetMileage, async {
        let value = adapter.max_mileage_value().await?;
        if value != criteria.max_mileage_km.to_string() {
            return Err(StepError::CheckpointFailed {
                what: "mileage control echoes the limit",
                detail: format!("control holds {value:?}"),
            });
        }
        Ok(())
    })
    .await?;

    step(progress, WorkflowStep::SubmitFilters, async {
        match adapter.submit_enabled().await? {
            true => Ok(()),
            false => Err(StepError::CheckpointFailed {
                what: "submit control enabled",
                detail: "control not clickable".to_string(),
            }),
        }
    })
    .await?;
    step(progress, WorkflowStep::SubmitFilters, adapter.submit_filters()).await?;

    // Result rendering is asynchronous relative to submission; poll with no
    // retry cap of its own, the enclosing run timeout is the bound.
    progress.set(WorkflowStep::AwaitResults);
    let count = poll_until(opts.run_timeout, opts.poll_interval, move || async move {
        match adapter.count_results().await {
            Ok(n) if n > 0 => Some(n),
            _ => None,
        }
    })
    .await
    .ok_or(WorkflowError {
        step: WorkflowStep::AwaitResults,
        source: StepError::ElementNotReady {
            what: "result cards",
            selector: "result list".to_string(),
        },
    })?;
    log::info!("{site}: {count} result cards rendered");

    progress.set(WorkflowStep::CollectDescriptions);
    let take = count.min(opts.result_card_limit);
    let mut facts = Vec::with_capacity(take);
    for index in 0..take {
        let text = adapter
            .read_result_description(index)
            .await
            .map_err(|source| WorkflowError {
                step: WorkflowStep::CollectDescriptions,
                source,
            })?;
        if text.is_empty() {
            log::warn!("{site}: card #{} has no description text, skipped", index + 1);
            continue;
        }
        let extracted = extract_facts(&text);
        log::info!("{site}: card #{}: {extracted:?}", index + 1);
        facts.push(extracted);
    }

    progress.set(WorkflowStep::Done);
    Ok(RunReport { consent, facts })
}

/// Execute the full sequence against one adapter under the overall run
/// timeout. Expiry unwinds the run and reports the step that was in flight.
pub async fn execute(
    adapter: &dyn SiteAdapter,
    criteria: &SearchCriteria,
    opts: &RunOptions,
) -> Result<RunReport, WorkflowError> {
    let progress = Progress::new();
    match timeout(opts.run_timeout, drive(adapter, criteria, opts, &progress)).await {
        Ok(result) => result,
        Err(_elapsed) => Err(WorkflowError {
            step: progress.current(),
            source: StepError::RunTimeout,
        }),
    }
}

/// [`execute`] plus guaranteed release of the session on every exit path,
/// including cancellation.
pub async fn run(
    session: Session,
    adapter: Box<dyn SiteAdapter>,
    criteria: &SearchCriteria,
    opts: &RunOptions,
) -> Result<RunReport, WorkflowError> {
    let result = execute(adapter.as_ref(), criteria, opts).await;
    if let Err(e) = session.close().await {
        log::error!("failed to close webdriver session: {e}");
    }
    result
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::criteria::{violations, SiteId};

    struct MockAdapter {
        descriptions: Vec<&'static str>,
        results_render: bool,
        category_appears: bool,
        typed: StdMutex<String>,
        mileage: StdMutex<String>,
        years: StdMutex<(String, String)>,
    }

    impl MockAdapter {
        fn with_descriptions(descriptions: Vec<&'static str>) -> Self {
            MockAdapter {
                descriptions,
                results_render: true,
                category_appears: true,
                typed: StdMutex::new(String::new()),
                mileage: StdMutex::new(String::new()),
                years: StdMutex::new((String::new(), String::new())),
            }
        }
    }

    #[async_trait]
    impl SiteAdapter for MockAdapter {
        fn site(&self) -> SiteId {
            SiteId::Njuskalo
        }

        async fn open(&self) -> Result<(), StepError> {
            Ok(())
        }

        async fn dismiss_consent(&self, _timeout: Duration) -> ConsentOutcome {
            ConsentOutcome::NotPresent
        }

        async fn focus_search_field(&self) -> Result<(), StepError> {
            Ok(())
        }

        async fn search_field_visible(&self) -> Result<bool, StepError> {
            Ok(true)
        }

        async fn search_field_value(&self) -> Result<String, StepError> {
            Ok(self.typed.lock().unwrap().clone())
        }

        async fn type_search_term(&self, text: &str) -> Result<(), StepError> {
            *self.typed.lock().unwrap() = text.to_string();
            Ok(())
        }

        async fn suggestion_box_visible(&self) -> Result<bool, StepError> {
            Ok(true)
        }

        async fn open_category_menu(&self) -> Result<(), StepError> {
            Ok(())
        }

        async fn category_option_visible(&self, _label: &str) -> Result<bool, StepError> {
            Ok(self.category_appears)
        }

        async fn select_category_option(&self, label: &str) -> Result<(), StepError> {
            match self.category_appears {
                true => Ok(()),
                false => Err(StepError::OptionNotFound {
                    label: label.to_string(),
                }),
            }
        }

        async fn set_year_range(&self, min: u32, max: u32) -> Result<(), StepError> {
            *self.years.lock().unwrap() = (min.to_string(), max.to_string());
            Ok(())
        }

        async fn year_range_values(&self) -> Result<(String, String), StepError> {
            Ok(self.years.lock().unwrap().clone())
        }

        async fn set_max_mileage(&self, km: u32) -> Result<(), StepError> {
            *self.mileage.lock().unwrap() = km.to_string();
            Ok(())
        }

        async fn max_mileage_value(&self) -> Result<String, StepError> {
            Ok(self.mileage.lock().unwrap().clone())
        }

        async fn submit_enabled(&self) -> Result<bool, StepError> {
            Ok(true)
        }

        async fn submit_filters(&self) -> Result<(), StepError> {
            Ok(())
        }

        async fn count_results(&self) -> Result<usize, StepError> {
            match self.results_render {
                true => Ok(self.descriptions.len()),
                false => Ok(0),
            }
        }

        async fn read_result_description(&self, index: usize) -> Result<String, StepError> {
            Ok(self.descriptions[index].to_string())
        }
    }

    fn criteria() -> SearchCriteria {
        SearchCriteria {
            brand: "BMW".to_string(),
            min_year: 2015,
            max_year: 2020,
            max_mileage_km: 150000,
        }
    }

    fn options() -> RunOptions {
        RunOptions {
            consent_timeout: Duration::from_millis(100),
            run_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(50),
            result_card_limit: 5,
        }
    }

    #[tokio::test]
    async fn successful_run_collects_facts_in_order() {
        let adapter = MockAdapter::with_descriptions(vec![
            "BMW 320d 2019, 120.000 km, odli\u{10d}no stanje",
            "BMW 118i, 2016, 95.000 km",
            "BMW X1, registriran, nova guma",
        ]);
        let report = execute(&adapter, &criteria(), &options()).await.unwrap();

        assert_eq!(report.consent, ConsentOutcome::NotPresent);
        assert_eq!(report.facts.len(), 3);
        assert_eq!(report.facts[0].year, Some(2019));
        assert_eq!(report.facts[0].mileage_km, Some(120000));
        assert_eq!(report.facts[1].year, Some(2016));
        assert_eq!(report.facts[2].year, None);
        assert_eq!(report.facts[2].mileage_km, None);
        assert!(violations(&criteria(), &report.facts).is_empty());
    }

    #[tokio::test]
    async fn card_limit_caps_collection() {
        let adapter = MockAdapter::with_descriptions(vec![
            "BMW 2016, 10.000 km",
            "BMW 2017, 20.000 km",
            "BMW 2018, 30.000 km",
            "BMW 2019, 40.000 km",
            "BMW 2020, 50.000 km",
            "BMW 2015, 60.000 km",
            "BMW 2016, 70.000 km",
        ]);
        let report = execute(&adapter, &criteria(), &options()).await.unwrap();
        assert_eq!(report.facts.len(), 5);
        assert_eq!(report.facts[4].mileage_km, Some(50000));
    }

    #[tokio::test]
    async fn empty_descriptions_are_skipped_not_fatal() {
        let adapter =
            MockAdapter::with_descriptions(vec!["BMW 2018, 90.000 km", "", "BMW 2019, 80.000 km"]);
        let report = execute(&adapter, &criteria(), &options()).await.unwrap();
        assert_eq!(report.facts.len(), 2);
        assert_eq!(report.facts[1].year, Some(2019));
    }

    #[tokio::test]
    async fn missing_category_option_fails_with_the_step_named() {
        let adapter = MockAdapter {
            category_appears: false,
            ..MockAdapter::with_descriptions(vec!["BMW 2018, 90.000 km"])
        };
        let err = execute(&adapter, &criteria(), &options()).await.unwrap_err();
        assert_eq!(err.step, WorkflowStep::SelectCategory);
        assert!(matches!(err.source, StepError::OptionNotFound { ref label } if label == "BMW"));
    }

    #[tokio::test(start_paused = true)]
    async fn results_never_rendering_times_out_at_await_results() {
        let adapter = MockAdapter {
            results_render: false,
            ..MockAdapter::with_descriptions(vec![])
        };
        let opts = RunOptions {
            run_timeout: Duration::from_millis(300),
            ..options()
        };
        let err = execute(&adapter, &criteria(), &opts).await.unwrap_err();
        assert_eq!(err.step, WorkflowStep::AwaitResults);
        assert!(matches!(
            err.source,
            StepError::RunTimeout | StepError::ElementNotReady { .. }
        ));
    }
}
