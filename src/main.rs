use std::path::Path;

use env_logger::Env;
use oglas::adapters::{adapter_for, AdapterTimings};
use oglas::configuration::{get_configuration, load_criteria, Settings};
use oglas::domain::criteria::{violations, SearchCriteria, SiteId};
use oglas::services::session::{Engine, Session};
use oglas::services::workflow::{self, RunOptions, RunReport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = get_configuration()?;
    let criteria = load_criteria(Path::new(&settings.runner.criteria_path))?;

    // An optional run name like "bolha-firefox" restricts the matrix to that
    // site; an unrecognized name fails fast.
    let only: Option<SiteId> = match std::env::args().nth(1) {
        Some(arg) => Some(arg.parse()?),
        None => None,
    };

    let mut handles = Vec::new();
    for (site, site_criteria) in criteria {
        if only.is_some_and(|s| s != site) {
            continue;
        }
        for engine in settings.runner.engines.clone() {
            let settings = settings.clone();
            let site_criteria = site_criteria.clone();
            handles.push(tokio::spawn(async move {
                let label = format!("{site}-{engine}");
                let outcome = run_with_retry(&label, site, engine, &site_criteria, &settings).await;
                (label, site_criteria, outcome)
            }));
        }
    }

    let mut failed = false;
    for handle in handles {
        let (label, site_criteria, outcome) = handle.await?;
        match outcome {
            Ok(report) => {
                let found = violations(&site_criteria, &report.facts);
                match found.is_empty() {
                    true => log::info!(
                        "{label}: ok, {} extracted cards within filters",
                        report.facts.len()
                    ),
                    false => {
                        failed = true;
                        for v in &found {
                            log::error!("{label}: {v}");
                        }
                    }
                }
            }
            Err(e) => {
                failed = true;
                log::error!("{label}: run failed: {e:#}");
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// One retry per run, at run granularity; the workflow itself never retries.
async fn run_with_retry(
    label: &str,
    site: SiteId,
    engine: Engine,
    criteria: &SearchCriteria,
    settings: &Settings,
) -> anyhow::Result<RunReport> {
    match run_once(site, engine, criteria, settings).await {
        Ok(report) => Ok(report),
        Err(e) => {
            log::warn!("{label}: first attempt failed ({e:#}), retrying once");
            run_once(site, engine, criteria, settings).await
        }
    }
}

async fn run_once(
    site: SiteId,
    engine: Engine,
    criteria: &SearchCriteria,
    settings: &Settings,
) -> anyhow::Result<RunReport> {
    let session = Session::connect(&settings.webdriver, engine).await?;
    let adapter = adapter_for(
        site,
        session.driver(),
        AdapterTimings::from_settings(&settings.runner),
    );
    let opts = RunOptions {
        consent_timeout: settings.runner.consent_timeout(),
        run_timeout: settings.runner.run_timeout(),
        poll_interval: settings.runner.poll_interval(),
        result_card_limit: settings.runner.result_card_limit,
    };
    let report = workflow::run(session, adapter, criteria, &opts).await?;
    Ok(report)
}
