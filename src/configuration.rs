use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::domain::criteria::{SearchCriteria, SiteId};
use crate::services::session::Engine;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub webdriver: WebDriverSettings,
    pub runner: RunnerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebDriverSettings {
    /// WebDriver endpoint (chromedriver, geckodriver or a selenium hub).
    pub url: String,
    pub headless: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSettings {
    pub engines: Vec<Engine>,
    pub criteria_path: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub element_timeout_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub consent_timeout_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub run_timeout_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub poll_interval_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub type_delay_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub result_card_limit: usize,
}

impl RunnerSettings {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn consent_timeout(&self) -> Duration {
        Duration::from_millis(self.consent_timeout_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn type_delay(&self) -> Duration {
        Duration::from_millis(self.type_delay_ms)
    }
}

/// Defaults in code, `configuration.yaml` on top when present, `OGLAS_*`
/// environment variables on top of that (e.g. `OGLAS_WEBDRIVER__URL`).
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .set_default("webdriver.url", "http://localhost:4444/wd/hub")?
        .set_default("webdriver.headless", true)?
        .set_default("runner.engines", vec!["chrome"])?
        .set_default("runner.criteria_path", "criteria.json")?
        .set_default("runner.element_timeout_ms", 5_000)?
        .set_default("runner.consent_timeout_ms", 8_000)?
        .set_default("runner.run_timeout_ms", 15_000)?
        .set_default("runner.poll_interval_ms", 250)?
        .set_default("runner.type_delay_ms", 20)?
        .set_default("runner.result_card_limit", 5)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("OGLAS").separator("__"))
        .build()?;

    settings.try_deserialize()
}

/// Site-keyed criteria map, one entry per marketplace under test.
pub fn load_criteria(path: &Path) -> anyhow::Result<HashMap<SiteId, SearchCriteria>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading criteria file {}", path.display()))?;
    let criteria: HashMap<SiteId, SearchCriteria> =
        serde_json::from_str(&raw).context("parsing criteria file")?;
    for (site, c) in &criteria {
        c.validate().with_context(|| format!("criteria for {site}"))?;
    }
    Ok(criteria)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_deserialize() {
        let settings = get_configuration().unwrap();
        assert_eq!(settings.runner.element_timeout(), Duration::from_secs(5));
        assert_eq!(settings.runner.consent_timeout(), Duration::from_secs(8));
        assert_eq!(settings.runner.run_timeout(), Duration::from_secs(15));
        assert_eq!(settings.runner.result_card_limit, 5);
    }

    #[test]
    fn criteria_map_parses_by_site() {
        let raw = r#"{
            "njuskalo": {"brand":"BMW","minYear":2015,"maxYear":2020,"maxMileageKm":150000},
            "bolha": {"brand":"Audi","minYear":2016,"maxYear":2022,"maxMileageKm":120000}
        }"#;
        let criteria: HashMap<SiteId, SearchCriteria> = serde_json::from_str(raw).unwrap();
        assert_eq!(criteria.len(), 2);
        assert_eq!(criteria[&SiteId::Bolha].brand, "Audi");
    }
}
