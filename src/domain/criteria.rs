use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::domain::listing::ExtractedFacts;
use crate::error::Error;

/// Closed set of supported marketplaces. Adding a site means adding a variant
/// here plus a concrete adapter and a criteria entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteId {
    Njuskalo,
    Bolha,
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteId::Njuskalo => write!(f, "njuskalo"),
            SiteId::Bolha => write!(f, "bolha"),
        }
    }
}

impl FromStr for SiteId {
    type Err = Error;

    /// Derive the site from a run name like "njuskalo-chrome".
    fn from_str(s: &str) -> Result<Self, Error> {
        let lower = s.to_lowercase();
        if lower.contains("njuskalo") {
            Ok(SiteId::Njuskalo)
        } else if lower.contains("bolha") {
            Ok(SiteId::Bolha)
        } else {
            Err(Error::UnknownSite(s.to_string()))
        }
    }
}

/// Filter configuration for one site's search, immutable per run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub brand: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub min_year: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_year: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_mileage_km: u32,
}

impl SearchCriteria {
    pub fn validate(&self) -> Result<(), Error> {
        if self.min_year > self.max_year {
            return Err(Error::Criteria(format!(
                "minYear {} is greater than maxYear {}",
                self.min_year, self.max_year
            )));
        }
        Ok(())
    }
}

/// Check one run's extracted facts against the criteria it was filtered with.
/// Each present year must lie in `[min_year, max_year]`, each present mileage
/// must be `<= max_mileage_km`; absent fields are skipped.
pub fn violations(criteria: &SearchCriteria, facts: &[ExtractedFacts]) -> Vec<String> {
    let mut out = Vec::new();
    for (i, fact) in facts.iter().enumerate() {
        if let Some(year) = fact.year {
            if year < criteria.min_year || year > criteria.max_year {
                out.push(format!(
                    "card #{}: year {} outside {}..={}",
                    i + 1,
                    year,
                    criteria.min_year,
                    criteria.max_year
                ));
            }
        }
        if let Some(km) = fact.mileage_km {
            if km > criteria.max_mileage_km {
                out.push(format!(
                    "card #{}: mileage {} km over the {} km limit",
                    i + 1,
                    km,
                    criteria.max_mileage_km
                ));
            }
        }
    }
    out
}
