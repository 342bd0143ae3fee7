use std::sync::LazyLock;

use regex::Regex;

// First maximal run of digits, optionally interleaved with the grouping and
// decimal separators these sites use (space, NBSP, dot, comma).
static NUMBER_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9][0-9 \u{A0}.,]*").unwrap());

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:19|20)[0-9]{2}\b").unwrap());

static KM_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)km").unwrap());

// Number immediately before the unit. Separators are only allowed one at a
// time between digit groups, so "2019, 120.000 km" yields "120.000" and not
// the year glued onto the mileage, while "180 000" and "1.234,56" stay whole.
static MILEAGE_BEFORE_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9]+(?:[ \u{A0}.,][0-9]+)*)\s*km").unwrap());

/// The (year, mileage) pair read out of one listing description. Either side
/// can be absent; an absent field is skipped by verification, it is not a
/// parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractedFacts {
    pub year: Option<u32>,
    pub mileage_km: Option<u32>,
}

/// Convert a locale-formatted number fragment to an integer.
///
/// Takes the first digit run in `text`, strips every separator and parses the
/// rest base-10. Digits after a decimal separator are collapsed into the
/// integer part, matching sites that format whole-unit quantities with a
/// thousands separator that looks like a decimal point in some locales.
///
/// `normalize_number("180 000 km")` -> `Some(180000)`
/// `normalize_number("1.234,56 km")` -> `Some(123456)`
pub fn normalize_number(text: &str) -> Option<u32> {
    NUMBER_RUN.find(text).and_then(|run| parse_digit_run(run.as_str()))
}

fn parse_digit_run(run: &str) -> Option<u32> {
    let cleaned: String = run.chars().filter(|c| c.is_ascii_digit()).collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// First 4-digit year (1900-2099) in `text`, left to right. First match wins
/// even when a model name contains a year-like token; inherited policy.
pub fn extract_year(text: &str) -> Option<u32> {
    YEAR.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Mileage in kilometers. The literal token "km" (case-insensitive) must be
/// present, otherwise absent unconditionally; "60,000 miles" never yields a
/// value. The number adjacent to the unit is taken, so neither a model
/// designation ("320d") nor a year earlier in the text shadows the mileage;
/// when no number touches the unit, the first digit run of the full text is
/// the fallback.
pub fn extract_mileage_km(text: &str) -> Option<u32> {
    if !KM_TOKEN.is_match(text) {
        return None;
    }
    match MILEAGE_BEFORE_UNIT.captures(text) {
        Some(caps) => parse_digit_run(caps.get(1)?.as_str()),
        None => normalize_number(text),
    }
}

/// Both extractions, independently; a present year with an absent mileage (or
/// the other way round) is a normal outcome.
pub fn extract_facts(text: &str) -> ExtractedFacts {
    ExtractedFacts {
        year: extract_year(text),
        mileage_km: extract_mileage_km(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_grouped_with_spaces() {
        assert_eq!(normalize_number("180 000 km"), Some(180000));
    }

    #[test]
    fn normalize_collapses_decimal_separator() {
        assert_eq!(normalize_number("1.234,56 km"), Some(123456));
    }

    #[test]
    fn normalize_non_breaking_space() {
        assert_eq!(normalize_number("95\u{A0}000"), Some(95000));
    }

    #[test]
    fn normalize_no_digits() {
        assert_eq!(normalize_number("no digits here"), None);
        assert_eq!(normalize_number(""), None);
        assert_eq!(normalize_number(".,, .."), None);
    }

    #[test]
    fn normalize_never_panics_on_overflow() {
        assert_eq!(normalize_number("99999999999999999999 km"), None);
    }

    #[test]
    fn year_first_match() {
        assert_eq!(extract_year("Audi A4, 2018, 120k km"), Some(2018));
    }

    #[test]
    fn year_absent() {
        assert_eq!(extract_year("no year here"), None);
    }

    #[test]
    fn year_century_prefix_gate() {
        assert_eq!(extract_year("registracija do 2150"), None);
        assert_eq!(extract_year("prva registracija 1999"), Some(1999));
    }

    #[test]
    fn mileage_dotted_thousands() {
        assert_eq!(extract_mileage_km("95.000 km"), Some(95000));
    }

    #[test]
    fn mileage_requires_km_unit() {
        assert_eq!(extract_mileage_km("60,000 miles"), None);
    }

    #[test]
    fn mileage_uppercase_unit() {
        assert_eq!(extract_mileage_km("120.000 KM"), Some(120000));
    }

    #[test]
    fn mileage_not_glued_to_earlier_year() {
        assert_eq!(
            extract_mileage_km("BMW 320d 2019, 120.000 km, odli\u{10d}no stanje"),
            Some(120000)
        );
        assert_eq!(extract_mileage_km("BMW 2016, 10.000 km"), Some(10000));
    }

    #[test]
    fn mileage_falls_back_when_unit_precedes_number() {
        assert_eq!(extract_mileage_km("km: 85.000"), Some(85000));
    }

    #[test]
    fn extract_full_description() {
        let facts = extract_facts("BMW 320d 2019, 120.000 km, odli\u{10d}no stanje");
        assert_eq!(
            facts,
            ExtractedFacts {
                year: Some(2019),
                mileage_km: Some(120000),
            }
        );
    }

    #[test]
    fn extract_year_only() {
        let facts = extract_facts("Golf 7, godi\u{161}te 2017, odli\u{10d}an");
        assert_eq!(facts.year, Some(2017));
        assert_eq!(facts.mileage_km, None);
    }

    #[test]
    fn extract_is_idempotent() {
        let text = "BMW 320d 2019, 120.000 km, odli\u{10d}no stanje";
        assert_eq!(extract_facts(text), extract_facts(text));
    }
}
