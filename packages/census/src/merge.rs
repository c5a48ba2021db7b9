//! Per-county join of census, prior-margin and unemployment data.
//!
//! The three extractions are independent: each returns `None` when its
//! source has no usable row for the county, and the others are unaffected.
//! Ratios with a zero or missing denominator are absent rather than `NaN`
//! or infinite.

use elections_census_models::{
    CensusCache, CensusFields, CensusResponse, CensusTable, EnrichedCountyRecord, tables,
};
use elections_geography_models::split_county_fips;

use crate::config::MarginCandidates;
use crate::sources::{MarginTable, UnemploymentTable};

/// The flat-file sources joined against every county.
#[derive(Debug, Clone, Default)]
pub struct FlatSources {
    /// Prior-election vote shares.
    pub margins: MarginTable,
    /// Candidates compared in [`Self::margins`].
    pub candidates: MarginCandidates,
    /// County unemployment rates.
    pub unemployment: UnemploymentTable,
}

/// Builds the enriched record for `fipscode`.
#[must_use]
pub fn merge(fipscode: &str, census: &CensusCache, sources: &FlatSources) -> EnrichedCountyRecord {
    EnrichedCountyRecord {
        unemployment: extract_unemployment(fipscode, &sources.unemployment),
        past_margin: extract_past_margin(fipscode, &sources.margins, &sources.candidates),
        census: extract_census(fipscode, census),
    }
}

/// Derives the census profile from the cached payload for `fipscode`.
///
/// A county missing from the cache, or whose payload does not decode or
/// names no geography, has no profile. Within a profile each field is
/// independent.
#[must_use]
pub fn extract_census(fipscode: &str, census: &CensusCache) -> Option<CensusFields> {
    let raw = census.get(fipscode)?;

    let response = match CensusResponse::from_value(raw) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("Ignoring undecodable census payload for {fipscode}: {e}");
            return None;
        }
    };

    let geography = response.first_geography()?;

    let estimate = |table: &str, field: &str| {
        geography
            .get(table)
            .and_then(|t: &CensusTable| t.estimate(field))
    };

    let race_total = estimate(tables::RACE, tables::RACE_TOTAL);

    let bachelors_or_higher = tables::EDUCATION_BACHELORS_OR_HIGHER
        .iter()
        .map(|&field| estimate(tables::EDUCATION, field))
        .sum::<Option<f64>>();

    Some(CensusFields {
        population: estimate(tables::POPULATION, tables::TOTAL_POPULATION).and_then(to_count),
        percent_white: ratio(estimate(tables::RACE, tables::RACE_WHITE), race_total),
        percent_black: ratio(estimate(tables::RACE, tables::RACE_BLACK), race_total),
        percent_hispanic: ratio(
            estimate(tables::HISPANIC, tables::HISPANIC_LATINO),
            estimate(tables::HISPANIC, tables::HISPANIC_TOTAL),
        ),
        median_income: estimate(tables::INCOME, tables::MEDIAN_INCOME),
        percent_bachelors: ratio(
            bachelors_or_higher,
            estimate(tables::EDUCATION, tables::EDUCATION_TOTAL),
        ),
    })
}

/// `part / total`, or `None` when either is missing or `total` is not
/// positive.
#[must_use]
pub fn ratio(part: Option<f64>, total: Option<f64>) -> Option<f64> {
    let (part, total) = (part?, total?);
    if total <= 0.0 {
        return None;
    }
    Some(part / total).filter(|r| r.is_finite())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_count(value: f64) -> Option<u64> {
    (value >= 0.0).then(|| value.round() as u64)
}

/// Formats the prior margin for `fipscode`, e.g. `"D +6"`.
///
/// Both candidates need a row with a numeric vote share; otherwise the
/// margin is absent.
#[must_use]
pub fn extract_past_margin(
    fipscode: &str,
    margins: &MarginTable,
    candidates: &MarginCandidates,
) -> Option<String> {
    let first = parse_number(margins.vote_pct(fipscode, &candidates.first.last_name)?)?;
    let second = parse_number(margins.vote_pct(fipscode, &candidates.second.last_name)?)?;

    Some(format_margin(100.0 * first - 100.0 * second, candidates))
}

/// Labels a percentage-point `difference` (first's share times 100 minus
/// second's share times 100) with the leading party and its rounded
/// magnitude.
///
/// Rounds half away from zero. A zero difference is labeled with the
/// second candidate's party.
#[must_use]
pub fn format_margin(difference: f64, candidates: &MarginCandidates) -> String {
    let party = if difference > 0.0 {
        &candidates.first.party
    } else {
        &candidates.second.party
    };
    format!("{party} +{}", difference.abs().round())
}

/// The unemployment rate for `fipscode`, matched on its state and county
/// halves.
#[must_use]
pub fn extract_unemployment(fipscode: &str, unemployment: &UnemploymentTable) -> Option<f64> {
    let (state_fips, county_fips) = split_county_fips(fipscode)?;
    parse_number(unemployment.rate(state_fips, county_fips)?)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::config::Candidate;

    fn census_payload(race_total: f64) -> serde_json::Value {
        json!({
            "data": {
                "05000US51059": {
                    "B01003": { "estimate": { "B01003001": 1_000.0 } },
                    "B02001": { "estimate": {
                        "B02001001": race_total,
                        "B02001002": 600.0,
                        "B02001003": 100.0
                    } },
                    "B03003": { "estimate": { "B03003001": 1_000.0, "B03003003": 150.0 } },
                    "B19013": { "estimate": { "B19013001": 52_000.0 } },
                    "B15003": { "estimate": {
                        "B15003001": 800.0,
                        "B15003022": 200.0,
                        "B15003023": 100.0,
                        "B15003024": 50.0,
                        "B15003025": 50.0
                    } }
                }
            }
        })
    }

    fn cache(payload: serde_json::Value) -> CensusCache {
        BTreeMap::from([("51059".to_string(), payload)])
    }

    fn margins(rows: &str) -> MarginTable {
        MarginTable::from_reader(format!("fipscode,last,votepct\n{rows}").as_bytes(), "m").unwrap()
    }

    fn unemployment(rows: &str) -> UnemploymentTable {
        UnemploymentTable::from_reader(
            format!("State FIPS Code,County FIPS Code,Unemployment Rate (%)\n{rows}").as_bytes(),
            "u",
        )
        .unwrap()
    }

    #[test]
    fn extracts_census_fields() {
        let fields = extract_census("51059", &cache(census_payload(1_000.0))).unwrap();

        assert_eq!(fields.population, Some(1_000));
        assert_eq!(fields.percent_white, Some(0.6));
        assert_eq!(fields.percent_black, Some(0.1));
        assert_eq!(fields.percent_hispanic, Some(0.15));
        assert_eq!(fields.median_income, Some(52_000.0));
        assert_eq!(fields.percent_bachelors, Some(0.5));
    }

    #[test]
    fn ratios_stay_within_unit_interval() {
        let fields = extract_census("51059", &cache(census_payload(1_000.0))).unwrap();
        for r in [
            fields.percent_white,
            fields.percent_black,
            fields.percent_hispanic,
            fields.percent_bachelors,
        ] {
            let r = r.unwrap();
            assert!((0.0..=1.0).contains(&r), "ratio out of range: {r}");
        }
    }

    #[test]
    fn zero_race_total_blanks_race_shares_only() {
        let fields = extract_census("51059", &cache(census_payload(0.0))).unwrap();

        assert_eq!(fields.percent_white, None);
        assert_eq!(fields.percent_black, None);
        assert_eq!(fields.population, Some(1_000));
        assert_eq!(fields.percent_hispanic, Some(0.15));
    }

    #[test]
    fn missing_county_has_no_census_profile() {
        assert_eq!(extract_census("01001", &cache(census_payload(1_000.0))), None);
    }

    #[test]
    fn undecodable_payload_has_no_census_profile() {
        assert_eq!(
            extract_census("51059", &cache(json!({ "data": "not a map" }))),
            None
        );
    }

    #[test]
    fn missing_tables_leave_profile_with_absent_fields() {
        let fields = extract_census("51059", &cache(json!({ "data": { "05000US51059": {} } })));
        assert_eq!(fields, Some(CensusFields::default()));
    }

    #[test]
    fn missing_degree_count_blanks_bachelors_share() {
        let mut payload = census_payload(1_000.0);
        payload["data"]["05000US51059"]["B15003"]["estimate"]["B15003025"] = json!(null);

        let fields = extract_census("51059", &cache(payload)).unwrap();
        assert_eq!(fields.percent_bachelors, None);
        assert_eq!(fields.median_income, Some(52_000.0));
    }

    #[test]
    fn ratio_guards_denominator() {
        assert_eq!(ratio(Some(1.0), Some(4.0)), Some(0.25));
        assert_eq!(ratio(Some(1.0), Some(0.0)), None);
        assert_eq!(ratio(Some(1.0), Some(-2.0)), None);
        assert_eq!(ratio(None, Some(4.0)), None);
        assert_eq!(ratio(Some(1.0), None), None);
    }

    #[test]
    fn first_candidate_lead_uses_first_party() {
        let table = margins("51059,Obama,0.52\n51059,Romney,0.46\n");
        let margin = extract_past_margin("51059", &table, &MarginCandidates::default());
        assert_eq!(margin.as_deref(), Some("D +6"));
    }

    #[test]
    fn second_candidate_lead_uses_second_party() {
        let table = margins("51059,Obama,0.46\n51059,Romney,0.52\n");
        let margin = extract_past_margin("51059", &table, &MarginCandidates::default());
        assert_eq!(margin.as_deref(), Some("R +6"));
    }

    #[test]
    fn margin_needs_both_candidates() {
        let table = margins("51059,Obama,0.52\n");
        assert_eq!(
            extract_past_margin("51059", &table, &MarginCandidates::default()),
            None
        );
    }

    #[test]
    fn non_numeric_vote_share_blanks_margin() {
        let table = margins("51059,Obama,n/a\n51059,Romney,0.46\n");
        assert_eq!(
            extract_past_margin("51059", &table, &MarginCandidates::default()),
            None
        );
    }

    #[test]
    fn margin_rounds_half_away_from_zero() {
        let candidates = MarginCandidates::default();
        assert_eq!(format_margin(2.5, &candidates), "D +3");
        assert_eq!(format_margin(-2.5, &candidates), "R +3");
        assert_eq!(format_margin(2.49, &candidates), "D +2");
        assert_eq!(format_margin(0.0, &candidates), "R +0");
    }

    #[test]
    fn margin_scales_each_share_before_subtracting() {
        // Scaled separately the shares differ by exactly 14.5; scaling the
        // difference instead lands just short of it.
        let table = margins("51059,Obama,0.002\n51059,Romney,0.147\n");
        let margin = extract_past_margin("51059", &table, &MarginCandidates::default());
        assert_eq!(margin.as_deref(), Some("R +15"));
    }

    #[test]
    fn margin_uses_configured_candidates() {
        let candidates = MarginCandidates {
            first: Candidate::new("Clinton", "D"),
            second: Candidate::new("Trump", "R"),
        };
        let table = margins("51059,Clinton,0.40\n51059,Trump,0.55\n");
        assert_eq!(
            extract_past_margin("51059", &table, &candidates).as_deref(),
            Some("R +15")
        );
    }

    #[test]
    fn parses_padded_unemployment_rate() {
        let table = unemployment("51,059, 5.4 \n");
        assert_eq!(extract_unemployment("51059", &table), Some(5.4));
        assert_eq!(extract_unemployment("51013", &table), None);
    }

    #[test]
    fn malformed_unemployment_inputs_are_absent() {
        let table = unemployment("51,059,N.A.\n");
        assert_eq!(extract_unemployment("51059", &table), None);
        assert_eq!(extract_unemployment("5105", &table), None);
    }

    #[test]
    fn merge_tolerates_missing_margin() {
        let sources = FlatSources {
            margins: margins("01001,Obama,0.26\n01001,Romney,0.73\n"),
            candidates: MarginCandidates::default(),
            unemployment: unemployment("51,059,5.4\n"),
        };

        let record = merge("51059", &cache(census_payload(1_000.0)), &sources);

        assert_eq!(record.past_margin, None);
        assert_eq!(record.unemployment, Some(5.4));
        assert_eq!(record.census.unwrap().population, Some(1_000));
    }

    #[test]
    fn merge_is_idempotent() {
        let sources = FlatSources {
            margins: margins("51059,Obama,0.59\n51059,Romney,0.39\n"),
            candidates: MarginCandidates::default(),
            unemployment: unemployment("51,059,3.9\n"),
        };
        let census = cache(census_payload(1_000.0));

        let first = merge("51059", &census, &sources);
        let second = merge("51059", &census, &sources);

        assert_eq!(first, second);
        assert_eq!(first.past_margin.as_deref(), Some("D +20"));
    }
}
