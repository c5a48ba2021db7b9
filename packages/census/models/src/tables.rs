//! ACS 5-year table and field codes read by the enrichment step.

/// `B01003`: total population.
pub const POPULATION: &str = "B01003";
/// `B02001`: race.
pub const RACE: &str = "B02001";
/// `B03003`: Hispanic or Latino origin.
pub const HISPANIC: &str = "B03003";
/// `B19013`: median household income.
pub const INCOME: &str = "B19013";
/// `B15003`: educational attainment for the population 25 years and over.
pub const EDUCATION: &str = "B15003";

/// Tables requested for every county, in request order.
pub const ALL: &[&str] = &[POPULATION, RACE, HISPANIC, INCOME, EDUCATION];

pub const TOTAL_POPULATION: &str = "B01003001";

pub const RACE_TOTAL: &str = "B02001001";
pub const RACE_WHITE: &str = "B02001002";
pub const RACE_BLACK: &str = "B02001003";

pub const HISPANIC_TOTAL: &str = "B03003001";
pub const HISPANIC_LATINO: &str = "B03003003";

pub const MEDIAN_INCOME: &str = "B19013001";

pub const EDUCATION_TOTAL: &str = "B15003001";
/// Bachelor's, master's, professional school and doctorate degree counts.
pub const EDUCATION_BACHELORS_OR_HIGHER: &[&str] =
    &["B15003022", "B15003023", "B15003024", "B15003025"];
