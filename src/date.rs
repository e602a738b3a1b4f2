//! Date handling shared by the document, the values and the generator.
//!
//! Dates are stored in the applicant document as UTC-midnight epoch milliseconds.

use chrono::{Months, NaiveDate, Utc};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of "today" for age predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(NaiveDate),
}

#[derive(Debug, Clone, Default)]
pub struct DateConverter {
    clock: Clock,
}

impl DateConverter {
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }

    pub fn fixed(today: NaiveDate) -> Self {
        Self::new(Clock::Fixed(today))
    }

    pub fn today(&self) -> NaiveDate {
        match self.clock {
            Clock::System => Utc::now().date_naive(),
            Clock::Fixed(date) => date,
        }
    }

    /// Timestamp of the birth date of someone exactly `age` years old today.
    ///
    /// The fractional part of the age is taken as months: 18.5 is 18 years and 6 months.
    pub fn date_timestamp_from_age(&self, age: f64) -> i64 {
        let years = age.trunc();
        let months = ((age - years) * 12.0).round();
        let total_months = (years * 12.0 + months).max(0.0) as u32;
        let today = self.today();
        let birth_date = today
            .checked_sub_months(Months::new(total_months))
            .unwrap_or(NaiveDate::MIN);
        epoch_millis(birth_date)
    }
}

pub fn epoch_millis(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or_default()
}

pub fn date_from_epoch_millis(millis: i64) -> Option<NaiveDate> {
    chrono::DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}

pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter() -> DateConverter {
        DateConverter::fixed(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())
    }

    #[test]
    fn test_whole_years() {
        // 2012-01-01
        assert_eq!(converter().date_timestamp_from_age(18.0), 1_325_376_000_000);
        // 2029-01-01 and 1930-01-01
        assert_eq!(converter().date_timestamp_from_age(1.0), 1_861_920_000_000);
        assert_eq!(converter().date_timestamp_from_age(100.0), -1_262_304_000_000);
    }

    #[test]
    fn test_fractional_years_are_months() {
        // 2011-07-01
        assert_eq!(converter().date_timestamp_from_age(18.5), 1_309_478_400_000);
    }

    #[test]
    fn test_epoch_round_trip() {
        let date = parse_date("2022-05-20").unwrap();
        assert_eq!(epoch_millis(date), 1_653_004_800_000);
        assert_eq!(date_from_epoch_millis(1_653_004_800_000), Some(date));
    }

    #[test]
    fn test_bad_date() {
        assert!(parse_date("05/20/2022").is_err());
    }
}
