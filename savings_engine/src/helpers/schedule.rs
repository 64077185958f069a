use chrono::{DateTime, Duration, Months, Utc};

use crate::db_types::Frequency;

/// Computes the next due date for a plan that was just charged at `from`.
///
/// Daily adds one day, Weekly seven days; Monthly and Yearly add one *calendar* month/year, clamping to the
/// last day of a shorter month (Jan 31 + 1 month = Feb 28/29).
pub fn next_contribution_date(frequency: Frequency, from: DateTime<Utc>) -> DateTime<Utc> {
    match frequency {
        Frequency::Daily => from + Duration::days(1),
        Frequency::Weekly => from + Duration::days(7),
        // checked_add_months only fails at the end of the representable range (year ~262143)
        Frequency::Monthly => from.checked_add_months(Months::new(1)).unwrap_or(from + Duration::days(30)),
        Frequency::Yearly => from.checked_add_months(Months::new(12)).unwrap_or(from + Duration::days(365)),
    }
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn daily_and_weekly_are_fixed_offsets() {
        let from = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
        assert_eq!(next_contribution_date(Frequency::Daily, from), Utc.with_ymd_and_hms(2024, 6, 2, 8, 30, 0).unwrap());
        assert_eq!(
            next_contribution_date(Frequency::Weekly, from),
            Utc.with_ymd_and_hms(2024, 6, 8, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn monthly_is_a_calendar_month() {
        let from = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        // 2024 is a leap year
        assert_eq!(
            next_contribution_date(Frequency::Monthly, from),
            Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap()
        );
        let from = Utc.with_ymd_and_hms(2024, 4, 15, 0, 0, 0).unwrap();
        assert_eq!(
            next_contribution_date(Frequency::Monthly, from),
            Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn yearly_is_a_calendar_year() {
        let from = Utc.with_ymd_and_hms(2024, 2, 29, 6, 0, 0).unwrap();
        assert_eq!(
            next_contribution_date(Frequency::Yearly, from),
            Utc.with_ymd_and_hms(2025, 2, 28, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_date_is_strictly_later() {
        let from = Utc::now();
        for freq in [Frequency::Daily, Frequency::Weekly, Frequency::Monthly, Frequency::Yearly] {
            assert!(next_contribution_date(freq, from) > from, "{freq:?} did not advance");
        }
    }
}
