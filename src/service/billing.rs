//! Calendar rules shared by the renewal engine and the monthly generation
//! pass. All monthly dues fall on the 15th; a membership assigned after the
//! 15th bills for the following month.

use chrono::{Datelike, Months, NaiveDate};

pub const DUE_DAY: u32 = 15;

/// One calendar month later, clamped to the last day of the target month
/// (Jan 31 -> Feb 28). Never day-count arithmetic.
pub fn add_calendar_month(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(1))
}

/// "YYYY-MM" key of the month a charge covers.
pub fn billing_period(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// The due date of the month containing `date`.
pub fn due_date_in_month(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), DUE_DAY)
}

/// First due date for a membership assigned on `start`: on or before the
/// 15th bills the current month, after the 15th bills the following month.
pub fn first_due_date(start: NaiveDate) -> Option<NaiveDate> {
    if start.day() <= DUE_DAY {
        due_date_in_month(start)
    } else {
        due_date_in_month(start.checked_add_months(Months::new(1))?)
    }
}
