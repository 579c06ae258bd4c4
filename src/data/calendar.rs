//! Calendar offsets in whole months and years.
//!
//! Day-of-month is clamped to the length of the target month, so `2020-02-29`
//! shifted by one year lands on `2021-02-28`.

use chrono::Months;
use chrono::NaiveDate;

/// Shift `date` by a signed number of calendar months, saturating at the representable range.
pub fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
  let step = Months::new(months.unsigned_abs());
  if months >= 0 {
    date.checked_add_months(step).unwrap_or(NaiveDate::MAX)
  } else {
    date.checked_sub_months(step).unwrap_or(NaiveDate::MIN)
  }
}

/// Shift `date` by a signed number of calendar years.
pub fn shift_years(date: NaiveDate, years: i32) -> NaiveDate {
  shift_months(date, years.saturating_mul(12))
}
