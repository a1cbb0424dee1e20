use super::SchedError;
use chrono::{Datelike, NaiveDate, Weekday};

/// Calendrier du mois planifié : une date par jour, dans l'ordre.
pub(crate) fn month_days(year: i32, month: u32) -> Result<Vec<NaiveDate>, SchedError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| SchedError::InvalidInput(format!("invalid month {year}-{month}")))?;
    Ok(first
        .iter_days()
        .take_while(|d| d.month() == month)
        .collect())
}

pub(crate) fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Index 0-based du jour si `date` tombe dans le mois.
pub(crate) fn day_index(date: NaiveDate, year: i32, month: u32) -> Option<usize> {
    (date.year() == year && date.month() == month).then(|| date.day0() as usize)
}
