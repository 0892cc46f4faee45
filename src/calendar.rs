use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDay {
    pub date: NaiveDate,
    pub in_month: bool,
}

pub type Week = [GridDay; 7];

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CalendarError {
    #[error("month out of range: {0}")]
    InvalidMonth(u32),
    #[error("date out of range: {year}-{month:02}")]
    OutOfRange { year: i32, month: u32 },
}

impl WeekStart {
    pub fn weekday(&self) -> Weekday {
        match self {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Sunday => Weekday::Sun,
        }
    }

    pub fn weekday_labels(&self) -> [&'static str; 7] {
        match self {
            WeekStart::Monday => ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"],
            WeekStart::Sunday => ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"],
        }
    }

    /// Column of `date` in a week laid out from this start day.
    fn column(&self, date: NaiveDate) -> i64 {
        let day = date.weekday().num_days_from_monday() as i64;
        let start = self.weekday().num_days_from_monday() as i64;
        (day - start).rem_euclid(7)
    }
}

pub fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, CalendarError> {
    if !(1..=12).contains(&month) {
        return Err(CalendarError::InvalidMonth(month));
    }
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(CalendarError::OutOfRange { year, month })
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32, CalendarError> {
    let first = first_of_month(year, month)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(CalendarError::OutOfRange { year, month })?;
    Ok((next - first).num_days() as u32)
}

/// Whole weeks covering `year`/`month`, padded with the neighbouring months.
pub fn grid(year: i32, month: u32, week_start: WeekStart) -> Result<Vec<Week>, CalendarError> {
    let first = first_of_month(year, month)?;
    let days = days_in_month(year, month)? as i64;
    let lead = week_start.column(first);
    let week_count = (lead + days + 6) / 7;
    let origin = first - Duration::days(lead);

    let mut weeks = Vec::with_capacity(week_count as usize);
    for w in 0..week_count {
        let week: Week = std::array::from_fn(|d| {
            let date = origin + Duration::days(w * 7 + d as i64);
            GridDay {
                date,
                in_month: date.month() == month && date.year() == year,
            }
        });
        weeks.push(week);
    }
    Ok(weeks)
}
