//! Taiwan Stock Exchange market holidays.
//!
//! Fixed-date national holidays plus the lunar-calendar festivals. Lunar dates
//! are not computed; they come from a lookup table, so years outside the table
//! only get the fixed-date closures.

use super::HolidayProvider;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Gregorian dates of the lunar-calendar anchors for one year.
struct LunarAnchors {
    year: i32,
    /// First day of the Lunar New Year, (month, day).
    new_year: (u32, u32),
    dragon_boat: (u32, u32),
    mid_autumn: (u32, u32),
    /// Tomb-Sweeping Day (solar term Qingming), always April.
    qingming_day: u32,
}

const LUNAR_TABLE: &[LunarAnchors] = &[
    LunarAnchors { year: 2020, new_year: (1, 25), dragon_boat: (6, 25), mid_autumn: (10, 1), qingming_day: 4 },
    LunarAnchors { year: 2021, new_year: (2, 12), dragon_boat: (6, 14), mid_autumn: (9, 21), qingming_day: 4 },
    LunarAnchors { year: 2022, new_year: (2, 1), dragon_boat: (6, 3), mid_autumn: (9, 10), qingming_day: 5 },
    LunarAnchors { year: 2023, new_year: (1, 22), dragon_boat: (6, 22), mid_autumn: (9, 29), qingming_day: 5 },
    LunarAnchors { year: 2024, new_year: (2, 10), dragon_boat: (6, 10), mid_autumn: (9, 17), qingming_day: 4 },
    LunarAnchors { year: 2025, new_year: (1, 29), dragon_boat: (5, 31), mid_autumn: (10, 6), qingming_day: 4 },
    LunarAnchors { year: 2026, new_year: (2, 17), dragon_boat: (6, 19), mid_autumn: (9, 25), qingming_day: 5 },
    LunarAnchors { year: 2027, new_year: (2, 6), dragon_boat: (6, 9), mid_autumn: (9, 15), qingming_day: 5 },
    LunarAnchors { year: 2028, new_year: (1, 26), dragon_boat: (5, 28), mid_autumn: (10, 3), qingming_day: 4 },
    LunarAnchors { year: 2029, new_year: (2, 13), dragon_boat: (6, 16), mid_autumn: (9, 22), qingming_day: 4 },
    LunarAnchors { year: 2030, new_year: (2, 3), dragon_boat: (6, 5), mid_autumn: (9, 12), qingming_day: 5 },
];

/// Built-in TWSE holiday provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaiwanHolidays;

impl TaiwanHolidays {
    pub fn new() -> Self {
        Self
    }

    /// Whether the lunar table covers `year`.
    pub fn has_lunar_data(year: i32) -> bool {
        LUNAR_TABLE.iter().any(|a| a.year == year)
    }
}

/// A single-day holiday on a weekend is observed on the adjacent weekday:
/// Saturday → preceding Friday, Sunday → following Monday.
fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

impl HolidayProvider for TaiwanHolidays {
    fn name(&self) -> &str {
        "twse"
    }

    fn holidays_for_year(&self, year: i32) -> Vec<NaiveDate> {
        let mut days = Vec::new();

        // New Year's Day, Peace Memorial Day, Labour Day, National Day
        for (m, d) in [(1, 1), (2, 28), (5, 1), (10, 10)] {
            days.extend(ymd(year, m, d).map(observed));
        }

        match LUNAR_TABLE.iter().find(|a| a.year == year) {
            Some(anchors) => {
                // Lunar New Year's Eve through the third day
                if let Some(first) = ymd(year, anchors.new_year.0, anchors.new_year.1) {
                    days.extend((-1..=2).map(|offset| first + Duration::days(offset)));
                }
                for (m, d) in [anchors.dragon_boat, anchors.mid_autumn] {
                    days.extend(ymd(year, m, d).map(observed));
                }

                // Children's Day (Apr 4) and Tomb-Sweeping Day. When they
                // coincide, Children's Day moves to Apr 5 if the 4th is a
                // Thursday and to Apr 3 otherwise.
                if let (Some(childrens), Some(qingming)) =
                    (ymd(year, 4, 4), ymd(year, 4, anchors.qingming_day))
                {
                    if childrens == qingming {
                        let moved = if childrens.weekday() == Weekday::Thu {
                            childrens + Duration::days(1)
                        } else {
                            childrens - Duration::days(1)
                        };
                        days.push(observed(qingming));
                        days.push(observed(moved));
                    } else {
                        days.push(observed(childrens));
                        days.push(observed(qingming));
                    }
                }
            }
            None => {
                tracing::debug!(year, "no lunar holiday data; using fixed-date holidays only");
                days.extend(ymd(year, 4, 4).map(observed));
            }
        }

        days.sort();
        days.dedup();
        days
    }
}
