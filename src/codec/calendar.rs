//! XML Schema calendar values
//!
//! An [`XsdCalendar`] keeps exactly the components it was given. A year-only
//! value stays a `gYear`, a year and month stay a `gYearMonth`, and so on; the
//! lexical form and the datatype are both derived from the populated components.

use super::{CodecError, CodecResult, ValueKind};
use crate::rdf::vocab::xsd;
use chrono::NaiveDate;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Which components of a calendar value are populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarPrecision {
    /// Date and time of day (xsd:dateTime)
    DateTime,
    /// Year, month and day (xsd:date)
    Date,
    /// Time of day only (xsd:time)
    Time,
    /// Year and month (xsd:gYearMonth)
    YearMonth,
    /// Year only (xsd:gYear)
    Year,
    /// Month and day (xsd:gMonthDay)
    MonthDay,
    /// Month only (xsd:gMonth)
    Month,
    /// Day only (xsd:gDay)
    Day,
}

impl CalendarPrecision {
    /// XSD datatype IRI for this precision
    pub fn datatype(&self) -> &'static str {
        match self {
            CalendarPrecision::DateTime => xsd::DATE_TIME,
            CalendarPrecision::Date => xsd::DATE,
            CalendarPrecision::Time => xsd::TIME,
            CalendarPrecision::YearMonth => xsd::G_YEAR_MONTH,
            CalendarPrecision::Year => xsd::G_YEAR,
            CalendarPrecision::MonthDay => xsd::G_MONTH_DAY,
            CalendarPrecision::Month => xsd::G_MONTH,
            CalendarPrecision::Day => xsd::G_DAY,
        }
    }
}

/// Time of day component
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TimeOfDay {
    hour: u8,
    minute: u8,
    second: u8,
    /// Fractional second digits exactly as supplied
    fraction: Option<String>,
}

/// Partial Gregorian calendar value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XsdCalendar {
    year: Option<i64>,
    month: Option<u8>,
    day: Option<u8>,
    time: Option<TimeOfDay>,
    /// Timezone offset in minutes
    timezone: Option<i16>,
}

const TZ: &str = r"(Z|[+-]\d{2}:\d{2})?";

struct Patterns {
    date_time: Regex,
    date: Regex,
    year_month: Regex,
    year: Regex,
    time: Regex,
    month_day: Regex,
    month: Regex,
    day: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let build = |body: &str| {
            Regex::new(&format!("^{}{}$", body, TZ)).expect("static calendar pattern")
        };
        Patterns {
            date_time: build(r"(-?\d{4,})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})(?:\.(\d+))?"),
            date: build(r"(-?\d{4,})-(\d{2})-(\d{2})"),
            year_month: build(r"(-?\d{4,})-(\d{2})"),
            year: build(r"(-?\d{4,})"),
            time: build(r"(\d{2}):(\d{2}):(\d{2})(?:\.(\d+))?"),
            month_day: build(r"--(\d{2})-(\d{2})"),
            month: build(r"--(\d{2})"),
            day: build(r"---(\d{2})"),
        }
    })
}

impl XsdCalendar {
    fn empty() -> Self {
        Self {
            year: None,
            month: None,
            day: None,
            time: None,
            timezone: None,
        }
    }

    /// Year-only value (xsd:gYear)
    pub fn year(year: i64) -> Self {
        Self {
            year: Some(year),
            ..Self::empty()
        }
    }

    /// Year and month (xsd:gYearMonth)
    pub fn year_month(year: i64, month: u8) -> CodecResult<Self> {
        Self {
            year: Some(year),
            month: Some(month),
            ..Self::empty()
        }
        .validated()
    }

    /// Calendar date (xsd:date)
    pub fn date(year: i64, month: u8, day: u8) -> CodecResult<Self> {
        Self {
            year: Some(year),
            month: Some(month),
            day: Some(day),
            ..Self::empty()
        }
        .validated()
    }

    /// Date and time of day (xsd:dateTime)
    pub fn date_time(
        year: i64,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> CodecResult<Self> {
        Self {
            year: Some(year),
            month: Some(month),
            day: Some(day),
            time: Some(TimeOfDay {
                hour,
                minute,
                second,
                fraction: None,
            }),
            timezone: None,
        }
        .validated()
    }

    /// Attach a timezone offset, in minutes east of UTC
    pub fn with_timezone(mut self, offset_minutes: i16) -> Self {
        self.timezone = Some(offset_minutes);
        self
    }

    /// Which components are populated
    pub fn precision(&self) -> CalendarPrecision {
        match (self.year, self.month, self.day, &self.time) {
            (Some(_), Some(_), Some(_), Some(_)) => CalendarPrecision::DateTime,
            (Some(_), Some(_), Some(_), None) => CalendarPrecision::Date,
            (None, None, None, Some(_)) => CalendarPrecision::Time,
            (Some(_), Some(_), None, _) => CalendarPrecision::YearMonth,
            (Some(_), None, _, _) => CalendarPrecision::Year,
            (None, Some(_), Some(_), _) => CalendarPrecision::MonthDay,
            (None, Some(_), None, _) => CalendarPrecision::Month,
            _ => CalendarPrecision::Day,
        }
    }

    /// XSD datatype IRI matching the populated components
    pub fn datatype(&self) -> &'static str {
        self.precision().datatype()
    }

    pub fn get_year(&self) -> Option<i64> {
        self.year
    }

    pub fn get_month(&self) -> Option<u8> {
        self.month
    }

    pub fn get_day(&self) -> Option<u8> {
        self.day
    }

    pub fn get_timezone(&self) -> Option<i16> {
        self.timezone
    }

    /// Hour, minute and second, when a time of day is present
    pub fn get_time(&self) -> Option<(u8, u8, u8)> {
        self.time.as_ref().map(|t| (t.hour, t.minute, t.second))
    }

    /// Canonical lexical form
    pub fn to_lexical(&self) -> String {
        let mut out = String::new();
        match self.precision() {
            CalendarPrecision::MonthDay | CalendarPrecision::Month => out.push_str("--"),
            CalendarPrecision::Day => out.push_str("---"),
            _ => {}
        }
        if let Some(year) = self.year {
            if year < 0 {
                out.push('-');
            }
            out.push_str(&format!("{:04}", year.unsigned_abs()));
        }
        if let Some(month) = self.month {
            if self.year.is_some() {
                out.push('-');
            }
            out.push_str(&format!("{:02}", month));
        }
        if let Some(day) = self.day {
            if self.month.is_some() {
                out.push('-');
            }
            out.push_str(&format!("{:02}", day));
        }
        if let Some(time) = &self.time {
            if self.day.is_some() {
                out.push('T');
            }
            out.push_str(&format!(
                "{:02}:{:02}:{:02}",
                time.hour, time.minute, time.second
            ));
            if let Some(fraction) = &time.fraction {
                out.push('.');
                out.push_str(fraction);
            }
        }
        if let Some(tz) = self.timezone {
            if tz == 0 {
                out.push('Z');
            } else {
                let sign = if tz < 0 { '-' } else { '+' };
                let abs = tz.unsigned_abs();
                out.push_str(&format!("{}{:02}:{:02}", sign, abs / 60, abs % 60));
            }
        }
        out
    }

    /// Parse any of the XSD calendar lexical forms
    pub fn parse(lexical: &str) -> CodecResult<Self> {
        let invalid = || CodecError::InvalidLexical {
            lexical: lexical.to_string(),
            target: ValueKind::Calendar,
        };
        let p = patterns();
        let s = lexical.trim();
        let num = |v: Option<regex::Match<'_>>| -> CodecResult<u8> {
            v.ok_or_else(invalid)?.as_str().parse::<u8>().map_err(|_| invalid())
        };
        let year = |v: Option<regex::Match<'_>>| -> CodecResult<i64> {
            v.ok_or_else(invalid)?.as_str().parse::<i64>().map_err(|_| invalid())
        };
        let tz = |v: Option<regex::Match<'_>>| -> CodecResult<Option<i16>> {
            match v.map(|m| m.as_str()) {
                None => Ok(None),
                Some("Z") => Ok(Some(0)),
                Some(offset) => {
                    let sign: i16 = if offset.starts_with('-') { -1 } else { 1 };
                    let hours: i16 = offset[1..3].parse().map_err(|_| invalid())?;
                    let minutes: i16 = offset[4..6].parse().map_err(|_| invalid())?;
                    if hours > 14 || minutes > 59 {
                        return Err(invalid());
                    }
                    Ok(Some(sign * (hours * 60 + minutes)))
                }
            }
        };

        let mut cal = Self::empty();
        if let Some(c) = p.date_time.captures(s) {
            cal.year = Some(year(c.get(1))?);
            cal.month = Some(num(c.get(2))?);
            cal.day = Some(num(c.get(3))?);
            cal.time = Some(TimeOfDay {
                hour: num(c.get(4))?,
                minute: num(c.get(5))?,
                second: num(c.get(6))?,
                fraction: c.get(7).map(|m| m.as_str().to_string()),
            });
            cal.timezone = tz(c.get(8))?;
        } else if let Some(c) = p.date.captures(s) {
            cal.year = Some(year(c.get(1))?);
            cal.month = Some(num(c.get(2))?);
            cal.day = Some(num(c.get(3))?);
            cal.timezone = tz(c.get(4))?;
        } else if let Some(c) = p.year_month.captures(s) {
            cal.year = Some(year(c.get(1))?);
            cal.month = Some(num(c.get(2))?);
            cal.timezone = tz(c.get(3))?;
        } else if let Some(c) = p.year.captures(s) {
            cal.year = Some(year(c.get(1))?);
            cal.timezone = tz(c.get(2))?;
        } else if let Some(c) = p.time.captures(s) {
            cal.time = Some(TimeOfDay {
                hour: num(c.get(1))?,
                minute: num(c.get(2))?,
                second: num(c.get(3))?,
                fraction: c.get(4).map(|m| m.as_str().to_string()),
            });
            cal.timezone = tz(c.get(5))?;
        } else if let Some(c) = p.month_day.captures(s) {
            cal.month = Some(num(c.get(1))?);
            cal.day = Some(num(c.get(2))?);
            cal.timezone = tz(c.get(3))?;
        } else if let Some(c) = p.day.captures(s) {
            cal.day = Some(num(c.get(1))?);
            cal.timezone = tz(c.get(2))?;
        } else if let Some(c) = p.month.captures(s) {
            cal.month = Some(num(c.get(1))?);
            cal.timezone = tz(c.get(2))?;
        } else {
            return Err(invalid());
        }

        cal.validated().map_err(|_| invalid())
    }

    fn validated(self) -> CodecResult<Self> {
        let invalid = || CodecError::InvalidLexical {
            lexical: self.to_lexical(),
            target: ValueKind::Calendar,
        };
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(invalid());
            }
        }
        if let Some(day) = self.day {
            if !(1..=31).contains(&day) {
                return Err(invalid());
            }
        }
        if let (Some(year), Some(month), Some(day)) = (self.year, self.month, self.day) {
            // chrono covers the proleptic range that matters in practice
            if let Ok(year) = i32::try_from(year) {
                if NaiveDate::from_ymd_opt(year, u32::from(month), u32::from(day)).is_none() {
                    return Err(invalid());
                }
            }
        }
        if let Some(time) = &self.time {
            if time.hour > 23 || time.minute > 59 || time.second > 59 {
                return Err(invalid());
            }
        }
        Ok(self)
    }
}

impl fmt::Display for XsdCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_lexical())
    }
}

impl FromStr for XsdCalendar {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
