//! Date arithmetic behind the report charts.
//!
//! Every function here is pure: the current date is always passed in.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use crate::services::report::query::ReportQuery;

/// Timestamp layout used on the wire for interval bounds.
pub const REPORT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Key layout of chart records; also handed to the client as its date parser.
pub const CHART_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

const DAY_TICKS_THRESHOLD: usize = 63;
const WEEK_TICKS_THRESHOLD: usize = 9;
const DEFAULT_TABLE_DATE_FORMAT: &str = "m/d/Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Today,
    Yesterday,
    Week,
    LastWeek,
    Month,
    LastMonth,
    Quarter,
    LastQuarter,
    Year,
    LastYear,
    Custom,
}

pub const DEFAULT_PERIOD: Period = Period::Month;

impl Period {
    pub fn parse(value: &str) -> Option<Self> {
        let period = match value {
            "today" => Period::Today,
            "yesterday" => Period::Yesterday,
            "week" => Period::Week,
            "last_week" => Period::LastWeek,
            "month" => Period::Month,
            "last_month" => Period::LastMonth,
            "quarter" => Period::Quarter,
            "last_quarter" => Period::LastQuarter,
            "year" => Period::Year,
            "last_year" => Period::LastYear,
            "custom" => Period::Custom,
            _ => return None,
        };
        Some(period)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Today => "Today",
            Period::Yesterday => "Yesterday",
            Period::Week => "Week to Date",
            Period::LastWeek => "Last Week",
            Period::Month => "Month to Date",
            Period::LastMonth => "Last Month",
            Period::Quarter => "Quarter to Date",
            Period::LastQuarter => "Last Quarter",
            Period::Year => "Year to Date",
            Period::LastYear => "Last Year",
            Period::Custom => "Custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Compare {
    PreviousPeriod,
    PreviousYear,
}

pub const DEFAULT_COMPARE: Compare = Compare::PreviousYear;

impl Compare {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "previous_period" => Some(Compare::PreviousPeriod),
            "previous_year" => Some(Compare::PreviousYear),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Compare::PreviousPeriod => "Previous Period",
            Compare::PreviousYear => "Previous Year",
        }
    }
}

/// Bucket granularity of a report series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Interval {
    pub fn parse(value: &str) -> Option<Self> {
        let interval = match value {
            "hour" => Interval::Hour,
            "day" => Interval::Day,
            "week" => Interval::Week,
            "month" => Interval::Month,
            "quarter" => Interval::Quarter,
            "year" => Interval::Year,
            _ => return None,
        };
        Some(interval)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Hour => "hour",
            Interval::Day => "day",
            Interval::Week => "week",
            Interval::Month => "month",
            Interval::Quarter => "quarter",
            Interval::Year => "year",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    Week,
    Month,
    Quarter,
    Year,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParams {
    pub period: Period,
    pub compare: Compare,
    pub after: Option<NaiveDate>,
    pub before: Option<NaiveDate>,
}

/// Reads `period`, `compare`, `after` and `before` from the query.
///
/// A custom period without a usable `after`/`before` pair falls back to the default period.
pub fn date_params(query: &ReportQuery) -> DateParams {
    let mut period = query
        .text("period")
        .and_then(Period::parse)
        .unwrap_or(DEFAULT_PERIOD);
    let compare = query
        .text("compare")
        .and_then(Compare::parse)
        .unwrap_or(DEFAULT_COMPARE);
    let after = query.text("after").and_then(parse_date);
    let before = query.text("before").and_then(parse_date);

    if period == Period::Custom {
        match (after, before) {
            (Some(a), Some(b)) if a <= b => {}
            _ => period = DEFAULT_PERIOD,
        }
    }

    DateParams {
        period,
        compare,
        after,
        before,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub label: String,
    pub range: String,
    pub after: NaiveDate,
    pub before: NaiveDate,
}

impl DateWindow {
    fn new(label: &str, after: NaiveDate, before: NaiveDate) -> Self {
        Self {
            label: label.to_string(),
            range: range_label(after, before),
            after,
            before,
        }
    }

    /// Chart legend key, e.g. `Month to Date (Jan 1 - 15, 2019)`.
    pub fn key(&self) -> String {
        format!("{} ({})", self.label, self.range)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentDates {
    pub primary: DateWindow,
    pub secondary: DateWindow,
}

pub fn current_dates(query: &ReportQuery, today: NaiveDate) -> CurrentDates {
    let params = date_params(query);
    let compare = params.compare;

    let (primary_after, primary_before, secondary_after, secondary_before) = match params.period {
        Period::Today => single_day(today, compare),
        Period::Yesterday => single_day(today - Duration::days(1), compare),
        Period::Week => period_to_date(Span::Week, compare, today),
        Period::LastWeek => last_period(Span::Week, compare, today),
        Period::Month => period_to_date(Span::Month, compare, today),
        Period::LastMonth => last_period(Span::Month, compare, today),
        Period::Quarter => period_to_date(Span::Quarter, compare, today),
        Period::LastQuarter => last_period(Span::Quarter, compare, today),
        Period::Year => period_to_date(Span::Year, compare, today),
        Period::LastYear => last_period(Span::Year, compare, today),
        Period::Custom => {
            // date_params only keeps Custom when both bounds are present
            let after = params.after.unwrap_or(today);
            let before = params.before.unwrap_or(today);
            custom_window(after, before, compare)
        }
    };

    CurrentDates {
        primary: DateWindow::new(params.period.label(), primary_after, primary_before),
        secondary: DateWindow::new(compare.label(), secondary_after, secondary_before),
    }
}

type Windows = (NaiveDate, NaiveDate, NaiveDate, NaiveDate);

fn single_day(day: NaiveDate, compare: Compare) -> Windows {
    let secondary = match compare {
        Compare::PreviousPeriod => day - Duration::days(1),
        Compare::PreviousYear => shift_months(day, -12),
    };
    (day, day, secondary, secondary)
}

fn period_to_date(span: Span, compare: Compare, today: NaiveDate) -> Windows {
    let start = start_of(span, today);
    let days_so_far = (today - start).num_days();
    let secondary_start = match compare {
        Compare::PreviousPeriod => shift_span(start, span, -1),
        Compare::PreviousYear => shift_months(start, -12),
    };
    (
        start,
        today,
        secondary_start,
        secondary_start + Duration::days(days_so_far),
    )
}

fn last_period(span: Span, compare: Compare, today: NaiveDate) -> Windows {
    let start = shift_span(start_of(span, today), span, -1);
    let end = end_of(span, start);
    let (secondary_start, secondary_end) = match compare {
        Compare::PreviousPeriod => {
            let s = shift_span(start, span, -1);
            (s, end_of(span, s))
        }
        Compare::PreviousYear => (shift_months(start, -12), shift_months(end, -12)),
    };
    (start, end, secondary_start, secondary_end)
}

fn custom_window(after: NaiveDate, before: NaiveDate, compare: Compare) -> Windows {
    match compare {
        Compare::PreviousPeriod => {
            let length = (before - after).num_days();
            let secondary_end = after - Duration::days(1);
            (
                after,
                before,
                secondary_end - Duration::days(length),
                secondary_end,
            )
        }
        Compare::PreviousYear => (
            after,
            before,
            shift_months(after, -12),
            shift_months(before, -12),
        ),
    }
}

/// Human readable span such as `Jan 1 - 31, 2019`.
pub fn range_label(after: NaiveDate, before: NaiveDate) -> String {
    let same_year = after.year() == before.year();
    let same_month = same_year && after.month() == before.month();

    if same_month && after.day() == before.day() {
        after.format("%b %-d, %Y").to_string()
    } else if same_month {
        format!(
            "{} {} - {}, {}",
            after.format("%b"),
            after.day(),
            before.day(),
            after.year()
        )
    } else if same_year {
        format!(
            "{} - {}",
            after.format("%b %-d"),
            before.format("%b %-d, %Y")
        )
    } else {
        format!(
            "{} - {}",
            after.format("%b %-d, %Y"),
            before.format("%b %-d, %Y")
        )
    }
}

pub fn allowed_intervals(query: &ReportQuery, today: NaiveDate) -> Vec<Interval> {
    use Interval::*;

    let params = date_params(query);
    match params.period {
        Period::Custom => {
            let primary = current_dates(query, today).primary;
            let days = (primary.before - primary.after).num_days();
            if days >= 365 {
                vec![Day, Week, Month, Quarter, Year]
            } else if days >= 90 {
                vec![Day, Week, Month, Quarter]
            } else if days >= 28 {
                vec![Day, Week, Month]
            } else if days >= 7 {
                vec![Day, Week]
            } else if days > 1 {
                vec![Day]
            } else {
                vec![Hour, Day]
            }
        }
        Period::Today | Period::Yesterday => vec![Hour, Day],
        Period::Week | Period::LastWeek => vec![Day],
        Period::Month | Period::LastMonth => vec![Day, Week],
        Period::Quarter | Period::LastQuarter => vec![Day, Week, Month],
        Period::Year | Period::LastYear => vec![Day, Week, Month, Quarter],
    }
}

/// The requested `interval` when it is allowed for the period, else the first allowed one.
pub fn interval_for_query(query: &ReportQuery, today: NaiveDate) -> Interval {
    let allowed = allowed_intervals(query, today);
    let default = allowed.first().copied().unwrap_or(Interval::Day);

    match query.text("interval").and_then(Interval::parse) {
        Some(requested) if allowed.contains(&requested) => requested,
        _ => default,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Bar,
}

pub fn chart_type_for_query(query: &ReportQuery) -> ChartType {
    match query.text("type") {
        Some("bar") => ChartType::Bar,
        _ => ChartType::Line,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateFormats {
    pub tooltip_label_format: &'static str,
    pub x_format: &'static str,
    pub x2_format: &'static str,
    pub table_format: &'static str,
}

/// Axis and tooltip formats for a chart with `ticks` points at `interval`.
pub fn date_formats_for_interval(interval: Interval, ticks: usize) -> DateFormats {
    let mut formats = DateFormats {
        tooltip_label_format: "%B %d, %Y",
        x_format: "%Y-%m-%d",
        x2_format: "%b %Y",
        table_format: DEFAULT_TABLE_DATE_FORMAT,
    };

    match interval {
        Interval::Hour => {
            formats.tooltip_label_format = "%_I%p %b %d, %Y";
            formats.x_format = "%_I%p";
            formats.x2_format = "%b %d, %Y";
            formats.table_format = "h A";
        }
        Interval::Day => {
            if ticks < DAY_TICKS_THRESHOLD {
                formats.x_format = "%d";
            } else {
                formats.x_format = "%b";
                formats.x2_format = "%Y";
            }
        }
        Interval::Week => {
            if ticks < WEEK_TICKS_THRESHOLD {
                formats.x_format = "%d";
                formats.x2_format = "%b %Y";
            } else {
                formats.x_format = "%b";
                formats.x2_format = "%Y";
            }
            formats.tooltip_label_format = "Week of %B %d, %Y";
        }
        Interval::Month | Interval::Quarter => {
            formats.tooltip_label_format = "%B %Y";
            formats.x_format = "%b";
            formats.x2_format = "%Y";
        }
        Interval::Year => {
            formats.tooltip_label_format = "%Y";
            formats.x_format = "%Y";
        }
    }

    formats
}

/// Projects a primary-window timestamp into the secondary window.
///
/// Previous-year comparisons step back one year and keep the time of day.
/// Otherwise the whole number of `interval` units between `primary_after` and
/// `date` is applied to `secondary_after`.
pub fn previous_date(
    date: NaiveDateTime,
    primary_after: NaiveDate,
    secondary_after: NaiveDate,
    compare: Compare,
    interval: Interval,
) -> NaiveDateTime {
    if compare == Compare::PreviousYear {
        return add_months_to(date, -12);
    }

    let difference = units_between(start_of_day(primary_after), date, interval);
    let base = start_of_day(secondary_after);

    match interval {
        Interval::Hour => base - Duration::hours(difference),
        Interval::Day => base - Duration::days(difference),
        Interval::Week => base - Duration::weeks(difference),
        Interval::Month => add_months_to(base, -difference),
        Interval::Quarter => add_months_to(base, -difference * 3),
        Interval::Year => add_months_to(base, -difference * 12),
    }
}

/// `a - b` in whole `interval` units, truncated toward zero.
fn units_between(a: NaiveDateTime, b: NaiveDateTime, interval: Interval) -> i64 {
    let elapsed = a - b;
    match interval {
        Interval::Hour => elapsed.num_hours(),
        Interval::Day => elapsed.num_days(),
        Interval::Week => elapsed.num_weeks(),
        Interval::Month => months_between(a, b),
        Interval::Quarter => months_between(a, b) / 3,
        Interval::Year => months_between(a, b) / 12,
    }
}

fn months_between(a: NaiveDateTime, b: NaiveDateTime) -> i64 {
    let mut months = (a.year() as i64 - b.year() as i64) * 12
        + (a.month() as i64 - b.month() as i64);

    if months > 0 && add_months_to(b, months) > a {
        months -= 1;
    } else if months < 0 && add_months_to(b, months) < a {
        months += 1;
    }
    months
}

fn add_months_to(at: NaiveDateTime, months: i64) -> NaiveDateTime {
    shift_months(at.date(), months).and_time(at.time())
}

/// Calendar month shift clamped to the end of the month.
fn shift_months(date: NaiveDate, months: i64) -> NaiveDate {
    let amount = Months::new(months.unsigned_abs().min(u32::MAX as u64) as u32);
    let shifted = if months >= 0 {
        date.checked_add_months(amount)
    } else {
        date.checked_sub_months(amount)
    };
    // only out of range at the edges of chrono's calendar
    shifted.unwrap_or(date)
}

fn shift_span(date: NaiveDate, span: Span, count: i64) -> NaiveDate {
    match span {
        Span::Week => date + Duration::weeks(count),
        Span::Month => shift_months(date, count),
        Span::Quarter => shift_months(date, count * 3),
        Span::Year => shift_months(date, count * 12),
    }
}

/// Weeks start on Sunday.
fn start_of(span: Span, date: NaiveDate) -> NaiveDate {
    match span {
        Span::Week => date - Duration::days(date.weekday().num_days_from_sunday() as i64),
        Span::Month => date - Duration::days(date.day0() as i64),
        Span::Quarter => {
            let month_start = date - Duration::days(date.day0() as i64);
            shift_months(month_start, -((date.month0() % 3) as i64))
        }
        Span::Year => date - Duration::days(date.ordinal0() as i64),
    }
}

fn end_of(span: Span, date: NaiveDate) -> NaiveDate {
    shift_span(start_of(span, date), span, 1) - Duration::days(1)
}

/// One bucket of a report window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub key: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Buckets covering `after..=before`; the first and last are clipped to the window.
pub fn interval_buckets(
    after: NaiveDateTime,
    before: NaiveDateTime,
    interval: Interval,
) -> Vec<Bucket> {
    let mut buckets = Vec::new();
    let mut start = after;

    while start <= before {
        let next = next_boundary(start, interval);
        if next <= start {
            break;
        }
        let end = (next - Duration::seconds(1)).min(before);
        buckets.push(Bucket {
            key: bucket_key(start, interval),
            start,
            end,
        });
        start = next;
    }

    buckets
}

/// Index of the bucket containing `at`.
pub fn bucket_index(buckets: &[Bucket], at: NaiveDateTime) -> Option<usize> {
    let position = buckets.partition_point(|bucket| bucket.start <= at);
    let index = position.checked_sub(1)?;
    (at <= buckets[index].end).then_some(index)
}

fn next_boundary(at: NaiveDateTime, interval: Interval) -> NaiveDateTime {
    let date = at.date();
    let midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN);

    match interval {
        Interval::Hour => {
            let hour_start = at
                - Duration::minutes(at.minute() as i64)
                - Duration::seconds(at.second() as i64)
                - Duration::nanoseconds(at.nanosecond() as i64);
            hour_start + Duration::hours(1)
        }
        Interval::Day => midnight(date + Duration::days(1)),
        Interval::Week => midnight(shift_span(start_of(Span::Week, date), Span::Week, 1)),
        Interval::Month => midnight(shift_span(start_of(Span::Month, date), Span::Month, 1)),
        Interval::Quarter => {
            midnight(shift_span(start_of(Span::Quarter, date), Span::Quarter, 1))
        }
        Interval::Year => midnight(shift_span(start_of(Span::Year, date), Span::Year, 1)),
    }
}

fn bucket_key(at: NaiveDateTime, interval: Interval) -> String {
    match interval {
        Interval::Hour => at.format("%Y-%m-%d %H").to_string(),
        Interval::Day => at.format(ISO_DATE_FORMAT).to_string(),
        Interval::Week => at.format("%Y-%U").to_string(),
        Interval::Month => at.format("%Y-%m").to_string(),
        Interval::Quarter => format!("{}-Q{}", at.year(), at.month0() / 3 + 1),
        Interval::Year => at.format("%Y").to_string(),
    }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, ISO_DATE_FORMAT).ok()
}

/// Accepts `2019-01-01 00:00:00`, `2019-01-01T00:00:00` or a bare `2019-01-01`.
pub fn parse_report_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, REPORT_DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, CHART_DATE_FORMAT))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, ISO_DATE_FORMAT)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::days(1) - Duration::seconds(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        ymd(y, m, d).and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn month_to_date_against_previous_year() {
        let query = ReportQuery::new().with("period", "month");
        let dates = current_dates(&query, ymd(2019, 3, 15));

        assert_eq!(dates.primary.after, ymd(2019, 3, 1));
        assert_eq!(dates.primary.before, ymd(2019, 3, 15));
        assert_eq!(dates.primary.label, "Month to Date");
        assert_eq!(dates.primary.range, "Mar 1 - 15, 2019");
        assert_eq!(dates.secondary.after, ymd(2018, 3, 1));
        assert_eq!(dates.secondary.before, ymd(2018, 3, 15));
        assert_eq!(dates.secondary.label, "Previous Year");
    }

    #[test]
    fn defaults_apply_without_params() {
        let dates = current_dates(&ReportQuery::new(), ymd(2019, 3, 15));
        assert_eq!(dates.primary.label, "Month to Date");
        assert_eq!(dates.secondary.label, "Previous Year");
    }

    #[test]
    fn last_month_against_previous_period() {
        let query = ReportQuery::new()
            .with("period", "last_month")
            .with("compare", "previous_period");
        let dates = current_dates(&query, ymd(2019, 3, 15));

        assert_eq!(dates.primary.after, ymd(2019, 2, 1));
        assert_eq!(dates.primary.before, ymd(2019, 2, 28));
        assert_eq!(dates.secondary.after, ymd(2019, 1, 1));
        assert_eq!(dates.secondary.before, ymd(2019, 1, 31));
        assert_eq!(dates.secondary.key(), "Previous Period (Jan 1 - 31, 2019)");
    }

    #[test]
    fn week_starts_on_sunday() {
        // 2019-03-13 is a Wednesday
        let query = ReportQuery::new()
            .with("period", "week")
            .with("compare", "previous_period");
        let dates = current_dates(&query, ymd(2019, 3, 13));

        assert_eq!(dates.primary.after, ymd(2019, 3, 10));
        assert_eq!(dates.secondary.after, ymd(2019, 3, 3));
        assert_eq!(dates.secondary.before, ymd(2019, 3, 6));
    }

    #[test]
    fn last_quarter_windows() {
        let query = ReportQuery::new()
            .with("period", "last_quarter")
            .with("compare", "previous_period");
        let dates = current_dates(&query, ymd(2019, 5, 20));

        assert_eq!(dates.primary.after, ymd(2019, 1, 1));
        assert_eq!(dates.primary.before, ymd(2019, 3, 31));
        assert_eq!(dates.secondary.after, ymd(2018, 10, 1));
        assert_eq!(dates.secondary.before, ymd(2018, 12, 31));
    }

    #[test]
    fn custom_previous_period_ends_the_day_before() {
        let query = ReportQuery::new()
            .with("period", "custom")
            .with("after", "2019-01-10")
            .with("before", "2019-01-19")
            .with("compare", "previous_period");
        let dates = current_dates(&query, ymd(2019, 3, 15));

        assert_eq!(dates.primary.range, "Jan 10 - 19, 2019");
        assert_eq!(dates.secondary.after, ymd(2018, 12, 31));
        assert_eq!(dates.secondary.before, ymd(2019, 1, 9));
        assert_eq!(dates.secondary.range, "Dec 31, 2018 - Jan 9, 2019");
    }

    #[test]
    fn custom_without_dates_falls_back_to_month() {
        let query = ReportQuery::new().with("period", "custom");
        assert_eq!(date_params(&query).period, Period::Month);
    }

    #[test]
    fn range_labels() {
        assert_eq!(range_label(ymd(2019, 1, 5), ymd(2019, 1, 5)), "Jan 5, 2019");
        assert_eq!(
            range_label(ymd(2019, 1, 1), ymd(2019, 2, 3)),
            "Jan 1 - Feb 3, 2019"
        );
    }

    #[test]
    fn allowed_intervals_by_period_and_length() {
        let today = ymd(2019, 3, 15);
        let q = |period: &str| ReportQuery::new().with("period", period);

        assert_eq!(
            allowed_intervals(&q("today"), today),
            vec![Interval::Hour, Interval::Day]
        );
        assert_eq!(
            allowed_intervals(&q("year"), today),
            vec![
                Interval::Day,
                Interval::Week,
                Interval::Month,
                Interval::Quarter
            ]
        );

        let custom = q("custom")
            .with("after", "2019-01-01")
            .with("before", "2019-01-30");
        assert_eq!(
            allowed_intervals(&custom, today),
            vec![Interval::Day, Interval::Week, Interval::Month]
        );
    }

    #[test]
    fn disallowed_interval_falls_back() {
        let today = ymd(2019, 3, 15);
        let query = ReportQuery::new()
            .with("period", "week")
            .with("interval", "month");
        assert_eq!(interval_for_query(&query, today), Interval::Day);

        let query = ReportQuery::new()
            .with("period", "month")
            .with("interval", "week");
        assert_eq!(interval_for_query(&query, today), Interval::Week);
    }

    #[test]
    fn formats_switch_on_tick_count() {
        assert_eq!(date_formats_for_interval(Interval::Day, 10).x_format, "%d");
        let many = date_formats_for_interval(Interval::Day, 90);
        assert_eq!(many.x_format, "%b");
        assert_eq!(many.x2_format, "%Y");
        assert_eq!(
            date_formats_for_interval(Interval::Week, 3).tooltip_label_format,
            "Week of %B %d, %Y"
        );
    }

    #[test]
    fn previous_date_by_offset() {
        let projected = previous_date(
            at(2019, 1, 15, 0),
            ymd(2019, 1, 1),
            ymd(2018, 12, 1),
            Compare::PreviousPeriod,
            Interval::Day,
        );
        assert_eq!(projected, at(2018, 12, 15, 0));

        let projected = previous_date(
            at(2019, 3, 1, 0),
            ymd(2019, 1, 1),
            ymd(2018, 10, 1),
            Compare::PreviousPeriod,
            Interval::Month,
        );
        assert_eq!(projected, at(2018, 12, 1, 0));

        let projected = previous_date(
            at(2019, 1, 16, 0),
            ymd(2019, 1, 1),
            ymd(2018, 12, 1),
            Compare::PreviousPeriod,
            Interval::Week,
        );
        assert_eq!(projected, at(2018, 12, 15, 0));
    }

    #[test]
    fn previous_date_previous_year() {
        let projected = previous_date(
            at(2020, 2, 29, 0),
            ymd(2020, 2, 1),
            ymd(2019, 2, 1),
            Compare::PreviousYear,
            Interval::Day,
        );
        assert_eq!(projected, at(2019, 2, 28, 0));

        let projected = previous_date(
            at(2019, 1, 2, 13),
            ymd(2019, 1, 2),
            ymd(2018, 1, 2),
            Compare::PreviousYear,
            Interval::Hour,
        );
        assert_eq!(projected, at(2018, 1, 2, 13));
    }

    #[test]
    fn previous_date_keeps_the_hour() {
        for hour in [0, 5, 13, 23] {
            let projected = previous_date(
                at(2019, 1, 2, hour),
                ymd(2019, 1, 2),
                ymd(2019, 1, 1),
                Compare::PreviousPeriod,
                Interval::Hour,
            );
            assert_eq!(projected, at(2019, 1, 1, hour));
        }
    }

    #[test]
    fn month_difference_truncates() {
        assert_eq!(months_between(at(2019, 1, 20, 0), at(2019, 2, 15, 0)), 0);
        assert_eq!(months_between(at(2019, 1, 1, 0), at(2019, 2, 15, 0)), -1);
        assert_eq!(months_between(at(2019, 4, 1, 0), at(2019, 1, 1, 0)), 3);
        assert_eq!(months_between(at(2019, 1, 1, 0), at(2019, 3, 1, 5)), -2);
    }

    #[test]
    fn buckets_cover_the_window() {
        let after = start_of_day(ymd(2019, 1, 1));
        let before = end_of_day(ymd(2019, 1, 31));

        let days = interval_buckets(after, before, Interval::Day);
        assert_eq!(days.len(), 31);
        assert_eq!(days[0].key, "2019-01-01");
        assert_eq!(days[30].end, before);

        // 2019-01-01 is a Tuesday: the first week is clipped to Jan 1..=Jan 5
        let weeks = interval_buckets(after, before, Interval::Week);
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0].end, end_of_day(ymd(2019, 1, 5)));
        assert_eq!(weeks[1].start, start_of_day(ymd(2019, 1, 6)));

        let hours = interval_buckets(after, end_of_day(ymd(2019, 1, 1)), Interval::Hour);
        assert_eq!(hours.len(), 24);
    }

    #[test]
    fn bucket_lookup() {
        let after = start_of_day(ymd(2019, 1, 1));
        let before = end_of_day(ymd(2019, 3, 31));
        let months = interval_buckets(after, before, Interval::Month);

        assert_eq!(months.len(), 3);
        assert_eq!(bucket_index(&months, at(2019, 2, 28, 23)), Some(1));
        assert_eq!(bucket_index(&months, at(2018, 12, 31, 23)), None);
        assert_eq!(bucket_index(&months, at(2019, 4, 1, 0)), None);
    }

    #[test]
    fn report_datetimes_parse_in_all_layouts() {
        let expected = Some(at(2019, 1, 1, 0));
        assert_eq!(parse_report_datetime("2019-01-01 00:00:00"), expected);
        assert_eq!(parse_report_datetime("2019-01-01T00:00:00"), expected);
        assert_eq!(parse_report_datetime("2019-01-01"), expected);
        assert_eq!(parse_report_datetime("yesterday"), None);
    }
}
