use crate::model::Operation;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];
const DATE_TIME_FORMATS: [&str; 4] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

pub(super) fn matches_time(operation: Operation, values: &[String], input: &str) -> bool {
    compare(operation, values, input, parse_time)
}

pub(super) fn matches_date(operation: Operation, values: &[String], input: &str) -> bool {
    compare(operation, values, input, parse_date)
}

/// Bounds are inclusive for every operation.
fn compare<T: PartialOrd>(operation: Operation, values: &[String], input: &str, parse: fn(&str) -> Option<T>) -> bool {
    let Some(input) = parse(input) else {
        return false;
    };

    let operand = |index: usize| values.get(index).and_then(|v| parse(v));

    match operation {
        Operation::Lower => operand(0).is_some_and(|bound| input <= bound),
        Operation::Greater => operand(0).is_some_and(|bound| input >= bound),
        Operation::Between => match (operand(0), operand(1)) {
            (Some(low), Some(high)) => low <= input && input <= high,
            _ => false,
        },
        _ => false,
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    TIME_FORMATS.iter().find_map(|format| NaiveTime::parse_from_str(text, format).ok())
}

fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
