use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("text does not match \"событие ЧЧ:ММ\" or \"событие ДД.ММ ЧЧ:ММ\"")]
    InvalidFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReminder {
    pub event: String,
    pub fire_at: NaiveDateTime,
}

enum Schedule {
    TimeOfDay { time: NaiveTime },
    DateAndTime { day: u32, month: u32, time: NaiveTime },
}

/// Parses a reminder command into an event name and an absolute fire time.
///
/// Two forms are accepted: `<событие> ЧЧ:ММ` and `<событие> ДД.ММ ЧЧ:ММ`.
/// The event is one or more words of letters; `.` and `:` are
/// interchangeable inside the date and time pairs. A candidate that is
/// already in the past relative to `now` rolls forward exactly one day.
pub fn resolve(text: &str, now: NaiveDateTime) -> Result<ResolvedReminder, ParseError> {
    let (event, schedule) = parse(text)?;

    let candidate = match schedule {
        Schedule::TimeOfDay { time } => now.date().and_time(time),
        Schedule::DateAndTime { day, month, time } => NaiveDate::from_ymd_opt(now.year(), month, day)
            .ok_or(ParseError::InvalidFormat)?
            .and_time(time),
    };

    Ok(ResolvedReminder {
        event,
        fire_at: roll_forward_if_passed(candidate, now),
    })
}

fn parse(text: &str) -> Result<(String, Schedule), ParseError> {
    let text = text.trim();
    let split_at = text
        .find(|c: char| !(c.is_alphabetic() || c.is_whitespace()))
        .ok_or(ParseError::InvalidFormat)?;
    let (event_part, tail) = text.split_at(split_at);

    // The event and the schedule must be separated by whitespace, so a
    // digit glued to the last word is a format error, not a short event.
    if !event_part.ends_with(|c: char| c.is_whitespace()) {
        return Err(ParseError::InvalidFormat);
    }
    let event = event_part.trim_end();
    if event.is_empty() {
        return Err(ParseError::InvalidFormat);
    }

    let schedule = match *tail.split_whitespace().collect::<Vec<_>>().as_slice() {
        [time] => Schedule::TimeOfDay {
            time: parse_time_pair(time)?,
        },
        [date, time] => {
            let (day, month) = parse_date_pair(date)?;
            Schedule::DateAndTime {
                day,
                month,
                time: parse_time_pair(time)?,
            }
        }
        _ => return Err(ParseError::InvalidFormat),
    };

    Ok((event.to_string(), schedule))
}

/// `ЧЧ:ММ` — hour is 1-2 digits, minute exactly 2.
fn parse_time_pair(token: &str) -> Result<NaiveTime, ParseError> {
    let (hour, minute) = split_pair(token)?;
    if hour.len() > 2 || minute.len() != 2 {
        return Err(ParseError::InvalidFormat);
    }

    NaiveTime::from_hms_opt(parse_component(hour)?, parse_component(minute)?, 0)
        .ok_or(ParseError::InvalidFormat)
}

/// `ДД.ММ` — day and month are both 1-2 digits.
fn parse_date_pair(token: &str) -> Result<(u32, u32), ParseError> {
    let (day, month) = split_pair(token)?;
    if day.len() > 2 || !(1..=2).contains(&month.len()) {
        return Err(ParseError::InvalidFormat);
    }

    Ok((parse_component(day)?, parse_component(month)?))
}

fn split_pair(token: &str) -> Result<(&str, &str), ParseError> {
    let (first, second) = token
        .split_once(['.', ':'])
        .ok_or(ParseError::InvalidFormat)?;

    let all_digits =
        |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(first) || !all_digits(second) {
        return Err(ParseError::InvalidFormat);
    }

    Ok((first, second))
}

fn parse_component(value: &str) -> Result<u32, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidFormat)
}

fn roll_forward_if_passed(candidate: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    if candidate < now {
        // A passed candidate rolls forward exactly one day in both forms;
        // a passed calendar date does not jump to the next year.
        candidate
            .checked_add_signed(TimeDelta::days(1))
            .expect("Not realistic to overflow")
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn time_ahead_resolves_to_today() {
        let resolved = resolve("тест 23:59", at(2024, 1, 1, 23, 58)).unwrap();

        assert_eq!(resolved.event, "тест");
        assert_eq!(resolved.fire_at, at(2024, 1, 1, 23, 59));
    }

    #[test]
    fn time_still_ahead_stays_on_the_same_day() {
        let resolved = resolve("тест 23:59", at(2024, 1, 2, 0, 1)).unwrap();

        assert_eq!(resolved.fire_at, at(2024, 1, 2, 23, 59));
    }

    #[test]
    fn passed_time_rolls_to_tomorrow() {
        let resolved = resolve("тест 10:00", at(2024, 1, 1, 12, 0)).unwrap();

        assert_eq!(resolved.fire_at, at(2024, 1, 2, 10, 0));
    }

    #[test]
    fn date_form_resolves_in_the_current_year() {
        let resolved = resolve("встреча 05.06 10:00", at(2024, 1, 1, 9, 0)).unwrap();

        assert_eq!(resolved.event, "встреча");
        assert_eq!(resolved.fire_at, at(2024, 6, 5, 10, 0));
    }

    #[test]
    fn passed_date_rolls_forward_one_day() {
        let resolved = resolve("встреча 05.06 10:00", at(2024, 7, 1, 12, 0)).unwrap();

        assert_eq!(resolved.fire_at, at(2024, 6, 6, 10, 0));
    }

    #[test]
    fn separators_are_interchangeable() {
        let resolved = resolve("встреча 5:06 10.30", at(2024, 1, 1, 0, 0)).unwrap();
        assert_eq!(resolved.fire_at, at(2024, 6, 5, 10, 30));

        let resolved = resolve("тест 10.30", at(2024, 1, 1, 0, 0)).unwrap();
        assert_eq!(resolved.fire_at, at(2024, 1, 1, 10, 30));
    }

    #[test]
    fn single_digit_components_are_accepted() {
        let resolved = resolve("тест 9:05", at(2024, 1, 1, 0, 0)).unwrap();
        assert_eq!(resolved.fire_at, at(2024, 1, 1, 9, 5));

        let resolved = resolve("встреча 5.6 10:30", at(2024, 1, 1, 0, 0)).unwrap();
        assert_eq!(resolved.fire_at, at(2024, 6, 5, 10, 30));
    }

    #[test]
    fn multi_word_event_is_preserved() {
        let resolved = resolve("забрать посылку на почте 18:00", at(2024, 1, 1, 9, 0)).unwrap();

        assert_eq!(resolved.event, "забрать посылку на почте");
    }

    #[test]
    fn leap_day_is_only_valid_in_a_leap_year() {
        let now = at(2024, 1, 1, 0, 0);
        assert!(resolve("тест 29.02 10:00", now).is_ok());

        let now = at(2023, 1, 1, 0, 0);
        assert_eq!(
            resolve("тест 29.02 10:00", now),
            Err(ParseError::InvalidFormat)
        );
    }

    #[test]
    fn malformed_commands_are_rejected() {
        let cases = [
            "",
            "тест",
            "10:00",
            "тест10:00",
            "тест 10",
            "тест 10:5",
            "тест 24:00",
            "тест 10:60",
            "тест 32.01 10:00",
            "тест 00.13 10:00",
            "тест 1.2.3 10:00",
            "тест 10:00 и ещё",
        ];

        for case in cases {
            assert_eq!(
                resolve(case, at(2024, 1, 1, 12, 0)),
                Err(ParseError::InvalidFormat),
                "expected {case:?} to be rejected"
            );
        }
    }

    fn datetime_strategy() -> impl Strategy<Value = NaiveDateTime> {
        (2000i32..2100, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60).prop_map(
            |(year, month, day, hour, minute, second)| {
                NaiveDate::from_ymd_opt(year, month, day)
                    .unwrap()
                    .and_hms_opt(hour, minute, second)
                    .unwrap()
            },
        )
    }

    proptest! {
        #[test]
        fn time_only_form_lands_within_a_day(
            now in datetime_strategy(),
            (hour, minute) in (0u32..24, 0u32..60),
        ) {
            let text = format!("тест {hour}:{minute:02}");
            let resolved = resolve(&text, now).unwrap();

            prop_assert!(resolved.fire_at >= now, "fire_at must never be in the past");
            prop_assert!(resolved.fire_at - now <= TimeDelta::days(1));
            prop_assert_eq!(
                resolved.fire_at.time(),
                NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
            );
        }

        #[test]
        fn date_form_preserves_day_and_month(
            (day, month) in (1u32..=28, 1u32..=12),
            (hour, minute) in (0u32..24, 0u32..60),
        ) {
            let now = at(2024, 1, 1, 0, 0);
            let text = format!("встреча {day}.{month} {hour}:{minute:02}");
            let resolved = resolve(&text, now).unwrap();

            prop_assert_eq!(resolved.fire_at.day(), day);
            prop_assert_eq!(resolved.fire_at.month(), month);
        }
    }
}
