use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum InvalidDateReason {
    #[error("booking start is not set")]
    StartMissing,

    #[error("booking end is not set")]
    EndMissing,

    #[error("booking start is in the past")]
    StartInPast,

    #[error("booking end is in the past")]
    EndInPast,

    #[error("booking end is before its start")]
    EndBeforeStart,

    #[error("booking start and end are equal")]
    StartEqualsEnd,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// Validated booking period, `start < end` always holds
pub struct BookingWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Checks a proposed booking period against `now`.
/// Checks run in a fixed order so the reported reason is deterministic.
pub fn validate_booking_window(
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Result<BookingWindow, InvalidDateReason> {
    let start = start.ok_or(InvalidDateReason::StartMissing)?;
    let end = end.ok_or(InvalidDateReason::EndMissing)?;

    if start < now {
        return Err(InvalidDateReason::StartInPast);
    }
    if end < now {
        return Err(InvalidDateReason::EndInPast);
    }
    if end < start {
        return Err(InvalidDateReason::EndBeforeStart);
    }
    if start == end {
        return Err(InvalidDateReason::StartEqualsEnd);
    }

    Ok(BookingWindow { start, end })
}

#[cfg(test)]
mod tests_validator {
    use chrono::{Duration, NaiveDate};

    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_accepts_future_window() {
        let start = now() + Duration::hours(1);
        let end = now() + Duration::hours(2);

        assert_eq!(
            validate_booking_window(Some(start), Some(end), now()),
            Ok(BookingWindow { start, end })
        );
    }

    #[test]
    fn test_accepts_window_starting_now() {
        let end = now() + Duration::minutes(1);
        assert!(validate_booking_window(Some(now()), Some(end), now()).is_ok());
    }

    #[test]
    /// Every rule broken at once must report the first check in order
    fn test_reasons_follow_check_order() {
        let past = now() - Duration::hours(1);
        let future = now() + Duration::hours(1);

        assert_eq!(
            validate_booking_window(None, None, now()),
            Err(InvalidDateReason::StartMissing)
        );
        assert_eq!(
            validate_booking_window(Some(past), None, now()),
            Err(InvalidDateReason::EndMissing)
        );
        assert_eq!(
            validate_booking_window(Some(past), Some(past), now()),
            Err(InvalidDateReason::StartInPast)
        );
        assert_eq!(
            validate_booking_window(Some(future), Some(past), now()),
            Err(InvalidDateReason::EndInPast)
        );
        assert_eq!(
            validate_booking_window(
                Some(future + Duration::hours(1)),
                Some(future),
                now()
            ),
            Err(InvalidDateReason::EndBeforeStart)
        );
        assert_eq!(
            validate_booking_window(Some(future), Some(future), now()),
            Err(InvalidDateReason::StartEqualsEnd)
        );
    }

    #[test]
    fn test_rejects_every_non_positive_length() {
        for offset_minutes in [0, 1, 30, 24 * 60] {
            let start = now() + Duration::hours(3);
            let end = start - Duration::minutes(offset_minutes);
            assert!(validate_booking_window(Some(start), Some(end), now()).is_err());
        }
    }
}
