use std::cmp::Reverse;
use std::str::FromStr;

use chrono::NaiveDateTime;

use crate::api::{Booking, BookingStatus, UserId};
use crate::error::ShareItError;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// Filter keyword accepted by booking listings
pub enum BookingStateFilter {
    All,
    Current,
    Past,
    Future,
    Waiting,
    Approved,
    Rejected,
}

impl FromStr for BookingStateFilter {
    type Err = ShareItError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ALL" => Ok(Self::All),
            "CURRENT" => Ok(Self::Current),
            "PAST" => Ok(Self::Past),
            "FUTURE" => Ok(Self::Future),
            "WAITING" => Ok(Self::Waiting),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            unknown => Err(ShareItError::UnsupportedState(unknown.to_string())),
        }
    }
}

impl BookingStateFilter {
    /// Resolves temporal keywords against `now`, status keywords ignore it
    pub fn selection(self, now: NaiveDateTime) -> BookingSelection {
        match self {
            Self::All => BookingSelection::All,
            Self::Current => BookingSelection::Current(now),
            Self::Past => BookingSelection::Past(now),
            Self::Future => BookingSelection::Future(now),
            Self::Waiting => BookingSelection::Status(BookingStatus::Waiting),
            Self::Approved => BookingSelection::Status(BookingStatus::Approved),
            Self::Rejected => BookingSelection::Status(BookingStatus::Rejected),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// Predicate a repository applies when listing bookings
pub enum BookingSelection {
    All,
    Status(BookingStatus),
    /// `start <= now <= end`
    Current(NaiveDateTime),
    /// `end < now`
    Past(NaiveDateTime),
    /// `start > now`
    Future(NaiveDateTime),
}

impl BookingSelection {
    pub fn matches(&self, booking: &Booking) -> bool {
        match *self {
            BookingSelection::All => true,
            BookingSelection::Status(status) => booking.status == status,
            BookingSelection::Current(now) => booking.start <= now && now <= booking.end,
            BookingSelection::Past(now) => booking.end < now,
            BookingSelection::Future(now) => booking.start > now,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// Whose bookings are listed
pub enum BookingParty {
    Booker(UserId),
    Owner(UserId),
}

impl BookingParty {
    pub fn matches(&self, booking: &Booking) -> bool {
        match *self {
            BookingParty::Booker(user_id) => booking.booker.id == user_id,
            BookingParty::Owner(user_id) => booking.item.owner_id == user_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// Non-negative offset and optional positive limit
pub struct Page {
    pub offset: i64,
    pub limit: Option<i64>,
}

impl Page {
    /// Returns `None` when neither parameter is given, the full result is wanted then
    pub fn from_params(from: Option<i64>, size: Option<i64>) -> Result<Option<Page>, ShareItError> {
        if let Some(offset) = from.filter(|offset| *offset < 0) {
            return Err(ShareItError::InvalidPageParameter(offset));
        }
        if let Some(limit) = size.filter(|limit| *limit <= 0) {
            return Err(ShareItError::InvalidPageParameter(limit));
        }
        if from.is_none() && size.is_none() {
            return Ok(None);
        }
        Ok(Some(Page {
            offset: from.unwrap_or_default(),
            limit: size,
        }))
    }

    pub fn apply<T>(&self, values: impl IntoIterator<Item = T>) -> Vec<T> {
        let skipped = values.into_iter().skip(self.offset as usize);
        match self.limit {
            Some(limit) => skipped.take(limit as usize).collect(),
            None => skipped.collect(),
        }
    }
}

/// Listing order: newest start first, ties broken by the higher id
pub fn order_by_start_desc(bookings: &mut [Booking]) {
    bookings.sort_by_key(|booking| Reverse((booking.start, booking.id)));
}
