use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::api::{Booking, BookingStatus};
use crate::error::ShareItError;

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Waiting => "WAITING",
            BookingStatus::Approved => "APPROVED",
            BookingStatus::Rejected => "REJECTED",
        }
    }
}

impl Display for BookingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "WAITING" => Ok(BookingStatus::Waiting),
            "APPROVED" => Ok(BookingStatus::Approved),
            "REJECTED" => Ok(BookingStatus::Rejected),
            other => Err(format!("Unknown booking status {other}")),
        }
    }
}

/// Status a WAITING booking moves to after the owner's decision.
/// APPROVED and REJECTED are terminal.
pub fn decide(booking: &Booking, approved: bool) -> Result<BookingStatus, ShareItError> {
    match booking.status {
        BookingStatus::Waiting if approved => Ok(BookingStatus::Approved),
        BookingStatus::Waiting => Ok(BookingStatus::Rejected),
        BookingStatus::Approved | BookingStatus::Rejected => {
            Err(ShareItError::AlreadyDecided(booking.id))
        }
    }
}
