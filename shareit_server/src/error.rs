use crate::api::{BookingId, ItemId, UserId};
use crate::bookings::InvalidDateReason;
use crate::repository::RepositoryError;

/// Errors raised by the sharing service. Translation to HTTP statuses happens in the handlers
#[derive(Debug, thiserror::Error)]
pub enum ShareItError {
    #[error("Invalid booking dates: {0}")]
    InvalidDate(#[from] InvalidDateReason),

    #[error("User {user_id} owns item {item_id} and cannot book it")]
    OwnerSelfBooking { user_id: UserId, item_id: ItemId },

    #[error("Item {0} is not available for booking")]
    ItemUnavailable(ItemId),

    #[error("User {user_id} is not allowed to {action}")]
    NotAuthorized { user_id: UserId, action: String },

    #[error("Booking {0} has already been decided")]
    AlreadyDecided(BookingId),

    #[error("Unknown state: {0}")]
    UnsupportedState(String),

    #[error("Invalid page parameter: {0}")]
    InvalidPageParameter(i64),

    #[error("User {user_id} has no finished booking of item {item_id} to comment on")]
    CommentNotAllowed { user_id: UserId, item_id: ItemId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ShareItError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // conditional update lost the race against another decision
            RepositoryError::BookingAlreadyDecided(booking_id) => Self::AlreadyDecided(booking_id),
            other => Self::Repository(other),
        }
    }
}

impl ShareItError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Repository(
                RepositoryError::UserNotFound(_)
                    | RepositoryError::ItemNotFound(_)
                    | RepositoryError::BookingNotFound(_)
                    | RepositoryError::ItemRequestNotFound(_)
            )
        )
    }
}

pub type ShareItResult<T> = Result<T, ShareItError>;
