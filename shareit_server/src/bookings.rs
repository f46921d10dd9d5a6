//! Booking rules: date validation, who may do what with a booking,
//! the approval transition and the state filter used by listings.

pub use approval::decide;
pub use authorizer::{
    authorize_booking_creation, authorize_booking_decision, authorize_booking_view,
};
pub use state_filter::{
    order_by_start_desc, BookingParty, BookingSelection, BookingStateFilter, Page,
};
pub use validator::{validate_booking_window, BookingWindow, InvalidDateReason};

mod approval;
mod authorizer;
mod state_filter;
mod validator;
