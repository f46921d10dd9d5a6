use crate::api::{Booking, BookingId, NewBooking, UserId};
use crate::bookings::{
    authorize_booking_creation, authorize_booking_decision, authorize_booking_view, decide,
    validate_booking_window, BookingParty, BookingStateFilter, Page,
};
use crate::error::ShareItResult;

use super::ShareItService;

impl ShareItService {
    /// Creates a WAITING booking after validating the dates and the booker
    pub async fn create_booking(
        &self,
        booker_id: UserId,
        new_booking: NewBooking,
    ) -> ShareItResult<Booking> {
        let window = validate_booking_window(new_booking.start, new_booking.end, self.now())?;
        let item = self.repository.get_item(new_booking.item_id).await?;
        self.repository.get_user(booker_id).await?;
        authorize_booking_creation(booker_id, &item)?;

        let booking = self
            .repository
            .add_booking(booker_id, item.id, window)
            .await?;
        tracing::info!(
            "User {} booked item {} as booking {}",
            booker_id,
            item.id,
            booking.id
        );
        Ok(booking)
    }

    pub async fn get_booking(&self, user_id: UserId, booking_id: BookingId) -> ShareItResult<Booking> {
        self.repository.get_user(user_id).await?;
        let booking = self.repository.get_booking(booking_id).await?;
        authorize_booking_view(user_id, &booking)?;
        Ok(booking)
    }

    /// Approves or rejects a WAITING booking, only the item owner may do it
    pub async fn decide_booking(
        &self,
        user_id: UserId,
        booking_id: BookingId,
        approved: bool,
    ) -> ShareItResult<Booking> {
        self.repository.get_user(user_id).await?;
        let booking = self.repository.get_booking(booking_id).await?;
        authorize_booking_decision(user_id, &booking)?;
        let status = decide(&booking, approved)?;

        let booking = self.repository.decide_booking(booking_id, status).await?;
        tracing::info!("User {} set booking {} to {}", user_id, booking_id, status);
        Ok(booking)
    }

    /// Bookings made by the user, filtered by `state` (ALL when absent)
    pub async fn list_booker_bookings(
        &self,
        booker_id: UserId,
        state: Option<&str>,
        page: Option<Page>,
    ) -> ShareItResult<Vec<Booking>> {
        self.list_bookings(BookingParty::Booker(booker_id), state, page)
            .await
    }

    /// Bookings of items owned by the user, filtered by `state` (ALL when absent)
    pub async fn list_owner_bookings(
        &self,
        owner_id: UserId,
        state: Option<&str>,
        page: Option<Page>,
    ) -> ShareItResult<Vec<Booking>> {
        self.list_bookings(BookingParty::Owner(owner_id), state, page)
            .await
    }

    async fn list_bookings(
        &self,
        party: BookingParty,
        state: Option<&str>,
        page: Option<Page>,
    ) -> ShareItResult<Vec<Booking>> {
        let filter: BookingStateFilter = state.unwrap_or("ALL").parse()?;
        let user_id = match party {
            BookingParty::Booker(user_id) | BookingParty::Owner(user_id) => user_id,
        };
        self.repository.get_user(user_id).await?;

        Ok(self
            .repository
            .list_bookings(party, filter.selection(self.now()), page)
            .await?)
    }
}
