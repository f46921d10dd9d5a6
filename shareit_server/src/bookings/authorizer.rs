use crate::api::{Booking, Item, UserId};
use crate::error::ShareItError;

/// Owner check comes first so an owner is refused even for an available item
pub fn authorize_booking_creation(requester_id: UserId, item: &Item) -> Result<(), ShareItError> {
    if item.owner_id == requester_id {
        return Err(ShareItError::OwnerSelfBooking {
            user_id: requester_id,
            item_id: item.id,
        });
    }
    if !item.available {
        return Err(ShareItError::ItemUnavailable(item.id));
    }
    Ok(())
}

pub fn authorize_booking_view(requester_id: UserId, booking: &Booking) -> Result<(), ShareItError> {
    if booking.booker.id == requester_id || booking.item.owner_id == requester_id {
        Ok(())
    } else {
        Err(ShareItError::NotAuthorized {
            user_id: requester_id,
            action: format!("view booking {}", booking.id),
        })
    }
}

pub fn authorize_booking_decision(
    requester_id: UserId,
    booking: &Booking,
) -> Result<(), ShareItError> {
    if booking.item.owner_id == requester_id {
        Ok(())
    } else {
        Err(ShareItError::NotAuthorized {
            user_id: requester_id,
            action: format!("decide on booking {}", booking.id),
        })
    }
}
