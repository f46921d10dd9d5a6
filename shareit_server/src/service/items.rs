use chrono::NaiveDateTime;

use crate::api::{
    Booking, BookingShort, Comment, Item, ItemDetails, ItemDetailsPatch, ItemId, ItemWithBookings,
    NewComment, UserId,
};
use crate::error::{ShareItError, ShareItResult};

use super::{require_non_blank, ShareItService};

/// Builds the presented item. `bookings` are APPROVED bookings and are only
/// looked at when `show_bookings` is set, i.e. the viewer owns the item.
fn with_bookings(
    item: Item,
    bookings: &[Booking],
    comments: &[Comment],
    show_bookings: bool,
    now: NaiveDateTime,
) -> ItemWithBookings {
    let (last_booking, next_booking) = if show_bookings {
        let item_id = item.id;
        let item_bookings =
            move || bookings.iter().filter(move |booking| booking.item.id == item_id);
        (
            item_bookings()
                .filter(|booking| booking.start <= now)
                .max_by_key(|booking| (booking.start, booking.id))
                .map(BookingShort::from),
            item_bookings()
                .filter(|booking| booking.start > now)
                .min_by_key(|booking| (booking.start, booking.id))
                .map(BookingShort::from),
        )
    } else {
        (None, None)
    };

    ItemWithBookings {
        last_booking,
        next_booking,
        comments: comments
            .iter()
            .filter(|comment| comment.item_id == item.id)
            .cloned()
            .collect(),
        id: item.id,
        name: item.name,
        description: item.description,
        available: item.available,
        request_id: item.request_id,
    }
}

impl ShareItService {
    pub async fn add_item(&self, owner_id: UserId, details: ItemDetails) -> ShareItResult<Item> {
        require_non_blank("name", &details.name)?;
        require_non_blank("description", &details.description)?;
        self.repository.get_user(owner_id).await?;
        if let Some(request_id) = details.request_id {
            self.repository.get_item_request(request_id).await?;
        }

        let item = self.repository.add_item(owner_id, details).await?;
        tracing::info!("User {} added item {}", owner_id, item.id);
        Ok(item)
    }

    /// Item with its comments, last and next bookings are only shown to the owner
    pub async fn get_item(&self, user_id: UserId, item_id: ItemId) -> ShareItResult<ItemWithBookings> {
        self.repository.get_user(user_id).await?;
        let item = self.repository.get_item(item_id).await?;
        let comments = self.repository.list_comments(&[item_id]).await?;
        let is_owner = item.owner_id == user_id;
        let bookings = if is_owner {
            self.repository.list_approved_bookings(&[item_id]).await?
        } else {
            vec![]
        };
        Ok(with_bookings(item, &bookings, &comments, is_owner, self.now()))
    }

    pub async fn list_owner_items(&self, owner_id: UserId) -> ShareItResult<Vec<ItemWithBookings>> {
        self.repository.get_user(owner_id).await?;
        let items = self.repository.list_items_by_owner(owner_id).await?;
        let item_ids: Vec<ItemId> = items.iter().map(|item| item.id).collect();
        let bookings = self.repository.list_approved_bookings(&item_ids).await?;
        let comments = self.repository.list_comments(&item_ids).await?;
        let now = self.now();

        Ok(items
            .into_iter()
            .map(|item| with_bookings(item, &bookings, &comments, true, now))
            .collect())
    }

    async fn owned_item(&self, user_id: UserId, item_id: ItemId, action: &str) -> ShareItResult<Item> {
        let item = self.repository.get_item(item_id).await?;
        if item.owner_id != user_id {
            return Err(ShareItError::NotAuthorized {
                user_id,
                action: format!("{action} item {item_id}"),
            });
        }
        Ok(item)
    }

    pub async fn update_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
        patch: ItemDetailsPatch,
    ) -> ShareItResult<Item> {
        if let Some(name) = &patch.name {
            require_non_blank("name", name)?;
        }
        if let Some(description) = &patch.description {
            require_non_blank("description", description)?;
        }
        self.owned_item(user_id, item_id, "update").await?;

        let item = self.repository.update_item(item_id, patch).await?;
        tracing::info!("User {} updated item {}", user_id, item_id);
        Ok(item)
    }

    pub async fn delete_item(&self, user_id: UserId, item_id: ItemId) -> ShareItResult<()> {
        self.owned_item(user_id, item_id, "delete").await?;
        self.repository.delete_item(item_id).await?;
        tracing::info!("User {} deleted item {}", user_id, item_id);
        Ok(())
    }

    /// Available items matching the text, a blank text matches nothing
    pub async fn search_items(&self, text: &str) -> ShareItResult<Vec<Item>> {
        if text.trim().is_empty() {
            return Ok(vec![]);
        }
        Ok(self.repository.search_available_items(text).await?)
    }

    /// Only renters whose APPROVED booking of the item is over may comment
    pub async fn add_comment(
        &self,
        author_id: UserId,
        item_id: ItemId,
        comment: NewComment,
    ) -> ShareItResult<Comment> {
        require_non_blank("text", &comment.text)?;
        self.repository.get_user(author_id).await?;
        self.repository.get_item(item_id).await?;

        let now = self.now();
        if !self
            .repository
            .has_finished_booking(author_id, item_id, now)
            .await?
        {
            return Err(ShareItError::CommentNotAllowed {
                user_id: author_id,
                item_id,
            });
        }

        let comment = self
            .repository
            .add_comment(author_id, item_id, comment.text, now)
            .await?;
        tracing::info!("User {} commented on item {}", author_id, item_id);
        Ok(comment)
    }
}
