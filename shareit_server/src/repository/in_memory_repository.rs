use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::NaiveDateTime;
use parking_lot::RwLock;

use crate::api::{
    BookedItem, Booker, Booking, BookingId, BookingStatus, Comment, CommentId, Item, ItemDetails,
    ItemDetailsPatch, ItemId, ItemRequestId, User, UserDetails, UserDetailsPatch, UserId,
};
use crate::bookings::{order_by_start_desc, BookingParty, BookingSelection, BookingWindow, Page};
use crate::repository::{ItemRequestRecord, RepositoryError, ShareItRepository};

struct StoredBooking {
    id: BookingId,
    item_id: ItemId,
    booker_id: UserId,
    start: NaiveDateTime,
    end: NaiveDateTime,
    status: BookingStatus,
}

struct StoredComment {
    id: CommentId,
    item_id: ItemId,
    author_id: UserId,
    text: String,
    created: NaiveDateTime,
}

/// Repository keeping everything in process memory.
/// Locks are always taken in the order users, items, bookings, comments, item_requests
pub struct InMemoryShareItRepository {
    users: RwLock<HashMap<UserId, User>>,
    items: RwLock<HashMap<ItemId, Item>>,
    bookings: RwLock<HashMap<BookingId, StoredBooking>>,
    comments: RwLock<HashMap<CommentId, StoredComment>>,
    item_requests: RwLock<HashMap<ItemRequestId, ItemRequestRecord>>,
    user_sequence_generator: AtomicI64,
    item_sequence_generator: AtomicI64,
    booking_sequence_generator: AtomicI64,
    comment_sequence_generator: AtomicI64,
    item_request_sequence_generator: AtomicI64,
}

impl Default for InMemoryShareItRepository {
    fn default() -> Self {
        Self {
            users: Default::default(),
            items: Default::default(),
            bookings: Default::default(),
            comments: Default::default(),
            item_requests: Default::default(),
            user_sequence_generator: Default::default(),
            item_sequence_generator: Default::default(),
            booking_sequence_generator: Default::default(),
            comment_sequence_generator: Default::default(),
            item_request_sequence_generator: Default::default(),
        }
    }
}

fn next_id(sequence_generator: &AtomicI64) -> i64 {
    sequence_generator.fetch_add(1, Ordering::Relaxed) + 1
}

fn to_booking(
    stored: &StoredBooking,
    items: &HashMap<ItemId, Item>,
) -> Result<Booking, RepositoryError> {
    let item = items
        .get(&stored.item_id)
        .ok_or(RepositoryError::ItemNotFound(stored.item_id))?;
    Ok(Booking {
        id: stored.id,
        start: stored.start,
        end: stored.end,
        status: stored.status,
        booker: Booker {
            id: stored.booker_id,
        },
        item: BookedItem {
            id: item.id,
            name: item.name.clone(),
            owner_id: item.owner_id,
        },
    })
}

fn to_comment(
    stored: &StoredComment,
    users: &HashMap<UserId, User>,
) -> Result<Comment, RepositoryError> {
    let author = users
        .get(&stored.author_id)
        .ok_or(RepositoryError::UserNotFound(stored.author_id))?;
    Ok(Comment {
        id: stored.id,
        item_id: stored.item_id,
        text: stored.text.clone(),
        author_name: author.name.clone(),
        created: stored.created,
    })
}

fn newest_first(mut requests: Vec<ItemRequestRecord>) -> Vec<ItemRequestRecord> {
    requests.sort_by_key(|request| Reverse((request.created, request.id)));
    requests
}

#[async_trait::async_trait]
impl ShareItRepository for InMemoryShareItRepository {
    async fn add_user(&self, details: UserDetails) -> Result<User, RepositoryError> {
        let mut locked_users = self.users.write();
        if locked_users.values().any(|user| user.email == details.email) {
            return Err(RepositoryError::DuplicateEmail(details.email));
        }
        let user = User {
            id: next_id(&self.user_sequence_generator),
            name: details.name,
            email: details.email,
        };
        locked_users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: UserId) -> Result<User, RepositoryError> {
        self.users
            .read()
            .get(&user_id)
            .cloned()
            .ok_or(RepositoryError::UserNotFound(user_id))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let mut users: Vec<User> = self.users.read().values().cloned().collect();
        users.sort_by_key(|user| user.id);
        Ok(users)
    }

    async fn update_user(
        &self,
        user_id: UserId,
        patch: UserDetailsPatch,
    ) -> Result<User, RepositoryError> {
        let mut locked_users = self.users.write();
        if let Some(email) = &patch.email {
            if locked_users
                .values()
                .any(|user| user.id != user_id && &user.email == email)
            {
                return Err(RepositoryError::DuplicateEmail(email.clone()));
            }
        }
        let user = locked_users
            .get_mut(&user_id)
            .ok_or(RepositoryError::UserNotFound(user_id))?;
        user.apply_patch(patch);
        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let mut locked_users = self.users.write();
        let mut locked_items = self.items.write();
        let mut locked_bookings = self.bookings.write();
        let mut locked_comments = self.comments.write();
        let mut locked_requests = self.item_requests.write();

        if locked_users.remove(&user_id).is_none() {
            return Err(RepositoryError::UserNotFound(user_id));
        }

        let owned_items: Vec<ItemId> = locked_items
            .values()
            .filter(|item| item.owner_id == user_id)
            .map(|item| item.id)
            .collect();
        locked_items.retain(|_, item| item.owner_id != user_id);
        locked_bookings.retain(|_, booking| {
            booking.booker_id != user_id && !owned_items.contains(&booking.item_id)
        });
        locked_comments.retain(|_, comment| {
            comment.author_id != user_id && !owned_items.contains(&comment.item_id)
        });

        let own_requests: Vec<ItemRequestId> = locked_requests
            .values()
            .filter(|request| request.requestor_id == user_id)
            .map(|request| request.id)
            .collect();
        locked_requests.retain(|_, request| request.requestor_id != user_id);
        for item in locked_items.values_mut() {
            if item
                .request_id
                .map(|request_id| own_requests.contains(&request_id))
                .unwrap_or_default()
            {
                item.request_id = None;
            }
        }
        Ok(())
    }

    async fn add_item(
        &self,
        owner_id: UserId,
        details: ItemDetails,
    ) -> Result<Item, RepositoryError> {
        let locked_users = self.users.read();
        let mut locked_items = self.items.write();
        let locked_requests = self.item_requests.read();
        if !locked_users.contains_key(&owner_id) {
            return Err(RepositoryError::UserNotFound(owner_id));
        }
        if let Some(request_id) = details.request_id {
            if !locked_requests.contains_key(&request_id) {
                return Err(RepositoryError::ItemRequestNotFound(request_id));
            }
        }
        let item = Item {
            id: next_id(&self.item_sequence_generator),
            owner_id,
            name: details.name,
            description: details.description,
            available: details.available,
            request_id: details.request_id,
        };
        locked_items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Item, RepositoryError> {
        self.items
            .read()
            .get(&item_id)
            .cloned()
            .ok_or(RepositoryError::ItemNotFound(item_id))
    }

    async fn update_item(
        &self,
        item_id: ItemId,
        patch: ItemDetailsPatch,
    ) -> Result<Item, RepositoryError> {
        let mut locked_items = self.items.write();
        let item = locked_items
            .get_mut(&item_id)
            .ok_or(RepositoryError::ItemNotFound(item_id))?;
        item.apply_patch(patch);
        Ok(item.clone())
    }

    async fn delete_item(&self, item_id: ItemId) -> Result<(), RepositoryError> {
        let mut locked_items = self.items.write();
        let mut locked_bookings = self.bookings.write();
        let mut locked_comments = self.comments.write();

        if locked_items.remove(&item_id).is_none() {
            return Err(RepositoryError::ItemNotFound(item_id));
        }
        locked_bookings.retain(|_, booking| booking.item_id != item_id);
        locked_comments.retain(|_, comment| comment.item_id != item_id);
        Ok(())
    }

    async fn list_items_by_owner(&self, owner_id: UserId) -> Result<Vec<Item>, RepositoryError> {
        let mut items: Vec<Item> = self
            .items
            .read()
            .values()
            .filter(|item| item.owner_id == owner_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    async fn search_available_items(&self, text: &str) -> Result<Vec<Item>, RepositoryError> {
        let text = text.to_lowercase();
        let mut items: Vec<Item> = self
            .items
            .read()
            .values()
            .filter(|item| {
                item.available
                    && (item.name.to_lowercase().contains(&text)
                        || item.description.to_lowercase().contains(&text))
            })
            .cloned()
            .collect();
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    async fn list_items_for_requests(
        &self,
        request_ids: &[ItemRequestId],
    ) -> Result<Vec<Item>, RepositoryError> {
        let mut items: Vec<Item> = self
            .items
            .read()
            .values()
            .filter(|item| {
                item.request_id
                    .map(|request_id| request_ids.contains(&request_id))
                    .unwrap_or_default()
            })
            .cloned()
            .collect();
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    async fn add_booking(
        &self,
        booker_id: UserId,
        item_id: ItemId,
        window: BookingWindow,
    ) -> Result<Booking, RepositoryError> {
        let locked_users = self.users.read();
        let locked_items = self.items.read();
        let mut locked_bookings = self.bookings.write();
        if !locked_users.contains_key(&booker_id) {
            return Err(RepositoryError::UserNotFound(booker_id));
        }
        if !locked_items.contains_key(&item_id) {
            return Err(RepositoryError::ItemNotFound(item_id));
        }
        let stored = StoredBooking {
            id: next_id(&self.booking_sequence_generator),
            item_id,
            booker_id,
            start: window.start,
            end: window.end,
            status: BookingStatus::Waiting,
        };
        let booking = to_booking(&stored, &locked_items)?;
        locked_bookings.insert(stored.id, stored);
        Ok(booking)
    }

    async fn get_booking(&self, booking_id: BookingId) -> Result<Booking, RepositoryError> {
        let locked_items = self.items.read();
        let locked_bookings = self.bookings.read();
        let stored = locked_bookings
            .get(&booking_id)
            .ok_or(RepositoryError::BookingNotFound(booking_id))?;
        to_booking(stored, &locked_items)
    }

    async fn decide_booking(
        &self,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> Result<Booking, RepositoryError> {
        let locked_items = self.items.read();
        let mut locked_bookings = self.bookings.write();
        let stored = locked_bookings
            .get_mut(&booking_id)
            .ok_or(RepositoryError::BookingNotFound(booking_id))?;
        if stored.status != BookingStatus::Waiting {
            return Err(RepositoryError::BookingAlreadyDecided(booking_id));
        }
        stored.status = status;
        to_booking(stored, &locked_items)
    }

    async fn list_bookings(
        &self,
        party: BookingParty,
        selection: BookingSelection,
        page: Option<Page>,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let locked_items = self.items.read();
        let locked_bookings = self.bookings.read();
        let mut bookings = locked_bookings
            .values()
            .map(|stored| to_booking(stored, &locked_items))
            .collect::<Result<Vec<_>, _>>()?;
        bookings.retain(|booking| party.matches(booking) && selection.matches(booking));
        order_by_start_desc(&mut bookings);

        Ok(match page {
            Some(page) => page.apply(bookings),
            None => bookings,
        })
    }

    async fn list_approved_bookings(
        &self,
        item_ids: &[ItemId],
    ) -> Result<Vec<Booking>, RepositoryError> {
        let locked_items = self.items.read();
        let locked_bookings = self.bookings.read();
        locked_bookings
            .values()
            .filter(|stored| {
                stored.status == BookingStatus::Approved && item_ids.contains(&stored.item_id)
            })
            .map(|stored| to_booking(stored, &locked_items))
            .collect()
    }

    async fn has_finished_booking(
        &self,
        booker_id: UserId,
        item_id: ItemId,
        now: NaiveDateTime,
    ) -> Result<bool, RepositoryError> {
        Ok(self.bookings.read().values().any(|stored| {
            stored.booker_id == booker_id
                && stored.item_id == item_id
                && stored.status == BookingStatus::Approved
                && stored.end < now
        }))
    }

    async fn add_comment(
        &self,
        author_id: UserId,
        item_id: ItemId,
        text: String,
        created: NaiveDateTime,
    ) -> Result<Comment, RepositoryError> {
        let locked_users = self.users.read();
        let locked_items = self.items.read();
        let mut locked_comments = self.comments.write();
        if !locked_items.contains_key(&item_id) {
            return Err(RepositoryError::ItemNotFound(item_id));
        }
        let stored = StoredComment {
            id: next_id(&self.comment_sequence_generator),
            item_id,
            author_id,
            text,
            created,
        };
        let comment = to_comment(&stored, &locked_users)?;
        locked_comments.insert(stored.id, stored);
        Ok(comment)
    }

    async fn list_comments(&self, item_ids: &[ItemId]) -> Result<Vec<Comment>, RepositoryError> {
        let locked_users = self.users.read();
        let locked_comments = self.comments.read();
        let mut comments = locked_comments
            .values()
            .filter(|stored| item_ids.contains(&stored.item_id))
            .map(|stored| to_comment(stored, &locked_users))
            .collect::<Result<Vec<_>, _>>()?;
        comments.sort_by_key(|comment| (comment.created, comment.id));
        Ok(comments)
    }

    async fn add_item_request(
        &self,
        requestor_id: UserId,
        description: String,
        created: NaiveDateTime,
    ) -> Result<ItemRequestRecord, RepositoryError> {
        let locked_users = self.users.read();
        let mut locked_requests = self.item_requests.write();
        if !locked_users.contains_key(&requestor_id) {
            return Err(RepositoryError::UserNotFound(requestor_id));
        }
        let request = ItemRequestRecord {
            id: next_id(&self.item_request_sequence_generator),
            description,
            requestor_id,
            created,
        };
        locked_requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_item_request(
        &self,
        request_id: ItemRequestId,
    ) -> Result<ItemRequestRecord, RepositoryError> {
        self.item_requests
            .read()
            .get(&request_id)
            .cloned()
            .ok_or(RepositoryError::ItemRequestNotFound(request_id))
    }

    async fn list_item_requests_by_requestor(
        &self,
        requestor_id: UserId,
    ) -> Result<Vec<ItemRequestRecord>, RepositoryError> {
        let requests = self
            .item_requests
            .read()
            .values()
            .filter(|request| request.requestor_id == requestor_id)
            .cloned()
            .collect();
        Ok(newest_first(requests))
    }

    async fn list_item_requests_of_others(
        &self,
        user_id: UserId,
        page: Option<Page>,
    ) -> Result<Vec<ItemRequestRecord>, RepositoryError> {
        let requests = newest_first(
            self.item_requests
                .read()
                .values()
                .filter(|request| request.requestor_id != user_id)
                .cloned()
                .collect(),
        );
        Ok(match page {
            Some(page) => page.apply(requests),
            None => requests,
        })
    }
}
