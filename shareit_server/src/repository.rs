use chrono::NaiveDateTime;

pub use in_memory_repository::InMemoryShareItRepository;
pub use postgres_repository::{PostgresShareItRepository, PostgresShareItRepositoryConfig};

use crate::api::{
    Booking, BookingId, BookingStatus, Comment, Item, ItemDetails, ItemDetailsPatch, ItemId,
    ItemRequestId, User, UserDetails, UserDetailsPatch, UserId,
};
use crate::bookings::{BookingParty, BookingSelection, BookingWindow, Page};

mod in_memory_repository;
mod postgres_repository;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Item {0} not found")]
    ItemNotFound(ItemId),

    #[error("Booking {0} not found")]
    BookingNotFound(BookingId),

    #[error("Item request {0} not found")]
    ItemRequestNotFound(ItemRequestId),

    #[error("Email {0} is already in use")]
    DuplicateEmail(String),

    #[error("Booking {0} is no longer waiting for a decision")]
    BookingAlreadyDecided(BookingId),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

#[derive(Debug, Clone, Eq, PartialEq)]
/// Stored item request, the answering items are looked up separately
pub struct ItemRequestRecord {
    pub id: ItemRequestId,
    pub description: String,
    pub requestor_id: UserId,
    pub created: NaiveDateTime,
}

/// Storage used by the sharing service. Every mutation is a single atomic operation
#[async_trait::async_trait]
pub trait ShareItRepository: Send + Sync {
    /// Adds user, fails with `DuplicateEmail` if the email is taken
    async fn add_user(&self, details: UserDetails) -> Result<User, RepositoryError>;

    async fn get_user(&self, user_id: UserId) -> Result<User, RepositoryError>;

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    /// Applies only the fields set in the patch
    async fn update_user(
        &self,
        user_id: UserId,
        patch: UserDetailsPatch,
    ) -> Result<User, RepositoryError>;

    /// Removes the user together with their items, bookings, comments and requests
    async fn delete_user(&self, user_id: UserId) -> Result<(), RepositoryError>;

    async fn add_item(&self, owner_id: UserId, details: ItemDetails)
        -> Result<Item, RepositoryError>;

    async fn get_item(&self, item_id: ItemId) -> Result<Item, RepositoryError>;

    async fn update_item(
        &self,
        item_id: ItemId,
        patch: ItemDetailsPatch,
    ) -> Result<Item, RepositoryError>;

    async fn delete_item(&self, item_id: ItemId) -> Result<(), RepositoryError>;

    /// Items of the owner ordered by id
    async fn list_items_by_owner(&self, owner_id: UserId) -> Result<Vec<Item>, RepositoryError>;

    /// Available items whose name or description contains `text`, ignoring case
    async fn search_available_items(&self, text: &str) -> Result<Vec<Item>, RepositoryError>;

    /// Items created in answer to any of the given requests
    async fn list_items_for_requests(
        &self,
        request_ids: &[ItemRequestId],
    ) -> Result<Vec<Item>, RepositoryError>;

    /// Stores a new WAITING booking
    async fn add_booking(
        &self,
        booker_id: UserId,
        item_id: ItemId,
        window: BookingWindow,
    ) -> Result<Booking, RepositoryError>;

    async fn get_booking(&self, booking_id: BookingId) -> Result<Booking, RepositoryError>;

    /// Moves a WAITING booking to `status`.
    /// Fails with `BookingAlreadyDecided` when the booking left WAITING in the meantime
    async fn decide_booking(
        &self,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> Result<Booking, RepositoryError>;

    /// Bookings of the party matching the selection, newest start first
    async fn list_bookings(
        &self,
        party: BookingParty,
        selection: BookingSelection,
        page: Option<Page>,
    ) -> Result<Vec<Booking>, RepositoryError>;

    /// APPROVED bookings of the given items
    async fn list_approved_bookings(
        &self,
        item_ids: &[ItemId],
    ) -> Result<Vec<Booking>, RepositoryError>;

    /// True if the user has an APPROVED booking of the item that ended before `now`
    async fn has_finished_booking(
        &self,
        booker_id: UserId,
        item_id: ItemId,
        now: NaiveDateTime,
    ) -> Result<bool, RepositoryError>;

    async fn add_comment(
        &self,
        author_id: UserId,
        item_id: ItemId,
        text: String,
        created: NaiveDateTime,
    ) -> Result<Comment, RepositoryError>;

    /// Comments of the given items, oldest first
    async fn list_comments(&self, item_ids: &[ItemId]) -> Result<Vec<Comment>, RepositoryError>;

    async fn add_item_request(
        &self,
        requestor_id: UserId,
        description: String,
        created: NaiveDateTime,
    ) -> Result<ItemRequestRecord, RepositoryError>;

    async fn get_item_request(
        &self,
        request_id: ItemRequestId,
    ) -> Result<ItemRequestRecord, RepositoryError>;

    /// Requests made by the user, newest first
    async fn list_item_requests_by_requestor(
        &self,
        requestor_id: UserId,
    ) -> Result<Vec<ItemRequestRecord>, RepositoryError>;

    /// Requests made by everybody except the user, newest first
    async fn list_item_requests_of_others(
        &self,
        user_id: UserId,
        page: Option<Page>,
    ) -> Result<Vec<ItemRequestRecord>, RepositoryError>;
}
