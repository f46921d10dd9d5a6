use anyhow::Context;
use reqwest::Response;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_tracing::TracingMiddleware;
use serde::de::DeserializeOwned;

use crate::api::{
    Booking, BookingId, BookingsQuery, Comment, ErrorResponse, Item, ItemDetails,
    ItemDetailsPatch, ItemId, ItemRequest, ItemRequestId, ItemWithBookings, NewBooking,
    NewComment, NewItemRequest, PageQuery, User, UserDetails, UserDetailsPatch, UserId,
    SHARER_USER_ID_HEADER,
};

/// Non-success answer of the server, reachable through `anyhow::Error::downcast_ref`
#[derive(Debug, thiserror::Error)]
#[error("Server answered {status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

pub struct ShareItClient {
    url: String,
    client: ClientWithMiddleware,
}

impl ShareItClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn as_user(&self, builder: RequestBuilder, user_id: UserId) -> RequestBuilder {
        builder.header(SHARER_USER_ID_HEADER, user_id.to_string())
    }

    async fn check(response: Response, operation: &str) -> anyhow::Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .json::<ErrorResponse>()
            .await
            .map(|body| body.error)
            .unwrap_or_default();
        Err(anyhow::Error::new(ApiError { status, message })
            .context(format!("Failed to {operation}")))
    }

    async fn parse<T: DeserializeOwned>(response: Response, operation: &str) -> anyhow::Result<T> {
        Self::check(response, operation)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse response of {operation}"))
    }

    /// Calls GET /health endpoint
    pub async fn health(&self) -> anyhow::Result<()> {
        let response = self
            .client
            .get(format!("{}/health", self.url))
            .send()
            .await?;
        Self::check(response, "check health").await?;
        Ok(())
    }

    /// Calls POST /users endpoint
    pub async fn add_user(&self, details: &UserDetails) -> anyhow::Result<User> {
        let response = self
            .client
            .post(format!("{}/users", self.url))
            .json(details)
            .send()
            .await?;
        Self::parse(response, "add user").await
    }

    /// Calls GET /users/{user_id} endpoint
    pub async fn get_user(&self, user_id: UserId) -> anyhow::Result<User> {
        let response = self
            .client
            .get(format!("{}/users/{}", self.url, user_id))
            .send()
            .await?;
        Self::parse(response, "get user").await
    }

    /// Calls GET /users endpoint
    pub async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let response = self
            .client
            .get(format!("{}/users", self.url))
            .send()
            .await?;
        Self::parse(response, "list users").await
    }

    /// Calls PATCH /users/{user_id} endpoint
    pub async fn update_user(
        &self,
        user_id: UserId,
        patch: &UserDetailsPatch,
    ) -> anyhow::Result<User> {
        let response = self
            .client
            .patch(format!("{}/users/{}", self.url, user_id))
            .json(patch)
            .send()
            .await?;
        Self::parse(response, "update user").await
    }

    /// Calls DELETE /users/{user_id} endpoint
    pub async fn delete_user(&self, user_id: UserId) -> anyhow::Result<()> {
        let response = self
            .client
            .delete(format!("{}/users/{}", self.url, user_id))
            .send()
            .await?;
        Self::check(response, "delete user").await?;
        Ok(())
    }

    /// Calls POST /items endpoint, `owner_id` becomes the owner
    pub async fn add_item(&self, owner_id: UserId, details: &ItemDetails) -> anyhow::Result<Item> {
        let builder = self.client.post(format!("{}/items", self.url)).json(details);
        let response = self.as_user(builder, owner_id).send().await?;
        Self::parse(response, "add item").await
    }

    /// Calls GET /items/{item_id} endpoint
    pub async fn get_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> anyhow::Result<ItemWithBookings> {
        let builder = self.client.get(format!("{}/items/{}", self.url, item_id));
        let response = self.as_user(builder, user_id).send().await?;
        Self::parse(response, "get item").await
    }

    /// Calls GET /items endpoint
    pub async fn list_items(&self, owner_id: UserId) -> anyhow::Result<Vec<ItemWithBookings>> {
        let builder = self.client.get(format!("{}/items", self.url));
        let response = self.as_user(builder, owner_id).send().await?;
        Self::parse(response, "list items").await
    }

    /// Calls PATCH /items/{item_id} endpoint
    pub async fn update_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
        patch: &ItemDetailsPatch,
    ) -> anyhow::Result<Item> {
        let builder = self
            .client
            .patch(format!("{}/items/{}", self.url, item_id))
            .json(patch);
        let response = self.as_user(builder, user_id).send().await?;
        Self::parse(response, "update item").await
    }

    /// Calls DELETE /items/{item_id} endpoint
    pub async fn delete_item(&self, user_id: UserId, item_id: ItemId) -> anyhow::Result<()> {
        let builder = self.client.delete(format!("{}/items/{}", self.url, item_id));
        let response = self.as_user(builder, user_id).send().await?;
        Self::check(response, "delete item").await?;
        Ok(())
    }

    /// Calls GET /items/search endpoint
    pub async fn search_items(&self, text: &str) -> anyhow::Result<Vec<Item>> {
        let response = self
            .client
            .get(format!("{}/items/search", self.url))
            .query(&[("text", text)])
            .send()
            .await?;
        Self::parse(response, "search items").await
    }

    /// Calls POST /items/{item_id}/comment endpoint
    pub async fn add_comment(
        &self,
        author_id: UserId,
        item_id: ItemId,
        comment: &NewComment,
    ) -> anyhow::Result<Comment> {
        let builder = self
            .client
            .post(format!("{}/items/{}/comment", self.url, item_id))
            .json(comment);
        let response = self.as_user(builder, author_id).send().await?;
        Self::parse(response, "add comment").await
    }

    /// Calls POST /bookings endpoint
    pub async fn create_booking(
        &self,
        booker_id: UserId,
        booking: &NewBooking,
    ) -> anyhow::Result<Booking> {
        let builder = self
            .client
            .post(format!("{}/bookings", self.url))
            .json(booking);
        let response = self.as_user(builder, booker_id).send().await?;
        Self::parse(response, "create booking").await
    }

    /// Calls GET /bookings/{booking_id} endpoint
    pub async fn get_booking(
        &self,
        user_id: UserId,
        booking_id: BookingId,
    ) -> anyhow::Result<Booking> {
        let builder = self
            .client
            .get(format!("{}/bookings/{}", self.url, booking_id));
        let response = self.as_user(builder, user_id).send().await?;
        Self::parse(response, "get booking").await
    }

    /// Calls PATCH /bookings/{booking_id}?approved= endpoint
    pub async fn decide_booking(
        &self,
        user_id: UserId,
        booking_id: BookingId,
        approved: bool,
    ) -> anyhow::Result<Booking> {
        let builder = self
            .client
            .patch(format!("{}/bookings/{}", self.url, booking_id))
            .query(&[("approved", approved)]);
        let response = self.as_user(builder, user_id).send().await?;
        Self::parse(response, "decide booking").await
    }

    /// Calls GET /bookings endpoint
    pub async fn list_bookings(
        &self,
        booker_id: UserId,
        query: &BookingsQuery,
    ) -> anyhow::Result<Vec<Booking>> {
        let builder = self
            .client
            .get(format!("{}/bookings", self.url))
            .query(query);
        let response = self.as_user(builder, booker_id).send().await?;
        Self::parse(response, "list bookings").await
    }

    /// Calls GET /bookings/owner endpoint
    pub async fn list_owner_bookings(
        &self,
        owner_id: UserId,
        query: &BookingsQuery,
    ) -> anyhow::Result<Vec<Booking>> {
        let builder = self
            .client
            .get(format!("{}/bookings/owner", self.url))
            .query(query);
        let response = self.as_user(builder, owner_id).send().await?;
        Self::parse(response, "list owner bookings").await
    }

    /// Calls POST /requests endpoint
    pub async fn add_item_request(
        &self,
        requestor_id: UserId,
        request: &NewItemRequest,
    ) -> anyhow::Result<ItemRequest> {
        let builder = self
            .client
            .post(format!("{}/requests", self.url))
            .json(request);
        let response = self.as_user(builder, requestor_id).send().await?;
        Self::parse(response, "add item request").await
    }

    /// Calls GET /requests endpoint
    pub async fn list_own_item_requests(&self, user_id: UserId) -> anyhow::Result<Vec<ItemRequest>> {
        let builder = self.client.get(format!("{}/requests", self.url));
        let response = self.as_user(builder, user_id).send().await?;
        Self::parse(response, "list own item requests").await
    }

    /// Calls GET /requests/all endpoint
    pub async fn list_other_item_requests(
        &self,
        user_id: UserId,
        page: &PageQuery,
    ) -> anyhow::Result<Vec<ItemRequest>> {
        let builder = self
            .client
            .get(format!("{}/requests/all", self.url))
            .query(page);
        let response = self.as_user(builder, user_id).send().await?;
        Self::parse(response, "list item requests").await
    }

    /// Calls GET /requests/{request_id} endpoint
    pub async fn get_item_request(
        &self,
        user_id: UserId,
        request_id: ItemRequestId,
    ) -> anyhow::Result<ItemRequest> {
        let builder = self
            .client
            .get(format!("{}/requests/{}", self.url, request_id));
        let response = self.as_user(builder, user_id).send().await?;
        Self::parse(response, "get item request").await
    }
}
