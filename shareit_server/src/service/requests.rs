use crate::api::{Item, ItemRequest, ItemRequestId, NewItemRequest, UserId};
use crate::bookings::Page;
use crate::error::ShareItResult;
use crate::repository::ItemRequestRecord;

use super::{require_non_blank, ShareItService};

impl ShareItService {
    pub async fn add_item_request(
        &self,
        requestor_id: UserId,
        request: NewItemRequest,
    ) -> ShareItResult<ItemRequest> {
        require_non_blank("description", &request.description)?;
        self.repository.get_user(requestor_id).await?;

        let record = self
            .repository
            .add_item_request(requestor_id, request.description, self.now())
            .await?;
        tracing::info!("User {} added item request {}", requestor_id, record.id);
        Ok(to_item_request(record, &[]))
    }

    /// Requests of the user, newest first
    pub async fn list_own_item_requests(&self, user_id: UserId) -> ShareItResult<Vec<ItemRequest>> {
        self.repository.get_user(user_id).await?;
        let records = self
            .repository
            .list_item_requests_by_requestor(user_id)
            .await?;
        self.with_items(records).await
    }

    /// Requests of all other users, newest first
    pub async fn list_other_item_requests(
        &self,
        user_id: UserId,
        page: Option<Page>,
    ) -> ShareItResult<Vec<ItemRequest>> {
        self.repository.get_user(user_id).await?;
        let records = self
            .repository
            .list_item_requests_of_others(user_id, page)
            .await?;
        self.with_items(records).await
    }

    pub async fn get_item_request(
        &self,
        user_id: UserId,
        request_id: ItemRequestId,
    ) -> ShareItResult<ItemRequest> {
        self.repository.get_user(user_id).await?;
        let record = self.repository.get_item_request(request_id).await?;
        let items = self.repository.list_items_for_requests(&[record.id]).await?;
        Ok(to_item_request(record, &items))
    }

    async fn with_items(&self, records: Vec<ItemRequestRecord>) -> ShareItResult<Vec<ItemRequest>> {
        let request_ids: Vec<ItemRequestId> = records.iter().map(|record| record.id).collect();
        let items = self
            .repository
            .list_items_for_requests(&request_ids)
            .await?;

        Ok(records
            .into_iter()
            .map(|record| to_item_request(record, &items))
            .collect())
    }
}

fn to_item_request(record: ItemRequestRecord, items: &[Item]) -> ItemRequest {
    ItemRequest {
        items: items
            .iter()
            .filter(|item| item.request_id == Some(record.id))
            .cloned()
            .collect(),
        id: record.id,
        description: record.description,
        requestor_id: record.requestor_id,
        created: record.created,
    }
}
