use actix_web::http::header::LOCATION;
use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{Error, HttpRequest, HttpResponse};
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};

use crate::api::{
    ApprovalQuery, BookingId, BookingsQuery, ErrorResponse, ItemDetails, ItemDetailsPatch, ItemId,
    ItemRequestId, NewBooking, NewComment, NewItemRequest, PageQuery, SearchQuery, UserDetails,
    UserDetailsPatch, UserId, SHARER_USER_ID_HEADER,
};
use crate::bookings::Page;
use crate::error::ShareItError;
use crate::repository::RepositoryError;
use crate::service::ShareItService;

fn status_of(err: &ShareItError) -> StatusCode {
    match err {
        ShareItError::InvalidDate(_)
        | ShareItError::ItemUnavailable(_)
        | ShareItError::AlreadyDecided(_)
        | ShareItError::UnsupportedState(_)
        | ShareItError::InvalidPageParameter(_)
        | ShareItError::Validation(_)
        | ShareItError::CommentNotAllowed { .. } => StatusCode::BAD_REQUEST,
        ShareItError::OwnerSelfBooking { .. } | ShareItError::NotAuthorized { .. } => {
            StatusCode::NOT_FOUND
        }
        ShareItError::Repository(RepositoryError::DuplicateEmail(_)) => StatusCode::CONFLICT,
        err if err.is_not_found() => StatusCode::NOT_FOUND,
        ShareItError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(operation: &str, err: ShareItError) -> HttpResponse {
    let status = status_of(&err);
    if status.is_server_error() {
        tracing::error!("{} failed {}", operation, err);
    } else {
        tracing::warn!("{} rejected {}", operation, err);
    }
    HttpResponse::build(status).json(ErrorResponse {
        error: err.to_string(),
    })
}

/// Acting user taken from the `X-Sharer-User-Id` header, or the 400 response to send back
fn sharer_user_id(req: &HttpRequest) -> Result<UserId, HttpResponse> {
    req.headers()
        .get(SHARER_USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| {
            HttpResponse::BadRequest().json(ErrorResponse {
                error: format!("Missing or invalid {} header", SHARER_USER_ID_HEADER),
            })
        })
}

macro_rules! sharer_user_id_or_return {
    ($req:expr) => {
        match sharer_user_id(&$req) {
            Ok(user_id) => user_id,
            Err(response) => return Ok(response),
        }
    };
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn add_user(
    service: Data<ShareItService>,
    details: web::Json<UserDetails>,
) -> Result<HttpResponse, Error> {
    Ok(match service.add_user(details.into_inner()).await {
        Ok(user) => HttpResponse::Created()
            .append_header((LOCATION, format!("/users/{}", user.id)))
            .json(user),
        Err(err) => error_response("Add user", err),
    })
}

#[api_v2_operation]
pub async fn list_users(service: Data<ShareItService>) -> Result<HttpResponse, Error> {
    Ok(match service.list_users().await {
        Ok(users) => HttpResponse::Ok().json(users),
        Err(err) => error_response("List users", err),
    })
}

#[api_v2_operation]
pub async fn get_user(
    service: Data<ShareItService>,
    user_id: web::Path<UserId>,
) -> Result<HttpResponse, Error> {
    Ok(match service.get_user(user_id.into_inner()).await {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(err) => error_response("Get user", err),
    })
}

#[api_v2_operation]
pub async fn update_user(
    service: Data<ShareItService>,
    user_id: web::Path<UserId>,
    patch: web::Json<UserDetailsPatch>,
) -> Result<HttpResponse, Error> {
    Ok(
        match service
            .update_user(user_id.into_inner(), patch.into_inner())
            .await
        {
            Ok(user) => HttpResponse::Ok().json(user),
            Err(err) => error_response("Update user", err),
        },
    )
}

#[api_v2_operation]
pub async fn delete_user(
    service: Data<ShareItService>,
    user_id: web::Path<UserId>,
) -> Result<HttpResponse, Error> {
    Ok(match service.delete_user(user_id.into_inner()).await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(err) => error_response("Delete user", err),
    })
}

#[api_v2_operation]
pub async fn add_item(
    req: HttpRequest,
    service: Data<ShareItService>,
    details: web::Json<ItemDetails>,
) -> Result<HttpResponse, Error> {
    let owner_id = sharer_user_id_or_return!(req);
    Ok(match service.add_item(owner_id, details.into_inner()).await {
        Ok(item) => HttpResponse::Created()
            .append_header((LOCATION, format!("/items/{}", item.id)))
            .json(item),
        Err(err) => error_response("Add item", err),
    })
}

#[api_v2_operation]
pub async fn list_owner_items(
    req: HttpRequest,
    service: Data<ShareItService>,
) -> Result<HttpResponse, Error> {
    let owner_id = sharer_user_id_or_return!(req);
    Ok(match service.list_owner_items(owner_id).await {
        Ok(items) => HttpResponse::Ok().json(items),
        Err(err) => error_response("List items", err),
    })
}

#[api_v2_operation]
pub async fn get_item(
    req: HttpRequest,
    service: Data<ShareItService>,
    item_id: web::Path<ItemId>,
) -> Result<HttpResponse, Error> {
    let user_id = sharer_user_id_or_return!(req);
    Ok(match service.get_item(user_id, item_id.into_inner()).await {
        Ok(item) => HttpResponse::Ok().json(item),
        Err(err) => error_response("Get item", err),
    })
}

#[api_v2_operation]
pub async fn update_item(
    req: HttpRequest,
    service: Data<ShareItService>,
    item_id: web::Path<ItemId>,
    patch: web::Json<ItemDetailsPatch>,
) -> Result<HttpResponse, Error> {
    let user_id = sharer_user_id_or_return!(req);
    Ok(
        match service
            .update_item(user_id, item_id.into_inner(), patch.into_inner())
            .await
        {
            Ok(item) => HttpResponse::Ok().json(item),
            Err(err) => error_response("Update item", err),
        },
    )
}

#[api_v2_operation]
pub async fn delete_item(
    req: HttpRequest,
    service: Data<ShareItService>,
    item_id: web::Path<ItemId>,
) -> Result<HttpResponse, Error> {
    let user_id = sharer_user_id_or_return!(req);
    Ok(match service.delete_item(user_id, item_id.into_inner()).await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(err) => error_response("Delete item", err),
    })
}

#[api_v2_operation]
pub async fn search_items(
    service: Data<ShareItService>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, Error> {
    Ok(match service.search_items(&query.text).await {
        Ok(items) => HttpResponse::Ok().json(items),
        Err(err) => error_response("Search items", err),
    })
}

#[api_v2_operation]
pub async fn add_comment(
    req: HttpRequest,
    service: Data<ShareItService>,
    item_id: web::Path<ItemId>,
    comment: web::Json<NewComment>,
) -> Result<HttpResponse, Error> {
    let author_id = sharer_user_id_or_return!(req);
    Ok(
        match service
            .add_comment(author_id, item_id.into_inner(), comment.into_inner())
            .await
        {
            Ok(comment) => HttpResponse::Created()
                .append_header((LOCATION, format!("/items/{}", comment.item_id)))
                .json(comment),
            Err(err) => error_response("Add comment", err),
        },
    )
}

#[api_v2_operation]
pub async fn create_booking(
    req: HttpRequest,
    service: Data<ShareItService>,
    new_booking: web::Json<NewBooking>,
) -> Result<HttpResponse, Error> {
    let booker_id = sharer_user_id_or_return!(req);
    Ok(
        match service
            .create_booking(booker_id, new_booking.into_inner())
            .await
        {
            Ok(booking) => HttpResponse::Created()
                .append_header((LOCATION, format!("/bookings/{}", booking.id)))
                .json(booking),
            Err(err) => error_response("Create booking", err),
        },
    )
}

#[api_v2_operation]
pub async fn get_booking(
    req: HttpRequest,
    service: Data<ShareItService>,
    booking_id: web::Path<BookingId>,
) -> Result<HttpResponse, Error> {
    let user_id = sharer_user_id_or_return!(req);
    Ok(
        match service.get_booking(user_id, booking_id.into_inner()).await {
            Ok(booking) => HttpResponse::Ok().json(booking),
            Err(err) => error_response("Get booking", err),
        },
    )
}

#[api_v2_operation]
pub async fn decide_booking(
    req: HttpRequest,
    service: Data<ShareItService>,
    booking_id: web::Path<BookingId>,
    query: web::Query<ApprovalQuery>,
) -> Result<HttpResponse, Error> {
    let user_id = sharer_user_id_or_return!(req);
    Ok(
        match service
            .decide_booking(user_id, booking_id.into_inner(), query.approved)
            .await
        {
            Ok(booking) => HttpResponse::Ok().json(booking),
            Err(err) => error_response("Decide booking", err),
        },
    )
}

#[api_v2_operation]
pub async fn list_booker_bookings(
    req: HttpRequest,
    service: Data<ShareItService>,
    query: web::Query<BookingsQuery>,
) -> Result<HttpResponse, Error> {
    let booker_id = sharer_user_id_or_return!(req);
    let result = match Page::from_params(query.from, query.size) {
        Ok(page) => {
            service
                .list_booker_bookings(booker_id, query.state.as_deref(), page)
                .await
        }
        Err(err) => Err(err),
    };
    Ok(match result {
        Ok(bookings) => HttpResponse::Ok().json(bookings),
        Err(err) => error_response("List booker bookings", err),
    })
}

#[api_v2_operation]
pub async fn list_owner_bookings(
    req: HttpRequest,
    service: Data<ShareItService>,
    query: web::Query<BookingsQuery>,
) -> Result<HttpResponse, Error> {
    let owner_id = sharer_user_id_or_return!(req);
    let result = match Page::from_params(query.from, query.size) {
        Ok(page) => {
            service
                .list_owner_bookings(owner_id, query.state.as_deref(), page)
                .await
        }
        Err(err) => Err(err),
    };
    Ok(match result {
        Ok(bookings) => HttpResponse::Ok().json(bookings),
        Err(err) => error_response("List owner bookings", err),
    })
}

#[api_v2_operation]
pub async fn add_item_request(
    req: HttpRequest,
    service: Data<ShareItService>,
    request: web::Json<NewItemRequest>,
) -> Result<HttpResponse, Error> {
    let requestor_id = sharer_user_id_or_return!(req);
    Ok(
        match service
            .add_item_request(requestor_id, request.into_inner())
            .await
        {
            Ok(request) => HttpResponse::Created()
                .append_header((LOCATION, format!("/requests/{}", request.id)))
                .json(request),
            Err(err) => error_response("Add item request", err),
        },
    )
}

#[api_v2_operation]
pub async fn list_own_item_requests(
    req: HttpRequest,
    service: Data<ShareItService>,
) -> Result<HttpResponse, Error> {
    let user_id = sharer_user_id_or_return!(req);
    Ok(match service.list_own_item_requests(user_id).await {
        Ok(requests) => HttpResponse::Ok().json(requests),
        Err(err) => error_response("List own item requests", err),
    })
}

#[api_v2_operation]
pub async fn list_other_item_requests(
    req: HttpRequest,
    service: Data<ShareItService>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let user_id = sharer_user_id_or_return!(req);
    let result = match Page::from_params(query.from, query.size) {
        Ok(page) => service.list_other_item_requests(user_id, page).await,
        Err(err) => Err(err),
    };
    Ok(match result {
        Ok(requests) => HttpResponse::Ok().json(requests),
        Err(err) => error_response("List item requests", err),
    })
}

#[api_v2_operation]
pub async fn get_item_request(
    req: HttpRequest,
    service: Data<ShareItService>,
    request_id: web::Path<ItemRequestId>,
) -> Result<HttpResponse, Error> {
    let user_id = sharer_user_id_or_return!(req);
    Ok(
        match service
            .get_item_request(user_id, request_id.into_inner())
            .await
        {
            Ok(request) => HttpResponse::Ok().json(request),
            Err(err) => error_response("Get item request", err),
        },
    )
}

#[cfg(test)]
mod handler_tests {
    use std::sync::Arc;

    use actix_web::test;
    use chrono::{NaiveDate, NaiveDateTime};
    use paperclip::actix::OpenApiExt;
    use serde_json::json;

    use crate::api::{Booking, BookingStatus, Item, User};
    use crate::app_config::config_app;
    use crate::clock::test_clock::ManualClock;
    use crate::repository::InMemoryShareItRepository;

    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn test_service() -> ShareItService {
        ShareItService::new(
            Arc::new(InMemoryShareItRepository::default()),
            Arc::new(ManualClock::new(now())),
        )
    }

    macro_rules! init_app {
        () => {
            test::init_service(
                actix_web::App::new()
                    .wrap_api()
                    .app_data(Data::new(test_service()))
                    .configure(config_app)
                    .build(),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_error_statuses() {
        let cases = [
            (ShareItError::ItemUnavailable(1), StatusCode::BAD_REQUEST),
            (
                ShareItError::UnsupportedState("BOGUS".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ShareItError::OwnerSelfBooking {
                    user_id: 1,
                    item_id: 2,
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ShareItError::Repository(RepositoryError::BookingNotFound(3)),
                StatusCode::NOT_FOUND,
            ),
            (
                ShareItError::Repository(RepositoryError::DuplicateEmail("a@b".to_string())),
                StatusCode::CONFLICT,
            ),
            (
                ShareItError::Repository(RepositoryError::Other("boom".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(status_of(&err), status, "{err}");
        }

        let response = error_response("Test", ShareItError::UnsupportedState("BOGUS".to_string()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.error, "Unknown state: BOGUS");
    }

    #[actix_web::test]
    /// Drives a booking through the HTTP layer:
    /// 1. Creates owner, renter and item, checks 201 with location
    /// 2. Books the item, owner approves, second approval is a 400
    /// 3. Unknown state keyword and negative page are 400s, missing header is 400
    async fn test_booking_endpoints() {
        let app = init_app!();

        let mut users = vec![];
        for name in ["owner", "renter"] {
            let resp = test::call_service(
                &app,
                test::TestRequest::post()
                    .uri("/users")
                    .set_json(json!({"name": name, "email": format!("{name}@example.com")}))
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let user: User = test::read_body_json(resp).await;
            users.push(user);
        }
        let (owner, renter) = (&users[0], &users[1]);

        let duplicate = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/users")
                .set_json(json!({"name": "copy", "email": "owner@example.com"}))
                .to_request(),
        )
        .await;
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/items")
                .insert_header((SHARER_USER_ID_HEADER, owner.id.to_string()))
                .set_json(json!({"name": "Kayak", "description": "two seats", "available": true}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let item: Item = test::read_body_json(resp).await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/bookings")
                .insert_header((SHARER_USER_ID_HEADER, renter.id.to_string()))
                .set_json(json!({
                    "item_id": item.id,
                    "start": "2024-03-10T10:00:00",
                    "end": "2024-03-10T11:00:00"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            resp.headers().get(LOCATION).unwrap().to_str().unwrap(),
            "/bookings/1"
        );
        let booking: Booking = test::read_body_json(resp).await;
        assert_eq!(booking.status, BookingStatus::Waiting);

        let own_booking = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/bookings")
                .insert_header((SHARER_USER_ID_HEADER, owner.id.to_string()))
                .set_json(json!({
                    "item_id": item.id,
                    "start": "2024-03-10T10:00:00",
                    "end": "2024-03-10T11:00:00"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(own_booking.status(), StatusCode::NOT_FOUND);

        let approve = || {
            test::TestRequest::patch()
                .uri(&format!("/bookings/{}?approved=true", booking.id))
                .insert_header((SHARER_USER_ID_HEADER, owner.id.to_string()))
                .to_request()
        };
        let resp = test::call_service(&app, approve()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let approved: Booking = test::read_body_json(resp).await;
        assert_eq!(approved.status, BookingStatus::Approved);
        let resp = test::call_service(&app, approve()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/bookings/owner?state=APPROVED")
                .insert_header((SHARER_USER_ID_HEADER, owner.id.to_string()))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let listed: Vec<Booking> = test::read_body_json(resp).await;
        assert_eq!(listed, vec![approved]);

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/bookings?state=BOGUS")
                .insert_header((SHARER_USER_ID_HEADER, renter.id.to_string()))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(error.error, "Unknown state: BOGUS");

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/bookings?from=-1&size=10")
                .insert_header((SHARER_USER_ID_HEADER, renter.id.to_string()))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        for uri in ["/bookings?from=0&size=0", "/bookings/owner?size=0"] {
            let resp = test::call_service(
                &app,
                test::TestRequest::get()
                    .uri(uri)
                    .insert_header((SHARER_USER_ID_HEADER, renter.id.to_string()))
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        }

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/bookings").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_search_and_requests_routes() {
        let app = init_app!();

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/users")
                .set_json(json!({"name": "owner", "email": "owner@example.com"}))
                .to_request(),
        )
        .await;
        let owner: User = test::read_body_json(resp).await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/items")
                .insert_header((SHARER_USER_ID_HEADER, owner.id.to_string()))
                .set_json(json!({"name": "Ladder", "description": "tall", "available": true}))
                .to_request(),
        )
        .await;
        let ladder: Item = test::read_body_json(resp).await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/items/search?text=LADD")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let found: Vec<Item> = test::read_body_json(resp).await;
        assert_eq!(found, vec![ladder]);

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/requests/all")
                .insert_header((SHARER_USER_ID_HEADER, owner.id.to_string()))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/requests/42")
                .insert_header((SHARER_USER_ID_HEADER, owner.id.to_string()))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request())
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
