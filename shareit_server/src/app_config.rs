use paperclip::actix::web;

use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/users")
                .service(
                    web::resource("")
                        .route(web::post().to(handlers::add_user))
                        .route(web::get().to(handlers::list_users)),
                )
                .service(
                    web::resource("/{user_id}")
                        .route(web::get().to(handlers::get_user))
                        .route(web::patch().to(handlers::update_user))
                        .route(web::delete().to(handlers::delete_user)),
                ),
        )
        .service(
            web::scope("/items")
                .service(
                    web::resource("")
                        .route(web::post().to(handlers::add_item))
                        .route(web::get().to(handlers::list_owner_items)),
                )
                // registered before /{item_id} so "search" is not taken for an id
                .service(web::resource("/search").route(web::get().to(handlers::search_items)))
                .service(
                    web::resource("/{item_id}")
                        .route(web::get().to(handlers::get_item))
                        .route(web::patch().to(handlers::update_item))
                        .route(web::delete().to(handlers::delete_item)),
                )
                .service(
                    web::resource("/{item_id}/comment")
                        .route(web::post().to(handlers::add_comment)),
                ),
        )
        .service(
            web::scope("/bookings")
                .service(
                    web::resource("")
                        .route(web::post().to(handlers::create_booking))
                        .route(web::get().to(handlers::list_booker_bookings)),
                )
                .service(
                    web::resource("/owner").route(web::get().to(handlers::list_owner_bookings)),
                )
                .service(
                    web::resource("/{booking_id}")
                        .route(web::get().to(handlers::get_booking))
                        .route(web::patch().to(handlers::decide_booking)),
                ),
        )
        .service(
            web::scope("/requests")
                .service(
                    web::resource("")
                        .route(web::post().to(handlers::add_item_request))
                        .route(web::get().to(handlers::list_own_item_requests)),
                )
                .service(
                    web::resource("/all")
                        .route(web::get().to(handlers::list_other_item_requests)),
                )
                .service(
                    web::resource("/{request_id}").route(web::get().to(handlers::get_item_request)),
                ),
        );
}
