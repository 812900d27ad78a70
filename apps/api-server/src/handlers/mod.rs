//! HTTP handlers and route configuration.

mod auth;
mod comments;
mod health;
mod posts;
mod tags;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Auth routes
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(auth::register))
                    .route("/login", web::post().to(auth::login))
                    .route("/me", web::get().to(auth::me)),
            )
            // Posts, with the fixed segments ahead of the slug lookup
            .service(
                web::scope("/posts")
                    .service(
                        web::resource("")
                            .route(web::get().to(posts::index))
                            .route(web::post().to(posts::create)),
                    )
                    .route("/mine", web::get().to(posts::mine))
                    .route("/recent", web::get().to(posts::recent))
                    .service(
                        web::resource("/{id}/comments")
                            .route(web::get().to(comments::list))
                            .route(web::post().to(comments::create)),
                    )
                    .route("/{id}/restore", web::post().to(posts::restore))
                    .route("/{id}/force", web::delete().to(posts::force_delete))
                    .service(
                        web::resource("/{key}")
                            .route(web::get().to(posts::show))
                            .route(web::patch().to(posts::update))
                            .route(web::delete().to(posts::delete)),
                    ),
            )
            // Comments
            .service(
                web::scope("/comments")
                    .route("/{id}/reply", web::post().to(comments::reply))
                    .route("/{id}/approve", web::patch().to(comments::approve))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(comments::show))
                            .route(web::patch().to(comments::update))
                            .route(web::delete().to(comments::delete)),
                    ),
            )
            // Tags
            .service(
                web::scope("/tags")
                    .route("/popular", web::get().to(tags::popular))
                    .route("/{slug}/posts", web::get().to(tags::posts)),
            ),
    );
}
