//! HTTP handlers and route configuration.

mod auth;
mod health;
mod posts;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/auth")
                .route("/register", web::post().to(auth::register))
                .route("/login", web::post().to(auth::login))
                .route("/me", web::get().to(auth::me)),
        )
        .service(
            web::scope("/posts")
                .route("", web::get().to(posts::index))
                .route("", web::post().to(posts::store))
                // Registered before `/{id}` so it is not parsed as an id.
                .route("/create", web::get().to(posts::create))
                .route("/{id}", web::get().to(posts::show))
                .route("/{id}", web::put().to(posts::update))
                .route("/{id}", web::patch().to(posts::update))
                .route("/{id}", web::delete().to(posts::destroy))
                .route("/{id}/edit", web::get().to(posts::edit)),
        );
}
