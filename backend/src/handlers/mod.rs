use actix_web::web;

pub mod auth;
pub mod blogs;
pub mod donations;
pub mod events;
pub mod membership;
pub mod users;
pub mod voting;
pub mod webhooks;
pub mod welfare;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(auth::configure)
            .configure(users::configure)
            .configure(membership::configure)
            .configure(welfare::configure)
            .configure(donations::configure)
            .configure(events::configure)
            .configure(voting::configure)
            .configure(blogs::configure),
    )
    .service(web::scope("/webhooks").configure(webhooks::configure));
}
