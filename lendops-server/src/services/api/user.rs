use actix_web::web;

use crate::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user")
            .route("/register", web::post().to(handlers::user::register))
            .route("/login", web::post().to(handlers::user::login))
            .route("/me", web::get().to(handlers::user::me))
            .route("/refer", web::get().to(handlers::user::refer))
            .route("/bind_mfa", web::post().to(handlers::user::bind_mfa)),
    );
}
