use actix_web::web;

mod customer;
mod payment_channel;
mod repayment;
mod user;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(customer::configure)
            .configure(payment_channel::configure)
            .configure(repayment::configure)
            .configure(user::configure),
    );
}
