use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest};
use futures::future;
use lendops_common::token::SessionToken;

use crate::env;
use crate::handlers::error::HttpErrorResponse;

/// Extractor proving the request carries a valid session token. Handlers
/// that take this as a parameter never run for unauthenticated requests.
#[derive(Debug)]
pub struct AuthorizedUser {
    pub user_id: i64,
}

impl FromRequest for AuthorizedUser {
    type Error = HttpErrorResponse;
    type Future = future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let header_value = match req.headers().get(header::AUTHORIZATION) {
            Some(v) => v,
            None => return future::err(HttpErrorResponse::from(
                lendops_common::token::TokenError::TokenMissing,
            )),
        };

        let token = match header_value.to_str() {
            Ok(t) => t,
            Err(_) => {
                return future::err(HttpErrorResponse::from(
                    lendops_common::token::TokenError::TokenInvalid,
                ));
            }
        };

        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();

        match SessionToken::verify(token, &env::CONF.token_signing_key) {
            Ok(claims) => future::ok(AuthorizedUser {
                user_id: claims.uid,
            }),
            Err(e) => future::err(HttpErrorResponse::from(e)),
        }
    }
}
