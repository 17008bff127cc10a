pub mod customer;
pub mod payment_channel;
pub mod repayment;
pub mod request_io;
pub mod user;

pub mod response {
    use actix_web::HttpResponse;
    use serde::Serialize;

    use crate::codes;

    /// The envelope every endpoint answers with. `code` is zero on success
    /// and a value from [`crate::codes`] otherwise.
    #[derive(Debug, Serialize)]
    pub struct ApiResponse<T: Serialize> {
        pub code: i32,
        pub msg: String,
        pub data: Option<T>,
    }

    pub fn ok<T: Serialize>(data: T) -> HttpResponse {
        HttpResponse::Ok().json(ApiResponse {
            code: codes::SUCCESS,
            msg: String::from("ok"),
            data: Some(data),
        })
    }

    pub fn ok_empty() -> HttpResponse {
        HttpResponse::Ok().json(ApiResponse::<()> {
            code: codes::SUCCESS,
            msg: String::from("ok"),
            data: None,
        })
    }
}

pub mod error {
    use actix_web::http::StatusCode;
    use actix_web::{HttpResponse, HttpResponseBuilder};
    use lendops_common::mfa::MfaError;
    use lendops_common::token::TokenError;
    use std::fmt;
    use tokio::sync::oneshot;

    use crate::codes;
    use crate::handlers::response::ApiResponse;

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(i32, String),
        InvalidState(i32, String),

        // 401
        IncorrectCredential(i32, String),
        BadToken(i32, String),
        TokenExpired(i32, String),
        TokenMissing(i32, String),

        // 403
        UserDisallowed(i32, String),

        // 404
        DoesNotExist(i32, String),

        // 409
        ConflictWithExisting(i32, String),

        // 413
        InputTooLarge(i32, String),

        // 500
        InternalError(i32, String),

        // 503
        DatabaseUnavailable(i32, String),
    }

    impl std::error::Error for HttpErrorResponse {}

    impl HttpErrorResponse {
        fn parts(&self) -> (i32, &str) {
            match self {
                HttpErrorResponse::IncorrectlyFormed(code, msg)
                | HttpErrorResponse::InvalidState(code, msg)
                | HttpErrorResponse::IncorrectCredential(code, msg)
                | HttpErrorResponse::BadToken(code, msg)
                | HttpErrorResponse::TokenExpired(code, msg)
                | HttpErrorResponse::TokenMissing(code, msg)
                | HttpErrorResponse::UserDisallowed(code, msg)
                | HttpErrorResponse::DoesNotExist(code, msg)
                | HttpErrorResponse::ConflictWithExisting(code, msg)
                | HttpErrorResponse::InputTooLarge(code, msg)
                | HttpErrorResponse::InternalError(code, msg)
                | HttpErrorResponse::DatabaseUnavailable(code, msg) => (*code, msg),
            }
        }
    }

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let (code, msg) = self.parts();
            write!(f, "[{code}] {msg}")
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            let (code, msg) = self.parts();

            HttpResponseBuilder::new(self.status_code()).json(ApiResponse::<()> {
                code,
                msg: String::from(msg),
                data: None,
            })
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::IncorrectlyFormed(_, _)
                | HttpErrorResponse::InvalidState(_, _) => StatusCode::BAD_REQUEST,
                HttpErrorResponse::IncorrectCredential(_, _)
                | HttpErrorResponse::BadToken(_, _)
                | HttpErrorResponse::TokenExpired(_, _)
                | HttpErrorResponse::TokenMissing(_, _) => StatusCode::UNAUTHORIZED,
                HttpErrorResponse::UserDisallowed(_, _) => StatusCode::FORBIDDEN,
                HttpErrorResponse::DoesNotExist(_, _) => StatusCode::NOT_FOUND,
                HttpErrorResponse::ConflictWithExisting(_, _) => StatusCode::CONFLICT,
                HttpErrorResponse::InputTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
                HttpErrorResponse::InternalError(_, _) => StatusCode::INTERNAL_SERVER_ERROR,
                HttpErrorResponse::DatabaseUnavailable(_, _) => StatusCode::SERVICE_UNAVAILABLE,
            }
        }
    }

    impl From<actix_web::error::BlockingError> for HttpErrorResponse {
        fn from(_err: actix_web::error::BlockingError) -> Self {
            HttpErrorResponse::InternalError(
                codes::GENERAL_BASE,
                String::from("Actix thread pool failure"),
            )
        }
    }

    impl From<oneshot::error::RecvError> for HttpErrorResponse {
        fn from(_err: oneshot::error::RecvError) -> Self {
            HttpErrorResponse::InternalError(
                codes::GENERAL_BASE,
                String::from("Rayon thread pool failure"),
            )
        }
    }

    impl From<TokenError> for HttpErrorResponse {
        fn from(err: TokenError) -> Self {
            match err {
                TokenError::TokenInvalid => HttpErrorResponse::BadToken(
                    codes::AUTH_BASE + codes::OP_VERIFY,
                    String::from("Invalid token"),
                ),
                TokenError::TokenExpired => HttpErrorResponse::TokenExpired(
                    codes::AUTH_BASE + codes::OP_VERIFY,
                    String::from("Token expired"),
                ),
                TokenError::TokenMissing => HttpErrorResponse::TokenMissing(
                    codes::AUTH_BASE + codes::OP_VERIFY,
                    String::from("Missing token"),
                ),
            }
        }
    }

    impl From<MfaError> for HttpErrorResponse {
        fn from(err: MfaError) -> Self {
            let code = codes::MFA_BASE + codes::OP_VERIFY;

            match err {
                MfaError::OtpMalformed => HttpErrorResponse::IncorrectlyFormed(
                    code,
                    String::from("One-time code is malformed"),
                ),
                MfaError::NotEnrolled => HttpErrorResponse::InvalidState(
                    code,
                    String::from("No active authenticator is enrolled"),
                ),
                MfaError::SecretCorrupt => {
                    log::error!("A stored authenticator seed failed to decrypt");
                    HttpErrorResponse::InternalError(
                        code,
                        String::from("Authenticator cannot be used"),
                    )
                }
                MfaError::OtpInvalid => HttpErrorResponse::IncorrectCredential(
                    code,
                    String::from("One-time code is incorrect"),
                ),
                MfaError::Dao(e) => {
                    log::error!("{e}");
                    HttpErrorResponse::InternalError(
                        code,
                        String::from("Failed to verify one-time code"),
                    )
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use actix_web::error::ResponseError;

        #[test]
        fn test_status_codes() {
            let cases = [
                (
                    HttpErrorResponse::IncorrectlyFormed(1, String::new()),
                    StatusCode::BAD_REQUEST,
                ),
                (
                    HttpErrorResponse::IncorrectCredential(1, String::new()),
                    StatusCode::UNAUTHORIZED,
                ),
                (
                    HttpErrorResponse::UserDisallowed(1, String::new()),
                    StatusCode::FORBIDDEN,
                ),
                (
                    HttpErrorResponse::DoesNotExist(1, String::new()),
                    StatusCode::NOT_FOUND,
                ),
                (
                    HttpErrorResponse::ConflictWithExisting(1, String::new()),
                    StatusCode::CONFLICT,
                ),
                (
                    HttpErrorResponse::InputTooLarge(1, String::new()),
                    StatusCode::PAYLOAD_TOO_LARGE,
                ),
                (
                    HttpErrorResponse::InternalError(1, String::new()),
                    StatusCode::INTERNAL_SERVER_ERROR,
                ),
                (
                    HttpErrorResponse::DatabaseUnavailable(1, String::new()),
                    StatusCode::SERVICE_UNAVAILABLE,
                ),
            ];

            for (err, expected) in cases {
                assert_eq!(err.status_code(), expected);
            }
        }

        #[test]
        fn test_error_envelope_shape() {
            let err = HttpErrorResponse::DoesNotExist(
                codes::PAYMENT_CHANNELS_BASE + codes::OP_GET,
                String::from("Channel not found"),
            );

            let resp = err.error_response();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            assert_eq!(
                format!("{err}"),
                format!(
                    "[{}] Channel not found",
                    codes::PAYMENT_CHANNELS_BASE + codes::OP_GET,
                ),
            );
        }
    }
}
