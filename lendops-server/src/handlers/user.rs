use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use lendops_common::db::{self, DaoError, DbThreadPool};
use lendops_common::mfa::recovery;
use lendops_common::threadrand::SecureRng;
use lendops_common::token::SessionToken;
use lendops_common::totp;
use lendops_common::validators::{self, Validity};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::codes;
use crate::env;
use crate::handlers::error::HttpErrorResponse;
use crate::handlers::request_io::{
    CredentialPair, InputBindMfa, InputShareCode, OutputMfaActivation, OutputMfaEnrollment,
    OutputSession, OutputUser, OutputUserId, OutputVisitorId,
};
use crate::handlers::response;
use crate::middleware::auth::AuthorizedUser;

const BAD_CREDENTIALS_MSG: &str = "Username or password is incorrect";
const VISITOR_COOKIE: &str = "visitor_id";
const MFA_SEED_LEN: usize = 20;

pub async fn register(
    db_thread_pool: web::Data<DbThreadPool>,
    user_data: web::Json<CredentialPair>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let create_code = codes::USERS_BASE + codes::OP_CREATE;

    if let Validity::Invalid(msg) = validators::validate_username(&user_data.username) {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            create_code,
            String::from(msg),
        ));
    }

    if let Validity::Invalid(msg) = validators::validate_password(&user_data.password) {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            create_code,
            String::from(msg),
        ));
    }

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    let username = user_data.username.clone();
    let username_taken = match web::block(move || auth_dao.username_in_use(&username)).await? {
        Ok(t) => t,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                create_code,
                String::from("Failed to check username availability"),
            ));
        }
    };

    if username_taken {
        return Err(HttpErrorResponse::ConflictWithExisting(
            create_code,
            String::from("Username is already taken"),
        ));
    }

    let user_data = Arc::new(user_data.0);
    let user_data_ref = Arc::clone(&user_data);

    let (sender, receiver) = oneshot::channel();

    rayon::spawn(move || {
        let hash_result = argon2_kdf::Hasher::default()
            .algorithm(argon2_kdf::Algorithm::Argon2id)
            .salt_length(env::CONF.hash_salt_length)
            .hash_length(env::CONF.hash_length)
            .iterations(env::CONF.hash_iterations)
            .memory_cost_kib(env::CONF.hash_mem_cost_kib)
            .threads(env::CONF.hash_threads)
            .secret(argon2_kdf::Secret::using(&env::CONF.hashing_key))
            .hash(user_data_ref.password.as_bytes());

        let hash = match hash_result {
            Ok(h) => h,
            Err(e) => {
                sender.send(Err(e)).expect("Sending to channel failed");
                return;
            }
        };

        sender
            .send(Ok(hash.to_string()))
            .expect("Sending to channel failed");
    });

    let password_hash = match receiver.await? {
        Ok(h) => h,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                create_code,
                String::from("Failed to hash password"),
            ));
        }
    };

    let share_code = format!("{:016x}", SecureRng::next_u64());

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    let user_id = match web::block(move || {
        auth_dao.create_user(&user_data.username, &password_hash, &share_code)
    })
    .await?
    {
        Ok(id) => id,
        Err(DaoError::QueryFailure(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ))) => {
            return Err(HttpErrorResponse::ConflictWithExisting(
                create_code,
                String::from("Username is already taken"),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                create_code,
                String::from("Failed to create user"),
            ));
        }
    };

    Ok(response::ok(OutputUserId { user_id }))
}

pub async fn login(
    req: HttpRequest,
    db_thread_pool: web::Data<DbThreadPool>,
    credentials: web::Json<CredentialPair>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let login_code = codes::AUTH_BASE + codes::OP_VERIFY;

    let client_addr = client_addr_of(&req);
    let user_agent = user_agent_of(&req);

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    let username = credentials.username.clone();
    let user = match web::block(move || auth_dao.get_user_by_username(&username)).await? {
        Ok(u) => u,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            // A missing username answers exactly like a wrong password
            record_audit(&db_thread_pool, None, "login", &client_addr, &user_agent, false);

            return Err(HttpErrorResponse::IncorrectCredential(
                login_code,
                String::from(BAD_CREDENTIALS_MSG),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                login_code,
                String::from("Failed to look up user"),
            ));
        }
    };

    if !user.is_active {
        record_audit(
            &db_thread_pool,
            Some(user.id),
            "login",
            &client_addr,
            &user_agent,
            false,
        );

        return Err(HttpErrorResponse::UserDisallowed(
            login_code,
            String::from("Account is disabled"),
        ));
    }

    let password = Arc::new(credentials.0.password);
    let password_ref = Arc::clone(&password);
    let stored_hash = user.password_hash.clone();

    let (sender, receiver) = oneshot::channel();

    rayon::spawn(move || {
        let hash = match argon2_kdf::Hash::from_str(&stored_hash) {
            Ok(h) => h,
            Err(e) => {
                sender.send(Err(e)).expect("Sending to channel failed");
                return;
            }
        };

        let does_password_match_hash = hash.verify_with_secret(
            password_ref.as_bytes(),
            argon2_kdf::Secret::using(&env::CONF.hashing_key),
        );

        sender
            .send(Ok(does_password_match_hash))
            .expect("Sending to channel failed");
    });

    let password_matches = match receiver.await? {
        Ok(m) => m,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                login_code,
                String::from("Failed to verify credentials"),
            ));
        }
    };

    if !password_matches {
        record_audit(
            &db_thread_pool,
            Some(user.id),
            "login",
            &client_addr,
            &user_agent,
            false,
        );

        return Err(HttpErrorResponse::IncorrectCredential(
            login_code,
            String::from(BAD_CREDENTIALS_MSG),
        ));
    }

    record_audit(
        &db_thread_pool,
        Some(user.id),
        "login",
        &client_addr,
        &user_agent,
        true,
    );

    let token = SessionToken::sign_and_encode(
        user.id,
        env::CONF.session_lifetime,
        &env::CONF.token_signing_key,
    );

    Ok(response::ok(OutputSession {
        token,
        user_id: user.id,
        username: user.username,
        mfa_enabled: user.mfa_enabled,
    }))
}

pub async fn me(
    authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let get_code = codes::USERS_BASE + codes::OP_GET;

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    let user =
        match web::block(move || auth_dao.get_user_by_id(authorized_user.user_id)).await? {
            Ok(u) => u,
            Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
                return Err(HttpErrorResponse::DoesNotExist(
                    get_code,
                    String::from("User not found"),
                ));
            }
            Err(e) => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(
                    get_code,
                    String::from("Failed to look up user"),
                ));
            }
        };

    Ok(response::ok(OutputUser {
        id: user.id,
        username: user.username,
        department_id: user.department_id,
        mfa_enabled: user.mfa_enabled,
        mfa_required: user.mfa_required,
        is_active: user.is_active,
        share_code: user.share_code,
    }))
}

/// Public landing endpoint for referral links. Repeated visits from the same
/// browser count against a single visitor row.
pub async fn refer(
    req: HttpRequest,
    db_thread_pool: web::Data<DbThreadPool>,
    share_code: web::Query<InputShareCode>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let visit_code = codes::USERS_BASE + codes::OP_QUERY;

    if share_code.share_code.is_empty() || share_code.share_code.len() > 64 {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            visit_code,
            String::from("Share code is malformed"),
        ));
    }

    let (visitor_id, is_new_visitor) = match req.cookie(VISITOR_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() && cookie.value().len() <= 64 => {
            (String::from(cookie.value()), false)
        }
        _ => (format!("{:032x}", SecureRng::next_u128()), true),
    };

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    let code = share_code.0.share_code;
    let visitor_id_copy = visitor_id.clone();

    match web::block(move || auth_dao.record_visit(&code, &visitor_id_copy)).await? {
        Ok(()) => (),
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                visit_code,
                String::from("Failed to record visit"),
            ));
        }
    }

    let mut resp = response::ok(OutputVisitorId {
        visitor_id: visitor_id.clone(),
    });

    if is_new_visitor {
        let cookie = Cookie::build(VISITOR_COOKIE, visitor_id)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish();

        if let Err(e) = resp.add_cookie(&cookie) {
            log::error!("Failed to attach visitor cookie: {e}");
        }
    }

    Ok(resp)
}

/// Two-phase enrollment. A request without a code provisions a fresh seed
/// and answers with the otpauth URL; a request with a code verifies it
/// against the pending seed and activates the device.
pub async fn bind_mfa(
    authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
    bind_data: web::Json<InputBindMfa>,
) -> Result<HttpResponse, HttpErrorResponse> {
    match bind_data.0.otp {
        None => begin_enrollment(authorized_user, db_thread_pool, bind_data.0.display_name).await,
        Some(otp) => complete_enrollment(authorized_user, db_thread_pool, otp).await,
    }
}

async fn begin_enrollment(
    authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
    display_name: Option<String>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let enroll_code = codes::MFA_BASE + codes::OP_CREATE;

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    let user = match web::block(move || auth_dao.get_user_by_id(authorized_user.user_id)).await? {
        Ok(u) => u,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                enroll_code,
                String::from("Failed to look up user"),
            ));
        }
    };

    if user.mfa_enabled {
        return Err(HttpErrorResponse::ConflictWithExisting(
            enroll_code,
            String::from("An authenticator is already enrolled"),
        ));
    }

    let mut seed = [0u8; MFA_SEED_LEN];
    SecureRng::fill(&mut seed);

    let seed_b32 = totp::encode_base32(&seed);
    let seed_encrypted = env::CONF.mfa_seed_box.encrypt(&seed);

    let otpauth_url = format!(
        "otpauth://totp/lendops:{}?secret={}&issuer=lendops&algorithm=SHA1&digits={}&period={}",
        user.username,
        seed_b32,
        totp::DIGITS,
        totp::PERIOD_SECS,
    );

    let display_name = display_name.unwrap_or_else(|| String::from("Authenticator app"));

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    let device_id = match web::block(move || {
        auth_dao.create_pending_device(
            authorized_user.user_id,
            "totp",
            &display_name,
            &seed_encrypted,
        )
    })
    .await?
    {
        Ok(id) => id,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                enroll_code,
                String::from("Failed to provision authenticator"),
            ));
        }
    };

    Ok(response::ok(OutputMfaEnrollment {
        device_id,
        otpauth_url,
    }))
}

async fn complete_enrollment(
    authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
    otp: String,
) -> Result<HttpResponse, HttpErrorResponse> {
    let activate_code = codes::MFA_BASE + codes::OP_VERIFY;

    let otp = String::from(otp.trim());

    if otp.len() != lendops_common::mfa::OTP_LEN || !otp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            activate_code,
            String::from("One-time code is malformed"),
        ));
    }

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    let device = match web::block(move || auth_dao.get_pending_device(authorized_user.user_id))
        .await?
    {
        Ok(Some(d)) => d,
        Ok(None) => {
            return Err(HttpErrorResponse::InvalidState(
                activate_code,
                String::from("No enrollment is in progress"),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                activate_code,
                String::from("Failed to look up pending authenticator"),
            ));
        }
    };

    let seed = match env::CONF.mfa_seed_box.decrypt(&device.seed_encrypted) {
        Ok(s) if !s.is_empty() => s,
        _ => {
            log::error!("Pending device {} has an unusable seed", device.id);
            return Err(HttpErrorResponse::InternalError(
                activate_code,
                String::from("Authenticator cannot be used"),
            ));
        }
    };

    if !totp::verify(&seed, &otp) {
        return Err(HttpErrorResponse::IncorrectCredential(
            activate_code,
            String::from("One-time code is incorrect"),
        ));
    }

    let recovery_codes = recovery::generate_codes();
    let code_hashes: Vec<String> = recovery_codes.iter().map(|c| recovery::hash_code(c)).collect();

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    let device_id = device.id;
    match web::block(move || {
        auth_dao.activate_device(authorized_user.user_id, device_id, &code_hashes)
    })
    .await?
    {
        Ok(()) => (),
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                activate_code,
                String::from("Failed to activate authenticator"),
            ));
        }
    }

    Ok(response::ok(OutputMfaActivation {
        device_id,
        recovery_codes,
    }))
}

fn client_addr_of(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .map(String::from)
        .unwrap_or_default()
}

fn user_agent_of(req: &HttpRequest) -> String {
    req.headers()
        .get(actix_web::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_default()
}

/// Audit rows are best-effort. Losing one is logged, never surfaced.
fn record_audit(
    db_thread_pool: &DbThreadPool,
    user_id: Option<i64>,
    audit_type: &'static str,
    client_addr: &str,
    user_agent: &str,
    succeeded: bool,
) {
    let auth_dao = db::auth::Dao::new(db_thread_pool);
    let client_addr = String::from(client_addr);
    let user_agent = String::from(user_agent);

    rayon::spawn(move || {
        if let Err(e) =
            auth_dao.record_login_audit(user_id, audit_type, &client_addr, &user_agent, succeeded)
        {
            log::error!("Failed to record login audit: {e}");
        }
    });
}
