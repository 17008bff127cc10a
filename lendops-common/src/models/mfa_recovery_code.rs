use diesel::{Insertable, Queryable};
use std::time::SystemTime;

use crate::schema::mfa_recovery_codes;

/// A single-use fallback credential. `redeemed_at` is set exactly once and
/// never cleared.
#[derive(Clone, Debug, Identifiable, Queryable)]
#[diesel(table_name = mfa_recovery_codes)]
pub struct MfaRecoveryCode {
    pub id: i64,
    pub user_id: i64,
    pub code_hash: String,
    pub redeemed_at: Option<SystemTime>,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub deleted_at: Option<SystemTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = mfa_recovery_codes)]
pub struct NewMfaRecoveryCode<'a> {
    pub user_id: i64,
    pub code_hash: &'a str,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}
