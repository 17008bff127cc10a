use diesel::{Insertable, Queryable};
use std::time::SystemTime;

use crate::schema::mfa_devices;

/// An enrolled authenticator. For each user at most one device may be
/// primary and active at the same time.
#[derive(Clone, Debug, Identifiable, Queryable)]
#[diesel(table_name = mfa_devices)]
pub struct MfaDevice {
    pub id: i64,
    pub user_id: i64,
    pub device_type: String,
    pub display_name: String,
    pub seed_encrypted: Vec<u8>,
    pub is_primary: bool,
    pub is_active: bool,
    pub last_used_at: Option<SystemTime>,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub deleted_at: Option<SystemTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = mfa_devices)]
pub struct NewMfaDevice<'a> {
    pub user_id: i64,
    pub device_type: &'a str,
    pub display_name: &'a str,
    pub seed_encrypted: &'a [u8],
    pub is_primary: bool,
    pub is_active: bool,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}
