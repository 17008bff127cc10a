use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::schema::users;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable, QueryableByName)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub department_id: Option<i64>,
    pub mfa_enabled: bool,
    pub mfa_required: bool,
    pub is_active: bool,
    pub share_code: String,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub deleted_at: Option<SystemTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub department_id: Option<i64>,
    pub mfa_enabled: bool,
    pub mfa_required: bool,
    pub is_active: bool,
    pub share_code: &'a str,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}
