use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::schema::application_files;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = application_files)]
pub struct ApplicationFile {
    pub id: i64,
    pub application_id: i64,
    pub file_role: String,
    pub storage_url: String,
    pub storage_key: Option<String>,
    pub file_name: String,
    pub mime_type: String,
    pub byte_size: i64,
    // 64-char hex digest of the stored bytes when present
    pub content_hash: Option<String>,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub deleted_at: Option<SystemTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = application_files)]
pub struct NewApplicationFile<'a> {
    pub application_id: i64,
    pub file_role: &'a str,
    pub storage_url: &'a str,
    pub storage_key: Option<&'a str>,
    pub file_name: &'a str,
    pub mime_type: &'a str,
    pub byte_size: i64,
    pub content_hash: Option<&'a str>,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}
