use diesel::{Insertable, Queryable};
use std::time::SystemTime;

use crate::schema::login_audits;

#[derive(Clone, Debug, Identifiable, Queryable)]
#[diesel(table_name = login_audits)]
pub struct LoginAudit {
    pub id: i64,
    pub user_id: Option<i64>,
    pub audit_type: String,
    pub client_addr: String,
    pub user_agent: String,
    pub succeeded: bool,

    pub created_at: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = login_audits)]
pub struct NewLoginAudit<'a> {
    pub user_id: Option<i64>,
    pub audit_type: &'a str,
    pub client_addr: &'a str,
    pub user_agent: &'a str,
    pub succeeded: bool,

    pub created_at: SystemTime,
}
