use bigdecimal::BigDecimal;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::schema::loan_applications;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AuditStatus {
    Pending,
    Approved,
    Rejected,
}

impl TryFrom<i16> for AuditStatus {
    type Error = i16;

    fn try_from(value: i16) -> Result<Self, i16> {
        match value {
            0 => Ok(AuditStatus::Pending),
            1 => Ok(AuditStatus::Approved),
            2 => Ok(AuditStatus::Rejected),
            v => Err(v),
        }
    }
}

impl From<AuditStatus> for i16 {
    fn from(status: AuditStatus) -> Self {
        match status {
            AuditStatus::Pending => 0,
            AuditStatus::Approved => 1,
            AuditStatus::Rejected => 2,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = loan_applications)]
pub struct LoanApplication {
    pub id: i64,
    pub applicant_name: String,
    pub applicant_phone: String,
    pub id_number: String,
    pub requested_amount: BigDecimal,
    pub term_days: i32,
    pub audit_status: i16,
    pub share_code: Option<String>,
    pub client_addr: Option<String>,
    pub risk_state: i16,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub deleted_at: Option<SystemTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = loan_applications)]
pub struct NewLoanApplication<'a> {
    pub applicant_name: &'a str,
    pub applicant_phone: &'a str,
    pub id_number: &'a str,
    pub requested_amount: &'a BigDecimal,
    pub term_days: i32,
    pub audit_status: i16,
    pub share_code: Option<&'a str>,
    pub client_addr: Option<&'a str>,
    pub risk_state: i16,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}
