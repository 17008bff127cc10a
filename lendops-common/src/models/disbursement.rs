use bigdecimal::BigDecimal;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::schema::disbursements;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum DisbursementStatus {
    Pending,
    Disbursed,
}

impl TryFrom<i16> for DisbursementStatus {
    type Error = i16;

    fn try_from(value: i16) -> Result<Self, i16> {
        match value {
            0 => Ok(DisbursementStatus::Pending),
            1 => Ok(DisbursementStatus::Disbursed),
            v => Err(v),
        }
    }
}

impl From<DisbursementStatus> for i16 {
    fn from(status: DisbursementStatus) -> Self {
        match status {
            DisbursementStatus::Pending => 0,
            DisbursementStatus::Disbursed => 1,
        }
    }
}

/// `disbursed_at` is non-null exactly when `status` is `Disbursed`. The only
/// permitted transition is `Pending` to `Disbursed`.
#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = disbursements)]
pub struct Disbursement {
    pub id: i64,
    pub application_id: i64,
    pub gross_amount: BigDecimal,
    pub net_amount: BigDecimal,
    pub status: i16,
    pub auditor_user_id: Option<i64>,
    pub audited_at: Option<SystemTime>,
    pub channel_id: Option<i64>,
    pub payout_order_no: Option<String>,
    pub disbursed_at: Option<SystemTime>,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub deleted_at: Option<SystemTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = disbursements)]
pub struct NewDisbursement<'a> {
    pub application_id: i64,
    pub gross_amount: &'a BigDecimal,
    pub net_amount: &'a BigDecimal,
    pub status: i16,
    pub auditor_user_id: Option<i64>,
    pub audited_at: Option<SystemTime>,
    pub channel_id: Option<i64>,
    pub payout_order_no: Option<&'a str>,
    pub disbursed_at: Option<SystemTime>,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}
