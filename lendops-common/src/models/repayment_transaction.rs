use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::schema::repayment_transactions;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Successful,
    Failed,
    Reversed,
}

impl TryFrom<i16> for TransactionStatus {
    type Error = i16;

    fn try_from(value: i16) -> Result<Self, i16> {
        match value {
            0 => Ok(TransactionStatus::Successful),
            1 => Ok(TransactionStatus::Failed),
            2 => Ok(TransactionStatus::Reversed),
            v => Err(v),
        }
    }
}

impl From<TransactionStatus> for i16 {
    fn from(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Successful => 0,
            TransactionStatus::Failed => 1,
            TransactionStatus::Reversed => 2,
        }
    }
}

/// A ledger row for one incoming payment. A null `schedule_id` marks an
/// unallocated deposit. For every successful transaction the four allocation
/// buckets sum to `pay_amount`.
#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = repayment_transactions)]
pub struct RepaymentTransaction {
    pub id: i64,
    pub schedule_id: Option<i64>,
    pub channel_id: Option<i64>,
    pub external_order_no: String,
    pub external_ref: Option<String>,
    pub pay_amount: i64,
    pub pay_method: String,
    pub paid_at: SystemTime,
    pub alloc_principal: i64,
    pub alloc_interest: i64,
    pub alloc_fee: i64,
    pub alloc_penalty: i64,
    pub status: i16,
    pub voucher_file: Option<String>,
    pub remark: Option<String>,
    pub created_by: i64,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub deleted_at: Option<SystemTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = repayment_transactions)]
pub struct NewRepaymentTransaction<'a> {
    pub schedule_id: Option<i64>,
    pub channel_id: Option<i64>,
    pub external_order_no: &'a str,
    pub external_ref: Option<&'a str>,
    pub pay_amount: i64,
    pub pay_method: &'a str,
    pub paid_at: SystemTime,
    pub alloc_principal: i64,
    pub alloc_interest: i64,
    pub alloc_fee: i64,
    pub alloc_penalty: i64,
    pub status: i16,
    pub voucher_file: Option<&'a str>,
    pub remark: Option<&'a str>,
    pub created_by: i64,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}
