use chrono::NaiveDate;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::schema::repayment_schedules;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ScheduleStatus {
    Open,
    Settled,
    Overdue,
}

impl TryFrom<i16> for ScheduleStatus {
    type Error = i16;

    fn try_from(value: i16) -> Result<Self, i16> {
        match value {
            0 => Ok(ScheduleStatus::Open),
            1 => Ok(ScheduleStatus::Settled),
            2 => Ok(ScheduleStatus::Overdue),
            v => Err(v),
        }
    }
}

impl From<ScheduleStatus> for i16 {
    fn from(status: ScheduleStatus) -> Self {
        match status {
            ScheduleStatus::Open => 0,
            ScheduleStatus::Settled => 1,
            ScheduleStatus::Overdue => 2,
        }
    }
}

/// One installment of a disbursement's repayment plan. Amounts are in minor
/// currency units. At rest:
/// - `total_due` equals the sum of the four due buckets,
/// - `paid_total` equals the sum of the four paid buckets,
/// - each paid bucket never exceeds its due bucket,
/// - `status` is `Settled` exactly when `paid_total >= total_due`, and then
///   `settled_at` is non-null.
#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = repayment_schedules)]
pub struct RepaymentSchedule {
    pub id: i64,
    pub disbursement_id: i64,
    pub installment_no: i32,
    pub due_date: NaiveDate,
    pub principal_due: i64,
    pub interest_due: i64,
    pub fee_due: i64,
    pub penalty_due: i64,
    pub total_due: i64,
    pub paid_principal: i64,
    pub paid_interest: i64,
    pub paid_fee: i64,
    pub paid_penalty: i64,
    pub paid_total: i64,
    pub status: i16,
    pub last_paid_at: Option<SystemTime>,
    pub settled_at: Option<SystemTime>,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub deleted_at: Option<SystemTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = repayment_schedules)]
pub struct NewRepaymentSchedule {
    pub disbursement_id: i64,
    pub installment_no: i32,
    pub due_date: NaiveDate,
    pub principal_due: i64,
    pub interest_due: i64,
    pub fee_due: i64,
    pub penalty_due: i64,
    pub total_due: i64,
    pub paid_principal: i64,
    pub paid_interest: i64,
    pub paid_fee: i64,
    pub paid_penalty: i64,
    pub paid_total: i64,
    pub status: i16,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}
