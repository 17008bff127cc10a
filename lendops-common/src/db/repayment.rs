use diesel::{
    dsl, ExpressionMethods, NullableExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

use crate::cache::{Cache, CachedEntity};
use crate::db::{DaoError, DbThreadPool};
use crate::models::disbursement::Disbursement;
use crate::models::loan_application::LoanApplication;
use crate::models::repayment_schedule::{RepaymentSchedule, ScheduleStatus};
use crate::models::repayment_transaction::{
    NewRepaymentTransaction, RepaymentTransaction, TransactionStatus,
};
use crate::schema::disbursements as disbursement_fields;
use crate::schema::disbursements::dsl::disbursements;
use crate::schema::loan_applications as loan_application_fields;
use crate::schema::loan_applications::dsl::loan_applications;
use crate::schema::payment_channels as payment_channel_fields;
use crate::schema::payment_channels::dsl::payment_channels;
use crate::schema::repayment_schedules as schedule_fields;
use crate::schema::repayment_schedules::dsl::repayment_schedules;
use crate::schema::repayment_transactions as transaction_fields;
use crate::schema::repayment_transactions::dsl::repayment_transactions;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub const SCHEDULE_ENTITY: &str = "repayment_schedule";
pub const SCHEDULE_DETAIL_ENTITY: &str = "repayment_schedule_detail";

const MAX_HISTORY_PAGE: i64 = 200;

#[derive(Debug)]
pub enum PostError {
    Validation(&'static str),
    ScheduleNotFound,
    AlreadySettled,
    Dao(DaoError),
}

impl std::error::Error for PostError {}

impl fmt::Display for PostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostError::Validation(msg) => write!(f, "PostError: {msg}"),
            PostError::ScheduleNotFound => write!(f, "PostError: Schedule not found"),
            PostError::AlreadySettled => write!(f, "PostError: Schedule is already settled"),
            PostError::Dao(e) => write!(f, "PostError: {e}"),
        }
    }
}

impl From<DaoError> for PostError {
    fn from(e: DaoError) -> Self {
        PostError::Dao(e)
    }
}

impl From<diesel::result::Error> for PostError {
    fn from(e: diesel::result::Error) -> Self {
        PostError::Dao(DaoError::QueryFailure(e))
    }
}

impl From<r2d2::Error> for PostError {
    fn from(e: r2d2::Error) -> Self {
        PostError::Dao(DaoError::DbThreadPoolFailure(e))
    }
}

/// One payment to apply against a schedule. Amounts are minor currency
/// units; the four allocation buckets must sum to `pay_amount`.
#[derive(Clone, Debug)]
pub struct PostRepayment {
    pub schedule_id: i64,
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
    pub voucher_file: Option<String>,
    pub remark: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostReceipt {
    pub transaction_id: i64,
    pub duplicate: bool,
    pub settled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleDetail {
    pub schedule: RepaymentSchedule,
    pub disbursement: Disbursement,
    pub application: LoanApplication,
    pub channel_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub transaction: RepaymentTransaction,
    pub channel_name: Option<String>,
    pub posted_by: String,
}

/// Gate checks against the schedule row. Callers run this before anything
/// irreversible, such as consuming a one-time code.
pub fn check_postable(status: Option<i16>) -> Result<(), PostError> {
    match status {
        None => Err(PostError::ScheduleNotFound),
        Some(s) if s == i16::from(ScheduleStatus::Settled) => Err(PostError::AlreadySettled),
        Some(_) => Ok(()),
    }
}

/// Checks that hold without looking at the schedule.
pub fn validate_amounts(payment: &PostRepayment) -> Result<(), PostError> {
    if payment.pay_amount <= 0 {
        return Err(PostError::Validation("Payment amount must be positive"));
    }

    if payment.alloc_principal < 0
        || payment.alloc_interest < 0
        || payment.alloc_fee < 0
        || payment.alloc_penalty < 0
    {
        return Err(PostError::Validation("Allocations cannot be negative"));
    }

    let alloc_sum = payment
        .alloc_principal
        .checked_add(payment.alloc_interest)
        .and_then(|s| s.checked_add(payment.alloc_fee))
        .and_then(|s| s.checked_add(payment.alloc_penalty))
        .ok_or(PostError::Validation("Allocations overflow"))?;

    if alloc_sum != payment.pay_amount {
        return Err(PostError::Validation(
            "Allocations must sum to the payment amount",
        ));
    }

    if payment.external_order_no.is_empty() {
        return Err(PostError::Validation("External order number is required"));
    }

    Ok(())
}

/// No bucket may be paid past what it is owed.
fn check_buckets(schedule: &RepaymentSchedule, payment: &PostRepayment) -> Result<(), PostError> {
    let checks = [
        (
            payment.alloc_principal,
            schedule.principal_due - schedule.paid_principal,
            "Principal allocation exceeds the outstanding principal",
        ),
        (
            payment.alloc_interest,
            schedule.interest_due - schedule.paid_interest,
            "Interest allocation exceeds the outstanding interest",
        ),
        (
            payment.alloc_fee,
            schedule.fee_due - schedule.paid_fee,
            "Fee allocation exceeds the outstanding fee",
        ),
        (
            payment.alloc_penalty,
            schedule.penalty_due - schedule.paid_penalty,
            "Penalty allocation exceeds the outstanding penalty",
        ),
    ];

    for (alloc, outstanding, msg) in checks {
        if alloc > outstanding {
            return Err(PostError::Validation(msg));
        }
    }

    Ok(())
}

struct Allocation {
    paid_principal: i64,
    paid_interest: i64,
    paid_fee: i64,
    paid_penalty: i64,
    paid_total: i64,
    settled: bool,
}

fn apply_allocation(schedule: &RepaymentSchedule, payment: &PostRepayment) -> Allocation {
    let paid_principal = schedule.paid_principal + payment.alloc_principal;
    let paid_interest = schedule.paid_interest + payment.alloc_interest;
    let paid_fee = schedule.paid_fee + payment.alloc_fee;
    let paid_penalty = schedule.paid_penalty + payment.alloc_penalty;
    let paid_total = paid_principal + paid_interest + paid_fee + paid_penalty;

    Allocation {
        paid_principal,
        paid_interest,
        paid_fee,
        paid_penalty,
        paid_total,
        settled: paid_total >= schedule.total_due,
    }
}

// Failed and reversed rows never surface in a schedule's payment history
fn history_entries(rows: Vec<(RepaymentTransaction, Option<String>, String)>) -> Vec<HistoryEntry> {
    rows.into_iter()
        .filter(|(transaction, _, _)| {
            transaction.status == i16::from(TransactionStatus::Successful)
        })
        .map(|(transaction, channel_name, posted_by)| HistoryEntry {
            transaction,
            channel_name,
            posted_by,
        })
        .collect()
}

// A channel that has been soft-deleted keeps its joined row but loses its
// name in snapshots served to callers
fn visible_channel_name(name: Option<String>, deleted_at: Option<SystemTime>) -> Option<String> {
    match deleted_at {
        Some(_) => None,
        None => name,
    }
}

pub struct Dao {
    db_thread_pool: DbThreadPool,
    cache: Cache,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool, cache: &Cache) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
            cache: cache.clone(),
        }
    }

    /// Applies one payment to its schedule. The schedule row is locked for
    /// the whole transaction, so concurrent posts against the same schedule
    /// serialize and each sees the other's allocations.
    ///
    /// Posting the same external order number twice for the same caller and
    /// schedule returns the original transaction instead of a second row.
    pub fn post(&self, caller_id: i64, payment: &PostRepayment) -> Result<PostReceipt, PostError> {
        validate_amounts(payment)?;

        let now = SystemTime::now();

        let mut db_connection = self.db_thread_pool.get().map_err(DaoError::from)?;

        let receipt = db_connection
            .build_transaction()
            .run::<_, PostError, _>(|conn| {
                let schedule = repayment_schedules
                    .find(payment.schedule_id)
                    .filter(schedule_fields::deleted_at.is_null())
                    .for_update()
                    .first::<RepaymentSchedule>(conn)
                    .optional()?
                    .ok_or(PostError::ScheduleNotFound)?;

                let existing = repayment_transactions
                    .filter(transaction_fields::external_order_no.eq(&payment.external_order_no))
                    .filter(transaction_fields::created_by.eq(caller_id))
                    .filter(transaction_fields::schedule_id.eq(payment.schedule_id))
                    .filter(transaction_fields::status.eq(i16::from(TransactionStatus::Successful)))
                    .filter(transaction_fields::deleted_at.is_null())
                    .select(transaction_fields::id)
                    .first::<i64>(conn)
                    .optional()?;

                if let Some(transaction_id) = existing {
                    return Ok(PostReceipt {
                        transaction_id,
                        duplicate: true,
                        settled: schedule.status == i16::from(ScheduleStatus::Settled),
                    });
                }

                if schedule.status == i16::from(ScheduleStatus::Settled) {
                    return Err(PostError::AlreadySettled);
                }

                check_buckets(&schedule, payment)?;
                let allocation = apply_allocation(&schedule, payment);

                let new_transaction = NewRepaymentTransaction {
                    schedule_id: Some(payment.schedule_id),
                    channel_id: payment.channel_id,
                    external_order_no: &payment.external_order_no,
                    external_ref: payment.external_ref.as_deref(),
                    pay_amount: payment.pay_amount,
                    pay_method: &payment.pay_method,
                    paid_at: payment.paid_at,
                    alloc_principal: payment.alloc_principal,
                    alloc_interest: payment.alloc_interest,
                    alloc_fee: payment.alloc_fee,
                    alloc_penalty: payment.alloc_penalty,
                    status: TransactionStatus::Successful.into(),
                    voucher_file: payment.voucher_file.as_deref(),
                    remark: payment.remark.as_deref(),
                    created_by: caller_id,
                    created_at: now,
                    updated_at: now,
                };

                let transaction_id = dsl::insert_into(repayment_transactions)
                    .values(&new_transaction)
                    .returning(transaction_fields::id)
                    .get_result::<i64>(conn)?;

                let (new_status, settled_at) = if allocation.settled {
                    (i16::from(ScheduleStatus::Settled), Some(now))
                } else {
                    (schedule.status, None)
                };

                dsl::update(repayment_schedules.find(payment.schedule_id))
                    .set((
                        schedule_fields::paid_principal.eq(allocation.paid_principal),
                        schedule_fields::paid_interest.eq(allocation.paid_interest),
                        schedule_fields::paid_fee.eq(allocation.paid_fee),
                        schedule_fields::paid_penalty.eq(allocation.paid_penalty),
                        schedule_fields::paid_total.eq(allocation.paid_total),
                        schedule_fields::status.eq(new_status),
                        schedule_fields::settled_at.eq(settled_at),
                        schedule_fields::last_paid_at.eq(payment.paid_at),
                        schedule_fields::updated_at.eq(now),
                    ))
                    .execute(conn)?;

                Ok(PostReceipt {
                    transaction_id,
                    duplicate: false,
                    settled: allocation.settled,
                })
            })?;

        // Stale reads are acceptable only until the commit is visible
        if !receipt.duplicate {
            let keys = [
                Cache::entity_key(SCHEDULE_ENTITY, payment.schedule_id),
                Cache::entity_key(SCHEDULE_DETAIL_ENTITY, payment.schedule_id),
            ];

            if let Err(e) = self.cache.invalidate(&keys) {
                log::error!(
                    "Cache invalidation for schedule {} failed: {e}",
                    payment.schedule_id,
                );
            }
        }

        Ok(receipt)
    }

    pub fn history(
        &self,
        schedule_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<HistoryEntry>, DaoError> {
        let limit = limit.clamp(1, MAX_HISTORY_PAGE);

        let rows = repayment_transactions
            .inner_join(users)
            .left_join(payment_channels)
            .filter(transaction_fields::schedule_id.eq(schedule_id))
            .filter(transaction_fields::status.eq(i16::from(TransactionStatus::Successful)))
            .filter(transaction_fields::deleted_at.is_null())
            .select((
                transaction_fields::all_columns,
                payment_channel_fields::name.nullable(),
                user_fields::username,
            ))
            .order(transaction_fields::paid_at.desc())
            .offset(offset.max(0))
            .limit(limit)
            .load::<(RepaymentTransaction, Option<String>, String)>(
                &mut self.db_thread_pool.get()?,
            )?;

        Ok(history_entries(rows))
    }

    /// Status of a live schedule, or `None` when no such schedule exists.
    pub fn schedule_status(&self, schedule_id: i64) -> Result<Option<i16>, DaoError> {
        Ok(repayment_schedules
            .find(schedule_id)
            .filter(schedule_fields::deleted_at.is_null())
            .select(schedule_fields::status)
            .first::<i16>(&mut self.db_thread_pool.get()?)
            .optional()?)
    }

    /// Schedule plus its disbursement, application, and channel, cached as
    /// one unit under the detail key.
    pub fn detail_by_schedule(&self, schedule_id: i64) -> Result<ScheduleDetail, DaoError> {
        let key = Cache::entity_key(SCHEDULE_DETAIL_ENTITY, schedule_id);

        match self.cache.get_json::<ScheduleDetail>(&key) {
            Ok(CachedEntity::Value(detail)) => return Ok(detail),
            Ok(CachedEntity::Placeholder) => {
                return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
            }
            Ok(CachedEntity::Miss) => (),
            Err(e) => log::error!("Cache read for key '{key}' failed: {e}"),
        }

        let mut db_connection = self.db_thread_pool.get()?;

        let schedule = repayment_schedules
            .find(schedule_id)
            .filter(schedule_fields::deleted_at.is_null())
            .first::<RepaymentSchedule>(&mut db_connection)
            .optional()?;

        let Some(schedule) = schedule else {
            if let Err(e) = self.cache.put_placeholder(&key) {
                log::error!("Cache write for key '{key}' failed: {e}");
            }

            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        };

        // Soft deletes are filtered on every joined table, not only the
        // driving one, so a deleted applicant or channel never leaks into
        // the snapshot
        let (disbursement, application, channel_name, channel_deleted_at) = disbursements
            .inner_join(loan_applications)
            .left_join(payment_channels)
            .filter(disbursement_fields::id.eq(schedule.disbursement_id))
            .filter(disbursement_fields::deleted_at.is_null())
            .filter(loan_application_fields::deleted_at.is_null())
            .select((
                disbursement_fields::all_columns,
                loan_application_fields::all_columns,
                payment_channel_fields::name.nullable(),
                payment_channel_fields::deleted_at.nullable(),
            ))
            .first::<(Disbursement, LoanApplication, Option<String>, Option<SystemTime>)>(
                &mut db_connection,
            )?;

        let detail = ScheduleDetail {
            schedule,
            disbursement,
            application,
            channel_name: visible_channel_name(channel_name, channel_deleted_at),
        };

        if let Err(e) = self.cache.put_json(&key, &detail) {
            log::error!("Cache write for key '{key}' failed: {e}");
        }

        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::UNIX_EPOCH;

    fn test_payment() -> PostRepayment {
        PostRepayment {
            schedule_id: 1,
            channel_id: None,
            external_order_no: String::from("ORD-1001"),
            external_ref: None,
            pay_amount: 10_000,
            pay_method: String::from("bank_transfer"),
            paid_at: UNIX_EPOCH,
            alloc_principal: 8_000,
            alloc_interest: 1_500,
            alloc_fee: 500,
            alloc_penalty: 0,
            voucher_file: None,
            remark: None,
        }
    }

    fn test_schedule() -> RepaymentSchedule {
        RepaymentSchedule {
            id: 1,
            disbursement_id: 1,
            installment_no: 1,
            due_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            principal_due: 80_000,
            interest_due: 12_000,
            fee_due: 5_000,
            penalty_due: 3_000,
            total_due: 100_000,
            paid_principal: 0,
            paid_interest: 0,
            paid_fee: 0,
            paid_penalty: 0,
            paid_total: 0,
            status: ScheduleStatus::Open.into(),
            last_paid_at: None,
            settled_at: None,
            created_at: UNIX_EPOCH,
            updated_at: UNIX_EPOCH,
            deleted_at: None,
        }
    }

    #[test]
    fn test_validate_amounts_accepts_balanced_payment() {
        assert!(validate_amounts(&test_payment()).is_ok());
    }

    #[test]
    fn test_validate_amounts_rejects_nonpositive_amount() {
        let mut payment = test_payment();
        payment.pay_amount = 0;
        assert!(matches!(
            validate_amounts(&payment),
            Err(PostError::Validation(_))
        ));

        payment.pay_amount = -5;
        assert!(validate_amounts(&payment).is_err());
    }

    #[test]
    fn test_validate_amounts_rejects_unbalanced_allocation() {
        let mut payment = test_payment();
        payment.alloc_fee = 499;

        assert!(matches!(
            validate_amounts(&payment),
            Err(PostError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_amounts_rejects_negative_bucket() {
        let mut payment = test_payment();
        payment.alloc_penalty = -100;
        payment.alloc_principal = 8_100;

        assert!(validate_amounts(&payment).is_err());
    }

    #[test]
    fn test_validate_amounts_rejects_missing_order_no() {
        let mut payment = test_payment();
        payment.external_order_no = String::new();

        assert!(validate_amounts(&payment).is_err());
    }

    #[test]
    fn test_check_buckets_rejects_overpaying_a_bucket() {
        let mut schedule = test_schedule();
        schedule.paid_interest = 11_000;

        let mut payment = test_payment();
        payment.alloc_interest = 1_500;

        assert!(matches!(
            check_buckets(&schedule, &payment),
            Err(PostError::Validation(_))
        ));
    }

    #[test]
    fn test_check_buckets_allows_exact_payoff() {
        let schedule = test_schedule();

        let payment = PostRepayment {
            pay_amount: 100_000,
            alloc_principal: 80_000,
            alloc_interest: 12_000,
            alloc_fee: 5_000,
            alloc_penalty: 3_000,
            ..test_payment()
        };

        assert!(validate_amounts(&payment).is_ok());
        assert!(check_buckets(&schedule, &payment).is_ok());
    }

    #[test]
    fn test_apply_allocation_partial_payment_stays_open() {
        let allocation = apply_allocation(&test_schedule(), &test_payment());

        assert_eq!(allocation.paid_total, 10_000);
        assert!(!allocation.settled);
    }

    #[test]
    fn test_apply_allocation_settles_on_full_payment() {
        let mut schedule = test_schedule();
        schedule.paid_principal = 72_000;
        schedule.paid_interest = 10_500;
        schedule.paid_fee = 4_500;
        schedule.paid_penalty = 3_000;
        schedule.paid_total = 90_000;

        let payment = PostRepayment {
            pay_amount: 10_000,
            alloc_principal: 8_000,
            alloc_interest: 1_500,
            alloc_fee: 500,
            alloc_penalty: 0,
            ..test_payment()
        };

        let allocation = apply_allocation(&schedule, &payment);

        assert_eq!(allocation.paid_total, 100_000);
        assert!(allocation.settled);
    }

    fn test_transaction(status: TransactionStatus) -> RepaymentTransaction {
        RepaymentTransaction {
            id: 42,
            schedule_id: Some(1),
            channel_id: None,
            external_order_no: String::from("ORD-1001"),
            external_ref: None,
            pay_amount: 10_000,
            pay_method: String::from("bank_transfer"),
            paid_at: UNIX_EPOCH,
            alloc_principal: 8_000,
            alloc_interest: 1_500,
            alloc_fee: 500,
            alloc_penalty: 0,
            status: status.into(),
            voucher_file: None,
            remark: None,
            created_by: 7,
            created_at: UNIX_EPOCH,
            updated_at: UNIX_EPOCH,
            deleted_at: None,
        }
    }

    #[test]
    fn test_history_drops_failed_and_reversed_rows() {
        let rows = vec![
            (
                test_transaction(TransactionStatus::Successful),
                Some(String::from("Bank A")),
                String::from("teller1"),
            ),
            (
                test_transaction(TransactionStatus::Failed),
                None,
                String::from("teller1"),
            ),
            (
                test_transaction(TransactionStatus::Reversed),
                Some(String::from("Bank A")),
                String::from("teller2"),
            ),
        ];

        let entries = history_entries(rows);

        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].transaction.status,
            i16::from(TransactionStatus::Successful),
        );
        assert_eq!(entries[0].posted_by, "teller1");
    }

    #[test]
    fn test_deleted_channel_name_is_hidden() {
        assert_eq!(
            visible_channel_name(Some(String::from("Bank A")), Some(UNIX_EPOCH)),
            None,
        );
        assert_eq!(
            visible_channel_name(Some(String::from("Bank A")), None),
            Some(String::from("Bank A")),
        );
        assert_eq!(visible_channel_name(None, None), None);
    }

    #[test]
    fn test_check_postable_rejects_missing_schedule() {
        assert!(matches!(
            check_postable(None),
            Err(PostError::ScheduleNotFound)
        ));
    }

    #[test]
    fn test_check_postable_rejects_settled_schedule() {
        assert!(matches!(
            check_postable(Some(ScheduleStatus::Settled.into())),
            Err(PostError::AlreadySettled)
        ));
    }

    #[test]
    fn test_check_postable_allows_open_and_overdue_schedules() {
        assert!(check_postable(Some(ScheduleStatus::Open.into())).is_ok());
        assert!(check_postable(Some(ScheduleStatus::Overdue.into())).is_ok());
    }
}
