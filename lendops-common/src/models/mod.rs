pub mod application_file;
pub mod disbursement;
pub mod loan_application;
pub mod login_audit;
pub mod mfa_device;
pub mod mfa_recovery_code;
pub mod payment_channel;
pub mod referral_visit;
pub mod repayment_schedule;
pub mod repayment_transaction;
pub mod user;
