//! Serializable types crossing the HTTP boundary.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

// Auth and users

#[derive(Clone, Debug, Deserialize)]
pub struct CredentialPair {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct OutputSession {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub mfa_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct OutputUser {
    pub id: i64,
    pub username: String,
    pub department_id: Option<i64>,
    pub mfa_enabled: bool,
    pub mfa_required: bool,
    pub is_active: bool,
    pub share_code: String,
}

#[derive(Debug, Serialize)]
pub struct OutputUserId {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct InputShareCode {
    pub share_code: String,
}

#[derive(Debug, Serialize)]
pub struct OutputVisitorId {
    pub visitor_id: String,
}

#[derive(Debug, Deserialize)]
pub struct InputBindMfa {
    /// Absent on the first call; the second call carries the code generated
    /// from the provisioned seed.
    pub otp: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OutputMfaEnrollment {
    pub device_id: i64,
    pub otpauth_url: String,
}

#[derive(Debug, Serialize)]
pub struct OutputMfaActivation {
    pub device_id: i64,
    pub recovery_codes: Vec<String>,
}

// Customer intake

#[derive(Clone, Debug, Deserialize)]
pub struct InputApplicationFile {
    pub file_role: String,
    pub storage_url: String,
    pub storage_key: Option<String>,
    pub file_name: String,
    pub mime_type: String,
    pub byte_size: i64,
    pub content_hash: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InputLoanApplication {
    pub applicant_name: String,
    pub applicant_phone: String,
    pub id_number: String,
    pub requested_amount: BigDecimal,
    pub term_days: i32,
    pub share_code: Option<String>,
    #[serde(default)]
    pub files: Vec<InputApplicationFile>,
}

#[derive(Debug, Serialize)]
pub struct OutputApplicationId {
    pub application_id: i64,
}

// Payment channels

#[derive(Clone, Debug, Deserialize)]
pub struct InputPaymentChannel {
    pub code: String,
    pub name: String,
    pub merchant_no: String,
    pub is_enabled: bool,
    pub supports_payout: bool,
    pub supports_collection: bool,
    pub payout_fee_rate: BigDecimal,
    pub payout_fee_fixed: BigDecimal,
    pub collection_fee_rate: BigDecimal,
    pub collection_fee_fixed: BigDecimal,
    pub payout_min: BigDecimal,
    pub payout_max: BigDecimal,
    pub collection_min: BigDecimal,
    pub collection_max: BigDecimal,
    pub settlement_cycle: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct InputPaymentChannelUpdate {
    pub name: Option<String>,
    pub merchant_no: Option<String>,
    pub is_enabled: Option<bool>,
    pub supports_payout: Option<bool>,
    pub supports_collection: Option<bool>,
    pub payout_fee_rate: Option<BigDecimal>,
    pub payout_fee_fixed: Option<BigDecimal>,
    pub collection_fee_rate: Option<BigDecimal>,
    pub collection_fee_fixed: Option<BigDecimal>,
    pub payout_min: Option<BigDecimal>,
    pub payout_max: Option<BigDecimal>,
    pub collection_min: Option<BigDecimal>,
    pub collection_max: Option<BigDecimal>,
    pub settlement_cycle: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    /// "asc" or "desc"; anything else is rejected.
    pub order: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct KeysetQuery {
    pub last_id: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ConditionQuery {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct IdsQuery {
    /// Comma-separated identifiers, e.g. `ids=3,17,40`
    pub ids: String,
}

#[derive(Debug, Serialize)]
pub struct OutputAffected {
    pub affected: usize,
}

// Repayments

#[derive(Clone, Debug, Deserialize)]
pub struct InputPostRepayment {
    pub schedule_id: i64,
    pub channel_id: Option<i64>,
    pub external_order_no: String,
    pub external_ref: Option<String>,
    pub pay_amount: i64,
    pub pay_method: String,
    /// Seconds since the Unix epoch.
    pub paid_at: u64,
    pub alloc_principal: i64,
    pub alloc_interest: i64,
    pub alloc_fee: i64,
    pub alloc_penalty: i64,
    pub otp: String,
    pub voucher_file: Option<String>,
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub schedule_id: i64,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OutputVoucherUpload {
    pub file_name: String,
    pub byte_size: usize,
}

#[derive(Debug, Serialize)]
pub struct OutputVoucher {
    pub file_name: String,
    pub content_b64: String,
}
