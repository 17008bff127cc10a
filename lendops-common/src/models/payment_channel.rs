use bigdecimal::BigDecimal;
use diesel::{AsChangeset, Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::schema::payment_channels;

/// Fee rates are canonical as fixed-point decimals. Callers working in basis
/// points convert before they reach this type.
#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = payment_channels)]
pub struct PaymentChannel {
    pub id: i64,
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

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub deleted_at: Option<SystemTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payment_channels)]
pub struct NewPaymentChannel<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub merchant_no: &'a str,
    pub is_enabled: bool,
    pub supports_payout: bool,
    pub supports_collection: bool,
    pub payout_fee_rate: &'a BigDecimal,
    pub payout_fee_fixed: &'a BigDecimal,
    pub collection_fee_rate: &'a BigDecimal,
    pub collection_fee_fixed: &'a BigDecimal,
    pub payout_min: &'a BigDecimal,
    pub payout_max: &'a BigDecimal,
    pub collection_min: &'a BigDecimal,
    pub collection_max: &'a BigDecimal,
    pub settlement_cycle: &'a str,

    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

/// Partial update by identifier. `None` fields are left untouched.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = payment_channels)]
pub struct PaymentChannelChanges<'a> {
    pub name: Option<&'a str>,
    pub merchant_no: Option<&'a str>,
    pub is_enabled: Option<bool>,
    pub supports_payout: Option<bool>,
    pub supports_collection: Option<bool>,
    pub payout_fee_rate: Option<&'a BigDecimal>,
    pub payout_fee_fixed: Option<&'a BigDecimal>,
    pub collection_fee_rate: Option<&'a BigDecimal>,
    pub collection_fee_fixed: Option<&'a BigDecimal>,
    pub payout_min: Option<&'a BigDecimal>,
    pub payout_max: Option<&'a BigDecimal>,
    pub collection_min: Option<&'a BigDecimal>,
    pub collection_max: Option<&'a BigDecimal>,
    pub settlement_cycle: Option<&'a str>,

    pub updated_at: Option<SystemTime>,
}
