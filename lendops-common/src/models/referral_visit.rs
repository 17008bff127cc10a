use diesel::{Insertable, Queryable};
use std::time::SystemTime;

use crate::schema::referral_visits;

#[derive(Clone, Debug, Identifiable, Queryable)]
#[diesel(table_name = referral_visits)]
pub struct ReferralVisit {
    pub id: i64,
    pub share_code: String,
    pub visitor_id: String,
    pub visit_count: i32,

    pub first_seen_at: SystemTime,
    pub last_seen_at: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = referral_visits)]
pub struct NewReferralVisit<'a> {
    pub share_code: &'a str,
    pub visitor_id: &'a str,
    pub visit_count: i32,

    pub first_seen_at: SystemTime,
    pub last_seen_at: SystemTime,
}
