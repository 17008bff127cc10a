//! Business result codes carried in the response envelope. Every entity owns
//! a contiguous range; an operation's code is the entity base plus an offset.

pub const SUCCESS: i32 = 0;

pub const RANGE_WIDTH: i32 = 1_000;

pub const DISBURSEMENTS_BASE: i32 = 85_000;
pub const REPAYMENT_SCHEDULES_BASE: i32 = 86_000;
pub const REPAYMENT_TRANSACTIONS_BASE: i32 = 87_000;
pub const PAYMENT_CHANNELS_BASE: i32 = 88_000;

pub const GENERAL_BASE: i32 = 100_000;
pub const AUTH_BASE: i32 = 101_000;
pub const USERS_BASE: i32 = 102_000;
pub const LOAN_APPLICATIONS_BASE: i32 = 103_000;
pub const APPLICATION_FILES_BASE: i32 = 104_000;
pub const MFA_BASE: i32 = 105_000;

pub const OP_CREATE: i32 = 1;
pub const OP_DELETE: i32 = 2;
pub const OP_UPDATE: i32 = 3;
pub const OP_GET: i32 = 4;
pub const OP_LIST: i32 = 5;
pub const OP_BATCH_DELETE: i32 = 6;
pub const OP_QUERY: i32 = 7;
pub const OP_MULTI_GET: i32 = 8;
pub const OP_LIST_BY_LAST_ID: i32 = 9;
pub const OP_VERIFY: i32 = 10;

const RANGES: [(&str, i32); 10] = [
    ("disbursements", DISBURSEMENTS_BASE),
    ("repayment_schedules", REPAYMENT_SCHEDULES_BASE),
    ("repayment_transactions", REPAYMENT_TRANSACTIONS_BASE),
    ("payment_channels", PAYMENT_CHANNELS_BASE),
    ("general", GENERAL_BASE),
    ("auth", AUTH_BASE),
    ("users", USERS_BASE),
    ("loan_applications", LOAN_APPLICATIONS_BASE),
    ("application_files", APPLICATION_FILES_BASE),
    ("mfa", MFA_BASE),
];

/// Panics when any two ranges overlap or a range swallows the success code.
/// Run at startup so a bad base can never ship codes that alias each other.
pub fn assert_disjoint() {
    for (i, (name_a, base_a)) in RANGES.iter().enumerate() {
        assert!(
            SUCCESS < *base_a || SUCCESS >= *base_a + RANGE_WIDTH,
            "Code range '{name_a}' contains the success code",
        );

        for (name_b, base_b) in RANGES.iter().skip(i + 1) {
            let disjoint = *base_a + RANGE_WIDTH <= *base_b || *base_b + RANGE_WIDTH <= *base_a;
            assert!(disjoint, "Code ranges '{name_a}' and '{name_b}' overlap");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_are_disjoint() {
        assert_disjoint();
    }

    // Operation codes are a published contract; clients match on the exact
    // values, so they can never be renumbered.
    #[test]
    fn test_operation_offsets_are_pinned() {
        assert_eq!(OP_CREATE, 1);
        assert_eq!(OP_DELETE, 2);
        assert_eq!(OP_UPDATE, 3);
        assert_eq!(OP_GET, 4);
        assert_eq!(OP_LIST, 5);
        assert_eq!(OP_BATCH_DELETE, 6);
        assert_eq!(OP_QUERY, 7);
        assert_eq!(OP_MULTI_GET, 8);
        assert_eq!(OP_LIST_BY_LAST_ID, 9);
    }

    #[test]
    fn test_offsets_fit_inside_a_range() {
        for offset in [
            OP_CREATE,
            OP_DELETE,
            OP_UPDATE,
            OP_GET,
            OP_LIST,
            OP_BATCH_DELETE,
            OP_QUERY,
            OP_MULTI_GET,
            OP_LIST_BY_LAST_ID,
            OP_VERIFY,
        ] {
            assert!(offset > 0 && offset < RANGE_WIDTH);
        }
    }
}
