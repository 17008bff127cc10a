diesel::table! {
    application_files (id) {
        id -> Int8,
        application_id -> Int8,
        file_role -> Varchar,
        storage_url -> Varchar,
        storage_key -> Nullable<Varchar>,
        file_name -> Varchar,
        mime_type -> Varchar,
        byte_size -> Int8,
        content_hash -> Nullable<Varchar>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        deleted_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    disbursements (id) {
        id -> Int8,
        application_id -> Int8,
        gross_amount -> Numeric,
        net_amount -> Numeric,
        status -> Int2,
        auditor_user_id -> Nullable<Int8>,
        audited_at -> Nullable<Timestamp>,
        channel_id -> Nullable<Int8>,
        payout_order_no -> Nullable<Varchar>,
        disbursed_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        deleted_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    loan_applications (id) {
        id -> Int8,
        applicant_name -> Varchar,
        applicant_phone -> Varchar,
        id_number -> Varchar,
        requested_amount -> Numeric,
        term_days -> Int4,
        audit_status -> Int2,
        share_code -> Nullable<Varchar>,
        client_addr -> Nullable<Varchar>,
        risk_state -> Int2,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        deleted_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    login_audits (id) {
        id -> Int8,
        user_id -> Nullable<Int8>,
        audit_type -> Varchar,
        client_addr -> Varchar,
        user_agent -> Varchar,
        succeeded -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    mfa_devices (id) {
        id -> Int8,
        user_id -> Int8,
        device_type -> Varchar,
        display_name -> Varchar,
        seed_encrypted -> Bytea,
        is_primary -> Bool,
        is_active -> Bool,
        last_used_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        deleted_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    mfa_recovery_codes (id) {
        id -> Int8,
        user_id -> Int8,
        code_hash -> Varchar,
        redeemed_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        deleted_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    payment_channels (id) {
        id -> Int8,
        code -> Varchar,
        name -> Varchar,
        merchant_no -> Varchar,
        is_enabled -> Bool,
        supports_payout -> Bool,
        supports_collection -> Bool,
        payout_fee_rate -> Numeric,
        payout_fee_fixed -> Numeric,
        collection_fee_rate -> Numeric,
        collection_fee_fixed -> Numeric,
        payout_min -> Numeric,
        payout_max -> Numeric,
        collection_min -> Numeric,
        collection_max -> Numeric,
        settlement_cycle -> Varchar,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        deleted_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    referral_visits (id) {
        id -> Int8,
        share_code -> Varchar,
        visitor_id -> Varchar,
        visit_count -> Int4,
        first_seen_at -> Timestamp,
        last_seen_at -> Timestamp,
    }
}

diesel::table! {
    repayment_schedules (id) {
        id -> Int8,
        disbursement_id -> Int8,
        installment_no -> Int4,
        due_date -> Date,
        principal_due -> Int8,
        interest_due -> Int8,
        fee_due -> Int8,
        penalty_due -> Int8,
        total_due -> Int8,
        paid_principal -> Int8,
        paid_interest -> Int8,
        paid_fee -> Int8,
        paid_penalty -> Int8,
        paid_total -> Int8,
        status -> Int2,
        last_paid_at -> Nullable<Timestamp>,
        settled_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        deleted_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    repayment_transactions (id) {
        id -> Int8,
        schedule_id -> Nullable<Int8>,
        channel_id -> Nullable<Int8>,
        external_order_no -> Varchar,
        external_ref -> Nullable<Varchar>,
        pay_amount -> Int8,
        pay_method -> Varchar,
        paid_at -> Timestamp,
        alloc_principal -> Int8,
        alloc_interest -> Int8,
        alloc_fee -> Int8,
        alloc_penalty -> Int8,
        status -> Int2,
        voucher_file -> Nullable<Varchar>,
        remark -> Nullable<Varchar>,
        created_by -> Int8,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        deleted_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    users (id) {
        id -> Int8,
        username -> Varchar,
        password_hash -> Varchar,
        department_id -> Nullable<Int8>,
        mfa_enabled -> Bool,
        mfa_required -> Bool,
        is_active -> Bool,
        share_code -> Varchar,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        deleted_at -> Nullable<Timestamp>,
    }
}

diesel::joinable!(application_files -> loan_applications (application_id));
diesel::joinable!(disbursements -> loan_applications (application_id));
diesel::joinable!(disbursements -> payment_channels (channel_id));
diesel::joinable!(login_audits -> users (user_id));
diesel::joinable!(mfa_devices -> users (user_id));
diesel::joinable!(mfa_recovery_codes -> users (user_id));
diesel::joinable!(repayment_schedules -> disbursements (disbursement_id));
diesel::joinable!(repayment_transactions -> payment_channels (channel_id));
diesel::joinable!(repayment_transactions -> repayment_schedules (schedule_id));
diesel::joinable!(repayment_transactions -> users (created_by));

diesel::allow_tables_to_appear_in_same_query!(
    application_files,
    disbursements,
    loan_applications,
    login_audits,
    mfa_devices,
    mfa_recovery_codes,
    payment_channels,
    referral_visits,
    repayment_schedules,
    repayment_transactions,
    users,
);
