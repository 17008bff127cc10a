use diesel::{dsl, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use std::time::SystemTime;

use crate::db::{DaoError, DbThreadPool};
use crate::models::login_audit::NewLoginAudit;
use crate::models::mfa_device::{MfaDevice, NewMfaDevice};
use crate::models::mfa_recovery_code::NewMfaRecoveryCode;
use crate::models::referral_visit::NewReferralVisit;
use crate::models::user::{NewUser, User};
use crate::schema::login_audits::dsl::login_audits;
use crate::schema::mfa_devices as mfa_device_fields;
use crate::schema::mfa_devices::dsl::mfa_devices;
use crate::schema::mfa_recovery_codes as recovery_code_fields;
use crate::schema::mfa_recovery_codes::dsl::mfa_recovery_codes;
use crate::schema::referral_visits as referral_visit_fields;
use crate::schema::referral_visits::dsl::referral_visits;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<User, DaoError> {
        Ok(users
            .filter(user_fields::username.eq(username))
            .filter(user_fields::deleted_at.is_null())
            .first::<User>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_user_by_id(&self, user_id: i64) -> Result<User, DaoError> {
        Ok(users
            .find(user_id)
            .filter(user_fields::deleted_at.is_null())
            .first::<User>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn username_in_use(&self, username: &str) -> Result<bool, DaoError> {
        Ok(dsl::select(dsl::exists(
            users
                .filter(user_fields::username.eq(username))
                .filter(user_fields::deleted_at.is_null()),
        ))
        .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        share_code: &str,
    ) -> Result<i64, DaoError> {
        let now = SystemTime::now();

        let new_user = NewUser {
            username,
            password_hash,
            department_id: None,
            mfa_enabled: false,
            mfa_required: false,
            is_active: true,
            share_code,
            created_at: now,
            updated_at: now,
        };

        Ok(dsl::insert_into(users)
            .values(&new_user)
            .returning(user_fields::id)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    pub fn record_login_audit(
        &self,
        user_id: Option<i64>,
        audit_type: &str,
        client_addr: &str,
        user_agent: &str,
        succeeded: bool,
    ) -> Result<(), DaoError> {
        let new_audit = NewLoginAudit {
            user_id,
            audit_type,
            client_addr,
            user_agent,
            succeeded,
            created_at: SystemTime::now(),
        };

        dsl::insert_into(login_audits)
            .values(&new_audit)
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    /// The device OTPs are checked against. At most one row can match because
    /// activation demotes any previous primary device.
    pub fn get_primary_active_device(
        &self,
        user_id: i64,
    ) -> Result<Option<MfaDevice>, DaoError> {
        Ok(mfa_devices
            .filter(mfa_device_fields::user_id.eq(user_id))
            .filter(mfa_device_fields::is_primary.eq(true))
            .filter(mfa_device_fields::is_active.eq(true))
            .filter(mfa_device_fields::deleted_at.is_null())
            .first::<MfaDevice>(&mut self.db_thread_pool.get()?)
            .optional()?)
    }

    pub fn touch_device_last_used(&self, device_id: i64) -> Result<(), DaoError> {
        let now = SystemTime::now();

        dsl::update(mfa_devices.find(device_id))
            .set((
                mfa_device_fields::last_used_at.eq(now),
                mfa_device_fields::updated_at.eq(now),
            ))
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    pub fn get_pending_device(&self, user_id: i64) -> Result<Option<MfaDevice>, DaoError> {
        Ok(mfa_devices
            .filter(mfa_device_fields::user_id.eq(user_id))
            .filter(mfa_device_fields::is_active.eq(false))
            .filter(mfa_device_fields::deleted_at.is_null())
            .order(mfa_device_fields::created_at.desc())
            .first::<MfaDevice>(&mut self.db_thread_pool.get()?)
            .optional()?)
    }

    /// Replaces any earlier pending enrollment so a retry always verifies
    /// against the seed that was most recently provisioned.
    pub fn create_pending_device(
        &self,
        user_id: i64,
        device_type: &str,
        display_name: &str,
        seed_encrypted: &[u8],
    ) -> Result<i64, DaoError> {
        let now = SystemTime::now();

        let new_device = NewMfaDevice {
            user_id,
            device_type,
            display_name,
            seed_encrypted,
            is_primary: false,
            is_active: false,
            created_at: now,
            updated_at: now,
        };

        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                dsl::update(
                    mfa_devices
                        .filter(mfa_device_fields::user_id.eq(user_id))
                        .filter(mfa_device_fields::is_active.eq(false))
                        .filter(mfa_device_fields::deleted_at.is_null()),
                )
                .set((
                    mfa_device_fields::deleted_at.eq(now),
                    mfa_device_fields::updated_at.eq(now),
                ))
                .execute(conn)?;

                dsl::insert_into(mfa_devices)
                    .values(&new_device)
                    .returning(mfa_device_fields::id)
                    .get_result(conn)
            })
            .map_err(DaoError::from)
    }

    /// Promotes a verified pending device to the user's primary authenticator
    /// and rotates the recovery codes in the same transaction.
    pub fn activate_device(
        &self,
        user_id: i64,
        device_id: i64,
        recovery_code_hashes: &[String],
    ) -> Result<(), DaoError> {
        let now = SystemTime::now();

        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                dsl::update(
                    mfa_devices
                        .filter(mfa_device_fields::user_id.eq(user_id))
                        .filter(mfa_device_fields::is_primary.eq(true)),
                )
                .set((
                    mfa_device_fields::is_primary.eq(false),
                    mfa_device_fields::updated_at.eq(now),
                ))
                .execute(conn)?;

                dsl::update(mfa_devices.find(device_id))
                    .set((
                        mfa_device_fields::is_primary.eq(true),
                        mfa_device_fields::is_active.eq(true),
                        mfa_device_fields::updated_at.eq(now),
                    ))
                    .execute(conn)?;

                dsl::update(users.find(user_id))
                    .set((
                        user_fields::mfa_enabled.eq(true),
                        user_fields::updated_at.eq(now),
                    ))
                    .execute(conn)?;

                dsl::update(
                    mfa_recovery_codes
                        .filter(recovery_code_fields::user_id.eq(user_id))
                        .filter(recovery_code_fields::deleted_at.is_null()),
                )
                .set((
                    recovery_code_fields::deleted_at.eq(now),
                    recovery_code_fields::updated_at.eq(now),
                ))
                .execute(conn)?;

                for code_hash in recovery_code_hashes {
                    let new_code = NewMfaRecoveryCode {
                        user_id,
                        code_hash,
                        created_at: now,
                        updated_at: now,
                    };

                    dsl::insert_into(mfa_recovery_codes)
                        .values(&new_code)
                        .execute(conn)?;
                }

                Ok(())
            })
            .map_err(DaoError::from)
    }

    /// Marks one unredeemed recovery code as used. Returns false when no row
    /// matched, so a code can never be redeemed twice.
    pub fn redeem_recovery_code(&self, user_id: i64, code_hash: &str) -> Result<bool, DaoError> {
        let now = SystemTime::now();

        let affected = dsl::update(
            mfa_recovery_codes
                .filter(recovery_code_fields::user_id.eq(user_id))
                .filter(recovery_code_fields::code_hash.eq(code_hash))
                .filter(recovery_code_fields::redeemed_at.is_null())
                .filter(recovery_code_fields::deleted_at.is_null()),
        )
        .set((
            recovery_code_fields::redeemed_at.eq(now),
            recovery_code_fields::updated_at.eq(now),
        ))
        .execute(&mut self.db_thread_pool.get()?)?;

        Ok(affected > 0)
    }

    pub fn record_visit(&self, share_code: &str, visitor_id: &str) -> Result<(), DaoError> {
        let now = SystemTime::now();

        let new_visit = NewReferralVisit {
            share_code,
            visitor_id,
            visit_count: 1,
            first_seen_at: now,
            last_seen_at: now,
        };

        dsl::insert_into(referral_visits)
            .values(&new_visit)
            .on_conflict((
                referral_visit_fields::share_code,
                referral_visit_fields::visitor_id,
            ))
            .do_update()
            .set((
                referral_visit_fields::visit_count
                    .eq(referral_visit_fields::visit_count + 1),
                referral_visit_fields::last_seen_at.eq(now),
            ))
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }
}
