use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl};
use std::time::SystemTime;

use crate::db::{DaoError, DbThreadPool};
use crate::models::application_file::{ApplicationFile, NewApplicationFile};
use crate::models::loan_application::{AuditStatus, LoanApplication, NewLoanApplication};
use crate::schema::application_files as application_file_fields;
use crate::schema::application_files::dsl::application_files;
use crate::schema::loan_applications as loan_application_fields;
use crate::schema::loan_applications::dsl::loan_applications;

/// Metadata for one document accompanying an intake submission.
pub struct FileAttachment<'a> {
    pub file_role: &'a str,
    pub storage_url: &'a str,
    pub storage_key: Option<&'a str>,
    pub file_name: &'a str,
    pub mime_type: &'a str,
    pub byte_size: i64,
    pub content_hash: Option<&'a str>,
}

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    /// Inserts the application and its documents in one transaction so a
    /// failed file insert never leaves an orphaned application behind.
    pub fn create_application(
        &self,
        new_application: &NewLoanApplication,
        attachments: &[FileAttachment],
    ) -> Result<i64, DaoError> {
        let now = SystemTime::now();

        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let application_id = dsl::insert_into(loan_applications)
                    .values(new_application)
                    .returning(loan_application_fields::id)
                    .get_result::<i64>(conn)?;

                for attachment in attachments {
                    let new_file = NewApplicationFile {
                        application_id,
                        file_role: attachment.file_role,
                        storage_url: attachment.storage_url,
                        storage_key: attachment.storage_key,
                        file_name: attachment.file_name,
                        mime_type: attachment.mime_type,
                        byte_size: attachment.byte_size,
                        content_hash: attachment.content_hash,
                        created_at: now,
                        updated_at: now,
                    };

                    dsl::insert_into(application_files)
                        .values(&new_file)
                        .execute(conn)?;
                }

                Ok(application_id)
            })
            .map_err(DaoError::from)
    }

    pub fn get_application(&self, application_id: i64) -> Result<LoanApplication, DaoError> {
        Ok(loan_applications
            .find(application_id)
            .filter(loan_application_fields::deleted_at.is_null())
            .first::<LoanApplication>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_application_files(
        &self,
        application_id: i64,
    ) -> Result<Vec<ApplicationFile>, DaoError> {
        Ok(application_files
            .filter(application_file_fields::application_id.eq(application_id))
            .filter(application_file_fields::deleted_at.is_null())
            .order(application_file_fields::id.asc())
            .load::<ApplicationFile>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn set_audit_status(
        &self,
        application_id: i64,
        status: AuditStatus,
    ) -> Result<(), DaoError> {
        let affected = dsl::update(
            loan_applications
                .find(application_id)
                .filter(loan_application_fields::deleted_at.is_null()),
        )
        .set((
            loan_application_fields::audit_status.eq(i16::from(status)),
            loan_application_fields::updated_at.eq(SystemTime::now()),
        ))
        .execute(&mut self.db_thread_pool.get()?)?;

        if affected == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        Ok(())
    }
}
