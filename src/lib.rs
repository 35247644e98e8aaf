mod auth;
mod db;
mod logging;
mod util;

use std::sync::Arc;

pub use auth::*;
pub use db::*;
pub use logging::init_logger;
pub use util::random_string;

/// The Agrigence membership system, facilitating accounts, payments,
/// and article submissions for the journal.
pub struct Agrigence<Db> {
    database: Arc<Db>,

    pub auth: Auth<Db>,
}

impl<Db> Agrigence<Db>
where
    Db: Database,
{
    pub fn new(database: Db) -> Self {
        let database = Arc::new(database);
        let auth = Auth::new(&database);

        Self { database, auth }
    }

    /// All registered members, admins excluded
    pub fn members(&self) -> Result<Vec<UserData>> {
        self.database.list_members()
    }

    pub fn profile(&self, user_id: &str) -> Result<UserData> {
        self.database.user_by_id(user_id)
    }

    pub fn payment_for(&self, user_id: &str) -> Result<PaymentData> {
        self.database.payment_by_user_id(user_id)
    }

    /// Records or amends a member's payment
    pub fn record_payment(&self, user_id: &str, updated: UpdatedPayment) -> Result<PaymentData> {
        self.database.update_payment(user_id, updated)
    }

    pub fn submission(&self, submission_id: &str) -> Result<SubmissionData> {
        self.database.submission_by_id(submission_id)
    }

    pub fn submissions_for(&self, user_id: &str) -> Result<Vec<SubmissionData>> {
        self.database.submissions_by_user_id(user_id)
    }

    /// Applies editorial or re-upload changes to a submission
    pub fn update_submission(
        &self,
        submission_id: &str,
        updated: UpdatedSubmission,
    ) -> Result<SubmissionData> {
        self.database.update_submission(submission_id, updated)
    }
}

impl Agrigence<DocumentDatabase<FileStorage>> {
    /// Opens the store in the directory named by AGRIGENCE_DATA_DIR,
    /// falling back to the default data directory
    pub fn from_env() -> Result<Self> {
        let database = DocumentDatabase::new(FileStorage::from_env()?)?;

        Ok(Self::new(database))
    }
}

#[cfg(test)]
mod test {
    use super::{Agrigence, DocumentDatabase, PaymentStatus, UpdatedPayment};

    #[test]
    fn facade_wires_auth_and_content_together() {
        let system = Agrigence::new(DocumentDatabase::in_memory().expect("database initializes"));

        let session = system
            .auth
            .login(crate::Credentials {
                email: "john@example.com".to_string(),
                password: "user123".to_string(),
            })
            .expect("seeded member logs in");

        let submissions = system.submissions_for(&session.user.id).unwrap();
        assert_eq!(submissions.len(), 2);

        let payment = system
            .record_payment(
                &session.user.id,
                UpdatedPayment {
                    status: Some(PaymentStatus::Refunded),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Refunded);
        assert_eq!(
            system.payment_for(&session.user.id).unwrap().status,
            PaymentStatus::Refunded
        );
    }
}
