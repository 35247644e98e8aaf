use chrono::{DateTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod document;
pub use document::*;

mod storage;
pub use storage::*;

mod seed;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the store
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the store doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

impl DatabaseError {
    fn not_found(resource: &'static str, identifier: &'static str) -> Self {
        Self::NotFound {
            resource,
            identifier,
        }
    }
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn any(self) -> DatabaseError;
}

impl<E> IntoDatabaseError for E
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }
}

/// Represents a type that can fetch and mutate Agrigence membership data
pub trait Database: Send + Sync {
    fn user_by_id(&self, user_id: &str) -> Result<UserData>;
    fn user_by_email(&self, email: &str) -> Result<UserData>;
    fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData>;
    /// All registered users, admins excluded
    fn list_members(&self) -> Result<Vec<UserData>>;

    fn session_by_token(&self, token: &str) -> Result<SessionData>;
    /// Appends the session and points the active-session slot at it
    fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    /// Resolves the active-session slot. An absent slot or a stale
    /// token is an anonymous context, not an error.
    fn current_session(&self) -> Result<Option<SessionData>>;
    /// Clears the active-session slot and deletes its session record
    fn clear_session(&self) -> Result<()>;

    fn payment_by_user_id(&self, user_id: &str) -> Result<PaymentData>;
    /// Merges into the user's payment, creating it first if none exists
    fn update_payment(&self, user_id: &str, updated: UpdatedPayment) -> Result<PaymentData>;

    fn submission_by_id(&self, submission_id: &str) -> Result<SubmissionData>;
    /// A user's submissions in insertion order
    fn submissions_by_user_id(&self, user_id: &str) -> Result<Vec<SubmissionData>>;
    fn update_submission(
        &self,
        submission_id: &str,
        updated: UpdatedSubmission,
    ) -> Result<SubmissionData>;

    fn create_reset_token(&self, new_token: NewResetToken) -> Result<ResetTokenData>;
    /// Returns and deletes the token. Unknown, already-redeemed,
    /// and expired tokens all resolve to NotFound.
    fn redeem_reset_token(&self, token: &str) -> Result<ResetTokenData>;
    fn clear_expired_reset_tokens(&self) -> Result<()>;
}

#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    /// Already hashed by the caller
    pub password: String,
    pub phone: String,
    pub gender: String,
    pub dob: String,
    pub occupation: String,
    pub organization: String,
    pub address: String,
    /// Ignored on create. Registration never grants admin rights.
    pub is_admin: bool,
    /// Ignored on create. Photos are uploaded after registration.
    pub profile_photo: Option<String>,
}

#[derive(Debug, Default)]
pub struct UpdatedUser {
    pub id: String,
    pub name: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<String>,
    pub occupation: Option<String>,
    pub organization: Option<String>,
    pub address: Option<String>,
    pub profile_photo: Option<String>,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct UpdatedPayment {
    pub status: Option<PaymentStatus>,
    pub amount: Option<String>,
    pub date: Option<String>,
    pub payment_id: Option<String>,
    pub method: Option<String>,
    pub receipt_number: Option<String>,
    pub receipt_path: Option<String>,
}

#[derive(Debug, Default)]
pub struct UpdatedSubmission {
    pub title: Option<String>,
    pub date: Option<String>,
    pub status: Option<SubmissionStatus>,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug)]
pub struct NewResetToken {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}
