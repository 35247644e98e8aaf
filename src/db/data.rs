use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An Agrigence member account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    pub name: String,
    /// Unique across the store, compared as stored
    pub email: String,
    /// The argon2 PHC string, never a plaintext password
    pub password: String,
    pub phone: String,
    pub gender: String,
    pub dob: String,
    pub occupation: String,
    pub organization: String,
    pub address: String,
    pub is_admin: bool,
    /// Data-URL of the uploaded photo, if any
    pub profile_photo: Option<String>,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    /// The session token, or key if you will
    pub token: String,
    pub created_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

/// The persisted form of a session, referencing its user by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// A membership payment. At most one exists per user,
/// keyed by the user id rather than a surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentData {
    pub user_id: String,
    pub status: PaymentStatus,
    /// Display amount, e.g. "KES 2,000"
    pub amount: String,
    pub date: String,
    pub payment_id: String,
    pub method: String,
    pub receipt_number: String,
    pub receipt_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

/// An article submitted for review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionData {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub date: String,
    pub status: SubmissionStatus,
    pub file_name: String,
    pub file_path: String,
    /// Editorial remarks shown to the author
    pub remarks: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[serde(rename = "Under Review")]
    UnderReview,
    #[serde(rename = "Revision Required")]
    RevisionRequired,
    Accepted,
    Rejected,
}

/// A single-use password reset token, handed to a delivery
/// channel by the caller and redeemed exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetTokenData {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}
