use chrono::Utc;
use log::warn;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::seed::seed_document;
use crate::{
    Database, DatabaseError, IntoDatabaseError, MemoryStorage, NewResetToken, NewSession, NewUser,
    PaymentData, PaymentStatus, ResetTokenData, Result, SessionData, SessionRecord, Storage,
    SubmissionData, UpdatedPayment, UpdatedSubmission, UpdatedUser, UserData,
};

/// The well-known key the whole document lives under
pub const STORE_KEY: &str = "agrigence-db";
/// The well-known key holding the active session token
pub const SESSION_KEY: &str = "agrigence-session";

pub(crate) const SCHEMA_VERSION: u32 = 1;

/// The one persisted document holding every collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoreDocument {
    pub version: u32,
    pub users: Vec<UserData>,
    pub payments: Vec<PaymentData>,
    pub submissions: Vec<SubmissionData>,
    pub sessions: Vec<SessionRecord>,
    pub reset_tokens: Vec<ResetTokenData>,
}

/// A whole-document store implementation for Agrigence.
///
/// Every accessor is one load-mutate-persist cycle over the full
/// document, run under a single lock so callers never interleave.
pub struct DocumentDatabase<S> {
    storage: Mutex<S>,
}

impl<S> DocumentDatabase<S>
where
    S: Storage,
{
    pub fn new(storage: S) -> Result<Self> {
        let db = Self {
            storage: Mutex::new(storage),
        };

        // Seed on first use so reads never come up empty
        db.read(|_| ())?;

        Ok(db)
    }

    /// One whole-document read
    fn read<T>(&self, f: impl FnOnce(&StoreDocument) -> T) -> Result<T> {
        let mut storage = self.storage.lock();
        let document = load(&mut *storage)?;

        Ok(f(&document))
    }

    /// One whole-document read-mutate-write cycle. Nothing is
    /// persisted if the mutation fails.
    fn mutate<T>(&self, f: impl FnOnce(&mut StoreDocument) -> Result<T>) -> Result<T> {
        let mut storage = self.storage.lock();
        let mut document = load(&mut *storage)?;

        let value = f(&mut document)?;
        persist(&mut *storage, &document)?;

        Ok(value)
    }
}

impl DocumentDatabase<MemoryStorage> {
    pub fn in_memory() -> Result<Self> {
        Self::new(MemoryStorage::default())
    }
}

impl<S> Database for DocumentDatabase<S>
where
    S: Storage,
{
    fn user_by_id(&self, user_id: &str) -> Result<UserData> {
        self.read(|document| document.users.iter().find(|u| u.id == user_id).cloned())?
            .ok_or(DatabaseError::not_found("user", "id"))
    }

    fn user_by_email(&self, email: &str) -> Result<UserData> {
        self.read(|document| document.users.iter().find(|u| u.email == email).cloned())?
            .ok_or(DatabaseError::not_found("user", "email"))
    }

    fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.mutate(|document| {
            if document.users.iter().any(|u| u.email == new_user.email) {
                return Err(DatabaseError::Conflict {
                    resource: "user",
                    field: "email",
                    value: new_user.email.clone(),
                });
            }

            // Registration never grants admin rights or a photo,
            // regardless of what the caller supplied
            let user = UserData {
                id: format!("user-{}", Utc::now().timestamp_millis()),
                name: new_user.name,
                email: new_user.email,
                password: new_user.password,
                phone: new_user.phone,
                gender: new_user.gender,
                dob: new_user.dob,
                occupation: new_user.occupation,
                organization: new_user.organization,
                address: new_user.address,
                is_admin: false,
                profile_photo: None,
            };

            document.users.push(user.clone());

            Ok(user)
        })
    }

    fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        self.mutate(|document| {
            let user = document
                .users
                .iter_mut()
                .find(|u| u.id == updated_user.id)
                .ok_or(DatabaseError::not_found("user", "id"))?;

            let merged = UserData {
                id: user.id.clone(),
                email: user.email.clone(),
                is_admin: user.is_admin,
                name: updated_user.name.unwrap_or_else(|| user.name.clone()),
                password: updated_user.password.unwrap_or_else(|| user.password.clone()),
                phone: updated_user.phone.unwrap_or_else(|| user.phone.clone()),
                gender: updated_user.gender.unwrap_or_else(|| user.gender.clone()),
                dob: updated_user.dob.unwrap_or_else(|| user.dob.clone()),
                occupation: updated_user
                    .occupation
                    .unwrap_or_else(|| user.occupation.clone()),
                organization: updated_user
                    .organization
                    .unwrap_or_else(|| user.organization.clone()),
                address: updated_user.address.unwrap_or_else(|| user.address.clone()),
                profile_photo: updated_user
                    .profile_photo
                    .or_else(|| user.profile_photo.clone()),
            };

            *user = merged.clone();

            Ok(merged)
        })
    }

    fn list_members(&self) -> Result<Vec<UserData>> {
        self.read(|document| {
            document
                .users
                .iter()
                .filter(|u| !u.is_admin)
                .cloned()
                .collect()
        })
    }

    fn session_by_token(&self, token: &str) -> Result<SessionData> {
        self.read(|document| {
            document
                .sessions
                .iter()
                .find(|s| s.token == token)
                .and_then(|record| join_session(document, record))
        })?
        .ok_or(DatabaseError::not_found("session", "token"))
    }

    fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let mut storage = self.storage.lock();
        let mut document = load(&mut *storage)?;

        // Sessions must reference an existing user at creation time
        let user = document
            .users
            .iter()
            .find(|u| u.id == new_session.user_id)
            .cloned()
            .ok_or(DatabaseError::not_found("user", "id"))?;

        if document.sessions.iter().any(|s| s.token == new_session.token) {
            return Err(DatabaseError::Conflict {
                resource: "session",
                field: "token",
                value: new_session.token,
            });
        }

        let record = SessionRecord {
            token: new_session.token,
            user_id: new_session.user_id,
            created_at: new_session.created_at,
        };

        document.sessions.push(record.clone());
        persist(&mut *storage, &document)?;
        storage.write(SESSION_KEY, &record.token)?;

        Ok(SessionData {
            token: record.token,
            created_at: record.created_at,
            user,
        })
    }

    fn current_session(&self) -> Result<Option<SessionData>> {
        let mut storage = self.storage.lock();

        let token = match storage.read(SESSION_KEY)? {
            Some(token) => token,
            None => return Ok(None),
        };

        let document = load(&mut *storage)?;

        Ok(document
            .sessions
            .iter()
            .find(|s| s.token == token)
            .and_then(|record| join_session(&document, record)))
    }

    fn clear_session(&self) -> Result<()> {
        let mut storage = self.storage.lock();

        let token = match storage.read(SESSION_KEY)? {
            Some(token) => token,
            None => return Ok(()),
        };

        let mut document = load(&mut *storage)?;
        document.sessions.retain(|s| s.token != token);
        persist(&mut *storage, &document)?;

        storage.remove(SESSION_KEY)
    }

    fn payment_by_user_id(&self, user_id: &str) -> Result<PaymentData> {
        self.read(|document| {
            document
                .payments
                .iter()
                .find(|p| p.user_id == user_id)
                .cloned()
        })?
        .ok_or(DatabaseError::not_found("payment", "user_id"))
    }

    fn update_payment(&self, user_id: &str, updated: UpdatedPayment) -> Result<PaymentData> {
        self.mutate(|document| {
            match document.payments.iter_mut().find(|p| p.user_id == user_id) {
                Some(payment) => {
                    if let Some(status) = updated.status {
                        payment.status = status
                    }
                    if let Some(amount) = updated.amount {
                        payment.amount = amount
                    }
                    if let Some(date) = updated.date {
                        payment.date = date
                    }
                    if let Some(payment_id) = updated.payment_id {
                        payment.payment_id = payment_id
                    }
                    if let Some(method) = updated.method {
                        payment.method = method
                    }
                    if let Some(receipt_number) = updated.receipt_number {
                        payment.receipt_number = receipt_number
                    }
                    if let Some(receipt_path) = updated.receipt_path {
                        payment.receipt_path = receipt_path
                    }

                    Ok(payment.clone())
                }
                None => {
                    let payment = PaymentData {
                        user_id: user_id.to_string(),
                        status: updated.status.unwrap_or(PaymentStatus::Pending),
                        amount: updated.amount.unwrap_or_default(),
                        date: updated.date.unwrap_or_default(),
                        payment_id: updated.payment_id.unwrap_or_default(),
                        method: updated.method.unwrap_or_default(),
                        receipt_number: updated.receipt_number.unwrap_or_default(),
                        receipt_path: updated.receipt_path.unwrap_or_default(),
                    };

                    document.payments.push(payment.clone());

                    Ok(payment)
                }
            }
        })
    }

    fn submission_by_id(&self, submission_id: &str) -> Result<SubmissionData> {
        self.read(|document| {
            document
                .submissions
                .iter()
                .find(|s| s.id == submission_id)
                .cloned()
        })?
        .ok_or(DatabaseError::not_found("submission", "id"))
    }

    fn submissions_by_user_id(&self, user_id: &str) -> Result<Vec<SubmissionData>> {
        self.read(|document| {
            document
                .submissions
                .iter()
                .filter(|s| s.user_id == user_id)
                .cloned()
                .collect()
        })
    }

    fn update_submission(
        &self,
        submission_id: &str,
        updated: UpdatedSubmission,
    ) -> Result<SubmissionData> {
        self.mutate(|document| {
            let submission = document
                .submissions
                .iter_mut()
                .find(|s| s.id == submission_id)
                .ok_or(DatabaseError::not_found("submission", "id"))?;

            if let Some(title) = updated.title {
                submission.title = title
            }
            if let Some(date) = updated.date {
                submission.date = date
            }
            if let Some(status) = updated.status {
                submission.status = status
            }
            if let Some(file_name) = updated.file_name {
                submission.file_name = file_name
            }
            if let Some(file_path) = updated.file_path {
                submission.file_path = file_path
            }
            if let Some(remarks) = updated.remarks {
                submission.remarks = remarks
            }

            Ok(submission.clone())
        })
    }

    fn create_reset_token(&self, new_token: NewResetToken) -> Result<ResetTokenData> {
        self.mutate(|document| {
            if !document.users.iter().any(|u| u.id == new_token.user_id) {
                return Err(DatabaseError::not_found("user", "id"));
            }

            if document
                .reset_tokens
                .iter()
                .any(|t| t.token == new_token.token)
            {
                return Err(DatabaseError::Conflict {
                    resource: "reset token",
                    field: "token",
                    value: new_token.token,
                });
            }

            let data = ResetTokenData {
                token: new_token.token,
                user_id: new_token.user_id,
                expires_at: new_token.expires_at,
            };

            document.reset_tokens.push(data.clone());

            Ok(data)
        })
    }

    fn redeem_reset_token(&self, token: &str) -> Result<ResetTokenData> {
        self.mutate(|document| {
            let position = document
                .reset_tokens
                .iter()
                .position(|t| t.token == token)
                .ok_or(DatabaseError::not_found("reset token", "token"))?;

            let data = document.reset_tokens.remove(position);

            // An expired token is as good as a missing one
            if data.expires_at < Utc::now() {
                return Err(DatabaseError::not_found("reset token", "token"));
            }

            Ok(data)
        })
    }

    fn clear_expired_reset_tokens(&self) -> Result<()> {
        self.mutate(|document| {
            let now = Utc::now();
            document.reset_tokens.retain(|t| t.expires_at > now);

            Ok(())
        })
    }
}

/// Parses the persisted document, reseeding when the key is absent.
/// A document that fails to parse or carries an unknown schema
/// version is discarded and reseeded rather than propagated.
fn load<S>(storage: &mut S) -> Result<StoreDocument>
where
    S: Storage + ?Sized,
{
    let document = storage.read(STORE_KEY)?.and_then(|text| {
        match serde_json::from_str::<StoreDocument>(&text) {
            Ok(document) if document.version == SCHEMA_VERSION => Some(document),
            Ok(document) => {
                warn!(
                    "Discarding store document with unknown schema version {}",
                    document.version
                );
                None
            }
            Err(e) => {
                warn!("Discarding corrupt store document: {}", e);
                None
            }
        }
    });

    match document {
        Some(document) => Ok(document),
        None => {
            let document = seed_document();
            persist(storage, &document)?;

            Ok(document)
        }
    }
}

fn persist<S>(storage: &mut S, document: &StoreDocument) -> Result<()>
where
    S: Storage + ?Sized,
{
    let text = serde_json::to_string(document).map_err(|e| e.any())?;

    storage.write(STORE_KEY, &text)
}

fn join_session(document: &StoreDocument, record: &SessionRecord) -> Option<SessionData> {
    let user = document
        .users
        .iter()
        .find(|u| u.id == record.user_id)?
        .clone();

    Some(SessionData {
        token: record.token.clone(),
        created_at: record.created_at,
        user,
    })
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};

    use super::{DocumentDatabase, STORE_KEY};
    use crate::{
        Database, DatabaseError, MemoryStorage, NewResetToken, NewSession, NewUser, PaymentStatus,
        Storage, SubmissionStatus, UpdatedPayment, UpdatedSubmission, UpdatedUser,
    };

    fn database() -> DocumentDatabase<MemoryStorage> {
        DocumentDatabase::in_memory().expect("database initializes")
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Mary Wanjiku".to_string(),
            email: email.to_string(),
            password: "not-a-real-hash".to_string(),
            phone: "+254 733 000 000".to_string(),
            gender: "Female".to_string(),
            dob: "1992-11-05".to_string(),
            occupation: "Soil Scientist".to_string(),
            organization: "AgriLab".to_string(),
            address: "Eldoret, Kenya".to_string(),
            is_admin: false,
            profile_photo: None,
        }
    }

    fn new_session(token: &str, user_id: &str) -> NewSession {
        NewSession {
            token: token.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn seed_is_written_exactly_once() {
        let db = database();

        // Touch a few accessors, then make sure nothing was duplicated
        db.user_by_email("john@example.com").unwrap();
        db.list_members().unwrap();
        db.submissions_by_user_id("user-001").unwrap();

        let counts = db
            .read(|d| (d.users.len(), d.payments.len(), d.submissions.len()))
            .unwrap();

        assert_eq!(counts, (2, 1, 2));
    }

    #[test]
    fn corrupt_document_is_reseeded() {
        let mut storage = MemoryStorage::default();
        storage.write(STORE_KEY, "{ definitely not json").unwrap();

        let db = DocumentDatabase::new(storage).expect("database initializes");
        let john = db.user_by_email("john@example.com").unwrap();

        assert_eq!(john.id, "user-001");
    }

    #[test]
    fn created_users_are_always_plain_members() {
        let db = database();

        let mut requested = new_user("mary@example.com");
        requested.is_admin = true;
        requested.profile_photo = Some("data:image/png;base64,abcd".to_string());

        let created = db.create_user(requested).unwrap();

        assert!(created.id.starts_with("user-"));
        assert!(!created.is_admin);
        assert_eq!(created.profile_photo, None);
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let db = database();
        let before = db.read(|d| d.users.len()).unwrap();

        let result = db.create_user(new_user("john@example.com"));

        assert!(matches!(result, Err(DatabaseError::Conflict { .. })));
        assert_eq!(db.read(|d| d.users.len()).unwrap(), before);
    }

    #[test]
    fn update_user_merges_fields() {
        let db = database();
        let before = db.user_by_id("user-001").unwrap();

        let updated = db
            .update_user(UpdatedUser {
                id: "user-001".to_string(),
                name: Some("X".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(updated.name, "X");

        let after = db.user_by_id("user-001").unwrap();
        assert_eq!(after.name, "X");
        assert_eq!(after.email, before.email);
        assert_eq!(after.phone, before.phone);
        assert_eq!(after.occupation, before.occupation);
    }

    #[test]
    fn update_user_reports_missing_ids() {
        let db = database();

        let result = db.update_user(UpdatedUser {
            id: "user-nope".to_string(),
            ..Default::default()
        });

        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn members_exclude_admins() {
        let db = database();

        let members = db.list_members().unwrap();

        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, "user-001");
    }

    #[test]
    fn sessions_resolve_through_the_active_slot() {
        let db = database();

        assert!(db.current_session().unwrap().is_none());

        db.create_session(new_session("tok-1", "user-001")).unwrap();

        let current = db.current_session().unwrap().expect("session is active");
        assert_eq!(current.token, "tok-1");
        assert_eq!(current.user.id, "user-001");
    }

    #[test]
    fn sessions_require_an_existing_user() {
        let db = database();

        let result = db.create_session(new_session("tok-1", "user-nope"));

        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
        assert!(db.current_session().unwrap().is_none());
    }

    #[test]
    fn clearing_the_session_deletes_the_record() {
        let db = database();

        db.create_session(new_session("tok-1", "user-001")).unwrap();
        assert_eq!(db.read(|d| d.sessions.len()).unwrap(), 1);

        db.clear_session().unwrap();

        assert!(db.current_session().unwrap().is_none());
        assert_eq!(db.read(|d| d.sessions.len()).unwrap(), 0);

        // Clearing an anonymous context is a no-op
        db.clear_session().unwrap();
    }

    #[test]
    fn payment_updates_merge_in_place() {
        let db = database();
        let before = db.payment_by_user_id("user-001").unwrap();

        let updated = db
            .update_payment(
                "user-001",
                UpdatedPayment {
                    status: Some(PaymentStatus::Refunded),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.status, PaymentStatus::Refunded);
        assert_eq!(updated.amount, before.amount);
        assert_eq!(db.read(|d| d.payments.len()).unwrap(), 1);
    }

    #[test]
    fn payment_updates_create_missing_records() {
        let db = database();
        let mary = db.create_user(new_user("mary@example.com")).unwrap();

        assert!(db.payment_by_user_id(&mary.id).is_err());

        let created = db
            .update_payment(
                &mary.id,
                UpdatedPayment {
                    status: Some(PaymentStatus::Paid),
                    amount: Some("KES 2,000".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(created.user_id, mary.id);
        assert_eq!(created.status, PaymentStatus::Paid);
        assert_eq!(db.read(|d| d.payments.len()).unwrap(), 2);
    }

    #[test]
    fn seeded_submissions_are_in_insertion_order() {
        let db = database();

        let submissions = db.submissions_by_user_id("user-001").unwrap();

        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].status, SubmissionStatus::UnderReview);
        assert_eq!(submissions[1].status, SubmissionStatus::RevisionRequired);
    }

    #[test]
    fn submission_updates_merge_in_place() {
        let db = database();

        let updated = db
            .update_submission(
                "SUB-002",
                UpdatedSubmission {
                    status: Some(SubmissionStatus::UnderReview),
                    remarks: Some("ok".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.status, SubmissionStatus::UnderReview);
        assert_eq!(updated.remarks, "ok");

        let fetched = db.submission_by_id("SUB-002").unwrap();
        assert_eq!(fetched, updated);
    }

    #[test]
    fn reset_tokens_are_single_use() {
        let db = database();

        db.create_reset_token(NewResetToken {
            token: "reset-1".to_string(),
            user_id: "user-001".to_string(),
            expires_at: Utc::now() + Duration::minutes(30),
        })
        .unwrap();

        let redeemed = db.redeem_reset_token("reset-1").unwrap();
        assert_eq!(redeemed.user_id, "user-001");

        let again = db.redeem_reset_token("reset-1");
        assert!(matches!(again, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn expired_reset_tokens_never_redeem() {
        let db = database();

        db.create_reset_token(NewResetToken {
            token: "reset-1".to_string(),
            user_id: "user-001".to_string(),
            expires_at: Utc::now() - Duration::minutes(1),
        })
        .unwrap();

        let result = db.redeem_reset_token("reset-1");
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));

        db.clear_expired_reset_tokens().unwrap();
        assert_eq!(db.read(|d| d.reset_tokens.len()).unwrap(), 0);
    }
}
