use argon2::{
    password_hash::Encoding, Argon2, PasswordHash, PasswordVerifier,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::{
    util::{hash_password, random_string, session_token},
    Database, DatabaseError, NewResetToken, NewSession, NewUser, SessionData, UpdatedUser,
    UserData,
};

pub struct Auth<Db> {
    db: Arc<Db>,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not found")]
    UserNotFound,
    #[error("Incorrect password")]
    IncorrectPassword,
    #[error("Email is already registered")]
    EmailTaken,
    #[error("Passwords do not match")]
    PasswordMismatch,
    /// One of the identity factors didn't match the stored record
    #[error("Verification details do not match our records")]
    VerificationFailed,
    #[error("Reset token is invalid or has expired")]
    InvalidResetToken,
    /// Something else went wrong with the store
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl<Db> Auth<Db>
where
    Db: Database,
{
    const RESET_TOKEN_DURATION_IN_MINUTES: usize = 30;

    pub fn new(db: &Arc<Db>) -> Self {
        Self {
            db: db.clone(),
            argon: Argon2::default(),
        }
    }

    /// Logs a user in, making the new session the active one
    pub fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        self.clear_expired();

        let user = self
            .db
            .user_by_email(&credentials.email)
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => AuthError::UserNotFound,
                err => AuthError::Db(err),
            })?;

        self.verify_password(&credentials.password, &user)?;

        let new_session = NewSession {
            token: session_token(),
            user_id: user.id,
            created_at: Utc::now(),
        };

        self.db.create_session(new_session).map_err(AuthError::Db)
    }

    /// Ends the active session, if there is one
    pub fn logout(&self) -> Result<(), DatabaseError> {
        self.db.clear_session()
    }

    /// Creates a member account. Never grants admin rights.
    pub fn register(&self, registration: Registration) -> Result<UserData, AuthError> {
        match self.db.user_by_email(&registration.email) {
            Ok(_) => return Err(AuthError::EmailTaken),
            Err(DatabaseError::NotFound { .. }) => {}
            Err(e) => return Err(AuthError::Db(e)),
        }

        if registration.password != registration.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let hashed_password = hash_password(&self.argon, &registration.password)
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.db
            .create_user(NewUser {
                name: registration.name,
                email: registration.email,
                password: hashed_password,
                phone: registration.phone,
                gender: registration.gender,
                dob: registration.dob,
                occupation: registration.occupation,
                organization: registration.organization,
                address: registration.address,
                is_admin: false,
                profile_photo: None,
            })
            .map_err(|e| match e {
                DatabaseError::Conflict { .. } => AuthError::EmailTaken,
                e => AuthError::Db(e),
            })
    }

    /// Resolves the identity behind the active session
    pub fn current_identity(&self) -> Result<Identity, DatabaseError> {
        let session = self.db.current_session()?;

        Ok(match session {
            Some(session) if session.user.is_admin => Identity::Admin(session.user),
            Some(session) => Identity::Member(session.user),
            None => Identity::Anonymous,
        })
    }

    /// Returns a session if it exists
    pub fn session(&self, token: &str) -> Result<SessionData, DatabaseError> {
        self.db.session_by_token(token)
    }

    /// Verifies the account's identity factors and issues a single-use
    /// reset token. No session is created; handing the token to a
    /// delivery channel is the caller's job.
    pub fn begin_password_reset(
        &self,
        email: &str,
        factors: ResetFactors,
    ) -> Result<PasswordReset, AuthError> {
        self.clear_expired();

        let user = self.db.user_by_email(email).map_err(|e| match e {
            DatabaseError::NotFound { .. } => AuthError::UserNotFound,
            err => AuthError::Db(err),
        })?;

        let verified = user.phone == factors.phone
            && user.dob == factors.dob
            && user.occupation == factors.occupation;

        if !verified {
            return Err(AuthError::VerificationFailed);
        }

        let expires_at =
            Utc::now() + Duration::minutes(Self::RESET_TOKEN_DURATION_IN_MINUTES as i64);

        let token = self
            .db
            .create_reset_token(NewResetToken {
                token: random_string(32),
                user_id: user.id.clone(),
                expires_at,
            })
            .map_err(AuthError::Db)?;

        Ok(PasswordReset {
            token: token.token,
            user,
        })
    }

    /// Redeems a reset token and overwrites the account's password
    pub fn reset_password(&self, token: &str, new_password: &str) -> Result<UserData, AuthError> {
        let reset = self.db.redeem_reset_token(token).map_err(|e| match e {
            DatabaseError::NotFound { .. } => AuthError::InvalidResetToken,
            err => AuthError::Db(err),
        })?;

        self.overwrite_password(&reset.user_id, new_password)
    }

    /// Overwrites the account's password after verifying the current one
    pub fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<UserData, AuthError> {
        let user = self.db.user_by_id(user_id).map_err(|e| match e {
            DatabaseError::NotFound { .. } => AuthError::UserNotFound,
            err => AuthError::Db(err),
        })?;

        self.verify_password(current_password, &user)?;
        self.overwrite_password(user_id, new_password)
    }

    /// Updates a user's profile fields
    pub fn update_profile(&self, updated_user: UpdatedUser) -> Result<UserData, DatabaseError> {
        self.db.update_user(updated_user)
    }

    fn verify_password(&self, password: &str, user: &UserData) -> Result<(), AuthError> {
        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::IncorrectPassword)
    }

    fn overwrite_password(&self, user_id: &str, new_password: &str) -> Result<UserData, AuthError> {
        let hashed_password = hash_password(&self.argon, new_password)
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.db
            .update_user(UpdatedUser {
                id: user_id.to_string(),
                password: Some(hashed_password),
                ..Default::default()
            })
            .map_err(AuthError::Db)
    }

    fn clear_expired(&self) {
        self.db
            .clear_expired_reset_tokens()
            .expect("expired reset tokens are cleared")
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub phone: String,
    pub gender: String,
    pub dob: String,
    pub occupation: String,
    pub organization: String,
    pub address: String,
}

/// The identity factors checked before a password reset is issued
#[derive(Debug)]
pub struct ResetFactors {
    pub phone: String,
    pub dob: String,
    pub occupation: String,
}

/// A verified reset request, carrying the token a delivery channel
/// would send to the account owner
#[derive(Debug)]
pub struct PasswordReset {
    pub token: String,
    pub user: UserData,
}

/// The resolved identity of the calling context
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    Member(UserData),
    Admin(UserData),
}

impl Identity {
    pub fn user(&self) -> Option<&UserData> {
        match self {
            Identity::Anonymous => None,
            Identity::Member(user) | Identity::Admin(user) => Some(user),
        }
    }
}

/// A page access requirement. Gates only decide; acting on a denial
/// (usually a redirect) is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Only anonymous visitors, e.g. the login and register pages
    Guest,
    /// Any logged-in account
    Member,
    /// Admin accounts only
    Admin,
}

#[derive(Debug, Error)]
#[error("{gate:?} access is required")]
pub struct GateDenied {
    pub gate: Gate,
}

impl Gate {
    pub fn allows(&self, identity: &Identity) -> bool {
        match self {
            Gate::Guest => matches!(identity, Identity::Anonymous),
            Gate::Member => !matches!(identity, Identity::Anonymous),
            Gate::Admin => matches!(identity, Identity::Admin(_)),
        }
    }

    pub fn check(&self, identity: &Identity) -> Result<(), GateDenied> {
        if self.allows(identity) {
            Ok(())
        } else {
            Err(GateDenied { gate: *self })
        }
    }
}
