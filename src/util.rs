use argon2::{
    password_hash::{self, SaltString},
    Argon2, PasswordHasher,
};
use chrono::Utc;
use rand::{distributions::Alphanumeric, rngs::OsRng, thread_rng, Rng};

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

/// Hashes a password into its PHC string form
pub(crate) fn hash_password(
    argon: &Argon2<'_>,
    password: &str,
) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);

    Ok(argon.hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Session tokens carry a time component and a random component
pub(crate) fn session_token() -> String {
    format!("{}-{}", Utc::now().timestamp_millis(), random_string(24))
}
