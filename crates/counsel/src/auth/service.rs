use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::booking::domain::{CounselorProfile, CounselorRecord};
use crate::store::{CounselStore, Entity, StoreError};

use super::jwt::JwtKeys;
use super::password::{hash_password, verify_password};
use super::AuthError;

/// Counselor account management and login.
pub struct AuthService<S> {
    store: Arc<S>,
    keys: JwtKeys,
    hasher: fn(&str) -> String,
}

/// A successful login: the bearer token plus the counselor it identifies.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub counselor: CounselorProfile,
}

#[derive(Debug, Clone)]
pub struct NewCounselor {
    pub full_name: String,
    pub email: String,
    pub employee_id: String,
    pub specialization: String,
    pub password: String,
}

impl<S> AuthService<S>
where
    S: CounselStore + 'static,
{
    pub fn new(store: Arc<S>, keys: JwtKeys) -> Self {
        Self {
            store,
            keys,
            hasher: hash_password,
        }
    }

    /// Tests swap in a cheap hasher; the verify path reads the iteration
    /// count out of the stored hash either way.
    #[cfg(test)]
    pub(crate) fn with_hasher(store: Arc<S>, keys: JwtKeys, hasher: fn(&str) -> String) -> Self {
        Self {
            store,
            keys,
            hasher,
        }
    }

    pub fn keys(&self) -> JwtKeys {
        self.keys.clone()
    }

    /// Verify credentials and issue a session token. Unknown email and wrong
    /// password collapse into one error so login probes learn nothing.
    pub fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let counselor = self
            .store
            .fetch_counselor_by_email(email)
            .map_err(AuthError::Store)?
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, &counselor.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        let token = self.keys.issue(&counselor.counselor_id, &counselor.email)?;
        tracing::info!(counselor_id = %counselor.counselor_id, "counselor logged in");
        Ok(LoginOutcome {
            token,
            counselor: counselor.profile(),
        })
    }

    pub fn create_counselor(&self, new: NewCounselor) -> Result<CounselorProfile, AuthError> {
        let record = CounselorRecord {
            counselor_id: Uuid::new_v4().to_string(),
            full_name: new.full_name,
            email: new.email,
            employee_id: new.employee_id,
            specialization: new.specialization,
            password_hash: (self.hasher)(&new.password),
            created_at: Utc::now(),
        };
        self.store
            .insert_counselor(&record)
            .map_err(AuthError::Store)?;
        tracing::info!(counselor_id = %record.counselor_id, "counselor account created");
        Ok(record.profile())
    }

    pub fn list_counselors(&self) -> Result<Vec<CounselorProfile>, AuthError> {
        let counselors = self.store.list_counselors().map_err(AuthError::Store)?;
        Ok(counselors.iter().map(CounselorRecord::profile).collect())
    }

    pub fn delete_counselor(&self, counselor_id: &str) -> Result<(), AuthError> {
        self.store
            .fetch_counselor(counselor_id)
            .map_err(AuthError::Store)?
            .ok_or(AuthError::Store(StoreError::NotFound(Entity::Counselor)))?;
        self.store
            .delete_counselor(counselor_id)
            .map_err(AuthError::Store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ConflictKind, MemoryStore};

    fn service() -> AuthService<MemoryStore> {
        AuthService::with_hasher(
            Arc::new(MemoryStore::new()),
            JwtKeys::new("test-secret", 60),
            |password| crate::auth::password::hash_with_iterations(password, 1_000),
        )
    }

    fn new_counselor(email: &str) -> NewCounselor {
        NewCounselor {
            full_name: "Ana Reyes".to_string(),
            email: email.to_string(),
            employee_id: "EMP-7".to_string(),
            specialization: "Anxiety".to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[test]
    fn created_counselor_can_log_in() {
        let service = service();
        let profile = service
            .create_counselor(new_counselor("ana@example.com"))
            .expect("account created");

        let outcome = service
            .login("ana@example.com", "correct horse")
            .expect("login succeeds");
        assert_eq!(outcome.counselor.counselor_id, profile.counselor_id);

        let claims = service.keys().verify(&outcome.token).expect("token valid");
        assert_eq!(claims.sub, profile.counselor_id);
    }

    #[test]
    fn wrong_password_and_unknown_email_are_indistinguishable() {
        let service = service();
        service
            .create_counselor(new_counselor("ana@example.com"))
            .expect("account created");

        let wrong_password = service.login("ana@example.com", "incorrect");
        let unknown_email = service.login("nobody@example.com", "correct horse");
        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let service = service();
        service
            .create_counselor(new_counselor("ana@example.com"))
            .expect("account created");
        let duplicate = service.create_counselor(new_counselor("ana@example.com"));
        assert!(matches!(
            duplicate,
            Err(AuthError::Store(StoreError::Conflict(
                ConflictKind::EmailTaken
            )))
        ));
    }
}
