//! crates/diet_tracker_core/src/gate.rs
//!
//! The Authentication & Session Gate: decides, for an incoming request
//! context, whether the caller may proceed to a protected surface, and
//! drives the two-step login protocol when not yet authenticated.
//!
//! The gate owns the session state machine
//! (`Anonymous -> AwaitingCode -> Authenticated`) and performs exactly one
//! persistent side effect: writing a freshly generated one-time secret back
//! to the credential store on an account's first successful password login.

use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use totp_rs::{Algorithm, Secret, TOTP};

use crate::domain::{AuthPhase, Enrollment, Session};
use crate::ports::{CredentialStore, PortError};

/// RFC 6238 parameters: 6-digit codes over a 30-second step, with one step
/// of clock-skew tolerance either side.
const OTP_DIGITS: usize = 6;
const OTP_SKEW_STEPS: u8 = 1;
const OTP_STEP_SECONDS: u64 = 30;

/// Idle sessions are forced back to `Anonymous` after this long.
pub const DEFAULT_IDLE_TIMEOUT_MINUTES: i64 = 30;

//=========================================================================================
// Gate Error Taxonomy
//=========================================================================================

/// Every way the gate can turn a caller away. All variants are recovered
/// locally by re-presenting the corresponding login step; none are fatal.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Unknown username and wrong password share this message so that the
    /// login form never confirms which usernames exist.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid one-time code")]
    InvalidOneTimeCode,

    #[error("Session expired. Please log in again")]
    SessionExpired,

    /// The credential store was unreachable or returned malformed data.
    #[error("Credential store error: {0}")]
    Store(#[from] PortError),

    /// The provisioning payload (otpauth URI / QR image) could not be built.
    #[error("Enrollment rendering failed: {0}")]
    Enrollment(String),
}

//=========================================================================================
// The Gate
//=========================================================================================

/// The gate is shared across all connections; per-caller state lives in the
/// `Session` passed into every operation.
pub struct AuthGate {
    credentials: Arc<dyn CredentialStore>,
    issuer: String,
    idle_timeout: Duration,
}

impl AuthGate {
    pub fn new(credentials: Arc<dyn CredentialStore>, issuer: impl Into<String>) -> Self {
        Self {
            credentials,
            issuer: issuer.into(),
            idle_timeout: Duration::minutes(DEFAULT_IDLE_TIMEOUT_MINUTES),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Transition `Anonymous -> AwaitingCode`: look the user up, verify the
    /// password against the stored hash, and provision a one-time secret if
    /// the account does not have one yet.
    ///
    /// On any failure the session is left untouched in `Anonymous`.
    pub async fn begin_login(
        &self,
        session: &mut Session,
        username: &str,
        password: &str,
    ) -> Result<(), GateError> {
        let record = match self.credentials.get(username).await {
            Ok(record) => record,
            // Fails closed: an unknown username is indistinguishable from a
            // wrong password.
            Err(PortError::NotFound(_)) => return Err(GateError::InvalidCredentials),
            Err(e) => return Err(GateError::Store(e)),
        };

        let parsed_hash = PasswordHash::new(&record.password_hash).map_err(|_| {
            GateError::Store(PortError::Malformed(format!(
                "stored password hash for '{}' is not a valid PHC string",
                username
            )))
        })?;

        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Err(GateError::InvalidCredentials);
        }

        let (otp_secret, enrollment) = match record.otp_secret {
            Some(secret) => (secret, None),
            None => {
                // First login of this account's lifetime: generate a secret,
                // persist it before touching the session, and arm the
                // one-shot enrollment payload.
                let secret = Secret::generate_secret().to_encoded().to_string();
                self.credentials.store_otp_secret(username, &secret).await?;
                let enrollment = self.enrollment_for(username, &secret)?;
                (secret, Some(enrollment))
            }
        };

        session.username = Some(record.username);
        session.role = Some(record.role);
        session.otp_secret = Some(otp_secret);
        session.enrollment = enrollment;
        session.authenticated_at = None;
        session.phase = AuthPhase::AwaitingCode;
        Ok(())
    }

    /// Transition `AwaitingCode -> Authenticated`: verify a time-based code
    /// against the session's secret, accepting the current step and one step
    /// either side. On success the session is stamped with `now`.
    pub fn verify_code(
        &self,
        session: &mut Session,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), GateError> {
        if session.phase != AuthPhase::AwaitingCode {
            return Err(GateError::SessionExpired);
        }
        let account = session
            .username
            .clone()
            .ok_or(GateError::SessionExpired)?;
        let secret = session
            .otp_secret
            .clone()
            .ok_or(GateError::SessionExpired)?;

        let totp = self.totp_for(&account, &secret)?;
        if !totp.check(code.trim(), now.timestamp() as u64) {
            return Err(GateError::InvalidOneTimeCode);
        }

        session.authenticated_at = Some(now);
        session.phase = AuthPhase::Authenticated;
        Ok(())
    }

    /// Gatekeeper for every protected request. A session whose last
    /// authentication stamp is older than the idle timeout is forcibly
    /// cleared before any protected action can run.
    pub fn authorize(&self, session: &mut Session, now: DateTime<Utc>) -> Result<(), GateError> {
        match (session.phase, session.authenticated_at) {
            (AuthPhase::Authenticated, Some(stamp)) => {
                if now.signed_duration_since(stamp) > self.idle_timeout {
                    session.reset();
                    Err(GateError::SessionExpired)
                } else {
                    Ok(())
                }
            }
            _ => {
                session.reset();
                Err(GateError::SessionExpired)
            }
        }
    }

    /// Explicit logout: clears every session attribute.
    pub fn logout(&self, session: &mut Session) {
        session.reset();
    }

    fn totp_for(&self, account: &str, secret: &str) -> Result<TOTP, GateError> {
        let secret_bytes = Secret::Encoded(secret.to_string()).to_bytes().map_err(|e| {
            GateError::Store(PortError::Malformed(format!(
                "one-time secret is not valid base32: {:?}",
                e
            )))
        })?;

        // *unchecked* so that short (80-bit) secrets provisioned by other
        // tools still verify.
        Ok(TOTP::new_unchecked(
            Algorithm::SHA1,
            OTP_DIGITS,
            OTP_SKEW_STEPS,
            OTP_STEP_SECONDS,
            secret_bytes,
            Some(self.issuer.clone()),
            account.to_string(),
        ))
    }

    fn enrollment_for(&self, account: &str, secret: &str) -> Result<Enrollment, GateError> {
        let totp = self.totp_for(account, secret)?;
        let otpauth_url = totp.get_url();
        let qr_png_base64 = totp
            .get_qr_base64()
            .map_err(|e| GateError::Enrollment(e.to_string()))?;
        Ok(Enrollment {
            otpauth_url,
            qr_png_base64,
        })
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CredentialRecord, Role};
    use crate::ports::PortResult;
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MemoryCredentialStore {
        records: Mutex<HashMap<String, CredentialRecord>>,
        writes: AtomicUsize,
    }

    impl MemoryCredentialStore {
        fn with_user(username: &str, password: &str, role: Role, otp_secret: Option<&str>) -> Self {
            let record = CredentialRecord {
                username: username.to_string(),
                password_hash: hash_password(password),
                role,
                otp_secret: otp_secret.map(str::to_string),
            };
            let mut records = HashMap::new();
            records.insert(username.to_string(), record);
            Self {
                records: Mutex::new(records),
                writes: AtomicUsize::new(0),
            }
        }

        fn secret_of(&self, username: &str) -> Option<String> {
            self.records
                .lock()
                .unwrap()
                .get(username)
                .and_then(|r| r.otp_secret.clone())
        }
    }

    #[async_trait]
    impl CredentialStore for MemoryCredentialStore {
        async fn get(&self, username: &str) -> PortResult<CredentialRecord> {
            self.records
                .lock()
                .unwrap()
                .get(username)
                .cloned()
                .ok_or_else(|| PortError::NotFound(format!("user '{}' not found", username)))
        }

        async fn store_otp_secret(&self, username: &str, secret: &str) -> PortResult<()> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .get_mut(username)
                .ok_or_else(|| PortError::NotFound(format!("user '{}' not found", username)))?;
            record.otp_secret = Some(secret.to_string());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn hash_password(password: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    fn gate_over(store: MemoryCredentialStore) -> (AuthGate, Arc<MemoryCredentialStore>) {
        let store = Arc::new(store);
        let gate = AuthGate::new(store.clone(), "DietTrackerApp");
        (gate, store)
    }

    fn code_for(secret: &str, at: DateTime<Utc>) -> String {
        let bytes = Secret::Encoded(secret.to_string()).to_bytes().unwrap();
        let totp = TOTP::new_unchecked(
            Algorithm::SHA1,
            OTP_DIGITS,
            OTP_SKEW_STEPS,
            OTP_STEP_SECONDS,
            bytes,
            None,
            "test".to_string(),
        );
        totp.generate(at.timestamp() as u64)
    }

    // A timestamp aligned to the start of a 30-second step, so the window
    // arithmetic in the tests is exact.
    fn step_aligned_now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_699_999_980, 0).unwrap()
    }

    #[tokio::test]
    async fn first_login_provisions_secret_exactly_once() {
        let (gate, store) =
            gate_over(MemoryCredentialStore::with_user("alice", "secret1", Role::Patient, None));
        let mut session = Session::new();

        gate.begin_login(&mut session, "alice", "secret1")
            .await
            .unwrap();

        assert_eq!(session.phase, AuthPhase::AwaitingCode);
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        let stored = store.secret_of("alice").expect("secret persisted");
        assert_eq!(session.otp_secret.as_deref(), Some(stored.as_str()));

        let enrollment = session.take_enrollment().expect("enrollment armed");
        assert!(enrollment.otpauth_url.starts_with("otpauth://totp/"));
        assert!(enrollment.otpauth_url.contains("DietTrackerApp"));
        assert!(!enrollment.qr_png_base64.is_empty());
        assert!(session.take_enrollment().is_none());
    }

    #[tokio::test]
    async fn returning_user_gets_no_write_and_no_enrollment() {
        let secret = Secret::generate_secret().to_encoded().to_string();
        let (gate, store) = gate_over(MemoryCredentialStore::with_user(
            "alice",
            "secret1",
            Role::Patient,
            Some(&secret),
        ));
        let mut session = Session::new();

        gate.begin_login(&mut session, "alice", "secret1")
            .await
            .unwrap();

        assert_eq!(session.phase, AuthPhase::AwaitingCode);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert_eq!(session.otp_secret.as_deref(), Some(secret.as_str()));
        assert!(session.take_enrollment().is_none());
    }

    #[tokio::test]
    async fn wrong_password_leaves_session_anonymous() {
        let (gate, store) =
            gate_over(MemoryCredentialStore::with_user("alice", "secret1", Role::Patient, None));
        let mut session = Session::new();

        let err = gate
            .begin_login(&mut session, "alice", "not-it")
            .await
            .unwrap_err();

        assert!(matches!(err, GateError::InvalidCredentials));
        assert_eq!(session.phase, AuthPhase::Anonymous);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert!(store.secret_of("alice").is_none());
    }

    #[tokio::test]
    async fn unknown_user_reports_the_same_generic_error() {
        let (gate, _store) =
            gate_over(MemoryCredentialStore::with_user("alice", "secret1", Role::Patient, None));
        let mut session = Session::new();

        let unknown = gate
            .begin_login(&mut session, "mallory", "secret1")
            .await
            .unwrap_err();
        let wrong = gate
            .begin_login(&mut session, "alice", "not-it")
            .await
            .unwrap_err();

        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(session.phase, AuthPhase::Anonymous);
    }

    #[tokio::test]
    async fn code_verifies_within_one_step_of_skew_and_not_beyond() {
        let (gate, store) =
            gate_over(MemoryCredentialStore::with_user("alice", "secret1", Role::Patient, None));
        let now = step_aligned_now();

        let mut session = Session::new();
        gate.begin_login(&mut session, "alice", "secret1")
            .await
            .unwrap();
        let secret = store.secret_of("alice").unwrap();
        let code = code_for(&secret, now);

        for offset in [0, 30, -30] {
            let mut attempt = session.clone();
            let at = now + Duration::seconds(offset);
            assert!(
                gate.verify_code(&mut attempt, &code, at).is_ok(),
                "code should verify at offset {}s",
                offset
            );
            assert_eq!(attempt.phase, AuthPhase::Authenticated);
            assert_eq!(attempt.authenticated_at, Some(at));
        }

        for offset in [60, -60] {
            let mut attempt = session.clone();
            let at = now + Duration::seconds(offset);
            let err = gate.verify_code(&mut attempt, &code, at).unwrap_err();
            assert!(matches!(err, GateError::InvalidOneTimeCode));
            assert_eq!(attempt.phase, AuthPhase::AwaitingCode);
        }
    }

    #[tokio::test]
    async fn bad_code_keeps_session_awaiting() {
        let (gate, _store) =
            gate_over(MemoryCredentialStore::with_user("alice", "secret1", Role::Patient, None));
        let mut session = Session::new();
        gate.begin_login(&mut session, "alice", "secret1")
            .await
            .unwrap();

        let err = gate
            .verify_code(&mut session, "000000", step_aligned_now())
            .unwrap_err();

        assert!(matches!(err, GateError::InvalidOneTimeCode));
        assert_eq!(session.phase, AuthPhase::AwaitingCode);
        assert!(session.authenticated_at.is_none());
    }

    #[tokio::test]
    async fn idle_session_is_forced_back_to_anonymous() {
        let (gate, store) =
            gate_over(MemoryCredentialStore::with_user("alice", "secret1", Role::Patient, None));
        let now = step_aligned_now();

        let mut session = Session::new();
        gate.begin_login(&mut session, "alice", "secret1")
            .await
            .unwrap();
        let code = code_for(&store.secret_of("alice").unwrap(), now);
        gate.verify_code(&mut session, &code, now).unwrap();

        assert!(gate
            .authorize(&mut session, now + Duration::minutes(29))
            .is_ok());

        let err = gate
            .authorize(&mut session, now + Duration::minutes(31))
            .unwrap_err();
        assert!(matches!(err, GateError::SessionExpired));
        assert_eq!(session.phase, AuthPhase::Anonymous);
        assert!(session.username.is_none());
        assert!(session.authenticated_at.is_none());
    }

    #[tokio::test]
    async fn authorize_rejects_sessions_that_never_finished_login() {
        let (gate, _store) =
            gate_over(MemoryCredentialStore::with_user("alice", "secret1", Role::Patient, None));

        let mut anonymous = Session::new();
        assert!(matches!(
            gate.authorize(&mut anonymous, step_aligned_now()),
            Err(GateError::SessionExpired)
        ));

        let mut half_way = Session::new();
        gate.begin_login(&mut half_way, "alice", "secret1")
            .await
            .unwrap();
        assert!(matches!(
            gate.authorize(&mut half_way, step_aligned_now()),
            Err(GateError::SessionExpired)
        ));
        assert_eq!(half_way.phase, AuthPhase::Anonymous);
    }

    #[tokio::test]
    async fn full_login_round_trip_for_a_fresh_account() {
        let (gate, store) =
            gate_over(MemoryCredentialStore::with_user("alice", "secret1", Role::Patient, None));
        let now = step_aligned_now();
        let mut session = Session::new();

        gate.begin_login(&mut session, "alice", "secret1")
            .await
            .unwrap();
        assert_eq!(session.phase, AuthPhase::AwaitingCode);
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        assert!(session.take_enrollment().is_some());

        let code = code_for(&store.secret_of("alice").unwrap(), now);
        gate.verify_code(&mut session, &code, now).unwrap();

        assert_eq!(session.phase, AuthPhase::Authenticated);
        assert_eq!(session.authenticated_at, Some(now));
        assert_eq!(session.role, Some(Role::Patient));

        gate.logout(&mut session);
        assert_eq!(session.phase, AuthPhase::Anonymous);
        assert!(session.otp_secret.is_none());
    }
}
