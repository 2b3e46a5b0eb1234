//! # Admin authentication
//!
//! E-mail and password sign-in for club chairpersons, backed by the same
//! [`DocumentStore`] as the club data:
//!
//! | Collection | Key | Document |
//! |------------|-----|----------|
//! | `admins` | lower-cased e-mail | [`Admin`] with Argon2id hash |
//! | `sessions` | random token | [`Session`] with expiry |
//! | `passwordResets` | random token | [`PasswordResetTicket`] |
//!
//! A front end keeps only the session token. Every other operation resolves the
//! admin through [`current_admin`] and passes the e-mail on as explicit request
//! data.

mod password;
mod session;

pub use password::{hash_password, verify_password};
pub use session::{PasswordResetTicket, Session};

use chrono::{DateTime, TimeDelta, Utc};
use store::collections::{ADMINS, PASSWORD_RESETS, SESSIONS};
use store::config::AuthConfig;
use store::{to_fields, Batch, DocumentStore, Precondition, Query};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Admin, AdminInfo};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Trim and lower-case an e-mail address; admins are keyed by this form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `now` plus a configured lifetime, or a validation error when the lifetime
/// does not fit the calendar.
fn expiry(now: DateTime<Utc>, ttl: Option<TimeDelta>, setting: &str) -> ApiResult<DateTime<Utc>> {
    ttl.and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| ApiError::validation(format!("auth.{setting} is out of range")))
}

fn check_password_strength(config: &AuthConfig, password: &str) -> ApiResult<()> {
    if password.chars().count() < config.min_password_len {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            config.min_password_len
        )));
    }
    Ok(())
}

/// Create a chairperson account.
pub async fn register_admin<S: DocumentStore>(
    store: &S,
    config: &AuthConfig,
    email: &str,
    password: &str,
    name: &str,
) -> ApiResult<AdminInfo> {
    let email = normalize_email(email);
    let name = name.trim().to_string();

    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation("Invalid email address"));
    }
    check_password_strength(config, password)?;
    if name.is_empty() {
        return Err(ApiError::validation("Name is required"));
    }

    let admin = Admin {
        email: email.clone(),
        name,
        password_hash: hash_password(password)?,
        created_at: Utc::now(),
    };
    let batch = Batch::new().set_if(ADMINS, &email, to_fields(&admin)?, Precondition::Missing);
    match store.commit(batch).await {
        Ok(_) => {}
        Err(e) if e.is_conflict() => {
            return Err(ApiError::Conflict(
                "An account with this email already exists".to_string(),
            ))
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(email = %admin.email, "registered admin");
    Ok(admin.to_info())
}

/// Sign in with e-mail and password, opening a new session.
pub async fn sign_in<S: DocumentStore>(
    store: &S,
    config: &AuthConfig,
    email: &str,
    password: &str,
) -> ApiResult<Session> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::validation("Please fill in all fields"));
    }

    let Some(doc) = store.get(ADMINS, &email).await? else {
        tracing::warn!(%email, "sign-in for unknown account");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };
    let admin: Admin = doc.decode()?;

    if !verify_password(password, &admin.password_hash)? {
        tracing::warn!(%email, "sign-in with wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let now = Utc::now();
    let session = Session {
        token: Uuid::new_v4().to_string(),
        admin_email: admin.email,
        created_at: now,
        expires_at: expiry(
            now,
            TimeDelta::try_hours(config.session_ttl_hours),
            "session_ttl_hours",
        )?,
    };
    store
        .commit(Batch::new().set_if(
            SESSIONS,
            &session.token,
            to_fields(&session)?,
            Precondition::Missing,
        ))
        .await?;

    tracing::info!(email = %session.admin_email, "admin signed in");
    Ok(session)
}

/// End a session. Unknown tokens are ignored.
pub async fn sign_out<S: DocumentStore>(store: &S, token: &str) -> ApiResult<()> {
    store.commit(Batch::new().delete(SESSIONS, token)).await?;
    Ok(())
}

/// Resolve a session token to the signed-in admin.
pub async fn current_admin<S: DocumentStore>(store: &S, token: &str) -> ApiResult<AdminInfo> {
    let Some(doc) = store.get(SESSIONS, token).await? else {
        return Err(ApiError::Unauthorized("Not signed in".to_string()));
    };
    let session: Session = doc.decode()?;

    if session.is_expired(Utc::now()) {
        if let Err(e) = store
            .commit(Batch::new().delete_if(SESSIONS, token, Precondition::Version(doc.version)))
            .await
        {
            tracing::warn!(error = %e, "failed to remove expired session");
        }
        return Err(ApiError::Unauthorized("Session expired, please sign in again".to_string()));
    }

    match store.get(ADMINS, &session.admin_email).await? {
        Some(admin) => Ok(admin.decode::<Admin>()?.to_info()),
        None => Err(ApiError::Unauthorized("Account no longer exists".to_string())),
    }
}

/// Issue a password reset ticket. Unknown addresses yield `None` rather than an
/// error so the answer does not reveal which accounts exist.
pub async fn request_password_reset<S: DocumentStore>(
    store: &S,
    config: &AuthConfig,
    email: &str,
) -> ApiResult<Option<PasswordResetTicket>> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ApiError::validation("Please enter your email"));
    }

    if store.get(ADMINS, &email).await?.is_none() {
        tracing::debug!(%email, "password reset for unknown account");
        return Ok(None);
    }

    let ticket = PasswordResetTicket {
        token: Uuid::new_v4().to_string(),
        email,
        expires_at: expiry(
            Utc::now(),
            TimeDelta::try_minutes(config.reset_token_ttl_minutes),
            "reset_token_ttl_minutes",
        )?,
    };
    store
        .set(PASSWORD_RESETS, &ticket.token, to_fields(&ticket)?)
        .await?;

    tracing::info!(email = %ticket.email, "password reset requested");
    Ok(Some(ticket))
}

/// Consume a reset ticket: set the new password and revoke every open session
/// of the account, in one batch.
pub async fn reset_password<S: DocumentStore>(
    store: &S,
    config: &AuthConfig,
    token: &str,
    new_password: &str,
) -> ApiResult<()> {
    check_password_strength(config, new_password)?;

    let invalid = || ApiError::Unauthorized("Invalid or expired reset token".to_string());

    let ticket_doc = store.get(PASSWORD_RESETS, token).await?.ok_or_else(invalid)?;
    let ticket: PasswordResetTicket = ticket_doc.decode()?;
    if Utc::now() >= ticket.expires_at {
        store.commit(Batch::new().delete(PASSWORD_RESETS, token)).await?;
        return Err(invalid());
    }

    let admin_doc = store
        .get(ADMINS, &ticket.email)
        .await?
        .ok_or_else(|| ApiError::not_found("admin", ticket.email.clone()))?;
    let mut admin: Admin = admin_doc.decode()?;
    admin.password_hash = hash_password(new_password)?;

    let sessions = store
        .query(SESSIONS, &Query::new().where_eq("adminEmail", admin.email.as_str()))
        .await?;

    let mut batch = Batch::new()
        .set_if(
            ADMINS,
            &admin.email,
            to_fields(&admin)?,
            Precondition::Version(admin_doc.version),
        )
        .delete_if(
            PASSWORD_RESETS,
            token,
            Precondition::Version(ticket_doc.version),
        );
    for session in &sessions {
        batch = batch.delete(SESSIONS, &session.id);
    }
    store.commit(batch).await?;

    tracing::info!(email = %admin.email, revoked = sessions.len(), "password reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::MemoryStore;

    fn config() -> AuthConfig {
        AuthConfig::default()
    }

    async fn registered() -> MemoryStore {
        let store = MemoryStore::new();
        register_admin(&store, &config(), " Chair@Club.mw ", "chilimba-2025", "Chair")
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_register_validation() {
        let store = MemoryStore::new();
        let cfg = config();
        assert!(matches!(
            register_admin(&store, &cfg, "no-at-sign", "chilimba-2025", "A").await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            register_admin(&store, &cfg, "a@b.mw", "short", "A").await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            register_admin(&store, &cfg, "a@b.mw", "chilimba-2025", "  ").await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_conflicts() {
        let store = registered().await;
        let err = register_admin(&store, &config(), "chair@club.mw", "another-pass", "Other")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_sign_in_and_current_admin() {
        let store = registered().await;

        let session = sign_in(&store, &config(), "CHAIR@club.mw", "chilimba-2025")
            .await
            .unwrap();
        assert_eq!(session.admin_email, "chair@club.mw");

        let admin = current_admin(&store, &session.token).await.unwrap();
        assert_eq!(admin.email, "chair@club.mw");
        assert_eq!(admin.display_name(), "Chair");

        sign_out(&store, &session.token).await.unwrap();
        assert!(matches!(
            current_admin(&store, &session.token).await,
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_in_failures() {
        let store = registered().await;
        let cfg = config();

        assert!(matches!(
            sign_in(&store, &cfg, "", "").await,
            Err(ApiError::Validation(_))
        ));
        let wrong = sign_in(&store, &cfg, "chair@club.mw", "nope-nope").await;
        assert!(matches!(wrong, Err(ApiError::Unauthorized(ref m)) if m == INVALID_CREDENTIALS));
        let unknown = sign_in(&store, &cfg, "ghost@club.mw", "chilimba-2025").await;
        assert!(matches!(unknown, Err(ApiError::Unauthorized(ref m)) if m == INVALID_CREDENTIALS));
    }

    #[tokio::test]
    async fn test_out_of_range_lifetimes_are_rejected() {
        let store = registered().await;
        let cfg = AuthConfig {
            session_ttl_hours: i64::MAX,
            reset_token_ttl_minutes: i64::MAX,
            ..config()
        };

        let err = sign_in(&store, &cfg, "chair@club.mw", "chilimba-2025")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m.contains("session_ttl_hours")));
        assert!(matches!(
            request_password_reset(&store, &cfg, "chair@club.mw").await,
            Err(ApiError::Validation(_))
        ));
        assert!(store
            .query(SESSIONS, &Query::new())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_expired_session_rejected_and_removed() {
        let store = registered().await;
        let past = Utc::now() - TimeDelta::hours(1);
        let session = Session {
            token: "stale".to_string(),
            admin_email: "chair@club.mw".to_string(),
            created_at: past - TimeDelta::hours(200),
            expires_at: past,
        };
        store
            .set(SESSIONS, "stale", to_fields(&session).unwrap())
            .await
            .unwrap();

        assert!(matches!(
            current_admin(&store, "stale").await,
            Err(ApiError::Unauthorized(_))
        ));
        assert!(store.get(SESSIONS, "stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let store = registered().await;
        let cfg = config();

        let session = sign_in(&store, &cfg, "chair@club.mw", "chilimba-2025")
            .await
            .unwrap();

        assert!(request_password_reset(&store, &cfg, "ghost@club.mw")
            .await
            .unwrap()
            .is_none());

        let ticket = request_password_reset(&store, &cfg, "chair@club.mw")
            .await
            .unwrap()
            .unwrap();

        reset_password(&store, &cfg, &ticket.token, "new-secret-99")
            .await
            .unwrap();

        // Old session revoked, old password gone, ticket single-use.
        assert!(current_admin(&store, &session.token).await.is_err());
        assert!(sign_in(&store, &cfg, "chair@club.mw", "chilimba-2025")
            .await
            .is_err());
        assert!(sign_in(&store, &cfg, "chair@club.mw", "new-secret-99")
            .await
            .is_ok());
        assert!(matches!(
            reset_password(&store, &cfg, &ticket.token, "another-one-1").await,
            Err(ApiError::Unauthorized(_))
        ));
    }
}
