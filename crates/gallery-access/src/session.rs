use chrono::{DateTime, Duration, Utc};
use gallery_db::Database;
use gallery_db::models::{AccountRow, SessionRow};
use tracing::debug;

use crate::{AccessError, Result, generate_token};

/// Sessions last this long and are never extended.
pub const SESSION_TTL_DAYS: i64 = 30;

/// A request made by a signed-in account.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub account: AccountRow,
    pub session: SessionRow,
}

/// Resolve a session token to its account.
///
/// An expired session is rejected as it stands: no renewal happens here.
pub fn authenticate(
    db: &Database,
    token: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Authenticated> {
    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => return Err(AccessError::Unauthenticated),
    };

    let (session, account) = db
        .get_session_with_account(token)?
        .ok_or(AccessError::InvalidSession)?;

    if session.expires_at < now {
        debug!("Session {} expired at {}", session.id, session.expires_at);
        return Err(AccessError::InvalidSession);
    }
    if account.is_blocked {
        return Err(AccessError::Blocked);
    }

    Ok(Authenticated { account, session })
}

pub fn open_session(
    db: &Database,
    account_id: i64,
    ip: Option<&str>,
    now: DateTime<Utc>,
) -> Result<SessionRow> {
    let token = generate_token();
    Ok(db.create_session(account_id, &token, ip, now + Duration::days(SESSION_TTL_DAYS))?)
}

/// Delete the session behind `token`, if any.
pub fn close_session(db: &Database, token: &str) -> Result<()> {
    db.delete_session_by_token(token)?;
    Ok(())
}

/// Revoke one of the account's own sessions.
pub fn revoke_session(db: &Database, account_id: i64, session_id: i64) -> Result<()> {
    if !db.delete_session_for_account(account_id, session_id)? {
        return Err(AccessError::NotFound("Session not found".into()));
    }
    Ok(())
}

pub fn list_sessions(db: &Database, account_id: i64) -> Result<Vec<SessionRow>> {
    Ok(db.list_sessions(account_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn missing_token_is_unauthenticated() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        assert!(matches!(
            authenticate(&db, None, now),
            Err(AccessError::Unauthenticated)
        ));
        assert!(matches!(
            authenticate(&db, Some(""), now),
            Err(AccessError::Unauthenticated)
        ));
    }

    #[test]
    fn unknown_token_is_invalid() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            authenticate(&db, Some("nope"), Utc::now()),
            Err(AccessError::InvalidSession)
        ));
    }

    #[test]
    fn valid_session_resolves_account() {
        let db = Database::open_in_memory().unwrap();
        let id = fixtures::account(&db, "alice");
        let now = Utc::now();
        let session = open_session(&db, id, Some("127.0.0.1"), now).unwrap();

        let auth = authenticate(&db, Some(&session.token), now).unwrap();
        assert_eq!(auth.account.id, id);
        assert_eq!(auth.session.id, session.id);
    }

    #[test]
    fn expired_session_is_rejected_and_not_renewed() {
        let db = Database::open_in_memory().unwrap();
        let id = fixtures::account(&db, "alice");
        let now = Utc::now();
        let session = open_session(&db, id, None, now).unwrap();
        let past = now - Duration::minutes(1);
        db.set_session_expiry(session.id, past).unwrap();

        assert!(matches!(
            authenticate(&db, Some(&session.token), now),
            Err(AccessError::InvalidSession)
        ));

        let (stored, _) = db.get_session_with_account(&session.token).unwrap().unwrap();
        assert_eq!(stored.expires_at.timestamp(), past.timestamp());
    }

    #[test]
    fn blocked_account_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let id = fixtures::account(&db, "mallory");
        let now = Utc::now();
        let session = open_session(&db, id, None, now).unwrap();
        db.set_blocked(id, true).unwrap();

        assert!(matches!(
            authenticate(&db, Some(&session.token), now),
            Err(AccessError::Blocked)
        ));
    }

    #[test]
    fn closing_and_revoking_sessions() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::account(&db, "alice");
        let bob = fixtures::account(&db, "bob");
        let now = Utc::now();
        let first = open_session(&db, alice, None, now).unwrap();
        let second = open_session(&db, alice, None, now).unwrap();

        close_session(&db, &first.token).unwrap();
        assert!(authenticate(&db, Some(&first.token), now).is_err());

        assert!(matches!(
            revoke_session(&db, bob, second.id),
            Err(AccessError::NotFound(_))
        ));
        revoke_session(&db, alice, second.id).unwrap();
        assert!(list_sessions(&db, alice).unwrap().is_empty());
    }
}
