use crate::api::error::AppError;
use crate::models::ShareRecord;
use crate::utils::password::verify_password;
use chrono::{DateTime, Utc};

/// Decides whether `record` may be released to a caller holding `password`.
///
/// Pure: it neither reads nor writes a store. Checks run in a fixed order so
/// an expired link reports `Expired` even when the password is also wrong.
pub fn evaluate(
    record: Option<ShareRecord>,
    password: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ShareRecord, AppError> {
    let record = record.ok_or_else(|| AppError::NotFound("Share link not found".to_string()))?;

    if record.is_expired(now) {
        return Err(AppError::Expired);
    }

    if record.is_spent() {
        return Err(AppError::AlreadyConsumed);
    }

    if let Some(stored) = &record.password_hash {
        let supplied = password.ok_or(AppError::PasswordRequired)?;
        if !verify_password(supplied, stored) {
            return Err(AppError::InvalidPassword);
        }
    }

    Ok(record)
}

/// Like [`evaluate`] but without the password gate. Used where no content is
/// released, such as emailing a link.
pub fn evaluate_availability(
    record: Option<ShareRecord>,
    now: DateTime<Utc>,
) -> Result<ShareRecord, AppError> {
    let record = record.ok_or_else(|| AppError::NotFound("Share link not found".to_string()))?;
    if record.is_expired(now) {
        return Err(AppError::Expired);
    }
    if record.is_spent() {
        return Err(AppError::AlreadyConsumed);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::storage_path_for;
    use crate::utils::password::{PasswordScheme, hash_password};

    fn record(password: Option<&str>) -> ShareRecord {
        let now = Utc::now();
        ShareRecord {
            id: "id".to_string(),
            filename: "a.txt".to_string(),
            mime_type: "text/plain".to_string(),
            size_bytes: 10,
            storage_path: storage_path_for("id", "a.txt"),
            created_at: now,
            expires_at: now + chrono::Duration::hours(1),
            one_time_consume: true,
            consumed: false,
            delete_after_send: false,
            owner_email: None,
            password_hash: password.map(|p| hash_password(p, PasswordScheme::Sha256).unwrap()),
        }
    }

    #[test]
    fn test_missing_record() {
        let err = evaluate(None, None, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_expired_wins_over_password() {
        let r = record(Some("p1"));
        let later = r.expires_at + chrono::Duration::seconds(1);
        assert!(matches!(
            evaluate(Some(r.clone()), Some("p1"), later),
            Err(AppError::Expired)
        ));
        assert!(matches!(
            evaluate(Some(r), Some("wrong"), later),
            Err(AppError::Expired)
        ));
    }

    #[test]
    fn test_expiry_boundary_is_still_valid() {
        let r = record(None);
        let at = r.expires_at;
        assert!(evaluate(Some(r), None, at).is_ok());
    }

    #[test]
    fn test_consumed_before_password() {
        let mut r = record(Some("p1"));
        r.consumed = true;
        assert!(matches!(
            evaluate(Some(r), None, Utc::now()),
            Err(AppError::AlreadyConsumed)
        ));
    }

    #[test]
    fn test_consumed_flag_ignored_when_not_one_time() {
        let mut r = record(None);
        r.one_time_consume = false;
        r.consumed = true;
        assert!(evaluate(Some(r), None, Utc::now()).is_ok());
    }

    #[test]
    fn test_password_checks() {
        let r = record(Some("p1"));
        let now = Utc::now();
        assert!(matches!(
            evaluate(Some(r.clone()), None, now),
            Err(AppError::PasswordRequired)
        ));
        assert!(matches!(
            evaluate(Some(r.clone()), Some("p2"), now),
            Err(AppError::InvalidPassword)
        ));
        assert!(evaluate(Some(r), Some("p1"), now).is_ok());
    }

    #[test]
    fn test_password_ignored_when_not_protected() {
        let r = record(None);
        assert!(evaluate(Some(r), Some("anything"), Utc::now()).is_ok());
    }

    #[test]
    fn test_availability_skips_password() {
        let r = record(Some("p1"));
        assert!(evaluate_availability(Some(r.clone()), Utc::now()).is_ok());
        let later = r.expires_at + chrono::Duration::seconds(1);
        assert!(matches!(
            evaluate_availability(Some(r), later),
            Err(AppError::Expired)
        ));
    }
}
