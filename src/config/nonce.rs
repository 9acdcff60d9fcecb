use chrono::{ DateTime, Duration, Utc };
use hmac::{ Hmac, Mac };
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Action the widget nonce is issued for.
pub const WIDGET_NONCE_ACTION: &str = "lcw_nonce";
const NONCE_HEX_LEN: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NonceError {
    #[error("nonce is not 20 hex characters")]
    Malformed,
    #[error("nonce does not match or has expired")]
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceAge {
    /// Issued during the current half of the lifetime.
    Current,
    /// Issued during the previous half; still accepted.
    Previous,
}

/// Issues short anti-forgery tokens bound to an action and a session.
///
/// A token is valid for one to two ticks, where a tick is half the lifetime.
#[derive(Clone)]
pub struct NonceIssuer {
    secret: Vec<u8>,
    tick_secs: i64,
}

impl NonceIssuer {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self::with_lifetime(secret, Duration::hours(24))
    }

    pub fn with_lifetime(secret: impl Into<Vec<u8>>, lifetime: Duration) -> Self {
        Self { secret: secret.into(), tick_secs: (lifetime.num_seconds() / 2).max(1) }
    }

    pub fn tick(&self, now: DateTime<Utc>) -> i64 {
        let ts = now.timestamp();
        (ts + self.tick_secs - 1).div_euclid(self.tick_secs)
    }

    pub fn create(&self, action: &str, session: &str) -> String {
        self.create_at(action, session, Utc::now())
    }

    pub fn create_at(&self, action: &str, session: &str, now: DateTime<Utc>) -> String {
        let digest = self.mac(self.tick(now), action, session).finalize().into_bytes();
        let mut token = hex::encode(digest);
        token.truncate(NONCE_HEX_LEN);
        token
    }

    pub fn verify(&self, nonce: &str, action: &str, session: &str) -> Result<NonceAge, NonceError> {
        self.verify_at(nonce, action, session, Utc::now())
    }

    pub fn verify_at(
        &self,
        nonce: &str,
        action: &str,
        session: &str,
        now: DateTime<Utc>
    ) -> Result<NonceAge, NonceError> {
        if nonce.len() != NONCE_HEX_LEN {
            return Err(NonceError::Malformed);
        }
        let tag = hex::decode(nonce).map_err(|_| NonceError::Malformed)?;
        let tick = self.tick(now);
        for (age, t) in [(NonceAge::Current, tick), (NonceAge::Previous, tick - 1)] {
            if self.mac(t, action, session).verify_truncated_left(&tag).is_ok() {
                return Ok(age);
            }
        }
        Err(NonceError::Invalid)
    }

    fn mac(&self, tick: i64, action: &str, session: &str) -> HmacSha256 {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(format!("{}|{}|{}", tick, action, session).as_bytes());
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn fresh_nonce_verifies() {
        let issuer = NonceIssuer::new("secret");
        let now = at(1_700_000_000);
        let nonce = issuer.create_at(WIDGET_NONCE_ACTION, "session-a", now);
        assert_eq!(nonce.len(), 20);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(issuer.verify_at(&nonce, WIDGET_NONCE_ACTION, "session-a", now), Ok(NonceAge::Current));
    }

    #[test]
    fn nonce_is_bound_to_session_action_and_secret() {
        let issuer = NonceIssuer::new("secret");
        let now = at(1_700_000_000);
        let nonce = issuer.create_at(WIDGET_NONCE_ACTION, "session-a", now);
        assert_eq!(issuer.verify_at(&nonce, WIDGET_NONCE_ACTION, "session-b", now), Err(NonceError::Invalid));
        assert_eq!(issuer.verify_at(&nonce, "other", "session-a", now), Err(NonceError::Invalid));
        assert_eq!(
            NonceIssuer::new("other").verify_at(&nonce, WIDGET_NONCE_ACTION, "session-a", now),
            Err(NonceError::Invalid)
        );
    }

    #[test]
    fn tampered_or_malformed_nonce_fails() {
        let issuer = NonceIssuer::new("secret");
        let now = at(1_700_000_000);
        let nonce = issuer.create_at(WIDGET_NONCE_ACTION, "s", now);
        let flipped = if nonce.starts_with('0') { "1" } else { "0" };
        let tampered = format!("{}{}", flipped, &nonce[1..]);
        assert_eq!(issuer.verify_at(&tampered, WIDGET_NONCE_ACTION, "s", now), Err(NonceError::Invalid));
        assert_eq!(issuer.verify_at("abc", WIDGET_NONCE_ACTION, "s", now), Err(NonceError::Malformed));
        assert_eq!(
            issuer.verify_at("zzzzzzzzzzzzzzzzzzzz", WIDGET_NONCE_ACTION, "s", now),
            Err(NonceError::Malformed)
        );
    }

    #[test]
    fn previous_tick_still_accepted_then_expires() {
        let issuer = NonceIssuer::new("secret");
        let issued = at(1_700_000_000);
        let nonce = issuer.create_at(WIDGET_NONCE_ACTION, "s", issued);
        let half = 12 * 3600;
        assert_eq!(
            issuer.verify_at(&nonce, WIDGET_NONCE_ACTION, "s", at(1_700_000_000 + half)),
            Ok(NonceAge::Previous)
        );
        assert_eq!(
            issuer.verify_at(&nonce, WIDGET_NONCE_ACTION, "s", at(1_700_000_000 + 2 * half)),
            Err(NonceError::Invalid)
        );
    }
}
