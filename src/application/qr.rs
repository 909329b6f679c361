use crate::domain::ports::{EventStoreRef, TicketStoreRef};
use crate::domain::ticket::TicketStatus;
use crate::error::{EngineError, Rejection, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Per-user and per-ticket QR generation quota.
pub const QR_RATE_PER_MINUTE: u32 = 10;
/// Maximum codes in one batch request.
pub const QR_BATCH_CAP: usize = 10;
/// Batch requests allowed per user per minute.
pub const QR_BATCH_RATE_PER_MINUTE: u32 = 3;

/// Keyed hash stored on each ticket at issuance; binds the code to its event.
pub fn ticket_security_hash(code: &str, event_id: Uuid, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(code.as_bytes());
    mac.update(event_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// The signed claims carried inside a scannable payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QrClaims {
    pub ticket_id: Uuid,
    pub event_id: Uuid,
    pub ticket_code: String,
    pub ticket_type: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
struct WindowEntry {
    count: u32,
    window_start: DateTime<Utc>,
}

/// Fixed-window rate limiter. Advisory throttling, not a correctness
/// mechanism; blunts screenshot-sharing and brute-force churn.
pub struct RateLimiter {
    entries: Mutex<HashMap<String, WindowEntry>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_seconds: i64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_requests,
            window: Duration::seconds(window_seconds),
        }
    }

    pub fn check(&self, key: &str, now: DateTime<Utc>) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| EngineError::Storage("rate limiter lock poisoned".into()))?;
        let entry = entries.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });
        if now >= entry.window_start + self.window {
            entry.count = 0;
            entry.window_start = now;
        }
        entry.count += 1;
        if entry.count > self.max_requests {
            let retry_after = (entry.window_start + self.window - now).num_seconds().max(0);
            return Err(EngineError::RateLimited(format!(
                "max {} requests per {}s, retry in {}s",
                self.max_requests,
                self.window.num_seconds(),
                retry_after
            )));
        }
        Ok(())
    }
}

/// Generates and validates signed QR payloads.
///
/// Payload layout: `base64(claims_json ++ "|" ++ hex(hmac_sha256(claims_json, event_secret)))`.
pub struct QrService {
    events: EventStoreRef,
    tickets: TicketStoreRef,
    user_limiter: RateLimiter,
    ticket_limiter: RateLimiter,
    batch_limiter: RateLimiter,
}

impl QrService {
    pub fn new(events: EventStoreRef, tickets: TicketStoreRef) -> Self {
        Self {
            events,
            tickets,
            user_limiter: RateLimiter::new(QR_RATE_PER_MINUTE, 60),
            ticket_limiter: RateLimiter::new(QR_RATE_PER_MINUTE, 60),
            batch_limiter: RateLimiter::new(QR_BATCH_RATE_PER_MINUTE, 60),
        }
    }

    pub async fn generate(
        &self,
        ticket_code: &str,
        requested_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<String> {
        self.user_limiter.check(&requested_by.to_string(), now)?;
        self.ticket_limiter.check(ticket_code, now)?;
        self.render(ticket_code, now).await
    }

    /// Batch generation, capped and separately throttled per user.
    pub async fn generate_batch(
        &self,
        ticket_codes: &[String],
        requested_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        if ticket_codes.len() > QR_BATCH_CAP {
            return Err(EngineError::RateLimited(format!(
                "batch size {} exceeds the cap of {}",
                ticket_codes.len(),
                QR_BATCH_CAP
            )));
        }
        self.batch_limiter
            .check(&requested_by.to_string(), now)?;
        let mut payloads = Vec::with_capacity(ticket_codes.len());
        for code in ticket_codes {
            payloads.push(self.render(code, now).await?);
        }
        Ok(payloads)
    }

    async fn render(&self, ticket_code: &str, now: DateTime<Utc>) -> Result<String> {
        let ticket = self
            .tickets
            .by_code(ticket_code)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("ticket {ticket_code}")))?;
        if ticket.status != TicketStatus::Valid {
            return Err(EngineError::rejected(Rejection::TicketNotUsable {
                status: ticket.status.as_str().into(),
            }));
        }
        let event = self
            .events
            .event(ticket.event_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("event {}", ticket.event_id)))?;

        let claims = QrClaims {
            ticket_id: ticket.id,
            event_id: ticket.event_id,
            ticket_code: ticket.code.clone(),
            ticket_type: ticket.ticket_type.clone(),
            issued_at: now,
            expires_at: ticket.valid_until.unwrap_or_else(|| event.tickets_expire_at()),
        };
        let claims_json = serde_json::to_string(&claims)?;
        let signature = sign(&claims_json, &event.qr_secret);
        Ok(BASE64.encode(format!("{claims_json}|{signature}")))
    }

    /// Validates a scanned payload: signature, expiry, then ticket status.
    pub async fn verify(&self, payload: &str, now: DateTime<Utc>) -> Result<QrClaims> {
        let raw = BASE64
            .decode(payload)
            .map_err(|_| EngineError::InvalidQr("not base64".into()))?;
        let text =
            String::from_utf8(raw).map_err(|_| EngineError::InvalidQr("not utf-8".into()))?;
        let (claims_json, signature) = text
            .rsplit_once('|')
            .ok_or_else(|| EngineError::InvalidQr("missing signature".into()))?;
        let claims: QrClaims = serde_json::from_str(claims_json)
            .map_err(|_| EngineError::InvalidQr("malformed claims".into()))?;

        let event = self
            .events
            .event(claims.event_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("event {}", claims.event_id)))?;
        if !verify_signature(claims_json, signature, &event.qr_secret) {
            return Err(EngineError::InvalidQr("signature mismatch".into()));
        }
        if claims.expires_at < now {
            return Err(EngineError::InvalidQr("payload expired".into()));
        }

        let ticket = self
            .tickets
            .by_code(&claims.ticket_code)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("ticket {}", claims.ticket_code)))?;
        if ticket.status != TicketStatus::Valid {
            return Err(EngineError::rejected(Rejection::TicketNotUsable {
                status: ticket.status.as_str().into(),
            }));
        }
        Ok(claims)
    }
}

fn sign(claims_json: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(claims_json.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn verify_signature(claims_json: &str, signature: &str, secret: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(claims_json.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_round_trip() {
        let sig = sign("{\"a\":1}", "secret");
        assert!(verify_signature("{\"a\":1}", &sig, "secret"));
        assert!(!verify_signature("{\"a\":2}", &sig, "secret"));
        assert!(!verify_signature("{\"a\":1}", &sig, "other"));
        assert!(!verify_signature("{\"a\":1}", "zz-not-hex", "secret"));
    }

    #[test]
    fn test_ticket_hash_binds_event() {
        let event_a = Uuid::new_v4();
        let event_b = Uuid::new_v4();
        let h1 = ticket_security_hash("TKT-1", event_a, "s");
        assert_eq!(h1, ticket_security_hash("TKT-1", event_a, "s"));
        assert_ne!(h1, ticket_security_hash("TKT-1", event_b, "s"));
        assert_ne!(h1, ticket_security_hash("TKT-2", event_a, "s"));
    }

    #[test]
    fn test_rate_limiter_window() {
        let now = Utc::now();
        let limiter = RateLimiter::new(2, 60);
        assert!(limiter.check("u1", now).is_ok());
        assert!(limiter.check("u1", now).is_ok());
        assert!(matches!(
            limiter.check("u1", now),
            Err(EngineError::RateLimited(_))
        ));
        // Another key is unaffected.
        assert!(limiter.check("u2", now).is_ok());
        // A new window opens after the period lapses.
        let later = now + Duration::seconds(61);
        assert!(limiter.check("u1", later).is_ok());
    }
}
