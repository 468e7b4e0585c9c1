//! Signed cookie codec for the preference and session records.
//!
//! Values are `base64(json)`, followed by `.` and an unpadded base64
//! HMAC-SHA256 of that payload when signing secrets are configured. Decoding
//! never fails: absent, malformed or badly signed cookies yield the record's
//! default.

use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{
    Engine,
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD},
};
use hmac::{Hmac, Mac};
use serde::{Serialize, de::DeserializeOwned};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::config::CookieSettings;
use crate::domain::session::{Preferences, SessionCookie};

type HmacSha256 = Hmac<Sha256>;

pub const PREFERENCES_COOKIE: &str = "user-prefs";
pub const SESSION_COOKIE: &str = "supabase-user";

/// A record stored in a single named cookie.
pub trait CookieRecord: Serialize + DeserializeOwned + Default {
    const NAME: &'static str;
    const HTTP_ONLY: bool;

    fn max_age(settings: &CookieSettings) -> Duration;
}

impl CookieRecord for Preferences {
    const NAME: &'static str = PREFERENCES_COOKIE;
    const HTTP_ONLY: bool = false;

    fn max_age(settings: &CookieSettings) -> Duration {
        settings.prefs_max_age
    }
}

impl CookieRecord for SessionCookie {
    const NAME: &'static str = SESSION_COOKIE;
    const HTTP_ONLY: bool = true;

    fn max_age(settings: &CookieSettings) -> Duration {
        settings.session_max_age
    }
}

#[derive(Debug, Clone)]
pub struct CookieCodec {
    settings: CookieSettings,
}

impl CookieCodec {
    pub fn new(settings: CookieSettings) -> Self {
        Self { settings }
    }

    pub fn decode<T: CookieRecord>(&self, jar: &CookieJar) -> T {
        jar.get(T::NAME)
            .map(|cookie| self.decode_value(cookie.value()))
            .unwrap_or_default()
    }

    pub fn decode_value<T: CookieRecord>(&self, raw: &str) -> T {
        let Some(payload) = self.unsign(raw) else {
            debug!(cookie = T::NAME, "cookie signature rejected");
            return T::default();
        };

        STANDARD
            .decode(payload)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_else(|| {
                debug!(cookie = T::NAME, "cookie payload could not be decoded");
                T::default()
            })
    }

    pub fn encode_value<T: CookieRecord>(&self, record: &T) -> String {
        // Serializing these plain records cannot fail; fall back to an empty object regardless.
        let json = serde_json::to_vec(record).unwrap_or_else(|_| b"{}".to_vec());
        let payload = STANDARD.encode(json);
        match self.settings.secrets.first() {
            Some(secret) => format!("{payload}.{}", sign(secret.as_bytes(), &payload)),
            None => payload,
        }
    }

    pub fn encode<T: CookieRecord>(&self, record: &T) -> Cookie<'static> {
        self.build(
            T::NAME,
            self.encode_value(record),
            T::max_age(&self.settings),
            T::HTTP_ONLY,
        )
    }

    /// An emptied cookie that expires immediately.
    pub fn clear<T: CookieRecord>(&self) -> Cookie<'static> {
        self.build(
            T::NAME,
            self.encode_value(&T::default()),
            Duration::ZERO,
            T::HTTP_ONLY,
        )
    }

    fn build(
        &self,
        name: &'static str,
        value: String,
        max_age: Duration,
        http_only: bool,
    ) -> Cookie<'static> {
        let seconds = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        let max_age = time::Duration::seconds(seconds);
        Cookie::build((name, value))
            .path("/")
            .max_age(max_age)
            .http_only(http_only)
            .same_site(SameSite::Lax)
            .secure(self.settings.secure)
            .build()
    }

    fn unsign<'a>(&self, raw: &'a str) -> Option<&'a str> {
        if self.settings.secrets.is_empty() {
            return Some(raw);
        }

        let (payload, signature) = raw.rsplit_once('.')?;
        let verified = self.settings.secrets.iter().any(|secret| {
            let expected = sign(secret.as_bytes(), payload);
            bool::from(expected.as_bytes().ct_eq(signature.as_bytes()))
        });
        verified.then_some(payload)
    }
}

fn sign(secret: &[u8], payload: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length.
        Err(_) => return String::new(),
    };
    mac.update(payload.as_bytes());
    STANDARD_NO_PAD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(secrets: &[&str]) -> CookieCodec {
        CookieCodec::new(CookieSettings {
            secrets: secrets.iter().map(|s| s.to_string()).collect(),
            ..CookieSettings::default()
        })
    }

    #[test]
    fn absent_cookie_decodes_to_default() {
        let jar = CookieJar::new();
        let prefs: Preferences = codec(&["s3cret"]).decode(&jar);
        let session: SessionCookie = codec(&[]).decode(&jar);

        assert_eq!(prefs, Preferences::default());
        assert!(!prefs.cacheable);
        assert_eq!(session.token, None);
    }

    #[test]
    fn round_trip_preserves_records() {
        for codec in [codec(&[]), codec(&["s3cret"])] {
            let prefs = Preferences { cacheable: true };
            let value = codec.encode_value(&prefs);
            assert_eq!(codec.decode_value::<Preferences>(&value), prefs);

            let session = SessionCookie::with_token("jwt-token");
            let value = codec.encode_value(&session);
            assert_eq!(codec.decode_value::<SessionCookie>(&value), session);
        }
    }

    #[test]
    fn unsigned_value_matches_plain_base64_json() {
        let value = codec(&[]).encode_value(&Preferences { cacheable: true });
        assert_eq!(value, STANDARD.encode("{\"cacheable\":true}"));
    }

    #[test]
    fn tampered_signature_yields_default() {
        let codec = codec(&["s3cret"]);
        let value = codec.encode_value(&Preferences { cacheable: true });
        let (payload, _) = value.rsplit_once('.').expect("signed value");

        let forged = format!("{payload}.AAAA");
        assert_eq!(
            codec.decode_value::<Preferences>(&forged),
            Preferences::default()
        );
        assert_eq!(
            codec.decode_value::<Preferences>(payload),
            Preferences::default()
        );
    }

    #[test]
    fn malformed_values_yield_default() {
        let codec = codec(&[]);
        for raw in ["", "%%%", "bm90IGpzb24=", "W10="] {
            assert_eq!(
                codec.decode_value::<SessionCookie>(raw),
                SessionCookie::default()
            );
        }
    }

    #[test]
    fn rotated_secret_still_verifies() {
        let old = codec(&["old"]);
        let value = old.encode_value(&SessionCookie::with_token("t"));

        let rotated = codec(&["new", "old"]);
        assert_eq!(
            rotated.decode_value::<SessionCookie>(&value).token(),
            Some("t")
        );
    }

    #[test]
    fn cookie_attributes_follow_record_kind() {
        let codec = codec(&[]);
        let prefs = codec.encode(&Preferences { cacheable: true });
        assert_eq!(prefs.name(), "user-prefs");
        assert_eq!(prefs.path(), Some("/"));
        assert_eq!(prefs.max_age(), Some(time::Duration::seconds(604_800)));
        assert_eq!(prefs.http_only(), Some(false));

        let session = codec.encode(&SessionCookie::with_token("t"));
        assert_eq!(session.name(), "supabase-user");
        assert_eq!(session.max_age(), Some(time::Duration::seconds(86_400)));
        assert_eq!(session.http_only(), Some(true));

        let cleared = codec.clear::<SessionCookie>();
        assert_eq!(cleared.max_age(), Some(time::Duration::ZERO));
        assert_eq!(codec.decode_value::<SessionCookie>(cleared.value()).token, None);
    }

    #[test]
    fn jar_lookup_uses_cookie_name() {
        let codec = codec(&[]);
        let jar = CookieJar::new().add(codec.encode(&Preferences { cacheable: true }));
        assert!(codec.decode::<Preferences>(&jar).cacheable);
    }
}
