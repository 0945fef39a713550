//! Cart session credentials.
//!
//! The Store API identifies a cart with a `Cart-Token` and protects mutating
//! requests with a short-lived `Nonce`. The two are captured independently
//! from responses and expire independently: a stale nonce never invalidates
//! the token it was issued with.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default nonce lifetime (10 minutes).
pub const DEFAULT_NONCE_TTL_SECS: i64 = 10 * 60;

/// Macro to define an opaque credential string.
///
/// The generated type never prints its value through `Debug`, so credentials
/// can be logged as part of larger structs without leaking.
macro_rules! define_credential {
    ($name:ident) => {
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a credential value, rejecting empty or whitespace-only input.
            #[must_use]
            pub fn parse(value: impl Into<String>) -> Option<Self> {
                let value = value.into();
                if value.trim().is_empty() {
                    None
                } else {
                    Some(Self(value))
                }
            }

            /// Returns the raw credential for attaching to a request.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(concat!(stringify!($name), "([REDACTED])"))
            }
        }
    };
}

define_credential!(CartToken);
define_credential!(Nonce);

/// A nonce together with the moment it was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedNonce {
    pub value: Nonce,
    pub issued_at: DateTime<Utc>,
}

impl IssuedNonce {
    /// Whether the nonce is still inside its lifetime at `now`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.issued_at) < ttl
    }
}

/// Credentials captured from a single response.
///
/// Either field may be absent; absent fields leave the cached value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialUpdate {
    pub cart_token: Option<CartToken>,
    pub nonce: Option<Nonce>,
}

impl CredentialUpdate {
    /// Build an update from raw values, dropping empty ones.
    #[must_use]
    pub fn from_raw(cart_token: Option<&str>, nonce: Option<&str>) -> Self {
        Self {
            cart_token: cart_token.and_then(CartToken::parse),
            nonce: nonce.and_then(Nonce::parse),
        }
    }

    /// True when the response carried no credentials at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cart_token.is_none() && self.nonce.is_none()
    }
}

/// The persisted session record.
///
/// This is the exact shape written to the backing key-value medium.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(default)]
    pub cart_token: Option<CartToken>,
    #[serde(default)]
    pub nonce: Option<IssuedNonce>,
}

impl StoredSession {
    /// Merge freshly captured credentials into the record.
    ///
    /// A token-only update keeps the cached nonce and vice versa. A new nonce
    /// is stamped with `now`.
    pub fn merge(&mut self, update: CredentialUpdate, now: DateTime<Utc>) {
        if let Some(token) = update.cart_token {
            self.cart_token = Some(token);
        }
        if let Some(nonce) = update.nonce {
            self.nonce = Some(IssuedNonce {
                value: nonce,
                issued_at: now,
            });
        }
    }

    /// Credentials usable at `now`. A stale nonce reads as absent; the token
    /// is returned regardless.
    #[must_use]
    pub fn credentials(&self, now: DateTime<Utc>, ttl: Duration) -> SessionCredentials {
        SessionCredentials {
            cart_token: self.cart_token.clone(),
            nonce: self
                .nonce
                .as_ref()
                .filter(|nonce| nonce.is_fresh(now, ttl))
                .map(|nonce| nonce.value.clone()),
        }
    }
}

/// Credentials as seen by the rest of the system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCredentials {
    pub cart_token: Option<CartToken>,
    pub nonce: Option<Nonce>,
}

impl SessionCredentials {
    /// Returns the pair only when both halves are present.
    #[must_use]
    pub fn into_active(self) -> Option<ActiveSession> {
        match (self.cart_token, self.nonce) {
            (Some(cart_token), Some(nonce)) => Some(ActiveSession { cart_token, nonce }),
            _ => None,
        }
    }
}

/// A complete, currently valid (token, nonce) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub cart_token: CartToken,
    pub nonce: Nonce,
}
