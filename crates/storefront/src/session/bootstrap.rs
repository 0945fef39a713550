//! Single-flight session bootstrap.
//!
//! A cart session is a (token, nonce) pair the server hands out on any cart
//! read. Many operations may discover at once that no usable pair is cached;
//! they all share one bootstrap request instead of each issuing their own.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use rooh_core::ActiveSession;
use tracing::{debug, info, instrument};

use super::SessionStore;
use crate::store_api::{CartTransport, StoreApiError, StoreRequest, StoreResponse};

type BootstrapFlight = Shared<BoxFuture<'static, Result<ActiveSession, Arc<StoreApiError>>>>;

/// Obtains a valid cart session, coalescing concurrent attempts.
#[derive(Clone)]
pub struct SessionBootstrapper {
    inner: Arc<BootstrapperInner>,
}

struct BootstrapperInner {
    transport: Arc<dyn CartTransport>,
    store: Arc<dyn SessionStore>,
    in_flight: Mutex<Option<BootstrapFlight>>,
}

impl SessionBootstrapper {
    #[must_use]
    pub fn new(transport: Arc<dyn CartTransport>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            inner: Arc::new(BootstrapperInner {
                transport,
                store,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Return a usable (token, nonce) pair.
    ///
    /// A complete cached pair is returned without touching the network.
    /// Otherwise one `GET cart` is issued and every concurrent caller waits
    /// on that same request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreApiError::Bootstrap`] wrapping the shared cause when the
    /// bootstrap request fails or does not yield both credentials. Nothing is
    /// cached on failure, so the next call starts a fresh attempt.
    pub async fn ensure_session(&self) -> Result<ActiveSession, StoreApiError> {
        if let Some(active) = self.inner.store.load().into_active() {
            return Ok(active);
        }

        self.join_or_start()
            .await
            .map_err(StoreApiError::Bootstrap)
    }

    /// Record credentials carried by any response.
    pub fn capture(&self, response: &StoreResponse) {
        if response.credentials.is_empty() {
            return;
        }
        debug!(
            cart_token = response.credentials.cart_token.is_some(),
            nonce = response.credentials.nonce.is_some(),
            "Captured cart session credentials"
        );
        self.inner.store.save(response.credentials.clone());
    }

    /// Forget the cached session so the next mutation bootstraps again.
    pub fn reset(&self) {
        self.inner.store.clear();
    }

    /// Whether a bootstrap request is currently outstanding.
    #[must_use]
    pub fn is_bootstrapping(&self) -> bool {
        lock_slot(&self.inner.in_flight).is_some()
    }

    /// Join the outstanding bootstrap or start one.
    ///
    /// The slot is checked and filled under one lock acquisition with no
    /// suspension in between.
    fn join_or_start(&self) -> BootstrapFlight {
        let mut slot = lock_slot(&self.inner.in_flight);
        if let Some(flight) = slot.as_ref() {
            debug!("Joining in-flight cart session bootstrap");
            return flight.clone();
        }

        let transport = Arc::clone(&self.inner.transport);
        let store = Arc::clone(&self.inner.store);
        let owner: Weak<BootstrapperInner> = Arc::downgrade(&self.inner);

        let flight = async move {
            let result = bootstrap(transport.as_ref(), store.as_ref())
                .await
                .map_err(Arc::new);
            if let Some(owner) = owner.upgrade() {
                *lock_slot(&owner.in_flight) = None;
            }
            result
        }
        .boxed()
        .shared();

        *slot = Some(flight.clone());
        flight
    }
}

fn lock_slot(
    slot: &Mutex<Option<BootstrapFlight>>,
) -> std::sync::MutexGuard<'_, Option<BootstrapFlight>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One bootstrap round trip: read the cart and keep the credentials it sends.
#[instrument(skip_all)]
async fn bootstrap(
    transport: &dyn CartTransport,
    store: &dyn SessionStore,
) -> Result<ActiveSession, StoreApiError> {
    let existing = store.load().cart_token;
    let response = transport
        .send(StoreRequest::get("cart").with_cart_token(existing))
        .await?;

    if !response.status.is_success() {
        return Err(StoreApiError::from_response(&response));
    }

    let credentials = response.credentials;
    if credentials.nonce.is_none() {
        return Err(StoreApiError::MissingCredentials("nonce"));
    }
    store.save(credentials);

    let active = store
        .load()
        .into_active()
        .ok_or(StoreApiError::MissingCredentials("cart token"))?;
    info!("Cart session bootstrapped");
    Ok(active)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use rooh_core::CredentialUpdate;

    use super::*;
    use crate::session::MemorySessionStore;
    use crate::store_api::testing::{ScriptedTransport, cart_json};

    fn bootstrapper(transport: &Arc<ScriptedTransport>) -> (SessionBootstrapper, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let bootstrapper = SessionBootstrapper::new(
            Arc::clone(transport) as Arc<dyn CartTransport>,
            Arc::clone(&store) as Arc<dyn SessionStore>,
        );
        (bootstrapper, store)
    }

    #[tokio::test]
    async fn test_cached_pair_skips_network() {
        let transport = Arc::new(ScriptedTransport::new());
        let (bootstrapper, store) = bootstrapper(&transport);
        store.save(CredentialUpdate::from_raw(Some("tok"), Some("n1")));

        let active = bootstrapper.ensure_session().await.unwrap();
        assert_eq!(active.nonce.as_str(), "n1");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_stores_credentials() {
        let transport = Arc::new(ScriptedTransport::new());
        let (bootstrapper, store) = bootstrapper(&transport);
        transport.push_ok(cart_json(&[]), Some("tok"), Some("n1"));

        let active = bootstrapper.ensure_session().await.unwrap();
        assert_eq!(active.cart_token.as_str(), "tok");
        assert_eq!(store.load().nonce.unwrap().as_str(), "n1");
        assert!(!bootstrapper.is_bootstrapping());
    }

    #[tokio::test]
    async fn test_bootstrap_reuses_existing_token() {
        let transport = Arc::new(ScriptedTransport::new());
        let (bootstrapper, store) = bootstrapper(&transport);
        store.save(CredentialUpdate::from_raw(Some("tok"), None));
        transport.push_ok(cart_json(&[]), None, Some("n1"));

        let active = bootstrapper.ensure_session().await.unwrap();
        assert_eq!(active.cart_token.as_str(), "tok");
        let sent = transport.requests();
        assert_eq!(sent[0].cart_token.as_ref().unwrap().as_str(), "tok");
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_request() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.set_delay(Duration::from_millis(50));
        let (bootstrapper, _store) = bootstrapper(&transport);
        transport.push_ok(cart_json(&[]), Some("tok"), Some("n1"));

        let calls = (0..5).map(|_| {
            let bootstrapper = bootstrapper.clone();
            async move { bootstrapper.ensure_session().await }
        });
        let results = futures::future::join_all(calls).await;

        assert_eq!(transport.requests().len(), 1);
        for result in results {
            assert_eq!(result.unwrap().nonce.as_str(), "n1");
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_failure() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.set_delay(Duration::from_millis(50));
        let (bootstrapper, store) = bootstrapper(&transport);
        transport.push_unreachable();

        let calls = (0..3).map(|_| {
            let bootstrapper = bootstrapper.clone();
            async move { bootstrapper.ensure_session().await }
        });
        let results = futures::future::join_all(calls).await;

        assert_eq!(transport.requests().len(), 1);
        for result in results {
            match result {
                Err(StoreApiError::Bootstrap(inner)) => {
                    assert!(matches!(inner.as_ref(), StoreApiError::Http(_)));
                    assert!(inner.status().is_none());
                }
                other => panic!("expected bootstrap failure, got {other:?}"),
            }
        }
        assert_eq!(store.load(), rooh_core::SessionCredentials::default());
    }

    #[tokio::test]
    async fn test_failure_is_not_sticky() {
        let transport = Arc::new(ScriptedTransport::new());
        let (bootstrapper, _store) = bootstrapper(&transport);
        transport.push_unreachable();
        transport.push_ok(cart_json(&[]), Some("tok"), Some("n1"));

        assert!(bootstrapper.ensure_session().await.is_err());
        assert!(bootstrapper.ensure_session().await.is_ok());
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_nonce_fails_without_caching() {
        let transport = Arc::new(ScriptedTransport::new());
        let (bootstrapper, store) = bootstrapper(&transport);
        transport.push_ok(cart_json(&[]), Some("tok"), None);

        let err = bootstrapper.ensure_session().await.unwrap_err();
        assert!(err.to_string().contains("nonce"));
        assert!(store.load().cart_token.is_none());
    }

    #[tokio::test]
    async fn test_reset_forces_new_bootstrap() {
        let transport = Arc::new(ScriptedTransport::new());
        let (bootstrapper, store) = bootstrapper(&transport);
        store.save(CredentialUpdate::from_raw(Some("tok"), Some("n1")));
        transport.push_ok(cart_json(&[]), Some("tok2"), Some("n2"));

        bootstrapper.reset();
        let active = bootstrapper.ensure_session().await.unwrap();
        assert_eq!(active.cart_token.as_str(), "tok2");
        assert!(transport.requests()[0].cart_token.is_none());
    }
}
