//! # Per-event access filtering.
//!
//! [`AccessFilter`] decides, on the stage-1 worker and once per
//! (subscription, event) pair, whether a subscriber may receive an event.
//! Unauthorized subscribers never get a delivery task scheduled.
//!
//! ## Decision
//! - Administrative owners are always authorized.
//! - Everyone else is authorized only if the external [`AccessPolicy`]
//!   confirms the owner has access to the event's originating network.
//! - A policy error counts as *not authorized* (fail-closed), so a flaky
//!   policy backend can never leak events to unverified subscribers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::PolicyError;
use crate::events::{Event, NetworkId};
use crate::subscriptions::{Owner, Subscription};

/// Collaborator contract: network membership decisions.
#[async_trait]
pub trait AccessPolicy: Send + Sync + 'static {
    /// True when `owner` may access events originating from `network`.
    async fn has_network_access(&self, owner: &Owner, network: NetworkId)
        -> Result<bool, PolicyError>;
}

/// Decides per subscription and per event whether delivery is authorized.
#[derive(Clone)]
pub struct AccessFilter {
    policy: Arc<dyn AccessPolicy>,
}

impl AccessFilter {
    /// Creates a filter over the given policy.
    pub fn new(policy: Arc<dyn AccessPolicy>) -> Self {
        Self { policy }
    }

    /// True when `subscription` may receive `event`.
    ///
    /// Admin owners bypass the policy. Policy errors fail closed.
    pub async fn is_authorized(&self, subscription: &Subscription, event: &Event) -> bool {
        if subscription.owner.is_admin() {
            return true;
        }
        match self
            .policy
            .has_network_access(&subscription.owner, event.network)
            .await
        {
            Ok(allowed) => allowed,
            Err(err) => {
                warn!(
                    owner = %subscription.owner.id,
                    network = %event.network,
                    error = %err,
                    "access policy check failed; treating as unauthorized"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{DeviceId, EventId, OwnerId};
    use crate::session::Session;
    use crate::subscriptions::FilterKey;

    /// Grants access to exactly one network; errors when asked about network 0.
    struct OneNetworkPolicy(NetworkId);

    #[async_trait]
    impl AccessPolicy for OneNetworkPolicy {
        async fn has_network_access(
            &self,
            _owner: &Owner,
            network: NetworkId,
        ) -> Result<bool, PolicyError> {
            if network.0 == 0 {
                return Err("policy backend unavailable".into());
            }
            Ok(network == self.0)
        }
    }

    fn subscription(owner: Owner) -> Subscription {
        Subscription::new(Session::new("s1"), owner, FilterKey::Device(DeviceId(7)))
    }

    fn notification(network: u64) -> Event {
        Event::notification_created(
            EventId(1),
            DeviceId(7),
            NetworkId(network),
            serde_json::Value::Null,
        )
    }

    #[tokio::test]
    async fn admin_is_always_authorized() {
        // Policy would deny (and even error) — the admin bypass wins.
        let filter = AccessFilter::new(Arc::new(OneNetworkPolicy(NetworkId(1))));
        let sub = subscription(Owner::admin(OwnerId(1)));
        assert!(filter.is_authorized(&sub, &notification(2)).await);
        assert!(filter.is_authorized(&sub, &notification(0)).await);
    }

    #[tokio::test]
    async fn client_follows_policy_decision() {
        let filter = AccessFilter::new(Arc::new(OneNetworkPolicy(NetworkId(1))));
        let sub = subscription(Owner::client(OwnerId(1)));
        assert!(filter.is_authorized(&sub, &notification(1)).await);
        assert!(!filter.is_authorized(&sub, &notification(2)).await);
    }

    #[tokio::test]
    async fn policy_error_fails_closed() {
        let filter = AccessFilter::new(Arc::new(OneNetworkPolicy(NetworkId(1))));
        let sub = subscription(Owner::client(OwnerId(1)));
        assert!(!filter.is_authorized(&sub, &notification(0)).await);
    }
}
