//! One live channel per role.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::info;

use super::channel::{ChannelHandle, ChannelId, Role};

#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<Role, ChannelHandle>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `handle` authoritative for `role`, returning the channel it superseded.
    pub fn register(&self, role: Role, handle: ChannelHandle) -> Option<ChannelHandle> {
        let id = handle.id();
        let previous = self.channels.write().insert(role, handle);
        match &previous {
            Some(old) if old.id() != id => {
                info!("Channel {} superseded {} as {}", id, old.id(), role)
            }
            _ => info!("Channel {} registered as {}", id, role),
        }
        previous.filter(|old| old.id() != id)
    }

    /// Clear `role` if `id` is still the channel registered for it.
    pub fn unregister(&self, role: Role, id: ChannelId) -> bool {
        let mut channels = self.channels.write();
        if channels.get(&role).is_some_and(|current| current.id() == id) {
            channels.remove(&role);
            info!("Channel {} unregistered as {}", id, role);
            true
        } else {
            false
        }
    }

    pub fn get(&self, role: Role) -> Option<ChannelHandle> {
        self.channels.read().get(&role).cloned()
    }

    pub fn is_current(&self, role: Role, id: ChannelId) -> bool {
        self.channels
            .read()
            .get(&role)
            .is_some_and(|current| current.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_supersedes() {
        let registry = ChannelRegistry::new();
        let (first, _rx1) = ChannelHandle::new();
        let (second, _rx2) = ChannelHandle::new();

        assert!(registry.register(Role::Engine, first.clone()).is_none());
        let superseded = registry.register(Role::Engine, second.clone()).unwrap();
        assert_eq!(superseded.id(), first.id());
        assert!(registry.is_current(Role::Engine, second.id()));
        assert!(!registry.is_current(Role::Engine, first.id()));
    }

    #[test]
    fn test_reregistering_same_channel_is_not_a_supersede() {
        let registry = ChannelRegistry::new();
        let (handle, _rx) = ChannelHandle::new();
        registry.register(Role::Frontend, handle.clone());
        assert!(registry.register(Role::Frontend, handle).is_none());
    }

    #[test]
    fn test_stale_unregister_keeps_current() {
        let registry = ChannelRegistry::new();
        let (first, _rx1) = ChannelHandle::new();
        let (second, _rx2) = ChannelHandle::new();
        registry.register(Role::Engine, first.clone());
        registry.register(Role::Engine, second.clone());

        assert!(!registry.unregister(Role::Engine, first.id()));
        assert!(registry.get(Role::Engine).is_some());
        assert!(registry.unregister(Role::Engine, second.id()));
        assert!(registry.get(Role::Engine).is_none());
    }
}
