use std::collections::HashMap;

use tracing::debug;

use crate::error::{FrameError, Result};
use crate::message::{Message, MsgFactory};

/// Builds a fresh, default-valued message.
pub type MsgCtor = fn() -> Box<dyn Message>;

/// Controls message registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegistryConfig {
    /// When true, several message types may share one id. The id layer
    /// then tries them in registration order until one reads cleanly.
    pub allow_multiple_per_id: bool,
}

/// Id-keyed registry of message constructors.
#[derive(Debug, Clone, Default)]
pub struct MsgRegistry {
    ctors: HashMap<u64, Vec<MsgCtor>>,
    config: RegistryConfig,
}

impl MsgRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            ctors: HashMap::new(),
            config,
        }
    }

    /// Register a message type. The id is taken from a sample instance.
    pub fn register(&mut self, ctor: MsgCtor) -> Result<u64> {
        let sample = ctor();
        let id = sample.id();
        let entry = self.ctors.entry(id).or_default();
        if !entry.is_empty() && !self.config.allow_multiple_per_id {
            return Err(FrameError::DuplicateId(id));
        }
        debug!(id, name = sample.name(), "registered message");
        entry.push(ctor);
        Ok(id)
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, ctor: MsgCtor) -> Result<Self> {
        self.register(ctor)?;
        Ok(self)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ctors.contains_key(&id)
    }

    /// Number of message types registered for `id`.
    pub fn count(&self, id: u64) -> usize {
        self.ctors.get(&id).map_or(0, Vec::len)
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.ctors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.ctors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ctors.is_empty()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl MsgFactory for MsgRegistry {
    fn create(&self, id: u64, idx: usize) -> Option<Box<dyn Message>> {
        self.ctors.get(&id)?.get(idx).map(|ctor| ctor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::FieldsMessage;
    use wirekit_field::IntValue;

    fn short_ping() -> Box<dyn Message> {
        Box::new(FieldsMessage::new(1, "ShortPing", IntValue::<u8>::new(0)))
    }

    fn long_ping() -> Box<dyn Message> {
        Box::new(FieldsMessage::new(1, "LongPing", IntValue::<u32>::new(0)))
    }

    fn status() -> Box<dyn Message> {
        Box::new(FieldsMessage::new(9, "Status", IntValue::<u16>::new(0)))
    }

    #[test]
    fn register_and_create() {
        let mut registry = MsgRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.register(short_ping).unwrap(), 1);
        assert_eq!(registry.register(status).unwrap(), 9);

        assert_eq!(registry.ids(), vec![1, 9]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(9));
        assert_eq!(registry.create(9, 0).map(|m| m.name()), Some("Status"));
        assert!(registry.create(9, 1).is_none());
        assert!(registry.create(2, 0).is_none());
    }

    #[test]
    fn duplicate_id_rejected_by_default() {
        let mut registry = MsgRegistry::new();
        registry.register(short_ping).unwrap();
        let err = registry.register(long_ping).unwrap_err();
        assert!(matches!(err, FrameError::DuplicateId(1)));
        assert_eq!(registry.count(1), 1);
    }

    #[test]
    fn multiple_per_id_keeps_registration_order() {
        let registry = MsgRegistry::with_config(RegistryConfig {
            allow_multiple_per_id: true,
        })
        .with(short_ping)
        .and_then(|r| r.with(long_ping))
        .unwrap();

        assert_eq!(registry.count(1), 2);
        assert_eq!(registry.create(1, 0).map(|m| m.name()), Some("ShortPing"));
        assert_eq!(registry.create(1, 1).map(|m| m.name()), Some("LongPing"));
        assert!(registry.create(1, 2).is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_from_json() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{"allow_multiple_per_id":true}"#).unwrap();
        assert!(config.allow_multiple_per_id);
    }
}
