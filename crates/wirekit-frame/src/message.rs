//! Message objects carried by frames.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use bytes::BufMut;
use wirekit_field::{Field, Result};

/// A protocol message: an id plus a payload that reads and writes itself.
///
/// Frame layers only see messages through this trait. Applications recover
/// the concrete type with [`downcast_ref`](trait.Message.html#method.downcast_ref).
pub trait Message: Any + fmt::Debug {
    /// Numeric id written by the id layer.
    fn id(&self) -> u64;

    /// Human readable name, for logs.
    fn name(&self) -> &'static str {
        ""
    }

    /// Serialized payload length.
    fn length(&self) -> usize;

    fn read(&mut self, buf: &mut &[u8]) -> Result<()>;

    fn write(&self, buf: &mut dyn BufMut) -> Result<()>;

    fn valid(&self) -> bool {
        true
    }

    fn refresh(&mut self) -> bool {
        false
    }

    /// A value carried by the frame rather than the payload, such as a
    /// protocol version.
    fn transport_value(&self, _key: &str) -> Option<u64> {
        None
    }

    fn set_transport_value(&mut self, _key: &str, _value: u64) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Message {
    pub fn downcast_ref<M: Message>(&self) -> Option<&M> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<M: Message>(&mut self) -> Option<&mut M> {
        self.as_any_mut().downcast_mut()
    }

    pub fn is<M: Message>(&self) -> bool {
        self.as_any().is::<M>()
    }
}

/// Creates message objects for the id layer.
///
/// Several message types may share an id; `idx` selects among them in
/// registration order. Returns `None` once `idx` runs past the last one.
pub trait MsgFactory {
    fn create(&self, id: u64, idx: usize) -> Option<Box<dyn Message>>;
}

impl<F> MsgFactory for F
where
    F: Fn(u64, usize) -> Option<Box<dyn Message>>,
{
    fn create(&self, id: u64, idx: usize) -> Option<Box<dyn Message>> {
        self(id, idx)
    }
}

/// A message whose payload is a single field, usually a [`Bundle`].
///
/// [`Bundle`]: wirekit_field::Bundle
#[derive(Debug, Clone, PartialEq)]
pub struct FieldsMessage<F> {
    id: u64,
    name: &'static str,
    fields: F,
    transport: BTreeMap<String, u64>,
}

impl<F: Field> FieldsMessage<F> {
    pub fn new(id: u64, name: &'static str, fields: F) -> Self {
        Self {
            id,
            name,
            fields,
            transport: BTreeMap::new(),
        }
    }

    pub fn fields(&self) -> &F {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut F {
        &mut self.fields
    }

    pub fn into_fields(self) -> F {
        self.fields
    }

    pub fn with_transport_value(mut self, key: &str, value: u64) -> Self {
        self.transport.insert(key.to_string(), value);
        self
    }
}

impl<F> Message for FieldsMessage<F>
where
    F: Field + fmt::Debug + 'static,
{
    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn length(&self) -> usize {
        self.fields.length()
    }

    fn read(&mut self, buf: &mut &[u8]) -> Result<()> {
        self.fields.read(buf)
    }

    fn write(&self, buf: &mut dyn BufMut) -> Result<()> {
        self.fields.write(buf)
    }

    fn valid(&self) -> bool {
        self.fields.valid()
    }

    fn refresh(&mut self) -> bool {
        self.fields.refresh()
    }

    fn transport_value(&self, key: &str) -> Option<u64> {
        self.transport.get(key).copied()
    }

    fn set_transport_value(&mut self, key: &str, value: u64) {
        self.transport.insert(key.to_string(), value);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
