//! Schema-bound codec handle
//!
//! [`Codec`] is the primary entry point: it owns a [`Registry`] built from
//! one descriptor set and a fixed 64-bit integer policy, and exposes decode
//! and encode calls addressed by fully-qualified message type name. The
//! handle holds no per-call state, so one codec can serve concurrent calls
//! and be built once per schema rather than per message.

use prost_types::FileDescriptorSet;

use crate::decoder::{DecodeOptions, Decoder};
use crate::encoder::Encoder;
use crate::error::Result;
use crate::registry::Registry;
use crate::value::Value;

/// A decode/encode facade over one schema registry
#[derive(Debug)]
pub struct Codec {
    registry: Registry,
    preserve_int64: bool,
}

impl Codec {
    /// Build a codec from serialized `FileDescriptorSet` bytes
    ///
    /// With `preserve_int64`, 64-bit integer fields decode to exact decimal
    /// strings; without it they decode to numbers, losing precision past
    /// 2^53.
    pub fn new(descriptor_bytes: &[u8], preserve_int64: bool) -> Result<Self> {
        Ok(Self {
            registry: Registry::from_bytes(descriptor_bytes)?,
            preserve_int64,
        })
    }

    /// Build a codec from an already-parsed descriptor set
    pub fn from_descriptor_set(set: &FileDescriptorSet, preserve_int64: bool) -> Result<Self> {
        Ok(Self {
            registry: Registry::from_descriptor_set(set)?,
            preserve_int64,
        })
    }

    /// The schema registry this codec resolves names against
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Whether 64-bit integers decode to exact decimal strings
    pub fn preserve_int64(&self) -> bool {
        self.preserve_int64
    }

    /// Decode wire bytes as the named message type, with default options
    pub fn decode(&self, schema: &str, bytes: &[u8]) -> Result<Value> {
        self.decode_with(schema, bytes, DecodeOptions::default())
    }

    /// Decode wire bytes as the named message type
    pub fn decode_with(&self, schema: &str, bytes: &[u8], options: DecodeOptions) -> Result<Value> {
        let descriptor = self.registry.lookup(schema)?;
        Decoder::new(&self.registry, self.preserve_int64, options).decode(descriptor, bytes)
    }

    /// Decode while capturing fields absent from the schema
    ///
    /// Same as [`Codec::decode_with`] with `preserve_unknown` forced on.
    pub fn decode_with_unknown(
        &self,
        schema: &str,
        bytes: &[u8],
        options: DecodeOptions,
    ) -> Result<Value> {
        self.decode_with(
            schema,
            bytes,
            DecodeOptions {
                preserve_unknown: true,
                ..options
            },
        )
    }

    /// Encode a structured value as wire bytes of the named message type
    pub fn encode(&self, schema: &str, value: &Value) -> Result<Vec<u8>> {
        let descriptor = self.registry.lookup(schema)?;
        Encoder::new(&self.registry).encode(descriptor, value)
    }

    /// Fully-qualified names of the top-level message types this codec can
    /// address, in descriptor declaration order
    pub fn info(&self) -> Vec<String> {
        self.registry.type_names().map(String::from).collect()
    }
}
