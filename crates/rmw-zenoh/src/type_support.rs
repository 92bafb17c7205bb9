// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Serialization contract for message types.
//!
//! Generated code (or a hand-written codec) implements [`TypeSupport`]; the
//! rmw layer only ever moves the resulting bytes.

use crate::error::{Error, Result};

/// Codec for one message type.
pub trait TypeSupport: Send + Sync + 'static {
    type Message;

    /// Fully qualified type name, e.g. `std_msgs/msg/String`.
    fn type_name(&self) -> &str;

    fn serialize(&self, message: &Self::Message) -> Result<Vec<u8>>;

    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Message>;
}

/// Pass-through codec for pre-serialized payloads.
#[derive(Clone, Debug)]
pub struct RawTypeSupport {
    type_name: String,
}

impl RawTypeSupport {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

impl TypeSupport for RawTypeSupport {
    type Message = Vec<u8>;

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn serialize(&self, message: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(message.clone())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// UTF-8 string codec, handy for `std_msgs/msg/String`-like topics.
#[derive(Clone, Debug)]
pub struct StringTypeSupport {
    type_name: String,
}

impl StringTypeSupport {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

impl TypeSupport for StringTypeSupport {
    type Message = String;

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn serialize(&self, message: &String) -> Result<Vec<u8>> {
        Ok(message.as_bytes().to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::Serialization(format!("{}: {}", self.type_name, e)))
    }
}
