use std::fmt;

use super::chain::SignatureChain;
use super::path::{Path, ProcessId};
use super::value::Bit;
use crate::common::crypto::Digest;

/*
    Every round each process sends every process (itself included) one
    message. The message holds one content item per leaf of the sender's
    EIG tree: the leaf's relay path, the value stored there and, in the
    authenticated variant, the chain of signatures that travelled with it.
    The receiver files each item under path + sender in its own tree.
*/

pub trait Hashable {
    fn hash(&self) -> Digest;
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Content {
    path: Path,
    value: Option<Bit>,
    signature: Option<SignatureChain>,
}

impl Content {
    pub fn new(path: Path, value: Option<Bit>, signature: Option<SignatureChain>) -> Self {
        Content {
            path,
            value,
            signature,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn value(&self) -> Option<Bit> {
        self.value
    }

    pub fn set_value(&mut self, value: Option<Bit>) {
        self.value = value;
    }

    pub fn signature(&self) -> Option<&SignatureChain> {
        self.signature.as_ref()
    }

    pub fn set_signature(&mut self, signature: Option<SignatureChain>) {
        self.signature = signature;
    }

    pub fn take_signature(&mut self) -> Option<SignatureChain> {
        self.signature.take()
    }

    pub fn into_parts(self) -> (Path, Option<Bit>, Option<SignatureChain>) {
        (self.path, self.value, self.signature)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    sender: ProcessId,
    contents: Vec<Content>,
}

impl Message {
    pub fn new(sender: ProcessId, contents: Vec<Content>) -> Self {
        Message { sender, contents }
    }

    pub fn sender(&self) -> ProcessId {
        self.sender
    }

    pub fn contents(&self) -> &[Content] {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut [Content] {
        &mut self.contents
    }

    pub fn into_contents(self) -> Vec<Content> {
        self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value.map_or_else(|| "None".to_string(), |v| v.to_string());
        write!(f, "path: {}, val: {}", self.path, value)?;
        if let Some(chain) = &self.signature {
            write!(f, ", signatures: {}", chain.len())?;
        }
        Ok(())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sender: {}", self.sender)?;
        for content in &self.contents {
            write!(f, "\n{}", content)?;
        }
        Ok(())
    }
}
