use sha2::{Digest as ShaDigest, Sha512};
use tracing::debug;

use super::message::{Content, Hashable, Message};
use super::path::ProcessId;
use super::peers::PublicKeyRegistry;
use super::value::Bit;
use crate::common::crypto::{Digest, Keypair, Signature};
use crate::common::error::VerificationError;

/*
    A signature chain is the chain of custody of one relayed value. The
    originator signs the value, and every process that relays it signs
    everything signed so far. Link k therefore covers the value and links
    0..k, and the verifier peels links from the outermost one (the process
    that handed it over) back to the originator, each against the public
    key of the process at that position of the relay path.

    A relay can change the value it forwards, but the change shows up as a
    mismatch with the value sealed at the bottom of the chain. It cannot
    rewrite that sealed value without a key it does not hold.
*/

pub const DOMAIN_EIG_CHAIN: &[u8] = b"eig_chain:";

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SignatureChain {
    value: Bit,
    links: Vec<Signature>,
}

impl SignatureChain {
    /// An unsigned chain over `value`.
    pub fn new(value: Bit) -> Self {
        SignatureChain {
            value,
            links: Vec::new(),
        }
    }

    pub fn value(&self) -> Bit {
        self.value
    }

    pub fn links(&self) -> &[Signature] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Seals everything signed so far under one more key.
    pub fn signed_by(mut self, keypair: &Keypair) -> Self {
        let digest = self.hash();
        self.links.push(keypair.sign(&digest));
        self
    }

    /// Unwraps the chain along `signers` (originator first) and returns the
    /// sealed value.
    pub fn verify(
        &self,
        signers: &[ProcessId],
        registry: &PublicKeyRegistry,
    ) -> Result<Bit, VerificationError> {
        if self.links.len() != signers.len() {
            return Err(VerificationError::ChainLength {
                links: self.links.len(),
                hops: signers.len(),
            });
        }

        for (k, signer) in signers.iter().enumerate().rev() {
            let key = registry
                .get(*signer)
                .ok_or(VerificationError::UnknownSigner(*signer))?;
            let link = &self.links[k];
            if link.signer != *key || !link.verify(&link_digest(self.value, &self.links[..k])) {
                return Err(VerificationError::BadSignature(*signer));
            }
        }

        Ok(self.value)
    }
}

impl Hashable for SignatureChain {
    fn hash(&self) -> Digest {
        link_digest(self.value, &self.links)
    }
}

fn link_digest(value: Bit, links: &[Signature]) -> Digest {
    let mut hasher = Sha512::new();
    hasher.update(DOMAIN_EIG_CHAIN);
    hasher.update([value.as_u8()]);
    for link in links {
        hasher.update(link.signer.as_ref());
        hasher.update(link.sig);
    }
    let result = hasher.finalize();
    let mut digest = [0u8; 64];
    digest.copy_from_slice(&result[..]);
    digest
}

/// Checks one content item received from `sender`.
///
/// The signers are the item's relay path followed by the sender. The item
/// passes when every link verifies and the sealed value equals the value
/// the item declares.
pub fn verify_content(
    content: &Content,
    sender: ProcessId,
    registry: &PublicKeyRegistry,
) -> Result<(), VerificationError> {
    let declared = content.value().ok_or(VerificationError::UnsetValue)?;
    let chain = content.signature().ok_or(VerificationError::MissingChain)?;

    let mut signers = content.path().ids().to_vec();
    signers.push(sender);

    let sealed = chain.verify(&signers, registry)?;
    if sealed != declared {
        return Err(VerificationError::ValueMismatch);
    }
    Ok(())
}

/// Drops every item of `message` that fails `verify_content`.
pub fn filter_message(
    message: Message,
    registry: &PublicKeyRegistry,
    receiver: ProcessId,
) -> Message {
    let sender = message.sender();
    let accepted = message
        .into_contents()
        .into_iter()
        .filter(|content| match verify_content(content, sender, registry) {
            Ok(()) => true,
            Err(reason) => {
                debug!(
                    process = receiver,
                    sender,
                    path = %content.path(),
                    %reason,
                    "Dropped content"
                );
                false
            }
        })
        .collect();
    Message::new(sender, accepted)
}
