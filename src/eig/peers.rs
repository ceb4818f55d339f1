use crate::common::crypto::Pubkey;

use super::path::{ProcessId, SENTINEL};

/// Public keys of every participant, indexed by process id.
///
/// Built once by the simulation and shared read-only afterwards. Entry `i`
/// is participant `i`'s own key.
#[derive(Debug, Clone, Default)]
pub struct PublicKeyRegistry {
    pub members: Vec<Pubkey>,
}

impl PublicKeyRegistry {
    pub fn new(members: Vec<Pubkey>) -> Self {
        PublicKeyRegistry { members }
    }

    pub fn get(&self, id: ProcessId) -> Option<&Pubkey> {
        if id == SENTINEL {
            return None;
        }
        self.members.get(id as usize - 1)
    }

    pub fn is_member(&self, pubkey: &Pubkey) -> bool {
        self.members.contains(pubkey)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
