use std::fmt;

/// Participant identifier. Participants are numbered from 1.
pub type ProcessId = u32;

/// Id of the tree root. Never names a participant.
pub const SENTINEL: ProcessId = 0;

/// Relay history of a value, originator first.
///
/// The sentinel root is implicit, so `depth()` is the number of hops and
/// equals the depth of the tree node the path addresses.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Path(Vec<ProcessId>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> &[ProcessId] {
        &self.0
    }

    pub fn contains(&self, id: ProcessId) -> bool {
        self.0.contains(&id)
    }

    pub fn last(&self) -> Option<ProcessId> {
        self.0.last().copied()
    }

    /// The path one hop further. Does not check for repeats; a repeated id
    /// simply never resolves against a tree.
    pub fn extended(&self, id: ProcessId) -> Path {
        let mut ids = Vec::with_capacity(self.0.len() + 1);
        ids.extend_from_slice(&self.0);
        ids.push(id);
        Path(ids)
    }

    /// Ids with the sentinel root prepended.
    pub fn rooted(&self) -> Vec<ProcessId> {
        std::iter::once(SENTINEL).chain(self.0.iter().copied()).collect()
    }

    pub fn has_repeats(&self) -> bool {
        self.0
            .iter()
            .enumerate()
            .any(|(i, id)| self.0[i + 1..].contains(id))
    }
}

impl From<Vec<ProcessId>> for Path {
    fn from(ids: Vec<ProcessId>) -> Self {
        Path(ids)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.0.iter().map(|id| id.to_string()).collect();
        write!(f, "{}", ids.join("-"))
    }
}
