use std::collections::BTreeMap;

use super::chain::SignatureChain;
use super::path::{Path, ProcessId};
use super::value::{Bit, Decision};

/// Position of a node in its tree's arena.
pub type NodeIndex = usize;

/// One vertex of an EIG tree: the claim of `path.last()` about the value
/// of `path[0]`, as relayed along `path`.
///
/// Children are owned through the arena and keyed by the id of the
/// process that extends the path. `parent` is only used for navigation.
#[derive(Clone, Debug)]
pub struct TreeNode {
    pub(crate) index: NodeIndex,
    pub(crate) parent: Option<NodeIndex>,
    pub(crate) proc_id: ProcessId,
    pub(crate) value: Option<Bit>,
    pub(crate) path: Path,
    pub(crate) children: BTreeMap<ProcessId, NodeIndex>,
    pub(crate) decision: Decision,
    pub(crate) authenticated: bool,
    pub(crate) signature: Option<SignatureChain>,
}

impl TreeNode {
    pub(crate) fn new(
        index: NodeIndex,
        parent: Option<NodeIndex>,
        proc_id: ProcessId,
        value: Option<Bit>,
        path: Path,
    ) -> Self {
        TreeNode {
            index,
            parent,
            proc_id,
            value,
            path,
            children: BTreeMap::new(),
            decision: Decision::Unset,
            authenticated: false,
            signature: None,
        }
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub fn proc_id(&self) -> ProcessId {
        self.proc_id
    }

    pub fn value(&self) -> Option<Bit> {
        self.value
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    pub fn children(&self) -> impl Iterator<Item = (ProcessId, NodeIndex)> + '_ {
        self.children.iter().map(|(id, index)| (*id, *index))
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn signature(&self) -> Option<&SignatureChain> {
        self.signature.as_ref()
    }
}
