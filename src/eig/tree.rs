use std::collections::VecDeque;
use std::fmt;

use tracing::trace;

use super::message::{Content, Message};
use super::node::{NodeIndex, TreeNode};
use super::path::{Path, ProcessId, SENTINEL};
use super::value::{Bit, Decision, Variant};
use crate::common::error::ConfigError;

const ROOT: NodeIndex = 0;

/// Per-process Exponential Information Gathering tree.
///
/// The root holds the owner's own input. After round `r` every leaf sits
/// at depth `r` and stores what the owner heard along that leaf's relay
/// path. Nodes live in a flat arena and refer to each other by index.
#[derive(Clone, Debug)]
pub struct EigTree {
    owner: ProcessId,
    process_count: usize,
    max_height: usize,
    variant: Variant,
    height: usize,
    nodes: Vec<TreeNode>,
}

/// What a renderer needs to draw one node.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NodeView {
    pub path: Path,
    pub value: Option<Bit>,
    pub decision: Decision,
    pub authenticated: bool,
}

impl EigTree {
    pub fn new(
        owner: ProcessId,
        process_count: usize,
        value: Bit,
        max_height: usize,
        variant: Variant,
    ) -> Self {
        let mut root = TreeNode::new(ROOT, None, SENTINEL, Some(value), Path::root());
        root.authenticated = true;

        EigTree {
            owner,
            process_count,
            max_height,
            variant,
            height: 0,
            nodes: vec![root],
        }
    }

    pub fn owner(&self) -> ProcessId {
        self.owner
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn max_height(&self) -> usize {
        self.max_height
    }

    pub fn is_complete(&self) -> bool {
        self.height >= self.max_height
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[ROOT]
    }

    pub fn node(&self, index: NodeIndex) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_at(&self, path: &Path) -> Option<&TreeNode> {
        self.resolve(path).map(|index| &self.nodes[index])
    }

    pub fn decision(&self) -> Decision {
        self.nodes[ROOT].decision
    }

    /// Gives every leaf one child per process id not yet on its path.
    pub fn add_level(&mut self) -> Result<(), ConfigError> {
        if self.is_complete() {
            return Err(ConfigError::TreeComplete {
                height: self.height,
            });
        }

        for leaf in self.leaves() {
            let path = self.nodes[leaf].path.clone();
            for id in 1..=self.process_count as ProcessId {
                if path.contains(id) {
                    continue;
                }
                let index = self.nodes.len();
                self.nodes
                    .push(TreeNode::new(index, Some(leaf), id, None, path.extended(id)));
                self.nodes[leaf].children.insert(id, index);
            }
        }
        self.height += 1;

        trace!(process = self.owner, height = self.height, nodes = self.nodes.len(), "Added tree level");
        Ok(())
    }

    /// Leaves in depth-first order, children visited by ascending id.
    fn leaves(&self) -> Vec<NodeIndex> {
        let mut leaves = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.is_leaf() {
                leaves.push(index);
            } else {
                stack.extend(node.children.values().rev());
            }
        }
        leaves
    }

    /// One content item per leaf, or a single item for the root before the
    /// tree has grown.
    pub fn to_message(&self) -> Message {
        let contents = self
            .leaves()
            .into_iter()
            .map(|index| {
                let node = &self.nodes[index];
                Content::new(node.path.clone(), node.value, node.signature.clone())
            })
            .collect();
        Message::new(self.owner, contents)
    }

    /// Files every item under its path extended by the sender. Items that
    /// address a node this tree does not have are ignored.
    pub fn apply(&mut self, message: Message) {
        let sender = message.sender();
        for content in message.into_contents() {
            let (path, value, signature) = content.into_parts();
            let target = path.extended(sender);
            let Some(index) = self.resolve(&target) else {
                trace!(process = self.owner, sender, path = %target, "Ignored content for unknown node");
                continue;
            };

            let node = &mut self.nodes[index];
            node.value = value;
            if self.variant == Variant::Authenticated {
                node.signature = signature;
                node.authenticated = true;
            }
        }
    }

    fn resolve(&self, path: &Path) -> Option<NodeIndex> {
        path.ids()
            .iter()
            .try_fold(ROOT, |index, id| self.nodes[index].children.get(id).copied())
    }

    /// Runs the decision rule from the root. Results are cached per node,
    /// so calling this again returns the first outcome.
    pub fn decide(&mut self) -> Decision {
        self.decide_node(ROOT)
    }

    fn decide_node(&mut self, index: NodeIndex) -> Decision {
        if self.nodes[index].decision != Decision::Unset {
            return self.nodes[index].decision;
        }

        let decision = match self.variant {
            Variant::Plain => self.decide_plain(index),
            Variant::Authenticated => self.decide_authenticated(index),
        };
        self.nodes[index].decision = decision;
        decision
    }

    fn decide_plain(&mut self, index: NodeIndex) -> Decision {
        let children: Vec<NodeIndex> = self.nodes[index].children.values().copied().collect();
        if children.is_empty() {
            return Decision::Decided(self.nodes[index].value.unwrap_or(Bit::Zero));
        }

        let ones = children
            .iter()
            .filter(|&&child| self.decide_node(child) == Decision::Decided(Bit::One))
            .count();
        Decision::Decided(majority(ones, children.len()))
    }

    fn decide_authenticated(&mut self, index: NodeIndex) -> Decision {
        let children: Vec<NodeIndex> = self.nodes[index].children.values().copied().collect();

        if !self.nodes[index].authenticated {
            for child in children {
                self.decide_node(child);
            }
            return Decision::Undecidable;
        }

        if children.is_empty() {
            return Decision::Decided(self.nodes[index].value.unwrap_or(Bit::Zero));
        }

        let mut counted = 0;
        let mut ones = 0;
        for child in children {
            let decision = self.decide_node(child);
            if !self.nodes[child].authenticated {
                continue;
            }
            if let Decision::Decided(bit) = decision {
                counted += 1;
                if bit == Bit::One {
                    ones += 1;
                }
            }
        }
        Decision::Decided(majority(ones, counted))
    }

    /// Breadth-first snapshot of every node.
    pub fn traverse(&self) -> Vec<NodeView> {
        self.breadth_first()
            .into_iter()
            .map(|index| {
                let node = &self.nodes[index];
                NodeView {
                    path: node.path.clone(),
                    value: node.value,
                    decision: node.decision,
                    authenticated: node.authenticated,
                }
            })
            .collect()
    }

    fn breadth_first(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([ROOT]);
        while let Some(index) = queue.pop_front() {
            order.push(index);
            queue.extend(self.nodes[index].children.values());
        }
        order
    }
}

fn majority(ones: usize, count: usize) -> Bit {
    if ones > count / 2 {
        Bit::One
    } else {
        Bit::Zero
    }
}

fn fmt_value(value: Option<Bit>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}

impl fmt::Display for EigTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = &self.nodes[ROOT];
        write!(f, "root: {}", self.owner)?;
        if root.is_leaf() {
            return write!(f, " val: {}", fmt_value(root.value));
        }

        let mut depth = 0;
        for index in self.breadth_first().into_iter().skip(1) {
            let node = &self.nodes[index];
            if node.depth() != depth {
                depth = node.depth();
                writeln!(f)?;
            } else {
                write!(f, " ** ")?;
            }
            write!(f, "path: {}", node.path)?;
            if node.is_leaf() {
                write!(f, ", val: {}", fmt_value(node.value))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::crypto::Keypair;
    use crate::eig::chain::SignatureChain;

    fn grown(n: usize, levels: usize, variant: Variant) -> EigTree {
        let mut tree = EigTree::new(1, n, Bit::One, levels, variant);
        for _ in 0..levels {
            tree.add_level().unwrap();
        }
        tree
    }

    fn set(tree: &mut EigTree, path: Vec<ProcessId>, value: Bit) {
        let index = tree.resolve(&Path::from(path)).unwrap();
        tree.nodes[index].value = Some(value);
        tree.nodes[index].authenticated = true;
    }

    #[test]
    fn test_add_level_shape() {
        let n = 5;
        let tree = grown(n, 3, Variant::Plain);

        assert_eq!(tree.height(), 3);
        assert_eq!(tree.root().child_count(), n);
        for node in tree.nodes() {
            assert!(!node.path().has_repeats());
            assert_eq!(node.depth(), node.path().depth());
            if node.depth() < 3 {
                let expected = if node.is_root() { n } else { n - node.depth() };
                assert_eq!(node.child_count(), expected);
            } else {
                assert!(node.is_leaf());
            }
            if let Some(parent) = node.parent() {
                let parent = tree.node(parent).unwrap();
                assert_eq!(parent.depth() + 1, node.depth());
                assert_eq!(node.path().last(), Some(node.proc_id()));
            }
        }
        // 1 + 5 + 5*4 + 5*4*3
        assert_eq!(tree.len(), 86);
    }

    #[test]
    fn test_add_level_past_max_height_fails() {
        let mut tree = grown(4, 2, Variant::Plain);

        assert!(tree.is_complete());
        assert_eq!(tree.add_level(), Err(ConfigError::TreeComplete { height: 2 }));
        assert_eq!(tree.height(), 2);
    }

    #[test]
    fn test_to_message_before_growth_is_root() {
        let tree = EigTree::new(2, 4, Bit::Zero, 2, Variant::Plain);
        let message = tree.to_message();

        assert_eq!(message.sender(), 2);
        assert_eq!(message.len(), 1);
        assert!(message.contents()[0].path().is_root());
        assert_eq!(message.contents()[0].value(), Some(Bit::Zero));
    }

    #[test]
    fn test_to_message_lists_leaves_in_order() {
        let tree = grown(3, 2, Variant::Plain);
        let paths: Vec<Vec<ProcessId>> = tree
            .to_message()
            .contents()
            .iter()
            .map(|c| c.path().ids().to_vec())
            .collect();

        assert_eq!(
            paths,
            vec![vec![1, 2], vec![1, 3], vec![2, 1], vec![2, 3], vec![3, 1], vec![3, 2]]
        );
    }

    #[test]
    fn test_apply_files_under_sender() {
        let mut tree = grown(3, 2, Variant::Plain);
        let message = Message::new(
            3,
            vec![
                Content::new(Path::from(vec![1]), Some(Bit::Zero), None),
                Content::new(Path::from(vec![2]), Some(Bit::One), None),
                // 3 cannot relay its own value to itself: no such node
                Content::new(Path::from(vec![3]), Some(Bit::One), None),
                Content::new(Path::from(vec![7]), Some(Bit::One), None),
            ],
        );
        tree.apply(message);

        assert_eq!(tree.node_at(&Path::from(vec![1, 3])).unwrap().value(), Some(Bit::Zero));
        assert_eq!(tree.node_at(&Path::from(vec![2, 3])).unwrap().value(), Some(Bit::One));
        assert_eq!(tree.node_at(&Path::from(vec![1, 2])).unwrap().value(), None);
        assert!(!tree.node_at(&Path::from(vec![1, 3])).unwrap().is_authenticated());
    }

    #[test]
    fn test_apply_authenticated_sets_chain() {
        let keypair = Keypair::new_pair();
        let mut tree = grown(3, 1, Variant::Authenticated);
        let chain = SignatureChain::new(Bit::One).signed_by(&keypair);
        tree.apply(Message::new(
            2,
            vec![Content::new(Path::root(), Some(Bit::One), Some(chain.clone()))],
        ));

        let node = tree.node_at(&Path::from(vec![2])).unwrap();
        assert!(node.is_authenticated());
        assert_eq!(node.signature(), Some(&chain));
        assert!(!tree.node_at(&Path::from(vec![1])).unwrap().is_authenticated());
    }

    #[test]
    fn test_plain_decide_majority() {
        let mut tree = grown(4, 1, Variant::Plain);
        set(&mut tree, vec![1], Bit::One);
        set(&mut tree, vec![2], Bit::One);
        set(&mut tree, vec![3], Bit::Zero);
        // 4 left unset, counts as zero: 2 ones of 4 is not a majority
        assert_eq!(tree.decide(), Decision::Decided(Bit::Zero));
        assert_eq!(tree.node_at(&Path::from(vec![4])).unwrap().decision(), Decision::Decided(Bit::Zero));
    }

    #[test]
    fn test_plain_decide_is_memoized() {
        let mut tree = grown(3, 1, Variant::Plain);
        for id in 1..=3 {
            set(&mut tree, vec![id], Bit::One);
        }
        assert_eq!(tree.decide(), Decision::Decided(Bit::One));

        set(&mut tree, vec![1], Bit::Zero);
        set(&mut tree, vec![2], Bit::Zero);
        assert_eq!(tree.decide(), Decision::Decided(Bit::One));
    }

    #[test]
    fn test_authenticated_decide_skips_unauthenticated() {
        let mut tree = grown(4, 2, Variant::Authenticated);
        for id in 1..=4 {
            set(&mut tree, vec![id], Bit::One);
        }
        // Under node 1 only one child is authenticated, and it says zero
        set(&mut tree, vec![1, 2], Bit::Zero);
        for (a, b) in [(2, 1), (2, 3), (3, 1), (3, 2), (3, 4)] {
            set(&mut tree, vec![a, b], Bit::One);
        }

        assert_eq!(tree.decide(), Decision::Decided(Bit::Zero));
        assert_eq!(tree.node_at(&Path::from(vec![1])).unwrap().decision(), Decision::Decided(Bit::Zero));
        assert_eq!(tree.node_at(&Path::from(vec![2])).unwrap().decision(), Decision::Decided(Bit::One));
        assert_eq!(tree.node_at(&Path::from(vec![3])).unwrap().decision(), Decision::Decided(Bit::One));
        // no authenticated children at all
        assert_eq!(tree.node_at(&Path::from(vec![4])).unwrap().decision(), Decision::Decided(Bit::Zero));
        assert_eq!(
            tree.node_at(&Path::from(vec![1, 3])).unwrap().decision(),
            Decision::Undecidable
        );
    }

    #[test]
    fn test_unauthenticated_subtree_is_undecidable() {
        let mut tree = grown(3, 2, Variant::Authenticated);
        set(&mut tree, vec![1, 2], Bit::One);

        tree.decide();

        let node = tree.node_at(&Path::from(vec![1])).unwrap();
        assert_eq!(node.decision(), Decision::Undecidable);
        // descendants were still visited
        assert_eq!(
            tree.node_at(&Path::from(vec![1, 2])).unwrap().decision(),
            Decision::Decided(Bit::One)
        );
        assert_eq!(tree.decision(), Decision::Decided(Bit::Zero));
    }

    #[test]
    fn test_traverse_is_breadth_first() {
        let mut tree = grown(3, 2, Variant::Plain);
        tree.decide();
        let views = tree.traverse();

        assert_eq!(views.len(), tree.len());
        assert!(views[0].path.is_root());
        assert_eq!(views[0].decision, tree.decision());
        assert!(views.windows(2).all(|w| w[0].path.depth() <= w[1].path.depth()));
    }

    #[test]
    fn test_display() {
        let tree = EigTree::new(2, 2, Bit::One, 2, Variant::Plain);
        assert_eq!(tree.to_string(), "root: 2 val: 1");

        let tree = grown(2, 2, Variant::Plain);
        assert_eq!(
            tree.to_string(),
            "root: 1\npath: 1 ** path: 2\npath: 1-2, val: None ** path: 2-1, val: None"
        );
    }
}
