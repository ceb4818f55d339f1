use std::sync::Arc;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use super::chain::{filter_message, SignatureChain};
use super::message::Message;
use super::path::ProcessId;
use super::peers::PublicKeyRegistry;
use super::tree::EigTree;
use super::value::{Bit, Decision, Variant};
use crate::common::crypto::{Keypair, Pubkey};
use crate::common::error::ConfigError;

/// One simulated process: its EIG tree, fault profile and keys.
///
/// A participant only ever mutates its own tree, inbox and random source,
/// so participants can be driven in parallel within a round.
pub struct Participant {
    id: ProcessId,
    process_count: usize,
    initial_value: Bit,
    byzantine: bool,
    lie_prob: u8,
    variant: Variant,
    keypair: Keypair,
    public_keys: Option<Arc<PublicKeyRegistry>>,
    tree: EigTree,
    inbox: Vec<Message>,
    decision: Decision,
    rng: ChaCha8Rng,
}

impl Participant {
    /// A correct participant. The key pair is drawn from `rng`, which also
    /// feeds every later lie roll.
    pub fn new(
        id: ProcessId,
        process_count: usize,
        initial_value: Bit,
        max_height: usize,
        variant: Variant,
        mut rng: ChaCha8Rng,
    ) -> Self {
        let keypair = Keypair::from_rng(&mut rng);
        Participant {
            id,
            process_count,
            initial_value,
            byzantine: false,
            lie_prob: 0,
            variant,
            keypair,
            public_keys: None,
            tree: EigTree::new(id, process_count, initial_value, max_height, variant),
            inbox: Vec::new(),
            decision: Decision::Unset,
            rng,
        }
    }

    /// Turns the participant Byzantine: each outgoing content item is
    /// corrupted with probability `lie_prob` percent.
    pub fn with_byzantine(mut self, lie_prob: u8) -> Self {
        self.byzantine = true;
        self.lie_prob = lie_prob;
        self
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn process_count(&self) -> usize {
        self.process_count
    }

    pub fn initial_value(&self) -> Bit {
        self.initial_value
    }

    pub fn is_byzantine(&self) -> bool {
        self.byzantine
    }

    pub fn lie_prob(&self) -> u8 {
        self.lie_prob
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn public_keys(&self) -> Option<&PublicKeyRegistry> {
        self.public_keys.as_deref()
    }

    pub fn tree(&self) -> &EigTree {
        &self.tree
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Installs the shared registry after checking it matches the roster
    /// and holds this participant's own key.
    pub fn set_public_keys(&mut self, registry: Arc<PublicKeyRegistry>) -> Result<(), ConfigError> {
        if registry.len() != self.process_count {
            return Err(ConfigError::RegistrySize {
                expected: self.process_count,
                got: registry.len(),
            });
        }
        if registry.get(self.id) != Some(&self.keypair.pubkey()) {
            return Err(ConfigError::OwnKeyMismatch(self.id));
        }
        self.public_keys = Some(registry);
        Ok(())
    }

    /// Builds the message for one recipient. Byzantine participants roll
    /// independently for every call, so two recipients can get different
    /// content in the same round.
    pub fn generate_msg(&mut self, recipient: ProcessId) -> Message {
        let mut message = self.tree.to_message();

        if self.byzantine {
            for content in message.contents_mut() {
                if self.rng.gen_range(1..=100u8) > self.lie_prob {
                    continue;
                }
                let lie = match content.value() {
                    Some(value) => value.flip(),
                    None => Bit::random(&mut self.rng),
                };
                trace!(process = self.id, recipient, path = %content.path(), %lie, "Corrupted content");
                content.set_value(Some(lie));
            }
        }

        if self.variant == Variant::Authenticated {
            for content in message.contents_mut() {
                // Relays extend the chain they received. Without one there is
                // nothing to relay, so only a fresh chain over the declared
                // value can be offered; receivers reject it for being short.
                let chain = content
                    .take_signature()
                    .or_else(|| content.value().map(SignatureChain::new));
                content.set_signature(chain.map(|chain| chain.signed_by(&self.keypair)));
            }
        }

        message
    }

    pub fn generate_msgs(&mut self, recipients: &[ProcessId]) -> Vec<Message> {
        recipients
            .iter()
            .map(|recipient| self.generate_msg(*recipient))
            .collect()
    }

    pub fn receive_msg(&mut self, msg: Message) {
        self.inbox.push(msg);
    }

    pub fn receive_msgs(&mut self, msgs: impl IntoIterator<Item = Message>) {
        self.inbox.extend(msgs);
    }

    /// Applies and clears the inbox. In the authenticated variant every
    /// message is first stripped of items whose chain does not verify.
    pub fn apply_msgs(&mut self) -> Result<(), ConfigError> {
        let registry = match self.variant {
            Variant::Plain => None,
            Variant::Authenticated => Some(
                self.public_keys
                    .clone()
                    .ok_or(ConfigError::MissingPublicKeys(self.id))?,
            ),
        };

        for message in std::mem::take(&mut self.inbox) {
            let accepted = match &registry {
                Some(registry) => {
                    let received = message.len();
                    let accepted = filter_message(message, registry, self.id);
                    if accepted.len() != received {
                        debug!(
                            process = self.id,
                            sender = accepted.sender(),
                            received,
                            accepted = accepted.len(),
                            "Filtered message"
                        );
                    }
                    accepted
                }
                None => message,
            };
            self.tree.apply(accepted);
        }
        Ok(())
    }

    pub fn add_tree_level(&mut self) -> Result<(), ConfigError> {
        self.tree.add_level()
    }

    pub fn decide(&mut self) -> Decision {
        self.decision = self.tree.decide();
        debug!(process = self.id, decision = %self.decision, "Decided");
        self.decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eig::path::Path;
    use rand::SeedableRng;

    fn participant(id: ProcessId, n: usize, value: Bit, variant: Variant) -> Participant {
        Participant::new(id, n, value, 2, variant, ChaCha8Rng::seed_from_u64(id as u64))
    }

    fn registry_of(participants: &[&Participant]) -> Arc<PublicKeyRegistry> {
        Arc::new(PublicKeyRegistry::new(
            participants.iter().map(|p| p.pubkey()).collect(),
        ))
    }

    #[test]
    fn test_correct_participant_does_not_equivocate() {
        let mut p = participant(1, 3, Bit::One, Variant::Plain);
        let first = p.generate_msg(2);
        let second = p.generate_msg(3);

        assert_eq!(first, second);
        assert_eq!(first.contents()[0].value(), Some(Bit::One));
    }

    #[test]
    fn test_byzantine_always_lies_at_full_probability() {
        let mut p = participant(1, 3, Bit::One, Variant::Plain).with_byzantine(100);
        p.add_tree_level().unwrap();

        let root_msg = participant(1, 3, Bit::One, Variant::Plain)
            .with_byzantine(100)
            .generate_msg(2);
        assert_eq!(root_msg.contents()[0].value(), Some(Bit::Zero));

        // unset leaves get a made-up value
        let msg = p.generate_msg(2);
        assert_eq!(msg.len(), 3);
        assert!(msg.contents().iter().all(|c| c.value().is_some()));
    }

    #[test]
    fn test_byzantine_never_lies_at_zero_probability() {
        let mut p = participant(1, 3, Bit::Zero, Variant::Plain).with_byzantine(0);
        for recipient in 1..=3 {
            assert_eq!(p.generate_msg(recipient).contents()[0].value(), Some(Bit::Zero));
        }
    }

    #[test]
    fn test_set_public_keys_checks_registry() {
        let mut p1 = participant(1, 2, Bit::One, Variant::Authenticated);
        let p2 = participant(2, 2, Bit::One, Variant::Authenticated);

        let short = Arc::new(PublicKeyRegistry::new(vec![p1.pubkey()]));
        assert_eq!(
            p1.set_public_keys(short),
            Err(ConfigError::RegistrySize { expected: 2, got: 1 })
        );

        let swapped = registry_of(&[&p2, &p1]);
        assert_eq!(p1.set_public_keys(swapped), Err(ConfigError::OwnKeyMismatch(1)));

        let registry = registry_of(&[&p1, &p2]);
        assert_eq!(p1.set_public_keys(registry), Ok(()));
        assert!(p1.public_keys().is_some());
    }

    #[test]
    fn test_authenticated_without_keys_fails() {
        let mut p = participant(1, 2, Bit::One, Variant::Authenticated);
        p.receive_msg(Message::new(1, Vec::new()));
        p.add_tree_level().unwrap();

        assert_eq!(p.apply_msgs(), Err(ConfigError::MissingPublicKeys(1)));
    }

    #[test]
    fn test_add_tree_level_past_rounds_fails() {
        let mut p = participant(1, 4, Bit::One, Variant::Plain);
        p.add_tree_level().unwrap();
        p.add_tree_level().unwrap();

        assert_eq!(p.add_tree_level(), Err(ConfigError::TreeComplete { height: 2 }));
    }

    #[test]
    fn test_authenticated_exchange() {
        let n = 3;
        let mut ps: Vec<Participant> = (1..=n as ProcessId)
            .map(|id| participant(id, n, Bit::One, Variant::Authenticated))
            .collect();
        let registry = registry_of(&ps.iter().collect::<Vec<_>>());
        for p in ps.iter_mut() {
            p.set_public_keys(Arc::clone(&registry)).unwrap();
        }

        let ids: Vec<ProcessId> = (1..=n as ProcessId).collect();
        let outboxes: Vec<Vec<Message>> = ps.iter_mut().map(|p| p.generate_msgs(&ids)).collect();
        for outbox in outboxes {
            for (p, msg) in ps.iter_mut().zip(outbox) {
                p.receive_msg(msg);
            }
        }
        for p in ps.iter_mut() {
            p.add_tree_level().unwrap();
            p.apply_msgs().unwrap();
        }

        let tree = ps[0].tree();
        for id in 1..=n as ProcessId {
            let node = tree.node_at(&Path::from(vec![id])).unwrap();
            assert!(node.is_authenticated());
            assert_eq!(node.signature().map(|c| c.len()), Some(1));
        }

        // 2 tampers with the value it relays for 1, 3 relays honestly
        let mut relay = ps[1].generate_msg(1);
        let tampered = relay
            .contents_mut()
            .iter_mut()
            .find(|c| c.path().ids() == [1])
            .unwrap();
        tampered.set_value(Some(Bit::Zero));

        let honest_relay = ps[2].generate_msg(1);

        ps[0].receive_msgs([relay, honest_relay]);
        ps[0].add_tree_level().unwrap();
        ps[0].apply_msgs().unwrap();

        let tree = ps[0].tree();
        let tampered_node = tree.node_at(&Path::from(vec![1, 2])).unwrap();
        assert!(!tampered_node.is_authenticated());
        assert_eq!(tampered_node.value(), None);
        let honest_node = tree.node_at(&Path::from(vec![1, 3])).unwrap();
        assert!(honest_node.is_authenticated());
        assert_eq!(honest_node.value(), Some(Bit::One));
        assert_eq!(honest_node.signature().map(|c| c.len()), Some(2));
        assert_eq!(ps[0].pending(), 0);
    }

    #[test]
    fn test_decide_caches_decision() {
        let mut p = participant(1, 1, Bit::One, Variant::Plain);
        let msg = p.generate_msg(1);
        p.receive_msg(msg);
        p.add_tree_level().unwrap();
        p.apply_msgs().unwrap();

        assert_eq!(p.decide(), Decision::Decided(Bit::One));
        assert_eq!(p.decision(), Decision::Decided(Bit::One));
    }
}
