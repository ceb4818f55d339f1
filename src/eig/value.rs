use std::fmt;

use rand::Rng;

/// A binary proposal value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum Bit {
    Zero,
    One,
}

impl Bit {
    pub fn flip(self) -> Self {
        match self {
            Bit::Zero => Bit::One,
            Bit::One => Bit::Zero,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Bit::Zero => 0,
            Bit::One => 1,
        }
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Bit::from(rng.gen::<bool>())
    }
}

impl From<bool> for Bit {
    fn from(b: bool) -> Self {
        if b { Bit::One } else { Bit::Zero }
    }
}

impl TryFrom<u8> for Bit {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Bit::Zero),
            1 => Ok(Bit::One),
            other => Err(other),
        }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Cached outcome of the decision rule for a tree node or a participant.
///
/// `Undecidable` is only produced by the authenticated variant, for nodes
/// whose value never passed signature verification. It is never counted
/// by a parent's majority.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Decision {
    #[default]
    Unset,
    Decided(Bit),
    Undecidable,
}

impl Decision {
    pub fn bit(&self) -> Option<Bit> {
        match self {
            Decision::Decided(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_decided(&self) -> bool {
        matches!(self, Decision::Decided(_))
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Unset => write!(f, "unset"),
            Decision::Decided(b) => write!(f, "{}", b),
            Decision::Undecidable => write!(f, "undecidable"),
        }
    }
}

/// Which flavour of EIG the tree and its participants run.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Variant {
    /// Majority relay with no authentication.
    #[default]
    Plain,
    /// Every relayed value carries a signature chain.
    Authenticated,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Plain => write!(f, "plain"),
            Variant::Authenticated => write!(f, "authenticated"),
        }
    }
}
