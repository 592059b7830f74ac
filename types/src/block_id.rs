use parse_display::{Display, FromStr};

use crate::primitives::{Slot, H256};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, FromStr)]
#[display(style = "lowercase")]
pub enum BlockId {
    Head,
    Genesis,
    Finalized,
    #[display("{0}")]
    Slot(Slot),
    #[display("{0:?}")]
    Root(H256),
}

impl From<Slot> for BlockId {
    fn from(slot: Slot) -> Self {
        Self::Slot(slot)
    }
}

impl From<H256> for BlockId {
    fn from(root: H256) -> Self {
        Self::Root(root)
    }
}

impl BlockId {
    /// Identifiers whose referent changes over time.
    #[must_use]
    pub const fn is_relative(self) -> bool {
        matches!(self, Self::Head | Self::Genesis | Self::Finalized)
    }
}
