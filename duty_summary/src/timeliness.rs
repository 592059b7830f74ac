use serde::{Deserialize, Serialize};
use types::consts::{
    TIMELY_HEAD_DELAY, TIMELY_HEAD_WEIGHT, TIMELY_SOURCE_MAX_DELAY, TIMELY_SOURCE_WEIGHT,
    TIMELY_TARGET_MAX_DELAY, TIMELY_TARGET_WEIGHT,
};

/// Numerators of per-increment amounts over `WEIGHT_DENOMINATOR`.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct ComponentWeights {
    pub source: u64,
    pub target: u64,
    pub head: u64,
}

impl ComponentWeights {
    pub const ALL: Self = Self {
        source: TIMELY_SOURCE_WEIGHT,
        target: TIMELY_TARGET_WEIGHT,
        head: TIMELY_HEAD_WEIGHT,
    };

    #[must_use]
    pub const fn sum(self) -> u64 {
        self.source + self.target + self.head
    }
}

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Deserialize, Serialize,
)]
pub struct Timeliness {
    pub source: bool,
    pub target: bool,
    pub head: bool,
}

impl Timeliness {
    pub const PERFECT: Self = Self {
        source: true,
        target: true,
        head: true,
    };

    #[must_use]
    pub const fn new(
        valid_source: bool,
        valid_target: bool,
        valid_head: bool,
        inclusion_delay: u64,
    ) -> Self {
        let source = valid_source && inclusion_delay <= TIMELY_SOURCE_MAX_DELAY;
        let target = valid_source && valid_target && inclusion_delay <= TIMELY_TARGET_MAX_DELAY;
        let head = valid_source && valid_target && valid_head && inclusion_delay == TIMELY_HEAD_DELAY;

        Self {
            source,
            target,
            head,
        }
    }

    #[must_use]
    pub const fn reward_weights(self) -> ComponentWeights {
        ComponentWeights {
            source: if self.source { TIMELY_SOURCE_WEIGHT } else { 0 },
            target: if self.target { TIMELY_TARGET_WEIGHT } else { 0 },
            head: if self.head { TIMELY_HEAD_WEIGHT } else { 0 },
        }
    }

    /// Head is never penalized.
    #[must_use]
    pub const fn penalty_weights(self) -> ComponentWeights {
        ComponentWeights {
            source: if self.source { 0 } else { TIMELY_SOURCE_WEIGHT },
            target: if self.target { 0 } else { TIMELY_TARGET_WEIGHT },
            head: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;
    use types::consts::WEIGHT_DENOMINATOR;

    use super::*;

    #[test]
    fn perfect_attestation_earns_every_weight() {
        let timeliness = Timeliness::new(true, true, true, 1);

        assert_eq!(timeliness, Timeliness::PERFECT);
        assert_eq!(timeliness.reward_weights(), ComponentWeights::ALL);
        assert_eq!(timeliness.reward_weights().sum(), 14 + 26 + 14);
        assert_eq!(WEIGHT_DENOMINATOR, 64);
        assert_eq!(timeliness.penalty_weights().sum(), 0);
    }

    #[test_case(true,  true,  true,  2  => Timeliness { source: true,  target: true,  head: false })]
    #[test_case(true,  true,  true,  5  => Timeliness { source: true,  target: true,  head: false })]
    #[test_case(true,  true,  true,  6  => Timeliness { source: false, target: true,  head: false })]
    #[test_case(true,  true,  true,  32 => Timeliness { source: false, target: true,  head: false })]
    #[test_case(true,  true,  true,  33 => Timeliness { source: false, target: false, head: false })]
    #[test_case(true,  false, true,  1  => Timeliness { source: true,  target: false, head: false })]
    #[test_case(true,  true,  false, 1  => Timeliness { source: true,  target: true,  head: false })]
    #[test_case(false, true,  true,  1  => Timeliness { source: false, target: false, head: false })]
    fn timeliness(
        valid_source: bool,
        valid_target: bool,
        valid_head: bool,
        inclusion_delay: u64,
    ) -> Timeliness {
        Timeliness::new(valid_source, valid_target, valid_head, inclusion_delay)
    }

    #[test]
    fn late_source_and_wrong_target_are_penalized_but_head_is_not() {
        let timeliness = Timeliness::new(true, false, false, 6);

        assert_eq!(
            timeliness.penalty_weights(),
            ComponentWeights {
                source: 14,
                target: 26,
                head: 0,
            },
        );
    }
}
