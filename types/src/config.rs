use core::{num::NonZeroU64, ops::Range, time::Duration};
use std::borrow::Cow;

use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::primitives::{Epoch, Slot};

/// Chain parameters the monitor depends on.
///
/// Field names follow the `SCREAMING_SNAKE_CASE` keys used by `consensus-specs` configurations,
/// so a network's `config.yaml` can be deserialized directly. Unknown keys are ignored.
/// Numbers may be given either natively or as strings.
#[expect(
    clippy::unsafe_derive_deserialize,
    reason = "A false positive triggered by `nonzero!`. \
              `Config` has no invariants. It is intended to be deserialized from user input."
)]
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    pub config_name: Cow<'static, str>,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub slots_per_epoch: NonZeroU64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub seconds_per_slot: NonZeroU64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub epochs_per_sync_committee_period: NonZeroU64,
}

impl Default for Config {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl Config {
    #[must_use]
    pub const fn mainnet() -> Self {
        Self {
            config_name: Cow::Borrowed("mainnet"),
            slots_per_epoch: nonzero!(32_u64),
            seconds_per_slot: nonzero!(12_u64),
            epochs_per_sync_committee_period: nonzero!(256_u64),
        }
    }

    #[must_use]
    pub const fn minimal() -> Self {
        Self {
            config_name: Cow::Borrowed("minimal"),
            slots_per_epoch: nonzero!(8_u64),
            seconds_per_slot: nonzero!(6_u64),
            epochs_per_sync_committee_period: nonzero!(8_u64),
        }
    }

    #[must_use]
    pub const fn slot_duration(&self) -> Duration {
        Duration::from_secs(self.seconds_per_slot.get())
    }

    #[must_use]
    pub const fn compute_epoch_at_slot(&self, slot: Slot) -> Epoch {
        slot / self.slots_per_epoch.get()
    }

    #[must_use]
    pub const fn compute_start_slot_at_epoch(&self, epoch: Epoch) -> Slot {
        epoch.saturating_mul(self.slots_per_epoch.get())
    }

    #[must_use]
    pub const fn compute_end_slot_at_epoch(&self, epoch: Epoch) -> Slot {
        self.compute_start_slot_at_epoch(epoch.saturating_add(1))
            .saturating_sub(1)
    }

    #[must_use]
    pub const fn slots_in_epoch(&self, epoch: Epoch) -> Range<Slot> {
        self.compute_start_slot_at_epoch(epoch)
            ..self.compute_start_slot_at_epoch(epoch.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use test_case::test_case;

    use super::*;

    #[test_case(0, 0)]
    #[test_case(31, 0)]
    #[test_case(32, 1)]
    #[test_case(3201, 100)]
    fn mainnet_epoch_at_slot(slot: Slot, expected_epoch: Epoch) {
        assert_eq!(Config::mainnet().compute_epoch_at_slot(slot), expected_epoch);
    }

    #[test]
    fn epoch_boundaries() {
        let config = Config::mainnet();

        assert_eq!(config.compute_start_slot_at_epoch(100), 3200);
        assert_eq!(config.compute_end_slot_at_epoch(100), 3231);
        assert_eq!(config.slots_in_epoch(100), 3200..3232);
    }

    #[test]
    fn config_deserializes_from_network_yaml() -> Result<()> {
        let yaml = "\
            CONFIG_NAME: holesky\n\
            PRESET_BASE: mainnet\n\
            SLOTS_PER_EPOCH: '32'\n\
            SECONDS_PER_SLOT: 12\n\
        ";

        let config = serde_yaml::from_str::<Config>(yaml)?;

        assert_eq!(config.config_name, "holesky");
        assert_eq!(config.slots_per_epoch.get(), 32);
        assert_eq!(config.seconds_per_slot.get(), 12);
        assert_eq!(config.epochs_per_sync_committee_period.get(), 256);

        Ok(())
    }
}
