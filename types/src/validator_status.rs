use parse_display::{Display, FromStr};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

use crate::{
    consts::FAR_FUTURE_EPOCH,
    containers::Validator,
    primitives::{Epoch, Gwei},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "validator epochs are inconsistent \
         (activation_eligibility_epoch: {activation_eligibility_epoch}, \
         activation_epoch: {activation_epoch}, \
         exit_epoch: {exit_epoch}, \
         withdrawable_epoch: {withdrawable_epoch})"
    )]
    InconsistentEpochs {
        activation_eligibility_epoch: Epoch,
        activation_epoch: Epoch,
        exit_epoch: Epoch,
        withdrawable_epoch: Epoch,
    },
}

#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Display,
    FromStr,
    DeserializeFromStr,
    SerializeDisplay,
)]
#[display(style = "snake_case")]
pub enum ValidatorStatus {
    PendingInitialized,
    PendingQueued,
    ActiveOngoing,
    ActiveExiting,
    ActiveSlashed,
    ExitedUnslashed,
    ExitedSlashed,
    WithdrawalPossible,
    WithdrawalDone,
}

impl ValidatorStatus {
    pub fn new(validator: &Validator, balance: Gwei, epoch: Epoch) -> Result<Self, Error> {
        let Validator {
            activation_eligibility_epoch,
            activation_epoch,
            exit_epoch,
            withdrawable_epoch,
            slashed,
            ..
        } = *validator;

        let inconsistent = activation_epoch > exit_epoch
            || exit_epoch > withdrawable_epoch
            || (activation_epoch != FAR_FUTURE_EPOCH
                && activation_eligibility_epoch > activation_epoch);

        if inconsistent {
            return Err(Error::InconsistentEpochs {
                activation_eligibility_epoch,
                activation_epoch,
                exit_epoch,
                withdrawable_epoch,
            });
        }

        if activation_epoch > epoch {
            if activation_eligibility_epoch == FAR_FUTURE_EPOCH {
                return Ok(Self::PendingInitialized);
            }

            return Ok(Self::PendingQueued);
        }

        if epoch < exit_epoch {
            if exit_epoch == FAR_FUTURE_EPOCH {
                return Ok(Self::ActiveOngoing);
            }

            if slashed {
                return Ok(Self::ActiveSlashed);
            }

            return Ok(Self::ActiveExiting);
        }

        if epoch < withdrawable_epoch {
            if slashed {
                return Ok(Self::ExitedSlashed);
            }

            return Ok(Self::ExitedUnslashed);
        }

        if balance > 0 {
            return Ok(Self::WithdrawalPossible);
        }

        Ok(Self::WithdrawalDone)
    }

    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::ActiveOngoing | Self::ActiveExiting | Self::ActiveSlashed,
        )
    }
}
