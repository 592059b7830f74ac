use std::collections::HashMap;

use duty_summary::Operator;
use types::{
    consts::EFFECTIVE_BALANCE_INCREMENT,
    containers::ValidatorRecord,
    primitives::ValidatorIndex,
};

/// Validator registry of the checked state together with operator attribution.
///
/// Fetched once per epoch and shared by the checkers that need balances.
#[derive(Default, Debug)]
pub struct EpochValidators {
    records: Vec<ValidatorRecord>,
    operators: HashMap<ValidatorIndex, Operator>,
}

impl EpochValidators {
    #[must_use]
    pub fn new(
        mut records: Vec<ValidatorRecord>,
        operators: HashMap<ValidatorIndex, Operator>,
    ) -> Self {
        records.sort_unstable_by_key(|record| record.index);

        Self { records, operators }
    }

    #[must_use]
    pub fn records(&self) -> &[ValidatorRecord] {
        &self.records
    }

    #[must_use]
    pub fn get(&self, index: ValidatorIndex) -> Option<&ValidatorRecord> {
        self.records
            .binary_search_by_key(&index, |record| record.index)
            .ok()
            .and_then(|position| self.records.get(position))
    }

    #[must_use]
    pub fn operator(&self, index: ValidatorIndex) -> Option<&Operator> {
        self.operators.get(&index)
    }

    pub fn operated(&self) -> impl Iterator<Item = ValidatorIndex> + '_ {
        self.operators.keys().copied()
    }

    #[must_use]
    pub fn effective_increments(&self, index: ValidatorIndex) -> u64 {
        self.get(index).map_or(0, |record| {
            record.validator.effective_balance / EFFECTIVE_BALANCE_INCREMENT
        })
    }
}
