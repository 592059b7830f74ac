use std::{collections::HashMap, path::Path};

use anyhow::{Context as _, Result};
use duty_monitor::ValidatorRegistry;
use duty_summary::Operator;
use fs_err as fs;
use tracing::info;
use types::primitives::PublicKeyBytes;

/// Operators of validators loaded from a YAML file mapping public keys to `{index, name}`.
#[derive(Default, Debug)]
pub struct FileRegistry {
    operators: HashMap<PublicKeyBytes, Operator>,
}

impl FileRegistry {
    pub fn load(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;

        let operators = serde_yaml::from_reader::<_, HashMap<PublicKeyBytes, Operator>>(file)
            .with_context(|| format!("failed to parse validator registry {}", path.display()))?;

        info!(
            "loaded operators of {} validators from {}",
            operators.len(),
            path.display(),
        );

        Ok(Self { operators })
    }
}

impl ValidatorRegistry for FileRegistry {
    fn operator(&self, pubkey: &PublicKeyBytes) -> Option<Operator> {
        self.operators.get(pubkey).cloned()
    }
}
