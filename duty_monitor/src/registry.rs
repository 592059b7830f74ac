use duty_summary::Operator;
use types::primitives::PublicKeyBytes;

/// Maps validator public keys to the operators running them.
pub trait ValidatorRegistry: Send + Sync {
    fn operator(&self, pubkey: &PublicKeyBytes) -> Option<Operator>;
}
