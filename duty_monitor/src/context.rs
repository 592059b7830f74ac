use duty_summary::EpochMeta;
use types::primitives::Epoch;

/// State carried from one epoch check to the next.
#[derive(Default, Debug)]
pub struct CheckContext {
    previous_meta: Option<EpochMeta>,
}

impl CheckContext {
    /// Metadata of the epoch before `epoch` if that epoch was the last one checked.
    #[must_use]
    pub fn previous_meta(&self, epoch: Epoch) -> Option<&EpochMeta> {
        self.previous_meta
            .as_ref()
            .filter(|meta| meta.epoch.checked_add(1) == Some(epoch))
    }

    pub fn finish(&mut self, meta: EpochMeta) {
        self.previous_meta = Some(meta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_directly_preceding_epoch_is_returned() {
        let mut context = CheckContext::default();

        assert_eq!(context.previous_meta(100), None);

        context.finish(EpochMeta::new(99));

        assert_eq!(context.previous_meta(100).map(|meta| meta.epoch), Some(99));
        assert_eq!(context.previous_meta(101), None);
        assert_eq!(context.previous_meta(99), None);
    }
}
