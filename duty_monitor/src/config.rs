#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct MonitorConfig {
    /// Record summaries of every validator instead of only the ones with a registered operator.
    pub track_all_validators: bool,
}
