use core::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use types::primitives::{Epoch, Slot, H256};

#[derive(Debug, Error)]
pub enum Error {
    #[error("no block found at slot {slot} or up to {max_depth} slots after it")]
    MaxDepthExceeded { slot: Slot, max_depth: u64 },
    #[error("no block found at slot {slot} or up to {max_depth} slots before it")]
    MaxDepthExceededBackward { slot: Slot, max_depth: u64 },
    #[error("Beacon API responded with {status}: {body}")]
    Response { status: StatusCode, body: String },
    #[error("all Beacon API endpoints exhausted")]
    EndpointsExhausted {
        #[source]
        source: Box<Self>,
    },
    #[error("attempted to call Beacon API but no endpoints were provided")]
    NoEndpointsProvided,
    #[error("head at slot {slot} has not advanced for {unchanged_for:?}")]
    StaleHead { slot: Slot, unchanged_for: Duration },
    #[error("head at slot {slot} is behind the previously seen slot {last_slot}")]
    HeadWentBackwards { slot: Slot, last_slot: Slot },
    #[error(
        "proposer duties for epoch {epoch} depend on {actual:?} \
         but the canonical dependent root is {expected:?}"
    )]
    DependentRootMismatch {
        epoch: Epoch,
        expected: H256,
        actual: H256,
    },
    #[error("parent {parent_root:?} of block at slot {slot} is not available")]
    MissingParentHeader { slot: Slot, parent_root: H256 },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("Beacon API returned an unexpected response: {0}")]
    UnexpectedResponse(#[from] serde_json::Error),
}

impl Error {
    /// Whether the resource is legitimately absent, possibly after every endpoint was tried.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Response { status, .. } => *status == StatusCode::NOT_FOUND,
            Self::EndpointsExhausted { source } => source.is_not_found(),
            _ => false,
        }
    }

    #[must_use]
    pub const fn is_max_depth_exceeded(&self) -> bool {
        matches!(
            self,
            Self::MaxDepthExceeded { .. } | Self::MaxDepthExceededBackward { .. },
        )
    }

    pub(crate) fn is_not_found_in(error: &anyhow::Error) -> bool {
        error.downcast_ref::<Self>().is_some_and(Self::is_not_found)
    }

    pub(crate) fn is_max_depth_exceeded_in(error: &anyhow::Error) -> bool {
        error
            .downcast_ref::<Self>()
            .is_some_and(Self::is_max_depth_exceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> Error {
        Error::Response {
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        }
    }

    #[test]
    fn not_found_is_visible_through_exhaustion() {
        let exhausted = Error::EndpointsExhausted {
            source: Box::new(not_found()),
        };

        assert!(not_found().is_not_found());
        assert!(exhausted.is_not_found());
        assert!(Error::is_not_found_in(&anyhow::Error::new(exhausted)));
    }

    #[test]
    fn other_statuses_are_not_absence() {
        let error = Error::EndpointsExhausted {
            source: Box::new(Error::Response {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "syncing".to_owned(),
            }),
        };

        assert!(!error.is_not_found());
        assert!(!Error::NoEndpointsProvided.is_not_found());
    }

    #[test]
    fn exhaustion_message_chains_the_last_failure() {
        let error = anyhow::Error::new(Error::EndpointsExhausted {
            source: Box::new(Error::Response {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "oops".to_owned(),
            }),
        });

        assert_eq!(
            format!("{error:#}"),
            "all Beacon API endpoints exhausted: \
             Beacon API responded with 500 Internal Server Error: oops",
        );
    }
}
