//! Error types for the exercise environment core

use crate::tag::Tag;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the exercise environment
#[derive(Error, Debug)]
pub enum Error {
    /// A container or VM creation call failed at the provisioning collaborator.
    #[error("provisioning failed: {0}")]
    Provisioning(String),

    /// An address request was rejected by the network collaborator.
    #[error("network bind failed: {0}")]
    NetworkBind(String),

    /// A start/stop/close primitive failed on an already-created instance.
    #[error("lifecycle operation failed: {0}")]
    Lifecycle(String),

    /// The network collaborator was handed an unusable subnet prefix.
    #[error("invalid subnet: {0}")]
    InvalidSubnet(String),

    #[error("tag already exists: {0}")]
    DuplicateTag(Tag),

    #[error("no tags, need at least one tag")]
    MissingTags,

    #[error("unknown tag: {0}")]
    UnknownTag(String),
}
