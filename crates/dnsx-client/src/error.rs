use thiserror::Error;

use crate::options::OptionsError;
use crate::transport::TransportError;
use crate::wire::WireError;

/// Anything a [`crate::Client`] run can fail with.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("no responses received")]
    NoResponses,
}
