pub mod client;
pub mod error;
pub mod nameserver;
pub mod options;
pub mod record;
pub mod transport;
pub mod wire;

pub use client::Client;
pub use error::ClientError;
pub use options::{ClientOptions, EdnsMode, OptionsError, Tweaks};
pub use record::{Answer, QClass, RData, RecordType};
pub use transport::{TransportError, TransportKind};
pub use wire::{Flags, Question, Response, WireError};
