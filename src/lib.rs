//! apkeep: publish an exported ActivityStreams outbox into a Perkeep server.
//!
//! The pipeline runs strictly downstream:
//! archive files → [`documents::DocumentSet`] → [`outbox::OutboxView`] →
//! `Create`/`Note` activities → [`publish::Publisher`] → [`contract::BlobStore`].
//!
//! [`upload::PerkeepClient`] is the HTTP implementation of the store; the
//! binary in `main.rs` wires everything through [`cli::run`].

pub mod cli;
pub mod config;
pub mod contract;
pub mod documents;
pub mod error;
pub mod jsonld;
pub mod outbox;
pub mod publish;
pub mod schema;
pub mod upload;

pub use error::ApError;
