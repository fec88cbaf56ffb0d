//! Core protocol types for the veil edge relay.
//!
//! This crate provides the pieces of the protocol that are independent of the
//! transport: the identifier codec, the per-connection handshake state
//! machine, and parsing of the request head that carries the relay
//! destination.

pub mod handshake;
pub mod ident;
pub mod request;

pub use handshake::{Handshake, Outcome};
pub use ident::ServerIdentity;
pub use request::RequestHead;
