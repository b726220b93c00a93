//! Core types shared by the courier crates: network addresses, the protocol
//! connection interface and its records, call contexts, and protocol errors.

pub mod address;
pub mod connection;
pub mod context;
pub mod errors;
pub mod ids;
pub mod records;

pub mod mock;

pub use address::{Address, AddressError};
pub use connection::Connection;
pub use context::CallContext;
pub use errors::{BenignCondition, ProtocolError};
pub use ids::SessionId;
pub use mock::{MockCall, MockConnection};
