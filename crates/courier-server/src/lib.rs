//! Session registry, request handlers, and the JSON-RPC over WebSocket
//! transport they are served on.

pub mod client;
pub mod compat;
pub mod errors;
pub mod handlers;
pub mod mappers;
pub mod registry;
pub mod rpc;
pub mod server;

pub use errors::RequestError;
pub use handlers::HandlerState;
pub use registry::{ConnectionHandle, RegistryError, SessionLookup, SessionRegistry, SessionState};
pub use server::{start, ServerConfig, ServerHandle};
