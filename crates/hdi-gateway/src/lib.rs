//! hdi-gateway - HTTP API for ChatHDI
//!
//! Serves the `/api` surface the web client talks to: chat, media and deck
//! generation, document parsing, reference data and saved conversations.

pub mod conversations;
pub mod documents;
pub mod protocol;
pub mod reference;
pub mod server;

pub use server::{GatewayServer, GatewayState, build_router};
