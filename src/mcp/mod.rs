//! Model Context Protocol server over stdin/stdout.

pub mod protocol;
mod server;
mod tools;

pub use server::McpServer;
