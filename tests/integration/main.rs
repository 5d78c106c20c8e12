//! Integration tests against local mock HTTP servers.

mod chat_client;
mod mock_server;
