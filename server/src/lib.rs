pub mod client_handler;
pub mod connection;
pub mod delivery;
pub mod hub;
pub mod server_listener;
pub mod server_types;
