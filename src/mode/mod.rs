#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "history")]
pub mod history;
