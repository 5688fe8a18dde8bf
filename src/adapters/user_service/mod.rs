//! User service adapters.
//!
//! - `HttpUserDirectory` - Calls the user service over HTTP with a bounded timeout
//! - `StaticUserDirectory` - In-memory table for tests and local runs

mod http_user_directory;
mod static_user_directory;

pub use http_user_directory::{HttpUserDirectory, DEFAULT_LOOKUP_TIMEOUT};
pub use static_user_directory::StaticUserDirectory;
