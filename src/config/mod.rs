pub mod env;

pub use env::{EnvManager, Endpoints, DEFAULT_CALLBACK_PORT};
