// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export the helpers integration tests exercise
pub use handlers::{parse_seed, write_output};
