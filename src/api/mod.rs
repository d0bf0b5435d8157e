pub mod handlers;

pub use handlers::{compare, compare_batch, health_check};
