pub mod handler;

pub use handler::{forward_and_accumulate, StreamProbe};
