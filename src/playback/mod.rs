pub mod fetch;
pub mod sync;
pub mod transcript;
