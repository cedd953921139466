pub mod annotate;
pub mod blocks;
pub mod io;
pub mod layout;
pub mod notes;
pub mod render;
pub mod schedule;
pub mod session;
pub mod store;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use annotate::*;
pub use blocks::*;
pub use io::*;
pub use layout::*;
pub use notes::*;
pub use render::*;
pub use schedule::*;
pub use session::*;
pub use store::*;
