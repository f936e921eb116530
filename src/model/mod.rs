pub mod node;
pub mod progress;
pub mod document;
pub mod config;

pub use node::*;
pub use progress::*;
pub use document::*;
pub use config::*;
