pub mod aggregate;
pub mod check;
pub mod import;
pub mod node_ops;
pub mod relocate;
pub mod rules;
pub mod search;
