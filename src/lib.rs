//! Editor core for hierarchical Feature-Driven Development plans.
//!
//! A [`model::Document`] holds the Program > Project > Aspect > Subject >
//! Activity > Feature tree. [`session::Session`] is the mutation surface:
//! every edit is checked against the hierarchy rules, recorded as an
//! undoable command and followed by progress aggregation.

pub mod cli;
pub mod io;
pub mod model;
pub mod ops;
pub mod session;
pub mod undo;
pub mod util;
