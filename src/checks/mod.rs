//! Leaf audit checks.
//!
//! Each check is a small wrapper around command output or file inspection,
//! implementing the [`crate::check::Check`] contract. Platform selection
//! happens in [`crate::claims`], not here; every check compiles on every
//! target.

pub mod linux;
pub mod shared;
