//! Domain models for docforge.
//!
//! # Core Concepts
//!
//! - [`User`]: Account that owns projects. Identified by email.
//! - [`Project`]: A document outline with a main topic and a target export format.
//! - [`Section`]: Ordered part of a project. Its `content` always holds the
//!   latest generated or refined text.
//! - [`Refinement`]: Immutable audit record of one refinement applied to a
//!   section (`old_content` → `new_content`). Replaying the chain reconstructs
//!   every earlier version.
//! - [`Comment`] and [`Feedback`]: Plain annotations attached to a section.

mod project;
mod section;
mod user;

pub use project::*;
pub use section::*;
pub use user::*;
