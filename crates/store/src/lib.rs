//! In-memory persistence and credential adapters.
//!
//! Implements the persistence ports of the [`pipeline`] crate
//! ([`pipeline::PipelineRepository`], [`pipeline::ResourceRepository`],
//! [`pipeline::ResourceConfigRepository`]) and the
//! [`pipeline::VariableSource`] credential port, seeded from a declarative
//! [`Catalog`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Locking, identity allocation and scope lookup rules live
//! here; the [`pipeline`] crate sees only the traits.

mod catalog;
mod memory;
mod variables;

pub use catalog::{Catalog, PipelineDefinition, ResourceDefinition};
pub use memory::MemoryStore;
pub use variables::StaticVariables;
