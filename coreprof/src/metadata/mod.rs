//! Metadata registry: functions, classes, modules, assemblies and source lines

pub mod entities;
pub mod registry;

pub use entities::{AppDomain, Assembly, Class, Function, Module, SourceFile, SourceLine};
pub use registry::{LineKey, MetadataRegistry};
