#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod artifact;
mod collector;
mod composer;
mod configuration;
mod dependency;
mod error;
mod files;
mod graph;
mod hash;
mod lazy;
mod manifest;
mod notation;
pub mod plugin;
mod resolver;
mod settings;
mod utils;

pub use crate::artifact::{ArtifactBinding, ProducerId, PublishArtifact};
pub use crate::collector::DependencyCollector;
pub use crate::composer::{Classpath, ClasspathComposer, ConfigurationView};
pub use crate::configuration::Configuration;
pub use crate::dependency::{
    Capability, ConfiguringAction, DEFAULT_TARGET_CONFIGURATION, Dependency, DependencyKind,
    ExcludeRule, ExternalModuleDependency, FileCollectionDependency, ProjectDependency,
};
pub use crate::error::*;
pub use crate::files::{FileEntry, FileSet};
pub use crate::graph::{ConfigurationGraph, ConfigurationHandle};
pub use crate::hash::Fingerprint;
pub use crate::lazy::LazyValue;
pub use crate::manifest::{ConfigurationManifest, Manifest};
pub use crate::notation::{
    CatalogModule, Declared, DependencyContext, ModuleCoordinates, Notation, NotationParser,
    ProjectRef,
};
pub use crate::plugin::{Plugin, WarArchive};
pub use crate::resolver::{LayoutResolver, Resolver};
pub use crate::settings::Settings;
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;
