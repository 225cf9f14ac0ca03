//! Artifact sources and precedence resolution for the overlay launcher.
//!
//! Given a launcher manifest, the resolver decides for each artifact which
//! of several competing copies is the most up-to-date usable one.
//!
//! # Architecture
//!
//! Four sources are consulted, each keyed by full filename:
//! - **Declared**: artifacts listed by the manifest
//! - **Cached**: previously resolved archives in `repository2/`
//! - **Overrides**: user-supplied archives in `patches/`
//! - **Snapshots**: materialized override-group baselines
//!
//! Filenames are split into a short name and a dotted version
//! ([`Identity`]); candidates sharing a logical name are compared with
//! [`newest`] and the winner is picked by [`resolve`].

pub mod error;
pub mod identity;
pub mod integrity;
pub mod layout;
pub mod manifest;
pub mod registry;
pub mod resolution;
pub mod version;

// Re-exports for convenience.
pub use error::{RegistryError, Result};
pub use identity::Identity;
pub use integrity::ContentHash;
pub use layout::{snapshot_slot, Layout};
pub use manifest::{file_url, local_path, Artifact, Manifest};
pub use registry::{
    has_archive_extension, list_archives, list_dir, RegistryBuilder, RegistryEntry, Source,
    SourceRegistry,
};
pub use resolution::{resolve, Candidates, Resolution};
pub use version::{compare_versions, newest};
