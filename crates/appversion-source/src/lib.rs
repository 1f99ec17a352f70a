//! Descriptor discovery and loading for app versions.
//!
//! This crate resolves where an `app.yaml` or `appengine-web.xml` lives:
//! a file, raw bytes, a directory tree, or a `.tar.gz`/`.zip` archive,
//! using the shortest-path rule (`locate`), then hands the descriptor to the
//! translators in `appversion-schema`. `Loader` carries the configuration and
//! handler collaborator; the free functions use a default `Loader`.

pub mod archive;
pub mod config;
pub mod loader;
pub mod locate;

pub use archive::{
    extract_from_tar_gz, extract_from_zip, select_member, ArchiveKind, ExtractedDescriptor,
};
pub use config::{LoaderConfig, DEFAULT_MAX_DESCRIPTOR_BYTES};
pub use loader::{
    from_archive, from_contents, from_directory, from_file, from_tar_gz, from_zip, Loader,
};
pub use locate::{locate, locate_in_directory, walk_files};

pub use appversion_schema::{CanonicalVersion, ConfigFormat, VersionError};
