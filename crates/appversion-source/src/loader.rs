use crate::archive::{extract_from_tar_gz, extract_from_zip, read_limited, ArchiveKind};
use crate::config::LoaderConfig;
use crate::locate::{locate, walk_files};
use appversion_schema::{
    from_document, from_element_tree, CanonicalVersion, ConfigFormat, HandlerParser,
    OpaqueHandlerParser, VersionError,
};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Resolves a descriptor from a file, raw contents, a directory, or an
/// archive, and translates it into a [`CanonicalVersion`].
pub struct Loader {
    config: LoaderConfig,
    handler_parser: Box<dyn HandlerParser>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            handler_parser: Box::new(OpaqueHandlerParser),
        }
    }

    /// Replace the collaborator that turns `app.yaml` handler entries into handlers.
    #[must_use]
    pub fn with_handler_parser(mut self, parser: impl HandlerParser + 'static) -> Self {
        self.handler_parser = Box::new(parser);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Parse descriptor bytes of the given format; no file I/O.
    pub fn from_contents(
        &self,
        contents: &[u8],
        format: ConfigFormat,
    ) -> Result<CanonicalVersion, VersionError> {
        match format {
            ConfigFormat::AppYaml => {
                let doc: serde_yaml::Value = serde_yaml::from_slice(contents).map_err(|e| {
                    VersionError::unreadable(format.file_name(), format!("invalid app.yaml: {e}"))
                })?;
                from_document(
                    &doc,
                    self.handler_parser.as_ref(),
                    &self.config.default_service,
                )
            }
            ConfigFormat::AppEngineWebXml => {
                let text = std::str::from_utf8(contents).map_err(|e| {
                    VersionError::unreadable(
                        format.file_name(),
                        format!("invalid appengine-web.xml: {e}"),
                    )
                })?;
                let doc = roxmltree::Document::parse(text).map_err(|e| {
                    VersionError::unreadable(
                        format.file_name(),
                        format!("invalid appengine-web.xml: {e}"),
                    )
                })?;
                from_element_tree(doc.root_element(), &self.config.default_service)
            }
        }
    }

    /// Read and parse a descriptor file. Any failure to open or read it,
    /// including a missing file, is reported as unreadable.
    pub fn from_file(
        &self,
        path: &Path,
        format: ConfigFormat,
    ) -> Result<CanonicalVersion, VersionError> {
        let location = path.display().to_string();
        let file = File::open(path).map_err(|e| VersionError::unreadable(&location, e))?;
        let contents = read_limited(file, self.config.max_descriptor_bytes, &location)?;
        debug!("read {} bytes from {location}", contents.len());
        self.from_contents(&contents, format)
    }

    /// Search `root` recursively for `app.yaml`, then `appengine-web.xml`.
    pub fn from_directory(&self, root: &Path) -> Result<CanonicalVersion, VersionError> {
        let location = root.display().to_string();
        let files = walk_files(root).map_err(|e| VersionError::unreadable(&location, e))?;

        for format in ConfigFormat::SEARCH_ORDER {
            if let Some(rel) = locate(format.file_name(), &files) {
                let path = root.join(rel);
                info!("using {format} at {}", path.display());
                return self.from_file(&path, format);
            }
        }

        Err(VersionError::ConfigNotFound { location })
    }

    pub fn from_tar_gz(&self, path: &Path) -> Result<CanonicalVersion, VersionError> {
        let extracted = extract_from_tar_gz(path, self.config.max_descriptor_bytes)?;
        info!("using {} from {}", extracted.member, path.display());
        self.from_contents(&extracted.contents, extracted.format)
    }

    pub fn from_zip(&self, path: &Path) -> Result<CanonicalVersion, VersionError> {
        let extracted = extract_from_zip(path, self.config.max_descriptor_bytes)?;
        info!("using {} from {}", extracted.member, path.display());
        self.from_contents(&extracted.contents, extracted.format)
    }

    /// Dispatch on the archive's file extension.
    pub fn from_archive(&self, path: &Path) -> Result<CanonicalVersion, VersionError> {
        match ArchiveKind::from_path(path) {
            Some(ArchiveKind::TarGz) => self.from_tar_gz(path),
            Some(ArchiveKind::Zip) => self.from_zip(path),
            None => Err(VersionError::unreadable(
                path.display().to_string(),
                "unsupported archive type (expected .tar.gz, .tgz or .zip)",
            )),
        }
    }
}

pub fn from_contents(
    contents: &[u8],
    format: ConfigFormat,
) -> Result<CanonicalVersion, VersionError> {
    Loader::default().from_contents(contents, format)
}

pub fn from_file(path: &Path, format: ConfigFormat) -> Result<CanonicalVersion, VersionError> {
    Loader::default().from_file(path, format)
}

pub fn from_directory(root: &Path) -> Result<CanonicalVersion, VersionError> {
    Loader::default().from_directory(root)
}

pub fn from_tar_gz(path: &Path) -> Result<CanonicalVersion, VersionError> {
    Loader::default().from_tar_gz(path)
}

pub fn from_zip(path: &Path) -> Result<CanonicalVersion, VersionError> {
    Loader::default().from_zip(path)
}

pub fn from_archive(path: &Path) -> Result<CanonicalVersion, VersionError> {
    Loader::default().from_archive(path)
}
