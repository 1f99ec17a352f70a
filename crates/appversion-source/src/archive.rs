//! Descriptor extraction from gzip-compressed tarballs and zip files.
//!
//! Both adapters list member names, pick the shallowest `app.yaml` (falling
//! back to `appengine-web.xml`) and return that member's bytes. Archive and
//! entry handles are dropped on every return path.

use crate::locate::locate;
use appversion_schema::{ConfigFormat, VersionError};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Descriptor bytes pulled out of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDescriptor {
    pub format: ConfigFormat,
    pub member: String,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    /// Guess the archive kind from the file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

/// Choose the member to read: shallowest `app.yaml`, else shallowest `appengine-web.xml`.
pub fn select_member(names: &[String]) -> Option<(ConfigFormat, &str)> {
    ConfigFormat::SEARCH_ORDER.into_iter().find_map(|format| {
        locate(format.file_name(), names.iter().map(String::as_str)).map(|name| (format, name))
    })
}

pub fn extract_from_tar_gz(
    path: &Path,
    max_bytes: u64,
) -> Result<ExtractedDescriptor, VersionError> {
    let location = path.display().to_string();
    let unreadable = |e: std::io::Error| VersionError::unreadable(&location, e);

    let names = {
        let mut archive = open_tar_gz(path).map_err(unreadable)?;
        let mut names = Vec::new();
        for entry in archive.entries().map_err(unreadable)? {
            let entry = entry.map_err(unreadable)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            names.push(entry.path().map_err(unreadable)?.to_string_lossy().into_owned());
        }
        names
    };
    debug!("{location}: {} file members", names.len());

    let (format, member) = select_member(&names).ok_or_else(|| VersionError::ConfigNotFound {
        location: location.clone(),
    })?;
    debug!("{location}: using member {member}");

    let mut archive = open_tar_gz(path).map_err(unreadable)?;
    for entry in archive.entries().map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        if entry.path().map_err(unreadable)?.to_string_lossy() != member {
            continue;
        }
        let contents = read_limited(entry, max_bytes, &format!("{location}:{member}"))?;
        return Ok(ExtractedDescriptor {
            format,
            member: member.to_owned(),
            contents,
        });
    }

    Err(VersionError::unreadable(
        location,
        format!("member {member} disappeared while reading"),
    ))
}

pub fn extract_from_zip(path: &Path, max_bytes: u64) -> Result<ExtractedDescriptor, VersionError> {
    let location = path.display().to_string();
    let file = File::open(path).map_err(|e| VersionError::unreadable(&location, e))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| VersionError::unreadable(&location, e))?;

    let names: Vec<String> = archive
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(str::to_owned)
        .collect();
    debug!("{location}: {} file entries", names.len());

    let (format, member) = select_member(&names).ok_or_else(|| VersionError::ConfigNotFound {
        location: location.clone(),
    })?;
    debug!("{location}: using entry {member}");

    let entry = archive
        .by_name(member)
        .map_err(|e| VersionError::unreadable(&location, e))?;
    let contents = read_limited(entry, max_bytes, &format!("{location}:{member}"))?;

    Ok(ExtractedDescriptor {
        format,
        member: member.to_owned(),
        contents,
    })
}

fn open_tar_gz(path: &Path) -> Result<tar::Archive<GzDecoder<File>>, std::io::Error> {
    let file = File::open(path)?;
    Ok(tar::Archive::new(GzDecoder::new(file)))
}

/// Read at most `max_bytes` from `reader`; anything longer is unreadable.
pub(crate) fn read_limited(
    reader: impl Read,
    max_bytes: u64,
    location: &str,
) -> Result<Vec<u8>, VersionError> {
    let mut contents = Vec::new();
    reader
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut contents)
        .map_err(|e| VersionError::unreadable(location, e))?;
    if contents.len() as u64 > max_bytes {
        return Err(VersionError::unreadable(
            location,
            format!("descriptor exceeds {max_bytes} bytes"),
        ));
    }
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(ArchiveKind::from_path(Path::new("app.tar.gz")), Some(ArchiveKind::TarGz));
        assert_eq!(ArchiveKind::from_path(Path::new("APP.TGZ")), Some(ArchiveKind::TarGz));
        assert_eq!(ArchiveKind::from_path(Path::new("/tmp/src.zip")), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_path(Path::new("src.tar")), None);
    }

    #[test]
    fn yaml_preferred_over_shallower_xml() {
        let list = names(&["WEB-INF/appengine-web.xml", "a/b/app.yaml"]);
        let (format, member) = select_member(&list).unwrap();
        assert_eq!(format, ConfigFormat::AppYaml);
        assert_eq!(member, "a/b/app.yaml");
    }

    #[test]
    fn falls_back_to_xml() {
        let list = names(&["war/WEB-INF/appengine-web.xml", "WEB-INF/appengine-web.xml"]);
        let (format, member) = select_member(&list).unwrap();
        assert_eq!(format, ConfigFormat::AppEngineWebXml);
        assert_eq!(member, "WEB-INF/appengine-web.xml");
    }

    #[test]
    fn nothing_recognized() {
        assert!(select_member(&names(&["main.py", "lib/app.yml"])).is_none());
    }

    #[test]
    fn read_limited_enforces_bound() {
        let data = b"0123456789";
        assert_eq!(read_limited(&data[..], 10, "mem").unwrap().len(), 10);
        let err = read_limited(&data[..], 9, "mem").unwrap_err();
        assert!(err.to_string().contains("exceeds 9 bytes"));
    }
}
