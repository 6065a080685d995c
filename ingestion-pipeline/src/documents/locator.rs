use std::path::{Path, PathBuf};

use common::error::IngestError;
use url::Url;

/// A parsed document locator.
///
/// Parsing is purely syntactic: nothing is opened or fetched, which keeps
/// reader selection cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A bare filesystem path or a `file://` URI.
    Local(PathBuf),
    /// An RFC 2397 `data:` URI.
    Data {
        media_type: String,
        base64: bool,
        payload: String,
    },
    /// `zip://<entry>::<archive>`, the archive being a local path.
    Zip { entry: String, archive: PathBuf },
    /// `http://` or `https://`.
    Remote(Url),
}

impl Locator {
    pub fn parse(raw: &str) -> Result<Self, IngestError> {
        if raw.trim().is_empty() {
            return Err(IngestError::UnsupportedLocator("empty locator".into()));
        }

        if let Some(rest) = raw.strip_prefix("data:") {
            return parse_data_uri(raw, rest);
        }

        if let Some(rest) = raw.strip_prefix("zip://") {
            return parse_zip_uri(raw, rest);
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url = Url::parse(raw)
                .map_err(|err| IngestError::UnsupportedLocator(format!("{raw}: {err}")))?;
            return Ok(Self::Remote(url));
        }

        if raw.starts_with("file://") {
            let url = Url::parse(raw)
                .map_err(|err| IngestError::UnsupportedLocator(format!("{raw}: {err}")))?;
            let path = url
                .to_file_path()
                .map_err(|()| IngestError::UnsupportedLocator(raw.to_string()))?;
            return Ok(Self::Local(path));
        }

        if let Some((scheme, _)) = raw.split_once("://") {
            if !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            {
                return Err(IngestError::UnsupportedLocator(format!(
                    "{raw} (unknown scheme '{scheme}')"
                )));
            }
        }

        Ok(Self::Local(PathBuf::from(raw)))
    }

    /// Lowercased file extension of the addressed resource, if any.
    pub fn extension(&self) -> Option<String> {
        match self {
            Self::Local(path) => extension_of(path),
            Self::Zip { entry, .. } => extension_of(Path::new(entry)),
            Self::Remote(url) => url
                .path_segments()
                .and_then(Iterator::last)
                .and_then(|segment| extension_of(Path::new(segment))),
            Self::Data { .. } => None,
        }
    }

    /// Media type of a `data:` URI, lowercased and without parameters.
    pub fn media_type(&self) -> Option<&str> {
        match self {
            Self::Data { media_type, .. } => Some(media_type.as_str()),
            _ => None,
        }
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn parse_data_uri(raw: &str, rest: &str) -> Result<Locator, IngestError> {
    let (meta, payload) = rest.split_once(',').ok_or_else(|| {
        IngestError::UnsupportedLocator(format!("{raw} (data URI without ',' separator)"))
    })?;

    let lowered = meta.to_ascii_lowercase();
    let (meta, base64) = match lowered.strip_suffix(";base64") {
        Some(stripped) => (stripped.to_string(), true),
        None => (lowered, false),
    };
    let media_type = meta
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(Locator::Data {
        media_type,
        base64,
        payload: payload.to_string(),
    })
}

fn parse_zip_uri(raw: &str, rest: &str) -> Result<Locator, IngestError> {
    let (entry, archive) = rest.split_once("::").ok_or_else(|| {
        IngestError::UnsupportedLocator(format!("{raw} (expected zip://<entry>::<archive>)"))
    })?;

    let entry = entry.trim_start_matches('/');
    if entry.is_empty() {
        return Err(IngestError::UnsupportedLocator(format!(
            "{raw} (missing archive entry)"
        )));
    }

    match Locator::parse(archive)? {
        Locator::Local(archive) => Ok(Locator::Zip {
            entry: entry.to_string(),
            archive,
        }),
        _ => Err(IngestError::UnsupportedLocator(format!(
            "{raw} (archives must be local files)"
        ))),
    }
}
