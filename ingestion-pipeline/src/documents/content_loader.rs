use std::{fs::File, io::Read, path::Path};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::error::IngestError;
use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, warn};
use url::Url;
use zip::{result::ZipError, ZipArchive};

use super::locator::Locator;

/// Fetches the raw bytes behind a locator.
#[async_trait]
pub trait ContentLoader: Send + Sync {
    fn load_bytes(&self, locator: &str) -> Result<Vec<u8>, IngestError>;

    fn load_text(&self, locator: &str) -> Result<String, IngestError> {
        self.load_text_with_encoding(locator, DEFAULT_ENCODING)
    }

    /// Decodes with the WHATWG encoding named by `encoding` (`utf-8`,
    /// `windows-1252`, `shift_jis`, ...). Malformed input is a parse error.
    fn load_text_with_encoding(
        &self,
        locator: &str,
        encoding: &str,
    ) -> Result<String, IngestError> {
        let encoding = resolve_encoding(encoding)?;
        let bytes = self.load_bytes(locator)?;
        decode_text(locator, bytes, encoding)
    }

    async fn load_bytes_async(&self, locator: &str) -> Result<Vec<u8>, IngestError> {
        self.load_bytes(locator)
    }

    async fn load_text_async(&self, locator: &str) -> Result<String, IngestError> {
        self.load_text_with_encoding_async(locator, DEFAULT_ENCODING).await
    }

    async fn load_text_with_encoding_async(
        &self,
        locator: &str,
        encoding: &str,
    ) -> Result<String, IngestError> {
        let encoding = resolve_encoding(encoding)?;
        let bytes = self.load_bytes_async(locator).await?;
        decode_text(locator, bytes, encoding)
    }
}

pub const DEFAULT_ENCODING: &str = "utf-8";

fn resolve_encoding(label: &str) -> Result<&'static Encoding, IngestError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| IngestError::Validation(format!("unknown text encoding '{label}'")))
}

fn decode_text(
    locator: &str,
    bytes: Vec<u8>,
    encoding: &'static Encoding,
) -> Result<String, IngestError> {
    if encoding == UTF_8 {
        return String::from_utf8(bytes)
            .map_err(|err| IngestError::Parse(format!("{locator} is not valid UTF-8: {err}")));
    }

    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes)
        .map(std::borrow::Cow::into_owned)
        .ok_or_else(|| IngestError::Parse(format!("{locator} is not valid {}", encoding.name())))
}

/// Loader for local paths, `file://`, `data:`, `zip://` and, on the async
/// path only, `http(s)://` locators.
#[derive(Debug, Clone, Default)]
pub struct DefaultContentLoader {
    http: reqwest::Client,
}

impl DefaultContentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn fetch_remote(&self, locator: &str, url: Url) -> Result<Vec<u8>, IngestError> {
        let response = self.http.get(url).send().await.map_err(|err| {
            warn!(locator, error = %err, "remote document unreachable");
            IngestError::DocumentNotFound(locator.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(locator, status = status.as_u16(), "remote document request failed");
            return Err(IngestError::DocumentNotFound(locator.to_string()));
        }

        let body = response.bytes().await.map_err(|err| {
            warn!(locator, error = %err, "remote document body could not be read");
            IngestError::DocumentNotFound(locator.to_string())
        })?;

        debug!(locator, bytes = body.len(), "remote document fetched");
        Ok(body.to_vec())
    }
}

#[async_trait]
impl ContentLoader for DefaultContentLoader {
    fn load_bytes(&self, locator: &str) -> Result<Vec<u8>, IngestError> {
        match Locator::parse(locator)? {
            Locator::Local(path) => std::fs::read(&path).map_err(|err| map_io(locator, err)),
            Locator::Data {
                base64, payload, ..
            } => decode_data(locator, base64, &payload),
            Locator::Zip { entry, archive } => read_zip_entry(locator, &archive, &entry),
            Locator::Remote(_) => Err(IngestError::UnsupportedLocator(format!(
                "{locator} can only be loaded asynchronously"
            ))),
        }
    }

    async fn load_bytes_async(&self, locator: &str) -> Result<Vec<u8>, IngestError> {
        match Locator::parse(locator)? {
            Locator::Local(path) => tokio::fs::read(&path)
                .await
                .map_err(|err| map_io(locator, err)),
            Locator::Data {
                base64, payload, ..
            } => decode_data(locator, base64, &payload),
            Locator::Zip { entry, archive } => {
                let owned_locator = locator.to_string();
                tokio::task::spawn_blocking(move || {
                    read_zip_entry(&owned_locator, &archive, &entry)
                })
                .await?
            }
            Locator::Remote(url) => self.fetch_remote(locator, url).await,
        }
    }
}

fn map_io(locator: &str, err: std::io::Error) -> IngestError {
    if err.kind() == std::io::ErrorKind::NotFound {
        IngestError::DocumentNotFound(locator.to_string())
    } else {
        IngestError::Io(err)
    }
}

fn decode_data(locator: &str, base64: bool, payload: &str) -> Result<Vec<u8>, IngestError> {
    if base64 {
        STANDARD
            .decode(payload.trim())
            .map_err(|err| IngestError::Parse(format!("{locator}: invalid base64 payload: {err}")))
    } else {
        Ok(urlencoding::decode_binary(payload.as_bytes()).into_owned())
    }
}

fn read_zip_entry(locator: &str, archive: &Path, entry: &str) -> Result<Vec<u8>, IngestError> {
    let file = File::open(archive).map_err(|err| map_io(locator, err))?;
    let mut zip = ZipArchive::new(file)
        .map_err(|err| IngestError::Parse(format!("{locator}: unreadable archive: {err}")))?;

    let mut member = match zip.by_name(entry) {
        Ok(member) => member,
        Err(ZipError::FileNotFound) => {
            return Err(IngestError::DocumentNotFound(locator.to_string()))
        }
        Err(err) => {
            return Err(IngestError::Parse(format!(
                "{locator}: unreadable archive entry: {err}"
            )))
        }
    };

    let mut buffer = Vec::new();
    member.read_to_end(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };
    use zip::{write::SimpleFileOptions, ZipWriter};

    use super::*;

    const TEXT: &str = "Café 🚀 — hello";
    const BYTES: &[u8] = b"\x00\xff\x10hello\xfe";

    fn write_archive(dir: &Path, name: &str, entry: &str, contents: &[u8]) -> std::path::PathBuf {
        let archive_path = dir.join(name);
        let file = File::create(&archive_path).expect("create archive");
        let mut writer = ZipWriter::new(file);
        writer
            .start_file(entry, SimpleFileOptions::default())
            .expect("start entry");
        writer.write_all(contents).expect("write entry");
        writer.finish().expect("finish archive");
        archive_path
    }

    #[test]
    fn loads_text_from_data_uris() {
        let loader = DefaultContentLoader::new();

        assert_eq!(
            loader.load_text("data:,Hello%2C%20World%21").expect("load"),
            "Hello, World!"
        );
        assert_eq!(
            loader
                .load_text("data:text/plain;base64,SGVsbG8sIHdvcmxkIQ==")
                .expect("load"),
            "Hello, world!"
        );
    }

    #[test]
    fn loads_local_paths_and_file_uris() {
        let dir = tempfile::tempdir().expect("tempdir");
        let text_path = dir.path().join("hello.txt");
        std::fs::write(&text_path, TEXT).expect("write");
        let bin_path = dir.path().join("data.bin");
        std::fs::write(&bin_path, BYTES).expect("write");
        let loader = DefaultContentLoader::new();

        let path_str = text_path.to_str().expect("utf-8 path");
        assert_eq!(loader.load_text(path_str).expect("load"), TEXT);

        let uri = Url::from_file_path(&text_path).expect("file uri").to_string();
        assert_eq!(loader.load_text(&uri).expect("load"), TEXT);

        assert_eq!(
            loader
                .load_bytes(bin_path.to_str().expect("utf-8 path"))
                .expect("load"),
            BYTES
        );
    }

    #[test]
    fn missing_files_are_document_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("does_not_exist.txt");
        let locator = missing.to_str().expect("utf-8 path");

        let err = DefaultContentLoader::new()
            .load_text(locator)
            .expect_err("missing file");

        assert!(matches!(err, IngestError::DocumentNotFound(ref l) if l == locator));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bin_path = dir.path().join("data.bin");
        std::fs::write(&bin_path, BYTES).expect("write");

        let err = DefaultContentLoader::new()
            .load_text(bin_path.to_str().expect("utf-8 path"))
            .expect_err("not utf-8");

        assert!(matches!(err, IngestError::Parse(_)));
    }

    #[test]
    fn loads_archive_members() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = write_archive(dir.path(), "arc.zip", "inner/hello.txt", TEXT.as_bytes());
        let loader = DefaultContentLoader::new();

        let locator = format!("zip://inner/hello.txt::{}", archive.display());
        assert_eq!(loader.load_text(&locator).expect("load"), TEXT);

        let missing_entry = format!("zip://inner/absent.txt::{}", archive.display());
        assert!(matches!(
            loader.load_text(&missing_entry),
            Err(IngestError::DocumentNotFound(_))
        ));

        let missing_archive = format!(
            "zip://inner/hello.txt::{}",
            dir.path().join("nope.zip").display()
        );
        assert!(matches!(
            loader.load_text(&missing_archive),
            Err(IngestError::DocumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn async_loading_matches_sync_loading() {
        let dir = tempfile::tempdir().expect("tempdir");
        let text_path = dir.path().join("hello_async.txt");
        std::fs::write(&text_path, TEXT).expect("write");
        let archive = write_archive(dir.path(), "arc_async.zip", "inner/data.bin", BYTES);
        let loader = DefaultContentLoader::new();

        assert_eq!(
            loader
                .load_text_async(text_path.to_str().expect("utf-8 path"))
                .await
                .expect("load"),
            TEXT
        );
        assert_eq!(
            loader
                .load_bytes_async(&format!("zip://inner/data.bin::{}", archive.display()))
                .await
                .expect("load"),
            BYTES
        );
        assert_eq!(
            loader
                .load_text_async("data:,Hello%20World")
                .await
                .expect("load"),
            "Hello World"
        );
    }

    #[tokio::test]
    async fn fetches_remote_documents_asynchronously() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/guide.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("remote body"))
            .mount(&server)
            .await;
        let loader = DefaultContentLoader::new();
        let locator = format!("{}/docs/guide.txt", server.uri());

        assert_eq!(
            loader.load_text_async(&locator).await.expect("load"),
            "remote body"
        );

        let missing = format!("{}/docs/missing.txt", server.uri());
        assert!(matches!(
            loader.load_text_async(&missing).await,
            Err(IngestError::DocumentNotFound(ref l)) if *l == missing
        ));
    }

    #[test]
    fn decodes_legacy_encodings_on_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("latin.txt");
        std::fs::write(&path, b"caf\xe9 cr\xe8me").expect("write");
        let locator = path.to_str().expect("utf-8 path");
        let loader = DefaultContentLoader::new();

        assert_eq!(
            loader
                .load_text_with_encoding(locator, "windows-1252")
                .expect("decode"),
            "café crème"
        );
        assert!(matches!(
            loader.load_text(locator),
            Err(IngestError::Parse(_))
        ));
        assert!(matches!(
            loader.load_text_with_encoding(locator, "klingon-8"),
            Err(IngestError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn async_decoding_honours_the_encoding() {
        let loader = DefaultContentLoader::new();
        let locator = "data:text/plain;base64,Y2Fm6Q==";

        assert_eq!(
            loader
                .load_text_with_encoding_async(locator, "latin1")
                .await
                .expect("decode"),
            "café"
        );
        assert!(matches!(
            loader.load_text_async(locator).await,
            Err(IngestError::Parse(_))
        ));
    }

    #[test]
    fn remote_documents_need_the_async_path() {
        let err = DefaultContentLoader::new()
            .load_text("https://example.com/guide.txt")
            .expect_err("sync remote load");

        assert!(matches!(err, IngestError::UnsupportedLocator(_)));
    }
}
