//! Input resolution
//!
//! The original jobs hardcoded Windows paths; here a source is a local file,
//! an HTTPS URL, or a directory of PDFs enumerated for bulk processing.

use crate::error::{Error, Result};
use futures_util::StreamExt;
use std::path::{Path, PathBuf};

/// Default cap for URL downloads (100MB)
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Resolved PDF data
pub struct ResolvedPdf {
    pub data: Vec<u8>,
    pub source_name: String,
}

fn validate_header(data: &[u8], what: &str) -> Result<()> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: format!("{} is not a valid PDF file", what),
        });
    }
    Ok(())
}

/// Resolve a file path to PDF data
pub fn resolve_path<P: AsRef<Path>>(path: P) -> Result<ResolvedPdf> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::PdfNotFound {
            path: path.display().to_string(),
        });
    }

    let data = std::fs::read(path).map_err(Error::Io)?;
    validate_header(&data, "File")?;

    Ok(ResolvedPdf {
        data,
        source_name: path.display().to_string(),
    })
}

/// Resolve a URL to PDF data, with a request timeout and a streamed size cap
pub async fn resolve_url(url: &str, max_download_bytes: u64) -> Result<ResolvedPdf> {
    url::Url::parse(url).map_err(|e| Error::SourceResolution {
        reason: format!("Invalid URL: {}", e),
    })?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .map_err(Error::HttpRequest)?;

    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(Error::SourceResolution {
            reason: format!("HTTP request failed with status: {}", response.status()),
        });
    }

    // Check Content-Length for early rejection
    if let Some(content_length) = response.content_length() {
        if content_length > max_download_bytes {
            return Err(Error::DownloadTooLarge {
                size: content_length,
                max_size: max_download_bytes,
            });
        }
    }

    // Stream the body, checking the cap incrementally
    let mut data = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Error::HttpRequest)?;
        data.extend_from_slice(&chunk);
        if data.len() as u64 > max_download_bytes {
            return Err(Error::DownloadTooLarge {
                size: data.len() as u64,
                max_size: max_download_bytes,
            });
        }
    }

    validate_header(&data, "Downloaded data")?;

    Ok(ResolvedPdf {
        data,
        source_name: url.to_string(),
    })
}

/// Resolve a path or URL source string
pub async fn resolve_source(source: &str) -> Result<ResolvedPdf> {
    if source.starts_with("http://") || source.starts_with("https://") {
        resolve_url(source, DEFAULT_MAX_DOWNLOAD_BYTES).await
    } else {
        resolve_path(source)
    }
}

/// A PDF file found while scanning a directory
#[derive(Debug, Clone)]
pub struct PdfFileInfo {
    /// Full path to the PDF file
    pub path: PathBuf,
    /// Filename only
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last modified time (ISO 8601), when available
    pub modified: Option<String>,
}

/// Enumerate PDF files under `dir`, sorted by name.
/// `pattern` is a filename glob (e.g. `report*.pdf`).
pub fn scan_directory(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PdfFileInfo>> {
    if !dir.is_dir() {
        return Err(Error::DirectoryScan {
            reason: format!("{} is not a directory", dir.display()),
        });
    }

    let pattern = match pattern {
        Some(p) => Some(glob::Pattern::new(p).map_err(|e| Error::DirectoryScan {
            reason: format!("Invalid pattern {:?}: {}", p, e),
        })?),
        None => None,
    };

    let mut files = Vec::new();
    collect_pdfs(dir, recursive, &pattern, &mut files)?;
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

fn collect_pdfs(
    dir: &Path,
    recursive: bool,
    pattern: &Option<glob::Pattern>,
    files: &mut Vec<PdfFileInfo>,
) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            if recursive {
                collect_pdfs(&path, recursive, pattern, files)?;
            }
            continue;
        }

        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };

        if !name.to_lowercase().ends_with(".pdf") {
            continue;
        }

        if let Some(p) = pattern {
            if !p.matches(&name) {
                continue;
            }
        }

        let metadata = entry.metadata()?;
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .and_then(|d| chrono::DateTime::from_timestamp(d.as_secs() as i64, 0))
            .map(|dt| dt.to_rfc3339());

        files.push(PdfFileInfo {
            path,
            name,
            size: metadata.len(),
            modified,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path_not_found() {
        let result = resolve_path("/nonexistent/path/file.pdf");
        assert!(matches!(result, Err(Error::PdfNotFound { .. })));
    }

    #[test]
    fn test_resolve_path_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"plain text, no header").unwrap();

        let result = resolve_path(&path);
        assert!(matches!(result, Err(Error::InvalidPdf { .. })));
    }

    #[test]
    fn test_resolve_path_accepts_pdf_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.pdf");
        std::fs::write(&path, b"%PDF-1.4 minimal").unwrap();

        let resolved = resolve_path(&path).unwrap();
        assert!(resolved.source_name.ends_with("ok.pdf"));
        assert_eq!(&resolved.data[0..4], b"%PDF");
    }

    #[test]
    fn test_scan_directory_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"nope").unwrap();

        let files = scan_directory(dir.path(), false, None).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_scan_directory_pattern() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report-1.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("other.pdf"), b"%PDF-1.4").unwrap();

        let files = scan_directory(dir.path(), false, Some("report*.pdf")).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "report-1.pdf");
    }

    #[test]
    fn test_scan_directory_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("nested.pdf"), b"%PDF-1.4").unwrap();

        let flat = scan_directory(dir.path(), false, None).unwrap();
        assert!(flat.is_empty());

        let deep = scan_directory(dir.path(), true, None).unwrap();
        assert_eq!(deep.len(), 1);
        assert_eq!(deep[0].name, "nested.pdf");
    }

    #[test]
    fn test_scan_directory_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let result = scan_directory(&path, false, None);
        assert!(matches!(result, Err(Error::DirectoryScan { .. })));
    }
}
