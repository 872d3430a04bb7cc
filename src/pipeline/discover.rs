//! Input discovery: find the PDFs in a folder and pair them with outputs.
//!
//! Only the top level of the input folder is scanned. A file counts as a PDF
//! when its name ends in `.pdf` in any letter case. Each document is written
//! to the output folder under the same file name.

use crate::error::CleanError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One unit of work for a batch worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentJob {
    /// File name, used in reports and progress events.
    pub name: String,
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Case-insensitive `.pdf` file-name check.
pub fn is_pdf_name(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase().ends_with(".pdf"))
        .unwrap_or(false)
}

/// File name of `path` for display, falling back to the full path.
pub fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// List the PDF files directly inside `input_dir`, sorted by file name.
pub fn discover_documents(input_dir: &Path) -> Result<Vec<PathBuf>, CleanError> {
    if !input_dir.exists() {
        return Err(CleanError::InputDirNotFound {
            path: input_dir.to_path_buf(),
        });
    }
    if !input_dir.is_dir() {
        return Err(CleanError::NotADirectory {
            path: input_dir.to_path_buf(),
        });
    }

    let read_err = |source: std::io::Error| CleanError::ReadDirFailed {
        path: input_dir.to_path_buf(),
        source,
    };

    let mut documents = Vec::new();
    for entry in std::fs::read_dir(input_dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() && is_pdf_name(&path) {
            documents.push(path);
        }
    }
    documents.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));

    debug!(
        "Found {} PDF(s) in {}",
        documents.len(),
        input_dir.display()
    );
    Ok(documents)
}

/// Build one job per PDF in `input_dir`, targeting the same name in `output_dir`.
pub fn plan_jobs(input_dir: &Path, output_dir: &Path) -> Result<Vec<DocumentJob>, CleanError> {
    Ok(discover_documents(input_dir)?
        .into_iter()
        .map(|input| {
            let name = document_name(&input);
            let output = output_dir.join(&name);
            DocumentJob {
                name,
                input,
                output,
            }
        })
        .collect())
}

/// Check that `path` is a readable file starting with the `%PDF` magic bytes.
pub fn validate_pdf(path: &Path) -> Result<(), CleanError> {
    if !path.exists() {
        return Err(CleanError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(CleanError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(CleanError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(CleanError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, contents).unwrap();
        p
    }

    #[test]
    fn pdf_name_is_case_insensitive() {
        assert!(is_pdf_name(Path::new("scan.pdf")));
        assert!(is_pdf_name(Path::new("SCAN.PDF")));
        assert!(is_pdf_name(Path::new("dir/Report.Pdf")));
        assert!(!is_pdf_name(Path::new("notes.txt")));
        assert!(!is_pdf_name(Path::new("archive.pdf.zip")));
        assert!(!is_pdf_name(Path::new("")));
    }

    #[test]
    fn discovery_is_flat_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.pdf", b"%PDF-1.5");
        touch(dir.path(), "A.PDF", b"%PDF-1.5");
        touch(dir.path(), "readme.txt", b"hello");
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        touch(&nested, "deep.pdf", b"%PDF-1.5");
        std::fs::create_dir(dir.path().join("folder.pdf")).unwrap();

        let found = discover_documents(dir.path()).unwrap();
        let names: Vec<String> = found.iter().map(|p| document_name(p)).collect();
        assert_eq!(names, vec!["A.PDF", "b.pdf"]);
    }

    #[test]
    fn jobs_keep_file_names() {
        let input = tempfile::tempdir().unwrap();
        touch(input.path(), "scan.pdf", b"%PDF-1.5");
        let jobs = plan_jobs(input.path(), Path::new("out")).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "scan.pdf");
        assert_eq!(jobs[0].output, Path::new("out").join("scan.pdf"));
    }

    #[test]
    fn missing_input_dir_is_reported() {
        let err = discover_documents(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, CleanError::InputDirNotFound { .. }));
    }

    #[test]
    fn file_as_input_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = touch(dir.path(), "x.pdf", b"%PDF");
        let err = discover_documents(&file).unwrap_err();
        assert!(matches!(err, CleanError::NotADirectory { .. }));
    }

    #[test]
    fn validate_checks_magic_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let good = touch(dir.path(), "good.pdf", b"%PDF-1.7\n");
        let bad = touch(dir.path(), "bad.pdf", b"PK\x03\x04zip");
        assert!(validate_pdf(&good).is_ok());
        assert!(matches!(
            validate_pdf(&bad).unwrap_err(),
            CleanError::NotAPdf { magic, .. } if &magic == b"PK\x03\x04"
        ));
        assert!(matches!(
            validate_pdf(&dir.path().join("absent.pdf")).unwrap_err(),
            CleanError::FileNotFound { .. }
        ));
    }
}
