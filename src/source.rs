use std::io::Read;
use std::path::Path;

use crate::error::LoadError;

pub const DEFAULT_SOURCE_ZIP: &str = "Medicare_IP_Hospitals_by_Geography_and_Service_2023.zip";
pub const DEFAULT_CSV_ENTRY: &str = "Medicare_IP_Hospitals_by_Geography_and_Service_2023.csv";

/// Reads the raw CSV bytes from a `.zip` archive entry or a plain `.csv` file.
pub fn read_source(path: &Path, csv_entry: &str) -> Result<Vec<u8>, LoadError> {
    if !path.is_file() {
        return Err(LoadError::SourceMissing {
            path: path.to_path_buf(),
        });
    }

    let extension = path
        .extension()
        .and_then(|x| x.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match extension.as_str() {
        "zip" => extract_csv_from_zip(path, csv_entry),
        "csv" => Ok(std::fs::read(path)?),
        _ => Err(LoadError::UnsupportedSource {
            path: path.to_path_buf(),
        }),
    }
}

fn extract_csv_from_zip(zip_path: &Path, csv_entry: &str) -> Result<Vec<u8>, LoadError> {
    let f = std::fs::File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(f)?;

    // Archives repackaged by hand often nest the CSV under a folder.
    let nested = format!("/{csv_entry}");
    let mut chosen_index: Option<usize> = None;
    for i in 0..archive.len() {
        let name = archive.by_index(i)?.name().to_string();
        if name == csv_entry {
            chosen_index = Some(i);
            break;
        }
        if chosen_index.is_none() && name.ends_with(&nested) {
            chosen_index = Some(i);
        }
    }
    let idx = chosen_index.ok_or_else(|| LoadError::EntryMissing {
        archive: zip_path.to_path_buf(),
        entry: csv_entry.to_string(),
    })?;

    let mut zf = archive.by_index(idx)?;
    tracing::info!("Extracting {} from {}", zf.name(), zip_path.display());
    let mut buf = Vec::with_capacity(zf.size() as usize);
    zf.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let f = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(f);
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn reads_named_entry_from_zip() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("source.zip");
        write_zip(
            &zip_path,
            &[("README.txt", "ignore me"), (DEFAULT_CSV_ENTRY, "a,b\n1,2\n")],
        );

        let bytes = read_source(&zip_path, DEFAULT_CSV_ENTRY).unwrap();
        assert_eq!(bytes, b"a,b\n1,2\n");
    }

    #[test]
    fn finds_entry_nested_in_a_folder() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("source.zip");
        write_zip(&zip_path, &[("export/data.csv", "x\n")]);

        assert_eq!(read_source(&zip_path, "data.csv").unwrap(), b"x\n");
    }

    #[test]
    fn missing_entry_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("source.zip");
        write_zip(&zip_path, &[("other.csv", "x\n")]);

        let err = read_source(&zip_path, DEFAULT_CSV_ENTRY).unwrap_err();
        assert!(matches!(err, LoadError::EntryMissing { .. }));
    }

    #[test]
    fn missing_file_and_unknown_extension_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_source(&dir.path().join("nope.zip"), DEFAULT_CSV_ENTRY).unwrap_err();
        assert!(matches!(err, LoadError::SourceMissing { .. }));

        let txt = dir.path().join("data.txt");
        std::fs::write(&txt, "x").unwrap();
        let err = read_source(&txt, DEFAULT_CSV_ENTRY).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedSource { .. }));
    }

    #[test]
    fn plain_csv_is_read_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("data.CSV");
        std::fs::write(&csv, "h\n1\n").unwrap();
        assert_eq!(read_source(&csv, DEFAULT_CSV_ENTRY).unwrap(), b"h\n1\n");
    }
}
