// Whole-file reads for calibration documents; no partial buffers on failure.
use crate::core::error::{Error, ErrorKind};
use std::fs;
use std::io;
use std::path::Path;

pub fn read_whole_file(path: impl AsRef<Path>) -> Result<Vec<u8>, Error> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| {
        Error::new(io_error_kind(&err))
            .with_message("failed to read calibration file")
            .with_path(path)
            .with_source(err)
    })?;
    tracing::debug!(path = %path.display(), len = bytes.len(), "read calibration file");
    Ok(bytes)
}

fn io_error_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::read_whole_file;
    use crate::core::error::ErrorKind;

    #[test]
    fn reads_entire_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("marker.json");
        std::fs::write(&path, b"{\"num_angles\":1}").expect("write");

        let bytes = read_whole_file(&path).expect("read");
        assert_eq!(bytes, b"{\"num_angles\":1}");
    }

    #[test]
    fn missing_file_reports_not_found_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.json");

        let err = read_whole_file(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.path(), Some(path.as_path()));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_reports_permission() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("locked.json");
        std::fs::write(&path, b"{}").expect("write");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).expect("chmod");
        if std::fs::File::open(&path).is_ok() {
            // Privileged users bypass mode bits.
            return;
        }

        let err = read_whole_file(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(err.path(), Some(path.as_path()));
        assert_eq!(crate::core::error::to_exit_code(err.kind()), 4);
    }

    #[test]
    fn directory_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_whole_file(dir.path()).unwrap_err();
        assert_ne!(err.kind(), ErrorKind::NotFound);
    }
}
