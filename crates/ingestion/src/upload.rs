//! Bounded upload reading.
//!
//! Reads a byte stream in fixed-size chunks and aborts as soon as the running
//! total passes the configured ceiling, so oversized uploads are never fully
//! buffered.

use bias_core::config::IngestConfig;
use bias_core::{Error, Result};
use std::io::{ErrorKind, Read};
use tracing::{debug, warn};

/// Read the whole stream, failing with `UploadTooLarge` past `max_upload_bytes`.
pub fn read_bounded<R: Read>(mut reader: R, config: &IngestConfig) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut chunk = vec![0u8; config.read_chunk_bytes.max(1)];
    let mut total = 0usize;

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        total += n;
        if total > config.max_upload_bytes {
            warn!(
                read = total,
                limit = config.max_upload_bytes,
                "upload exceeds size ceiling, aborting read"
            );
            return Err(Error::UploadTooLarge {
                limit_bytes: config.max_upload_bytes,
            });
        }
        out.extend_from_slice(&chunk[..n]);
    }

    debug!(bytes = total, "upload read");
    Ok(out)
}

/// Reject uploads whose file name does not end in `.csv` (case-insensitive).
pub fn ensure_csv_filename(name: &str) -> Result<()> {
    if name.to_ascii_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(Error::data("Upload a CSV file."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that yields the same byte forever and counts how much was pulled.
    struct Endless {
        pulled: usize,
    }

    impl Read for Endless {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            buf.fill(b'x');
            self.pulled += buf.len();
            Ok(buf.len())
        }
    }

    fn config(max: usize, chunk: usize) -> IngestConfig {
        IngestConfig {
            max_upload_bytes: max,
            read_chunk_bytes: chunk,
        }
    }

    #[test]
    fn test_reads_small_upload() {
        let data = b"a,b\n1,2\n".to_vec();
        let out = read_bounded(data.as_slice(), &config(1024, 3)).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_exact_limit_allowed() {
        let data = vec![b'x'; 16];
        let out = read_bounded(data.as_slice(), &config(16, 4)).unwrap();
        assert_eq!(out.len(), 16);
    }

    #[test]
    fn test_aborts_before_full_buffering() {
        let mut reader = Endless { pulled: 0 };
        let err = read_bounded(&mut reader, &config(100, 10)).unwrap_err();
        assert!(matches!(err, Error::UploadTooLarge { limit_bytes: 100 }));
        // Stops on the first chunk past the ceiling
        assert_eq!(reader.pulled, 110);
    }

    #[test]
    fn test_csv_filename() {
        assert!(ensure_csv_filename("trades.CSV").is_ok());
        assert!(ensure_csv_filename("trades.xlsx").is_err());
        assert!(ensure_csv_filename("").is_err());
    }
}
