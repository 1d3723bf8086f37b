//! CSV archiving of per-cycle records into the session's `arch` directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::path::Path;
use std::fs::File;
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
///
/// The default archiver has no writer and silently discards records, which is how archiving is
/// disabled.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session_path = session.arch_root.join(path);

        // Create any intermediate directories
        if let Some(parent) = session_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(session_path)?;

        let w = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            writer: Some(w)
        })
    }

    /// Returns true if records written to this archiver reach a file.
    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(
        &mut self, record: T
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(ref mut w) = self.writer {
            w.serialize(record)?;
            w.flush()?
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        tick: u64,
        v_x_ms: f64
    }

    #[test]
    fn test_archiver_writes_csv() {
        let root = tempfile::tempdir().unwrap();
        let session = Session::in_root(root.path(), "arch_test", "sessions").unwrap();

        let mut arch = Archiver::from_path(&session, "run/samples.csv").unwrap();
        assert!(arch.is_enabled());
        arch.serialise(Sample { tick: 0, v_x_ms: 1.5 }).unwrap();
        arch.serialise(Sample { tick: 1, v_x_ms: 2.5 }).unwrap();

        let contents = std::fs::read_to_string(session.arch_root.join("run/samples.csv")).unwrap();
        assert_eq!(contents, "tick,v_x_ms\n0,1.5\n1,2.5\n");
    }

    #[test]
    fn test_default_archiver_discards() {
        let mut arch = Archiver::default();
        assert!(!arch.is_enabled());
        assert!(arch.serialise(Sample { tick: 0, v_x_ms: 0.0 }).is_ok());
    }
}
