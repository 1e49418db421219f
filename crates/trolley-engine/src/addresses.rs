//! Read-only source of shipping records.

use std::path::Path;
use thiserror::Error;
use tracing::info;
use trolley_common::protocol::AddressRecord;

#[derive(Debug, Error)]
pub enum AddressBookError {
    #[error("Failed to read address book: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse address book: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Ordered, finite collection of address records. Loaded once at startup,
/// never mutated afterwards. Records are addressed by index.
pub struct AddressBook {
    records: Vec<AddressRecord>,
}

impl AddressBook {
    /// Load a JSON array of records.
    pub fn load(path: &Path) -> Result<Self, AddressBookError> {
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<AddressRecord> = serde_json::from_str(&raw)?;
        info!(count = records.len(), path = %path.display(), "Loaded address book");
        Ok(Self { records })
    }

    pub fn from_records(records: Vec<AddressRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AddressRecord> {
        self.records.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_records_from_json_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"firstName":"Asha","lastName":"Verma","address1":"12 MG Road","address2":"","city":"Pune","postalCode":411001,"zone":"Maharashtra"}}]"#
        )
        .unwrap();
        let book = AddressBook::load(file.path()).unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(book.get(0).unwrap().city, "Pune");
        assert!(book.get(1).is_none());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            AddressBook::load(file.path()),
            Err(AddressBookError::Parse(_))
        ));
    }
}
