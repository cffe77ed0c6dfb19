use crate::models::HashRecord;
use anyhow::Result;

/// Processed files for the current session, most recent first.
///
/// Nothing is written to disk; the list lives until `clear` or drop.
#[derive(Debug, Default)]
pub struct History {
    records: Vec<HashRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: HashRecord) {
        self.records.insert(0, record);
    }

    pub fn latest(&self) -> Option<&HashRecord> {
        self.records.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HashRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }
}
