use crate::protocol::TelemetryRecord;

/// Holder of the latest sensor snapshot
///
/// Each sample overwrites the previous one. Publishing reads the record
/// without clearing it, so repeated publishes without a new sample send the
/// same document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryBuffer {
    latest: Option<TelemetryRecord>,
}

impl TelemetryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, record: TelemetryRecord) {
        self.latest = Some(record);
    }

    /// The latest record, or `None` before the first sample
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.latest.as_ref()
    }
}
