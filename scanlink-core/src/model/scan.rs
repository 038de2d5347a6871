use serde::{Deserialize, Serialize};
use std::fmt;

/// Default on-screen lifetime a sender suggests for a scan notification.
/// The receiver owns the actual countdown.
pub const DEFAULT_SCAN_DURATION_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    FaceScan,
    HandScan,
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanType::FaceScan => write!(f, "face_scan"),
            ScanType::HandScan => write!(f, "hand_scan"),
        }
    }
}
