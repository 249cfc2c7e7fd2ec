//! Storage quota value object.

use serde::{Deserialize, Serialize};

const KIB: i64 = 1024;
const MIB: i64 = 1024 * KIB;
const GIB: i64 = 1024 * MIB;

/// Snapshot of a principal's storage accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageQuota {
    /// Total quota in bytes.
    pub total_bytes: i64,
    /// Currently used bytes.
    pub used_bytes: i64,
    /// Remaining bytes, never negative.
    pub available_bytes: i64,
    /// Usage percentage (0.0 - 100.0).
    pub usage_percent: f64,
}

impl StorageQuota {
    /// Create a quota snapshot from total and used values.
    pub fn new(total_bytes: i64, used_bytes: i64) -> Self {
        let available_bytes = (total_bytes - used_bytes).max(0);
        let usage_percent = if total_bytes <= 0 {
            0.0
        } else {
            (used_bytes as f64 / total_bytes as f64) * 100.0
        };

        Self {
            total_bytes,
            used_bytes,
            available_bytes,
            usage_percent,
        }
    }

    /// Check if adding the given number of bytes would exceed the quota.
    ///
    /// Filling the quota exactly is allowed.
    pub fn would_exceed(&self, additional_bytes: i64) -> bool {
        self.used_bytes.saturating_add(additional_bytes) > self.total_bytes
    }

    /// Human-readable `used / total` summary.
    pub fn summary(&self) -> String {
        format!(
            "{} / {} ({:.1}%)",
            format_bytes(self.used_bytes),
            format_bytes(self.total_bytes),
            self.usage_percent
        )
    }
}

/// Format a byte count the way the dashboard shows it (`1.50 MB`, `12 B`).
pub fn format_bytes(bytes: i64) -> String {
    if bytes >= GIB {
        format!("{:.2} GB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_fill_is_allowed() {
        let quota = StorageQuota::new(1000, 600);
        assert!(!quota.would_exceed(400));
        assert!(quota.would_exceed(401));
        assert_eq!(quota.available_bytes, 400);
    }

    #[test]
    fn test_overdrawn_quota_reports_zero_available() {
        let quota = StorageQuota::new(100, 150);
        assert_eq!(quota.available_bytes, 0);
        assert!(quota.would_exceed(1));
    }

    #[test]
    fn test_format_bytes_thresholds() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536 * 1024), "1.50 MB");
        assert_eq!(format_bytes(5 * GIB), "5.00 GB");
    }
}
