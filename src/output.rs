use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

/// Where the samples for a run on `source` should be written.
///
/// The file sits next to the source as
/// `<stem>-<param_str>-samples-<timestamp>.csv.gz`, where `<stem>` is the source
/// file name up to its first dot.
pub fn sample_output_path(source: &Path, param_str: &str, timestamp: NaiveDateTime) -> PathBuf {
    let stem = source
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .unwrap_or_default();
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!(
        "{stem}-{param_str}-samples-{}.csv.gz",
        timestamp.format(TIMESTAMP_FORMAT)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn output_name() {
        let timestamp = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap();
        let source = Path::new("data/obs.train.csv.gz");
        let path = sample_output_path(source, "GibbsSampler", timestamp);
        assert_eq!(
            path,
            PathBuf::from("data/obs-GibbsSampler-samples-2024-03-09-14:05:07.csv.gz")
        );

        let path = sample_output_path(Path::new("obs.csv"), "X", timestamp);
        assert_eq!(path, PathBuf::from("obs-X-samples-2024-03-09-14:05:07.csv.gz"));
    }
}
