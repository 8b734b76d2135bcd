use std::path::Path;

use tokio::process::Command;

use super::MediaError;

/// Read a media file's duration in seconds with ffprobe
pub async fn probe_duration(ffprobe: &str, path: &Path) -> Result<f64, MediaError> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| MediaError::Spawn {
            command: ffprobe.to_string(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(MediaError::Failed {
            command: ffprobe.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_duration(stdout: &str) -> Result<f64, MediaError> {
    let value = stdout.trim();
    value
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| MediaError::Unparseable(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("125.480000\n").unwrap(), 125.48);
        assert!(parse_duration("N/A").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-1").is_err());
    }

    #[tokio::test]
    async fn test_missing_ffprobe_is_an_error() {
        let result = probe_duration("definitely-not-ffprobe-4f2a", Path::new("x.mp4")).await;
        assert!(matches!(result, Err(MediaError::Spawn { .. })));
    }
}
