use crate::config::{
    CutPoints, DiffConfig, MismatchMethod, MismatchStrategy, NoisePolicy, ScanMode,
};

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;
use thiserror::Error;

const COMMENT_CHAR: char = '#';
const NONE_VALUE: &str = "none";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: unknown configuration key '{key}'")]
    UnknownKey { line: usize, key: String },
    #[error("line {line}: invalid value for '{key}': {reason}")]
    InvalidValue {
        line: usize,
        key: String,
        reason: String,
    },
}

/// Loads a diff configuration file.
///
/// The format is one `key value...` pair per line, `#` starts a comment.
/// Keys left out keep their `DiffConfig::default()` value.
///
/// ```text
/// stride 2
/// detect_threshold 4.5
/// max_regions none
/// region_cut 28 12
/// scan coarse 4
/// ```
pub fn load_config_file(file_path: impl AsRef<Path>) -> Result<DiffConfig, ConfigError> {
    let file = File::open(file_path)?;
    let reader = io::BufReader::new(file);
    let mut config = DiffConfig::default();
    for (index, line) in reader.lines().enumerate() {
        parse_line(&line?, index + 1, &mut config)?;
    }
    Ok(config)
}

/// Same as [`load_config_file`] over an in-memory string.
pub fn parse_config(text: &str) -> Result<DiffConfig, ConfigError> {
    let mut config = DiffConfig::default();
    for (index, line) in text.lines().enumerate() {
        parse_line(line, index + 1, &mut config)?;
    }
    Ok(config)
}

fn parse_line(line: &str, line_no: usize, config: &mut DiffConfig) -> Result<(), ConfigError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(COMMENT_CHAR) {
        return Ok(());
    }
    let mut parts = line.split_whitespace();
    let Some(key) = parts.next() else {
        return Ok(());
    };
    let params: Vec<&str> = parts.collect();
    let invalid = |reason: String| ConfigError::InvalidValue {
        line: line_no,
        key: key.to_string(),
        reason,
    };

    match key {
        "stride" => config.stride = parse_stride(&params).map_err(invalid)?,
        "detect_threshold" => config.detect_threshold = parse_threshold(&params).map_err(invalid)?,
        "low_threshold" => config.low_threshold = parse_threshold(&params).map_err(invalid)?,
        "min_region_area" => config.min_region_area = parse_single::<u64>(&params).map_err(invalid)?,
        "max_regions" => config.max_regions = parse_optional::<usize>(&params).map_err(invalid)?,
        "merge_padding" => config.merge_padding = parse_optional::<u32>(&params).map_err(invalid)?,
        "region_cut" => config.region_cuts = parse_cuts(&params).map_err(invalid)?,
        "mismatch_cut" => config.mismatch_cuts = parse_cuts(&params).map_err(invalid)?,
        "noise" => config.noise = parse_noise(&params).map_err(invalid)?,
        "scan" => config.scan = parse_scan(&params).map_err(invalid)?,
        "mismatch" => config.mismatch = parse_mismatch(&params).map_err(invalid)?,
        _ => {
            return Err(ConfigError::UnknownKey {
                line: line_no,
                key: key.to_string(),
            })
        }
    }
    Ok(())
}

fn expect_count(params: &[&str], count: usize) -> Result<(), String> {
    if params.len() != count {
        return Err(format!("expected {count} value(s), got {}", params.len()));
    }
    Ok(())
}

fn parse_single<T>(params: &[&str]) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    expect_count(params, 1)?;
    params[0].parse::<T>().map_err(|e| e.to_string())
}

fn parse_optional<T>(params: &[&str]) -> Result<Option<T>, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    expect_count(params, 1)?;
    if params[0].eq_ignore_ascii_case(NONE_VALUE) {
        return Ok(None);
    }
    params[0].parse::<T>().map(Some).map_err(|e| e.to_string())
}

fn parse_stride(params: &[&str]) -> Result<u32, String> {
    let stride = parse_single::<u32>(params)?;
    if stride == 0 {
        return Err("stride must be at least 1".to_string());
    }
    Ok(stride)
}

fn check_threshold(value: f64) -> Result<f64, String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{value} is not a finite, non-negative number"));
    }
    Ok(value)
}

fn parse_threshold(params: &[&str]) -> Result<f64, String> {
    check_threshold(parse_single::<f64>(params)?)
}

fn parse_cuts(params: &[&str]) -> Result<CutPoints, String> {
    expect_count(params, 2)?;
    let critical = check_threshold(params[0].parse::<f64>().map_err(|e| e.to_string())?)?;
    let warning = check_threshold(params[1].parse::<f64>().map_err(|e| e.to_string())?)?;
    if warning > critical {
        return Err("warning cut must not exceed critical cut".to_string());
    }
    Ok(CutPoints { critical, warning })
}

fn parse_noise(params: &[&str]) -> Result<NoisePolicy, String> {
    expect_count(params, 1)?;
    match params[0] {
        "off" => Ok(NoisePolicy::Off),
        "isolated" => Ok(NoisePolicy::IsolatedCells),
        other => Err(format!("'{other}' is not one of: off, isolated")),
    }
}

fn parse_scan(params: &[&str]) -> Result<ScanMode, String> {
    match params {
        ["full"] => Ok(ScanMode::Full),
        ["coarse", factor] => {
            let factor = factor.parse::<u32>().map_err(|e| e.to_string())?;
            if factor < 2 {
                return Err("coarse factor must be at least 2".to_string());
            }
            Ok(ScanMode::CoarseToFine { factor })
        }
        _ => Err("expected 'full' or 'coarse <factor>'".to_string()),
    }
}

fn parse_method(value: &str) -> Result<MismatchMethod, String> {
    match value {
        "sampled" => Ok(MismatchMethod::Sampled),
        "full" => Ok(MismatchMethod::FullResolution),
        other => Err(format!("'{other}' is not one of: sampled, full")),
    }
}

fn parse_mismatch(params: &[&str]) -> Result<MismatchStrategy, String> {
    expect_count(params, 2)?;
    let primary = if params[0].eq_ignore_ascii_case(NONE_VALUE) {
        None
    } else {
        Some(parse_method(params[0])?)
    };
    Ok(MismatchStrategy {
        primary,
        fallback: parse_method(params[1])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = parse_config("").unwrap();
        assert_eq!(config, DiffConfig::default());
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let config = parse_config("# tuned for 4k\n\n   \nstride 4\n").unwrap();
        assert_eq!(config.stride, 4);
    }

    #[test]
    fn test_parse_full_config() {
        let text = "stride 3\n\
                    detect_threshold 4.0\n\
                    low_threshold 2.5\n\
                    min_region_area 100\n\
                    max_regions none\n\
                    merge_padding 6\n\
                    region_cut 30 10\n\
                    mismatch_cut 40 20\n\
                    noise isolated\n\
                    scan coarse 4\n\
                    mismatch none sampled\n";
        let config = parse_config(text).unwrap();
        assert_eq!(config.stride, 3);
        assert_eq!(config.detect_threshold, 4.0);
        assert_eq!(config.low_threshold, 2.5);
        assert_eq!(config.min_region_area, 100);
        assert_eq!(config.max_regions, None);
        assert_eq!(config.merge_padding, Some(6));
        assert_eq!(config.region_cuts, CutPoints { critical: 30.0, warning: 10.0 });
        assert_eq!(config.mismatch_cuts, CutPoints { critical: 40.0, warning: 20.0 });
        assert_eq!(config.noise, NoisePolicy::IsolatedCells);
        assert_eq!(config.scan, ScanMode::CoarseToFine { factor: 4 });
        assert_eq!(
            config.mismatch,
            MismatchStrategy {
                primary: None,
                fallback: MismatchMethod::Sampled
            }
        );
    }

    #[test]
    fn test_unknown_key_reports_line() {
        let err = parse_config("stride 2\nsharpness 3\n").unwrap_err();
        match err {
            ConfigError::UnknownKey { line, key } => {
                assert_eq!(line, 2);
                assert_eq!(key, "sharpness");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_stride_rejected() {
        assert!(parse_config("stride 0").is_err());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        assert!(parse_config("detect_threshold -1").is_err());
        assert!(parse_config("low_threshold NaN").is_err());
    }

    #[test]
    fn test_inverted_cuts_rejected() {
        assert!(parse_config("region_cut 10 28").is_err());
        assert!(parse_config("region_cut 28").is_err());
    }

    #[test]
    fn test_bad_scan_mode() {
        assert!(parse_config("scan coarse 1").is_err());
        assert!(parse_config("scan sideways").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config_file("does/not/exist.cfg").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
