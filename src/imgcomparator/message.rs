//! Serializable request/response pair for running the engine behind a
//! message boundary (worker thread, subprocess, stdin/stdout).

use serde::{Deserialize, Serialize};

use super::engine::{compare_with, DiffResult};
use super::{DiffError, Image};
use crate::config::DiffConfig;

/// One screenshot as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "lowercase")]
pub enum PixelBuffer {
    /// Raw, tightly packed RGBA8 pixels.
    Rgba8 {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
    /// An encoded image. Usually PNG, any format `image` decodes is accepted.
    Png { data: Vec<u8> },
}

impl PixelBuffer {
    pub fn from_image(img: &Image) -> PixelBuffer {
        let data = img.to_rgba_image().into_raw();
        PixelBuffer::Rgba8 {
            width: img.width,
            height: img.height,
            data,
        }
    }

    fn to_image(&self, which: &str) -> Result<Image, DiffError> {
        match self {
            PixelBuffer::Rgba8 {
                width,
                height,
                data,
            } => Image::from_rgba8(*width, *height, data)
                .map_err(|e| DiffError::invalid(format!("{which} image: {}", e.message()))),
            PixelBuffer::Png { data } => Image::decode_as(data, which),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffRequest {
    pub image_before: PixelBuffer,
    pub image_after: PixelBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorTag {
    InvalidInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiffResponse {
    Ok { result: DiffResult },
    Error { error: ErrorTag, message: String },
}

impl From<DiffError> for DiffResponse {
    fn from(err: DiffError) -> Self {
        match err {
            DiffError::InvalidInput { message } => DiffResponse::Error {
                error: ErrorTag::InvalidInput,
                message,
            },
        }
    }
}

impl From<Result<DiffResult, DiffError>> for DiffResponse {
    fn from(result: Result<DiffResult, DiffError>) -> Self {
        match result {
            Ok(result) => DiffResponse::Ok { result },
            Err(err) => err.into(),
        }
    }
}

/// Decodes both buffers and runs the comparison. Never fails: errors are
/// folded into `DiffResponse::Error`.
pub fn handle_request(request: &DiffRequest, config: &DiffConfig) -> DiffResponse {
    let run = || -> Result<DiffResult, DiffError> {
        let before = request.image_before.to_image("before")?;
        let after = request.image_after.to_image("after")?;
        compare_with(&before, &after, config)
    };
    run().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imgcomparator::Severity;

    fn png_bytes(img: &Image) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.to_rgba_image()
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn block_pair() -> (Image, Image) {
        let before = Image::filled(64, 64, 0xFFFFFFFF);
        let mut after = before.clone();
        for y in 8..40 {
            for x in 8..40 {
                after.set_pixel(x, y, 0xFF000000);
            }
        }
        (before, after)
    }

    #[test]
    fn test_rgba_request_succeeds() {
        let (before, after) = block_pair();
        let request = DiffRequest {
            image_before: PixelBuffer::from_image(&before),
            image_after: PixelBuffer::from_image(&after),
        };
        match handle_request(&request, &DiffConfig::default()) {
            DiffResponse::Ok { result } => {
                assert_eq!(result.regions.len(), 1);
                assert_eq!(result.regions[0].level, Severity::Critical);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_png_and_rgba_agree() {
        let (before, after) = block_pair();
        let config = DiffConfig::default();
        let rgba = DiffRequest {
            image_before: PixelBuffer::from_image(&before),
            image_after: PixelBuffer::from_image(&after),
        };
        let png = DiffRequest {
            image_before: PixelBuffer::Png {
                data: png_bytes(&before),
            },
            image_after: PixelBuffer::Png {
                data: png_bytes(&after),
            },
        };
        assert_eq!(handle_request(&rgba, &config), handle_request(&png, &config));
    }

    #[test]
    fn test_undecodable_after_image_is_error_not_empty_result() {
        let (before, _) = block_pair();
        let request = DiffRequest {
            image_before: PixelBuffer::from_image(&before),
            image_after: PixelBuffer::Png {
                data: vec![1, 2, 3, 4],
            },
        };
        match handle_request(&request, &DiffConfig::default()) {
            DiffResponse::Error { error, message } => {
                assert_eq!(error, ErrorTag::InvalidInput);
                assert!(message.contains("after"));
            }
            other => panic!("expected an error, got {other:?}"),
        }
    }

    #[test]
    fn test_short_rgba_buffer_is_error() {
        let request = DiffRequest {
            image_before: PixelBuffer::Rgba8 {
                width: 4,
                height: 4,
                data: vec![0; 10],
            },
            image_after: PixelBuffer::Rgba8 {
                width: 4,
                height: 4,
                data: vec![0; 64],
            },
        };
        let response = handle_request(&request, &DiffConfig::default());
        assert!(matches!(response, DiffResponse::Error { .. }));
    }

    #[test]
    fn test_response_json_shape() {
        let err: DiffResponse = DiffError::invalid("boom").into();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "InvalidInput");
        assert_eq!(json["message"], "boom");

        let (before, after) = block_pair();
        let ok: DiffResponse = compare_with(&before, &after, &DiffConfig::default()).into();
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["result"]["width"], 64);
        assert_eq!(json["result"]["regions"][0]["level"], "critical");
        let x = json["result"]["regions"][0]["x"].as_u64().unwrap();
        assert_eq!(x, 8);
    }

    #[test]
    fn test_request_from_json() {
        let text = r#"{
            "image_before": {"encoding": "rgba8", "width": 1, "height": 1, "data": [0, 0, 0, 255]},
            "image_after":  {"encoding": "rgba8", "width": 1, "height": 1, "data": [0, 0, 0, 255]}
        }"#;
        let request: DiffRequest = serde_json::from_str(text).unwrap();
        match handle_request(&request, &DiffConfig::default()) {
            DiffResponse::Ok { result } => {
                assert_eq!(result.mismatch, 0.0);
                assert!(result.regions.is_empty());
            }
            other => panic!("unexpected response {other:?}"),
        }
    }
}
