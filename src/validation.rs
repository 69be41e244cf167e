//! Request Validation - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! Errors block generation, warnings are reported and logged.

use serde::{Deserialize, Serialize};

use crate::config::GenerationRequest;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn from_violations(violations: Vec<ValidationViolation>) -> Self {
        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);
        Self { valid, violations }
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Warning)
    }

    /// "rule: message" for every blocking violation, joined with "; ".
    pub fn error_summary(&self) -> String {
        self.errors()
            .map(|v| format!("{}: {}", v.rule, v.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Validation rule trait - produces violations
pub trait RequestRule {
    fn name(&self) -> &'static str;
    fn validate(&self, request: &GenerationRequest) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

/// Ratio 0 would divide by zero; ratios of 2 or less hide too much of the
/// symbol to decode reliably.
pub struct CenterImageRatioRule;

impl RequestRule for CenterImageRatioRule {
    fn name(&self) -> &'static str { "center_image_ratio" }

    fn validate(&self, request: &GenerationRequest) -> Vec<ValidationViolation> {
        let ratio = request.settings.center_image_ratio;
        if ratio == 0 {
            return vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Center image ratio must be at least 1".to_string(),
                expected: Some(">= 1".to_string()),
                actual: Some(ratio.to_string()),
            }];
        }
        if request.has_overlay() && ratio <= 2 {
            return vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: "Center image covers most of the symbol, it may not decode".to_string(),
                expected: Some("> 2".to_string()),
                actual: Some(ratio.to_string()),
            }];
        }
        vec![]
    }
}

pub struct CenterImageFormatRule;

impl RequestRule for CenterImageFormatRule {
    fn name(&self) -> &'static str { "center_image_format" }

    fn validate(&self, request: &GenerationRequest) -> Vec<ValidationViolation> {
        let format = request.settings.format;
        if request.center_image().is_some() && !format.supports_center_image() {
            vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: "Center images only work on QR codes, ignoring it".to_string(),
                expected: Some("QRCode".to_string()),
                actual: Some(format.to_string()),
            }]
        } else {
            vec![]
        }
    }
}

/// Largest output the pipeline will allocate, in pixels (8192 x 8192).
pub const MAX_IMAGE_PIXELS: u64 = 8192 * 8192;

pub struct ImageSizeRule;

impl RequestRule for ImageSizeRule {
    fn name(&self) -> &'static str { "image_size" }

    fn validate(&self, request: &GenerationRequest) -> Vec<ValidationViolation> {
        let (width, height) = (request.settings.image_width, request.settings.image_height);
        let pixels = u64::from(width) * u64::from(height);
        if pixels > MAX_IMAGE_PIXELS {
            vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: format!("Image of {} pixels exceeds the {} pixel limit", pixels, MAX_IMAGE_PIXELS),
                expected: Some(format!("<= {} pixels", MAX_IMAGE_PIXELS)),
                actual: Some(format!("{}x{}", width, height)),
            }]
        } else {
            vec![]
        }
    }
}

pub struct FileNameRule;

impl RequestRule for FileNameRule {
    fn name(&self) -> &'static str { "file_name" }

    fn validate(&self, request: &GenerationRequest) -> Vec<ValidationViolation> {
        let name = &request.settings.file_name;
        if name.trim().is_empty() || name.contains(['/', '\\']) {
            vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "File name must be a non-empty name without path separators".to_string(),
                expected: Some("e.g. scode".to_string()),
                actual: Some(format!("{:?}", name)),
            }]
        } else {
            vec![]
        }
    }
}

pub struct ContrastRule;

impl RequestRule for ContrastRule {
    fn name(&self) -> &'static str { "contrast" }

    fn validate(&self, request: &GenerationRequest) -> Vec<ValidationViolation> {
        let fg = request.settings.foreground_color;
        let bg = request.settings.background_color;
        if fg == bg {
            vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: "Foreground and background colors are identical".to_string(),
                expected: Some("distinct colors".to_string()),
                actual: Some(fg.to_string()),
            }]
        } else {
            vec![]
        }
    }
}

/// Validator runs every rule and applies the blocking policy
pub struct Validator {
    rules: Vec<Box<dyn RequestRule + Send + Sync>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(CenterImageRatioRule),
                Box::new(CenterImageFormatRule),
                Box::new(ImageSizeRule),
                Box::new(FileNameRule),
                Box::new(ContrastRule),
            ],
        }
    }

    pub fn validate(&self, request: &GenerationRequest) -> ValidationResult {
        let violations = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(request))
            .collect();
        ValidationResult::from_violations(violations)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorSettings;
    use crate::raster::Color;
    use crate::symbology::Symbology;
    use std::path::PathBuf;

    fn request_with(settings: GeneratorSettings) -> GenerationRequest {
        settings.request("payload")
    }

    #[test]
    fn test_default_request_is_clean() {
        let result = Validator::new().validate(&request_with(GeneratorSettings::default()));
        assert!(result.valid);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_zero_ratio_blocks() {
        let result = Validator::new().validate(&request_with(GeneratorSettings {
            center_image_ratio: 0,
            ..Default::default()
        }));
        assert!(!result.valid);
        assert!(result.error_summary().contains("center_image_ratio"));
    }

    #[test]
    fn test_large_overlay_warns() {
        let result = Validator::new().validate(&request_with(GeneratorSettings {
            format: Symbology::QrCode,
            center_image: Some(PathBuf::from("logo.png")),
            center_image_ratio: 2,
            ..Default::default()
        }));
        assert!(result.valid);
        assert_eq!(result.warnings().count(), 1);
    }

    #[test]
    fn test_center_image_on_linear_code_warns() {
        let result = Validator::new().validate(&request_with(GeneratorSettings {
            format: Symbology::Ean13,
            center_image: Some(PathBuf::from("logo.png")),
            ..Default::default()
        }));
        assert!(result.valid);
        assert_eq!(result.warnings().next().unwrap().rule, "center_image_format");
    }

    #[test]
    fn test_pixel_cap_blocks_huge_images() {
        let huge = Validator::new().validate(&request_with(GeneratorSettings {
            image_width: 100_000,
            image_height: 100_000,
            ..Default::default()
        }));
        assert!(!huge.valid);
        assert!(huge.error_summary().contains("image_size"));

        let at_limit = Validator::new().validate(&request_with(GeneratorSettings {
            image_width: 8192,
            image_height: 8192,
            ..Default::default()
        }));
        assert!(at_limit.valid);

        let wide = Validator::new().validate(&request_with(GeneratorSettings {
            image_width: u32::MAX,
            image_height: 2,
            ..Default::default()
        }));
        assert!(!wide.valid);
    }

    #[test]
    fn test_bad_file_names_block() {
        for name in ["", "   ", "a/b", "a\\b"] {
            let result = Validator::new().validate(&request_with(GeneratorSettings {
                file_name: name.to_string(),
                ..Default::default()
            }));
            assert!(!result.valid, "{:?}", name);
        }
    }

    #[test]
    fn test_identical_colors_warn() {
        let result = Validator::new().validate(&request_with(GeneratorSettings {
            foreground_color: Color::WHITE,
            background_color: Color::WHITE,
            ..Default::default()
        }));
        assert!(result.valid);
        assert_eq!(result.warnings().next().unwrap().rule, "contrast");
    }
}
