//! Process configuration.
//!
//! Everything is read from the environment once at startup. Every value has a
//! default so the service starts with no configuration at all (no vision
//! provider, which makes analysis report `ServiceUnavailable`).

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "PharmStock Backend";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Session used when the caller does not name one.
pub const DEFAULT_SESSION_KEY: &str = "default";

/// Placeholder for unreadable or missing text fields.
pub const UNREADABLE_PLACEHOLDER: &str = "Non identifié";

const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llava";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "pharmstock=info,pharmstock_lib=info,tower_http=info"
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("Unknown vision provider '{0}' (expected gemini, ollama or none)")]
    UnknownProvider(String),

    #[error("GEMINI_API_KEY is required when the gemini provider is selected")]
    MissingApiKey,
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Which external vision capability answers extraction requests.
#[derive(Clone, PartialEq)]
pub enum VisionProvider {
    /// Nothing configured; every analysis fails with `ServiceUnavailable`.
    None,
    Gemini {
        api_key: String,
        model: String,
        base_url: String,
    },
    Ollama {
        model: String,
        base_url: String,
    },
}

// Hand-written so the API key never reaches a log line.
impl std::fmt::Debug for VisionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisionProvider::None => f.write_str("None"),
            VisionProvider::Gemini { model, base_url, .. } => f
                .debug_struct("Gemini")
                .field("api_key", &"<redacted>")
                .field("model", model)
                .field("base_url", base_url)
                .finish(),
            VisionProvider::Ollama { model, base_url } => f
                .debug_struct("Ollama")
                .field("model", model)
                .field("base_url", base_url)
                .finish(),
        }
    }
}

impl VisionProvider {
    /// Provider label for logs and health output. Never includes secrets.
    pub fn label(&self) -> &'static str {
        match self {
            VisionProvider::None => "none",
            VisionProvider::Gemini { .. } => "gemini",
            VisionProvider::Ollama { .. } => "ollama",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub provider: VisionProvider,
    /// Upper bound on a single vision call, connect to last byte.
    pub timeout: Duration,
}

/// Intake checks applied before any image leaves the process.
#[derive(Debug, Clone, Serialize)]
pub struct ImagePolicy {
    pub allowed_mime_types: Vec<String>,
    pub max_bytes: usize,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self {
            allowed_mime_types: vec![
                "image/jpeg".into(),
                "image/jpg".into(),
                "image/png".into(),
                "image/webp".into(),
            ],
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Policy applied to the model's detections.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationPolicy {
    /// Records below this confidence are kept but counted as low-confidence.
    pub min_confidence: f64,
    /// Detections past this many are dropped.
    pub max_detections: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            max_detections: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub vision: VisionConfig,
    pub image: ImagePolicy,
    pub validation: ValidationPolicy,
    /// Answer with placeholder data when no provider is configured.
    pub demo_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            vision: VisionConfig {
                provider: VisionProvider::None,
                timeout: Duration::from_secs(30),
            },
            image: ImagePolicy::default(),
            validation: ValidationPolicy::default(),
            demo_mode: false,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = AppConfig::default();

        let bind = get("PHARMSTOCK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = parse_value("PHARMSTOCK_BIND", &bind)?;

        let timeout = match get("PHARMSTOCK_VISION_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_value("PHARMSTOCK_VISION_TIMEOUT_SECS", &v)?),
            None => defaults.vision.timeout,
        };

        let api_key = get("GEMINI_API_KEY");
        let provider_name = get("PHARMSTOCK_VISION_PROVIDER")
            .map(|p| p.to_ascii_lowercase())
            .unwrap_or_else(|| {
                if api_key.is_some() { "gemini" } else { "none" }.to_string()
            });

        let provider = match provider_name.as_str() {
            "none" => VisionProvider::None,
            "gemini" => VisionProvider::Gemini {
                api_key: api_key.ok_or(ConfigError::MissingApiKey)?,
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: get("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            },
            "ollama" => VisionProvider::Ollama {
                model: get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
                base_url: get("OLLAMA_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
            },
            other => return Err(ConfigError::UnknownProvider(other.to_string())),
        };

        let mut image = defaults.image;
        if let Some(v) = get("PHARMSTOCK_MAX_IMAGE_BYTES") {
            image.max_bytes = parse_value("PHARMSTOCK_MAX_IMAGE_BYTES", &v)?;
        }
        if let Some(v) = get("PHARMSTOCK_ALLOWED_MIME_TYPES") {
            let types: Vec<String> = v
                .split(',')
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            if types.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "PHARMSTOCK_ALLOWED_MIME_TYPES",
                    value: v,
                });
            }
            image.allowed_mime_types = types;
        }

        let mut validation = defaults.validation;
        if let Some(v) = get("PHARMSTOCK_MIN_CONFIDENCE") {
            let min: f64 = parse_value("PHARMSTOCK_MIN_CONFIDENCE", &v)?;
            if !(0.0..=1.0).contains(&min) {
                return Err(ConfigError::InvalidValue {
                    key: "PHARMSTOCK_MIN_CONFIDENCE",
                    value: v,
                });
            }
            validation.min_confidence = min;
        }
        if let Some(v) = get("PHARMSTOCK_MAX_DETECTIONS") {
            let max: usize = parse_value("PHARMSTOCK_MAX_DETECTIONS", &v)?;
            if max == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "PHARMSTOCK_MAX_DETECTIONS",
                    value: v,
                });
            }
            validation.max_detections = max;
        }

        let demo_mode = match get("PHARMSTOCK_DEMO_MODE") {
            Some(v) => parse_flag("PHARMSTOCK_DEMO_MODE", &v)?,
            None => false,
        };

        Ok(Self {
            bind_addr,
            vision: VisionConfig { provider, timeout },
            image,
            validation,
            demo_mode,
        })
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.vision.provider, VisionProvider::None);
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.image.max_bytes, 10 * 1024 * 1024);
        assert!(config.image.allowed_mime_types.contains(&"image/webp".to_string()));
        assert!((config.validation.min_confidence - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.validation.max_detections, 20);
        assert!(!config.demo_mode);
    }

    #[test]
    fn api_key_selects_gemini() {
        let config = config_from(&[("GEMINI_API_KEY", "secret")]).unwrap();
        match config.vision.provider {
            VisionProvider::Gemini { api_key, model, .. } => {
                assert_eq!(api_key, "secret");
                assert_eq!(model, DEFAULT_GEMINI_MODEL);
            }
            other => panic!("expected gemini, got {other:?}"),
        }
    }

    #[test]
    fn explicit_gemini_without_key_is_rejected() {
        let result = config_from(&[("PHARMSTOCK_VISION_PROVIDER", "gemini")]);
        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn ollama_provider_reads_model() {
        let config = config_from(&[
            ("PHARMSTOCK_VISION_PROVIDER", "Ollama"),
            ("OLLAMA_MODEL", "llava:13b"),
        ])
        .unwrap();
        assert_eq!(
            config.vision.provider,
            VisionProvider::Ollama {
                model: "llava:13b".into(),
                base_url: DEFAULT_OLLAMA_BASE_URL.into(),
            }
        );
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let result = config_from(&[("PHARMSTOCK_VISION_PROVIDER", "openai")]);
        assert!(matches!(result, Err(ConfigError::UnknownProvider(p)) if p == "openai"));
    }

    #[test]
    fn policy_overrides_are_applied() {
        let config = config_from(&[
            ("PHARMSTOCK_MAX_IMAGE_BYTES", "1024"),
            ("PHARMSTOCK_ALLOWED_MIME_TYPES", "image/PNG, image/jpeg"),
            ("PHARMSTOCK_MIN_CONFIDENCE", "0.5"),
            ("PHARMSTOCK_MAX_DETECTIONS", "3"),
            ("PHARMSTOCK_VISION_TIMEOUT_SECS", "5"),
            ("PHARMSTOCK_DEMO_MODE", "yes"),
        ])
        .unwrap();
        assert_eq!(config.image.max_bytes, 1024);
        assert_eq!(config.image.allowed_mime_types, vec!["image/png", "image/jpeg"]);
        assert!((config.validation.min_confidence - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.validation.max_detections, 3);
        assert_eq!(config.vision.timeout, Duration::from_secs(5));
        assert!(config.demo_mode);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let result = config_from(&[("PHARMSTOCK_MAX_IMAGE_BYTES", "ten")]);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "PHARMSTOCK_MAX_IMAGE_BYTES", .. })
        ));
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let result = config_from(&[("PHARMSTOCK_MIN_CONFIDENCE", "1.5")]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_max_detections_is_rejected() {
        let err = config_from(&[("PHARMSTOCK_MAX_DETECTIONS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "PHARMSTOCK_MAX_DETECTIONS",
                ..
            }
        ));
        let config = config_from(&[("PHARMSTOCK_MAX_DETECTIONS", "1")]).unwrap();
        assert_eq!(config.validation.max_detections, 1);
    }

    #[test]
    fn provider_label_hides_secrets() {
        let provider = VisionProvider::Gemini {
            api_key: "secret".into(),
            model: "m".into(),
            base_url: "u".into(),
        };
        assert_eq!(provider.label(), "gemini");
        assert!(!format!("{provider:?}").contains("secret"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "1.0.0");
    }
}
