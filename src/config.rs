// Configuration module: command-line flags, the API-key environment
// fallback and the immutable `RunConfig` the steps read from.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use thiserror::Error;

pub const BASE_URL: &str = "https://app.dynamicmockups.com/api/v1";
pub const API_KEY_ENV: &str = "DYNAMICMOCKUPS_API_KEY";
pub const DEFAULT_PSD_URL: &str = "https://raw.githubusercontent.com/joonaspaakko/\
Batch-Mockup-Smart-Object-Replacement-photoshop-script/master/\
Examples/example-1/assets/Mug%20PSD%20MockUp%202/Mug%20PSD%20MockUp%202.psd";
pub const DEFAULT_DESIGN_URL: &str = "https://picsum.photos/1200/1200.jpg";

/// How the replacement design is fitted into the smart object's bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Fit {
    Contain,
    Cover,
    Stretch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpg,
    Webp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    View,
    Print,
}

#[derive(Parser, Debug)]
#[command(name = "mockup-smoke")]
#[command(about = "Upload a PSD to the mockup API, render one smart object and save the responses")]
#[command(allow_negative_numbers = true)]
pub struct Args {
    /// API key (falls back to the DYNAMICMOCKUPS_API_KEY environment variable)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Public URL of the PSD to upload
    #[arg(long, default_value = DEFAULT_PSD_URL)]
    pub psd_url: String,

    /// Name for the uploaded PSD (empty = api_test_<unix seconds>)
    #[arg(long, default_value = "")]
    pub psd_name: String,

    #[arg(long, default_value_t = 6)]
    pub psd_category_id: i64,

    /// Design image placed into the selected smart object
    #[arg(long, default_value = DEFAULT_DESIGN_URL)]
    pub design_url: String,

    #[arg(long, value_enum, default_value_t = Fit::Contain)]
    pub fit: Fit,

    #[arg(long, value_enum, default_value_t = ImageFormat::Png)]
    pub image_format: ImageFormat,

    #[arg(long, default_value_t = 1500, value_parser = clap::value_parser!(u32).range(1..))]
    pub image_size: u32,

    #[arg(long, value_enum, default_value_t = RenderMode::View)]
    pub mode: RenderMode,

    /// Index into the uploaded mockup's smart objects
    #[arg(long, default_value_t = 0)]
    pub smart_object_index: i64,

    #[arg(long)]
    pub skip_render: bool,

    #[arg(long)]
    pub skip_mockup_list: bool,

    /// Where the JSON transcript of the run is written
    #[arg(long = "output-json", default_value = "last_run.json")]
    pub output_json: PathBuf,

    /// API base URL
    #[arg(long, default_value = BASE_URL)]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    /// Page size for the mockup listing
    #[arg(long, default_value_t = 5)]
    pub mockup_limit: u32,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--api-key was not given and DYNAMICMOCKUPS_API_KEY is empty")]
    MissingApiKey,
}

impl ConfigError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ConfigError::MissingApiKey => 2,
        }
    }
}

/// Finalized settings for one run. Built once at startup and never mutated.
#[derive(Clone)]
pub struct RunConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub psd_url: String,
    pub psd_name: String,
    pub psd_category_id: i64,
    pub design_url: String,
    pub fit: Fit,
    pub image_format: ImageFormat,
    pub image_size: u32,
    pub mode: RenderMode,
    pub smart_object_index: i64,
    pub mockup_limit: u32,
    pub skip_render: bool,
    pub skip_mockup_list: bool,
    pub output_path: PathBuf,
}

impl RunConfig {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let env_key = std::env::var(API_KEY_ENV).ok();
        Self::resolve(args, env_key, Utc::now())
    }

    /// Resolve parsed flags into a `RunConfig`. The flag wins over `env_key`;
    /// only the environment value is trimmed. The default PSD name is
    /// derived from `now`.
    pub fn resolve(args: Args, env_key: Option<String>, now: DateTime<Utc>) -> Result<Self, ConfigError> {
        let api_key = match args.api_key {
            Some(key) => key,
            None => env_key.map(|key| key.trim().to_string()).unwrap_or_default(),
        };
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        let psd_name = if args.psd_name.is_empty() {
            format!("api_test_{}", now.timestamp())
        } else {
            args.psd_name
        };

        Ok(RunConfig {
            api_key,
            base_url: args.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(args.timeout_secs),
            psd_url: args.psd_url,
            psd_name,
            psd_category_id: args.psd_category_id,
            design_url: args.design_url,
            fit: args.fit,
            image_format: args.image_format,
            image_size: args.image_size,
            mode: args.mode,
            smart_object_index: args.smart_object_index,
            mockup_limit: args.mockup_limit,
            skip_render: args.skip_render,
            skip_mockup_list: args.skip_mockup_list,
            output_path: args.output_json,
        })
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("api_key", &mask_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("psd_url", &self.psd_url)
            .field("psd_name", &self.psd_name)
            .field("smart_object_index", &self.smart_object_index)
            .field("skip_render", &self.skip_render)
            .field("skip_mockup_list", &self.skip_mockup_list)
            .field("output_path", &self.output_path)
            .finish_non_exhaustive()
    }
}

/// Mask an API key for display: keys of 12 characters or fewer are fully
/// starred, longer ones keep the first 8 and last 6 characters.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["mockup-smoke"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn mask_key_stars_short_keys() {
        assert_eq!(mask_key("short"), "*****");
        assert_eq!(mask_key("abcdefghijkl"), "************");
        assert_eq!(mask_key(""), "");
    }

    #[test]
    fn mask_key_keeps_head_and_tail_of_long_keys() {
        let key = "0123456789abcdefghijklmnopqrstuv";
        assert_eq!(key.len(), 32);
        assert_eq!(mask_key(key), "01234567...qrstuv");
    }

    #[test]
    fn defaults_match_cli_surface() {
        let args = parse(&["--api-key", "k"]);
        assert_eq!(args.psd_url, DEFAULT_PSD_URL);
        assert_eq!(args.psd_category_id, 6);
        assert_eq!(args.design_url, DEFAULT_DESIGN_URL);
        assert_eq!(args.fit, Fit::Contain);
        assert_eq!(args.image_format, ImageFormat::Png);
        assert_eq!(args.image_size, 1500);
        assert_eq!(args.mode, RenderMode::View);
        assert_eq!(args.smart_object_index, 0);
        assert!(!args.skip_render);
        assert!(!args.skip_mockup_list);
        assert_eq!(args.api_key.as_deref(), Some("k"));
        assert_eq!(args.output_json, PathBuf::from("last_run.json"));
        assert_eq!(args.timeout_secs, 120);
        assert_eq!(args.mockup_limit, 5);
    }

    #[test]
    fn empty_api_key_is_rejected_with_exit_code_2() {
        let err = RunConfig::resolve(parse(&["--api-key", ""]), Some("env-key".into()), Utc::now()).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey);
        assert_eq!(err.exit_code(), 2);

        let err = RunConfig::resolve(parse(&[]), Some("   ".into()), Utc::now()).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey);
        assert_eq!(RunConfig::resolve(parse(&[]), None, Utc::now()).unwrap_err(), ConfigError::MissingApiKey);
    }

    #[test]
    fn env_key_is_trimmed_but_flag_is_sent_as_given() {
        let from_env = RunConfig::resolve(parse(&[]), Some(" env-key \n".into()), Utc::now()).unwrap();
        assert_eq!(from_env.api_key, "env-key");

        let from_flag = RunConfig::resolve(parse(&["--api-key", " flag-key "]), Some("env-key".into()), Utc::now()).unwrap();
        assert_eq!(from_flag.api_key, " flag-key ");
    }

    #[test]
    fn api_key_falls_back_to_environment_variable() {
        std::env::set_var(API_KEY_ENV, "  from-environment  ");
        let config = RunConfig::from_args(parse(&[]));
        std::env::remove_var(API_KEY_ENV);
        assert_eq!(config.unwrap().api_key, "from-environment");
    }

    #[test]
    fn psd_name_defaults_to_timestamp() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let config = RunConfig::resolve(parse(&["--api-key", "key"]), None, now).unwrap();
        assert_eq!(config.psd_name, "api_test_1700000000");
        assert_eq!(config.api_key, "key");
    }

    #[test]
    fn explicit_values_are_kept() {
        let args = parse(&[
            "--api-key",
            "key",
            "--psd-name",
            "mug",
            "--fit",
            "stretch",
            "--image-format",
            "webp",
            "--mode",
            "print",
            "--smart-object-index",
            "-1",
            "--base-url",
            "http://localhost:9000/api/",
        ]);
        let config = RunConfig::from_args(args).unwrap();
        assert_eq!(config.psd_name, "mug");
        assert_eq!(config.fit, Fit::Stretch);
        assert_eq!(config.image_format, ImageFormat::Webp);
        assert_eq!(config.mode, RenderMode::Print);
        assert_eq!(config.smart_object_index, -1);
        assert_eq!(config.base_url, "http://localhost:9000/api");
    }

    #[test]
    fn invalid_choices_and_sizes_are_rejected() {
        assert!(Args::try_parse_from(["mockup-smoke", "--fit", "fill"]).is_err());
        assert!(Args::try_parse_from(["mockup-smoke", "--image-format", "gif"]).is_err());
        assert!(Args::try_parse_from(["mockup-smoke", "--image-size", "0"]).is_err());
    }

    #[test]
    fn debug_output_masks_the_key() {
        let args = parse(&["--api-key", "0123456789abcdefghijklmnopqrstuv"]);
        let config = RunConfig::from_args(args).unwrap();
        let rendered = format!("{config:?}");
        assert!(rendered.contains("01234567...qrstuv"));
        assert!(!rendered.contains("0123456789abcdefghijklmnopqrstuv"));
    }
}
