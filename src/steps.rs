// Step layer: upload the PSD, optionally render one smart object, optionally
// list mockups, then save the transcript. Steps run strictly in that order
// and each one only reads what the previous steps produced.

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::api::{is_success, message_of, ApiError, MockupApi};
use crate::bundle::ResultBundle;
use crate::config::{mask_key, RunConfig};

pub const UPLOAD_PATH: &str = "/psd/upload";
pub const RENDER_PATH: &str = "/renders";

/// A replaceable region of the uploaded mockup, kept exactly as the API
/// returned it. Fields are only looked up when a step needs them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SmartObject(pub Value);

impl SmartObject {
    pub fn uuid(&self) -> Option<&Value> {
        self.0.get("uuid")
    }

    pub fn name(&self) -> Option<&Value> {
        self.0.get("name")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    pub success: bool,
    pub message: String,
    pub mockup_uuid: Option<Value>,
    pub psd_uuid: Option<Value>,
    pub smart_objects: Vec<SmartObject>,
}

impl UploadResult {
    /// Pull the ids and smart objects out of an upload envelope. Missing
    /// fields become `None` or an empty list; present ones are cloned as-is.
    pub fn from_response(body: &Value) -> Self {
        let data = body.get("data");
        let present = |value: Option<&Value>| value.filter(|v| !v.is_null()).cloned();

        let smart_objects = match data.and_then(|d| d.get("smart_objects")) {
            Some(Value::Array(items)) => items.iter().cloned().map(SmartObject).collect(),
            _ => Vec::new(),
        };

        UploadResult {
            success: is_success(body),
            message: message_of(body),
            mockup_uuid: present(data.and_then(|d| d.get("uuid"))),
            psd_uuid: present(data.and_then(|d| d.get("psd")).and_then(|p| p.get("uuid"))),
            smart_objects,
        }
    }
}

/// Render an optional JSON value for a status line: strings unquoted,
/// absent or null values as `None`.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    pub success: bool,
    pub message: String,
    /// Only set when the render succeeded.
    pub export_path: Option<String>,
}

impl RenderResult {
    pub fn from_response(body: &Value) -> Self {
        let success = is_success(body);
        let export_path = if success {
            body.get("data")
                .and_then(|d| d.get("export_path"))
                .and_then(Value::as_str)
                .map(str::to_string)
        } else {
            None
        };
        RenderResult {
            success,
            message: message_of(body),
            export_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockupListResult {
    pub success: bool,
    pub items: Vec<Value>,
}

impl MockupListResult {
    pub fn from_response(body: &Value) -> Self {
        let items = match body.get("data") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        MockupListResult {
            success: is_success(body),
            items,
        }
    }
}

/// Why the render step did not call the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderSkip {
    NoSmartObjects,
    IndexOutOfRange { index: i64, len: usize },
}

impl std::fmt::Display for RenderSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderSkip::NoSmartObjects => write!(f, "the mockup has no smart objects"),
            RenderSkip::IndexOutOfRange { index, len } => write!(
                f,
                "smart-object-index {index} is invalid (0..{})",
                *len as i64 - 1
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderStep {
    Skipped(RenderSkip),
    Rendered { response: Value, result: RenderResult },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every requested step ran and the transcript was written.
    Completed,
    /// The upload envelope reported `success: false`; nothing else ran.
    UploadFailed { message: String },
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::UploadFailed { .. } => 1,
        }
    }
}

/// Run `call` behind a console spinner.
fn with_spinner<T>(message: &str, call: impl FnOnce() -> Result<T, ApiError>) -> Result<T, ApiError> {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.tick();
    let result = call();
    spinner.finish_and_clear();
    result
}

pub fn upload_payload(config: &RunConfig) -> Value {
    json!({
        "psd_file_url": config.psd_url,
        "psd_name": config.psd_name,
        "psd_category_id": config.psd_category_id,
        "mockup_template": {
            "create_after_upload": true,
            "collections": [],
        },
    })
}

pub fn render_payload(config: &RunConfig, mockup_uuid: Option<&Value>, chosen_uuid: &Value) -> Value {
    json!({
        "mockup_uuid": mockup_uuid,
        "export_label": format!("{}_render", config.psd_name),
        "export_options": {
            "image_format": config.image_format,
            "image_size": config.image_size,
            "mode": config.mode,
        },
        "smart_objects": [{
            "uuid": chosen_uuid,
            "asset": {
                "url": config.design_url,
                "fit": config.fit,
            },
        }],
    })
}

/// Register the PSD and return the raw envelope alongside what was
/// extracted from it.
pub fn upload<A: MockupApi>(api: &A, config: &RunConfig) -> Result<(Value, UploadResult)> {
    let payload = upload_payload(config);
    let response = with_spinner("Uploading PSD...", || {
        api.request(Method::POST, UPLOAD_PATH, Some(&payload))
    })?;
    let result = UploadResult::from_response(&response);
    Ok((response, result))
}

/// Pick the configured smart object and render the design into it, or
/// explain why that is not possible without touching the API.
pub fn render<A: MockupApi>(
    api: &A,
    config: &RunConfig,
    mockup_uuid: Option<&Value>,
    smart_objects: &[SmartObject],
) -> Result<RenderStep> {
    if smart_objects.is_empty() {
        return Ok(RenderStep::Skipped(RenderSkip::NoSmartObjects));
    }
    let chosen = match usize::try_from(config.smart_object_index)
        .ok()
        .and_then(|i| smart_objects.get(i))
    {
        Some(chosen) => chosen,
        None => {
            return Ok(RenderStep::Skipped(RenderSkip::IndexOutOfRange {
                index: config.smart_object_index,
                len: smart_objects.len(),
            }))
        }
    };

    println!(
        "Rendering smart object: {} ({})",
        display_value(chosen.name()),
        display_value(chosen.uuid())
    );
    let chosen_uuid = chosen.uuid().ok_or_else(|| {
        anyhow!(
            "smart object {} in the upload response has no uuid",
            config.smart_object_index
        )
    })?;
    let payload = render_payload(config, mockup_uuid, chosen_uuid);
    let response = with_spinner("Rendering...", || api.request(Method::POST, RENDER_PATH, Some(&payload)))?;
    let result = RenderResult::from_response(&response);
    Ok(RenderStep::Rendered { response, result })
}

pub fn list_mockups<A: MockupApi>(api: &A, limit: u32) -> Result<(Value, MockupListResult)> {
    let path = format!("/mockups?limit={limit}");
    let response = with_spinner("Listing mockups...", || api.request(Method::GET, &path, None))?;
    let result = MockupListResult::from_response(&response);
    Ok((response, result))
}

/// Run every configured step and write the transcript. Transport and HTTP
/// status errors abort the run; a failed render does not.
pub fn run<A: MockupApi>(api: &A, config: &RunConfig) -> Result<RunOutcome> {
    info!(?config, "starting smoke run");
    println!("Using API key: {}", mask_key(&config.api_key));
    println!("Uploading PSD: {}", config.psd_url);

    let (upload_response, uploaded) = upload(api, config)?;
    if !uploaded.success {
        println!("PSD upload failed: {}", uploaded.message);
        // No transcript on upload failure.
        return Ok(RunOutcome::UploadFailed {
            message: uploaded.message,
        });
    }
    println!(
        "Upload success. mockup_uuid={} smart_objects={} psd_uuid={}",
        display_value(uploaded.mockup_uuid.as_ref()),
        uploaded.smart_objects.len(),
        display_value(uploaded.psd_uuid.as_ref()),
    );

    let mut bundle = ResultBundle::new(upload_response);

    if config.skip_render {
        debug!("render step disabled");
    } else {
        match render(api, config, uploaded.mockup_uuid.as_ref(), &uploaded.smart_objects)? {
            RenderStep::Skipped(reason) => println!("Render skipped: {reason}."),
            RenderStep::Rendered { response, result } => {
                bundle.render = Some(response);
                if result.success {
                    println!("Render success: {}", result.export_path.as_deref().unwrap_or("None"));
                } else {
                    println!("Render failed: {}", result.message);
                }
            }
        }
    }

    if config.skip_mockup_list {
        debug!("mockup listing disabled");
    } else {
        let (response, listed) = list_mockups(api, config.mockup_limit)?;
        bundle.mockups = Some(response);
        println!("Mockup list success: {} item", listed.items.len());
    }

    bundle.write_to(&config.output_path)?;
    println!("Saved run output: {}", config.output_path.display());
    Ok(RunOutcome::Completed)
}
