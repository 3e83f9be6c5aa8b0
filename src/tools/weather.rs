//! Weather lookup tool
//!
//! Fetches a one-line current-conditions report from wttr.in. The
//! optional `units` parameter demonstrates an enum-constrained property
//! in a locally defined descriptor.

use reqwest::Client;
use tracing::debug;

use super::{Parameters, Property, Tool, ToolArgs, ToolContext, ToolDescriptor};
use crate::error::{BrainError, Result};

const WEATHER_ENDPOINT: &str = "https://wttr.in";

/// Tool reporting current weather for a location.
///
/// # Parameters
/// - `location`: city or place name (required)
/// - `units`: `metric` or `imperial` (optional, defaults to metric)
pub struct WeatherTool {
    client: Client,
    endpoint: String,
}

impl WeatherTool {
    pub fn new() -> Self {
        Self::with_endpoint(WEATHER_ENDPOINT)
    }

    /// Custom endpoint, used by tests.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Tool for WeatherTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "weather".into(),
            description: "Look up the current weather conditions for a location.".into(),
            parameters: Parameters {
                kind: "object".into(),
                required: vec!["location".into()],
                properties: [
                    (
                        "location".to_string(),
                        Property::string("city or place name to report weather for"),
                    ),
                    (
                        "units".to_string(),
                        Property::string_enum(
                            "unit system for the report",
                            &["metric", "imperial"],
                        ),
                    ),
                ]
                .into_iter()
                .collect(),
            },
        }
    }

    async fn execute(&self, args: &ToolArgs, ctx: &ToolContext) -> Result<String> {
        let location = args.require_str("location")?;
        let units = args
            .opt_enum("units", &["metric", "imperial"])?
            .unwrap_or("metric");
        // wttr.in uses bare flags: m for metric, u for imperial (USCS).
        let unit_flag = if units == "imperial" { "u" } else { "m" };
        let url = format!(
            "{}/{}?format=4&{}",
            self.endpoint,
            urlencode(location),
            unit_flag
        );
        debug!(location, units, "running weather lookup");

        let fetch = async {
            let response = self.client.get(&url).send().await?;
            Ok::<String, BrainError>(response.error_for_status()?.text().await?)
        };
        let report = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(BrainError::Cancelled),
            report = fetch => report?,
        };

        Ok(report.trim().to_string())
    }
}

/// Percent-encode a location for use as a path segment.
fn urlencode(location: &str) -> String {
    let mut out = String::new();
    for c in location.trim().chars() {
        match c {
            ' ' => out.push('+'),
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | ',') => {
                out.push(c)
            }
            c => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("%{:02X}", byte));
                }
            }
        }
    }
    out
}
