//! Record API client.
//!
//! Fetches records with their neighborhoods and the edge-class catalog. Every
//! response body is `{"result": ...}` and may carry JSON-path
//! back-references, which are resolved before the result is handed out.

use log::debug;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::codec::retrocycle;
use crate::components::kb_graph::types::EdgeType;
use crate::config::GraphConfig;

/// Base class every edge class inherits from.
const EDGE_BASE_CLASS: &str = "E";

#[derive(Error, Debug)]
pub enum ApiError {
	#[error("no browser window available")]
	NoWindow,

	#[error("request failed: {0}")]
	Js(String),

	#[error("{url} returned HTTP {status}")]
	Status { url: String, status: u16 },

	#[error("invalid JSON from {url}: {source}")]
	Decode {
		url: String,
		#[source]
		source: serde_json::Error,
	},

	#[error("response from {url} has no result")]
	MissingResult { url: String },
}

impl From<JsValue> for ApiError {
	fn from(value: JsValue) -> Self {
		ApiError::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
	}
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone, Debug)]
pub struct RecordApi {
	base: String,
	record_route: String,
}

impl RecordApi {
	pub fn new(base: impl Into<String>, record_route: impl Into<String>) -> Self {
		Self {
			base: base.into(),
			record_route: record_route.into(),
		}
	}

	pub fn from_config(config: &GraphConfig) -> Self {
		Self::new(&config.api_base, &config.record_route)
	}

	pub fn record_url(&self, id: &str, neighbors: u32) -> String {
		format!(
			"{}{}/{}?neighbors={neighbors}",
			self.base,
			self.record_route,
			id.trim_start_matches('#')
		)
	}

	pub fn schema_url(&self) -> String {
		format!("{}/schema", self.base)
	}

	/// Fetches one record with `neighbors` hops of its neighborhood embedded.
	pub async fn get_record(&self, id: &str, neighbors: u32) -> ApiResult<Value> {
		let url = self.record_url(id, neighbors);
		let body = get_json(&url).await?;
		take_result(&url, body)
	}

	/// Fetches the schema and returns its edge classes.
	pub async fn edge_types(&self) -> ApiResult<Vec<EdgeType>> {
		let url = self.schema_url();
		let body = get_json(&url).await?;
		Ok(edge_types_from_schema(&take_result(&url, body)?))
	}
}

/// Resolves back-references and unwraps the `result` member.
pub fn take_result(url: &str, body: Value) -> ApiResult<Value> {
	match retrocycle(body).get_mut("result").map(Value::take) {
		Some(result) if !result.is_null() => Ok(result),
		_ => Err(ApiError::MissingResult { url: url.to_string() }),
	}
}

#[derive(Deserialize)]
struct SchemaClass {
	name: String,
	#[serde(default)]
	inherits: Vec<String>,
}

/// Edge classes of a schema map, sorted by name.
pub fn edge_types_from_schema(schema: &Value) -> Vec<EdgeType> {
	let Some(classes) = schema.as_object() else {
		return Vec::new();
	};
	let mut edge_types: Vec<EdgeType> = classes
		.values()
		.filter_map(|class| SchemaClass::deserialize(class).ok())
		.filter(|class| class.inherits.iter().any(|parent| parent == EDGE_BASE_CLASS))
		.map(|class| EdgeType::new(class.name))
		.collect();
	edge_types.sort_by(|a, b| a.name.cmp(&b.name));
	edge_types
}

async fn get_json(url: &str) -> ApiResult<Value> {
	let window = web_sys::window().ok_or(ApiError::NoWindow)?;

	let init = RequestInit::new();
	init.set_method("GET");
	init.set_mode(RequestMode::Cors);
	let request = Request::new_with_str_and_init(url, &init)?;
	request.headers().set("Accept", "application/json")?;

	debug!("kb-graph: GET {url}");
	let response: Response = JsFuture::from(window.fetch_with_request(&request))
		.await?
		.dyn_into()?;
	if !response.ok() {
		return Err(ApiError::Status {
			url: url.to_string(),
			status: response.status(),
		});
	}

	let text = JsFuture::from(response.text()?)
		.await?
		.as_string()
		.unwrap_or_default();
	serde_json::from_str(&text).map_err(|source| ApiError::Decode {
		url: url.to_string(),
		source,
	})
}
