//! Language-agnostic representation of a validated API specification

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// Structured format a document was confirmed to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecFormat {
    Yaml,
    Json,
}

impl SpecFormat {
    /// File extension used when the document is written back out
    pub fn file_extension(&self) -> &'static str {
        match self {
            SpecFormat::Yaml => "yaml",
            SpecFormat::Json => "json",
        }
    }
}

impl fmt::Display for SpecFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_extension())
    }
}

/// SHA-256 over the canonical document bytes, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecFingerprint(String);

impl SpecFingerprint {
    pub(crate) fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, enough to tell specs apart in logs
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for SpecFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// HTTP methods an OpenAPI path item can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    /// Get all HTTP methods in OpenAPI path-item order
    pub fn all() -> &'static [HttpMethod] {
        &[
            HttpMethod::Get,
            HttpMethod::Put,
            HttpMethod::Post,
            HttpMethod::Delete,
            HttpMethod::Patch,
            HttpMethod::Head,
            HttpMethod::Options,
            HttpMethod::Trace,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
            HttpMethod::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated, immutable API specification shared by all generators
#[derive(Debug, Clone)]
pub struct ValidatedSpec {
    /// Value of the `openapi` (or legacy `swagger`) field
    pub openapi_version: String,
    pub info: ApiInfo,
    pub servers: Vec<Server>,
    pub operations: Vec<Operation>,
    /// Component schemas keyed by name
    pub schemas: BTreeMap<String, Schema>,
    pub format: SpecFormat,
    /// Document text after canonicalization (BOM stripped, `\n` line endings, trimmed)
    pub raw: String,
    pub fingerprint: SpecFingerprint,
}

impl ValidatedSpec {
    /// Base URL of the first declared server, if any
    pub fn base_url(&self) -> Option<&str> {
        self.servers.first().map(|server| server.url.as_str())
    }
}

/// API information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

/// Server definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    pub description: Option<String>,
}

/// OpenAPI operation representation
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    /// Declared `operationId`, or one synthesized from method and path
    pub id: String,
    pub path: String,
    pub method: HttpMethod,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    pub responses: Vec<Response>,
    pub deprecated: bool,
}

impl Operation {
    /// Schema of the first 2xx response with a body
    pub fn success_schema(&self) -> Option<&Schema> {
        self.responses
            .iter()
            .filter(|response| response.status_code.starts_with('2'))
            .find_map(|response| response.schema.as_ref())
    }

    /// Every schema this operation references directly, with a location label
    pub fn schemas(&self) -> Vec<(String, &Schema)> {
        let mut schemas = Vec::new();
        for parameter in &self.parameters {
            schemas.push((
                format!("{} {} parameter `{}`", self.method, self.path, parameter.name),
                &parameter.schema,
            ));
        }
        if let Some(schema) = self.request_body.as_ref().and_then(|b| b.schema.as_ref()) {
            schemas.push((format!("{} {} request body", self.method, self.path), schema));
        }
        for response in &self.responses {
            if let Some(schema) = &response.schema {
                schemas.push((
                    format!("{} {} response {}", self.method, self.path, response.status_code),
                    schema,
                ));
            }
        }
        schemas
    }
}

/// Operation parameter
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Schema,
    pub description: Option<String>,
}

/// Parameter location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }
}

/// Request body
#[derive(Debug, Clone, Serialize)]
pub struct RequestBody {
    pub required: bool,
    pub content_type: String,
    pub schema: Option<Schema>,
    pub description: Option<String>,
}

/// Response
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub status_code: String,
    pub description: String,
    pub schema: Option<Schema>,
}

/// `type` may be a single name or, in OpenAPI 3.1, a list of names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

/// Additional properties specification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Boolean(bool),
    Schema(Box<Schema>),
}

/// Schema representation.
///
/// References stay references: a `$ref` to a component schema is kept by
/// name rather than inlined, so recursive models are representable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", default)]
    pub schema_type: Option<SchemaType>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Option<Box<Schema>>,
    #[serde(default)]
    pub properties: BTreeMap<String, Schema>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(rename = "enum", default)]
    pub enum_values: Vec<JsonValue>,
    #[serde(default)]
    pub all_of: Vec<Schema>,
    #[serde(default)]
    pub one_of: Vec<Schema>,
    #[serde(default)]
    pub any_of: Vec<Schema>,
    #[serde(default)]
    pub not: Option<Box<Schema>>,
    #[serde(default)]
    pub nullable: bool,
}

impl Schema {
    /// Component name when this schema is a `#/components/schemas/...` reference
    pub fn ref_name(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix("#/components/schemas/"))
    }

    /// First non-null type name
    pub fn primary_type(&self) -> Option<&str> {
        match self.schema_type.as_ref()? {
            SchemaType::Single(name) => Some(name.as_str()),
            SchemaType::Multiple(names) => names
                .iter()
                .map(String::as_str)
                .find(|name| *name != "null"),
        }
    }

    /// Whether `null` is an accepted value
    pub fn is_nullable(&self) -> bool {
        self.nullable
            || matches!(
                &self.schema_type,
                Some(SchemaType::Multiple(names)) if names.iter().any(|n| n == "null")
            )
    }

    /// Visit this schema and every nested schema, depth first.
    ///
    /// The callback receives a JSON-pointer-like path relative to `root`.
    pub fn walk<'a>(&'a self, root: &str, visit: &mut dyn FnMut(&str, &'a Schema)) {
        visit(root, self);
        if let Some(items) = &self.items {
            items.walk(&format!("{root}/items"), visit);
        }
        for (name, property) in &self.properties {
            property.walk(&format!("{root}/properties/{name}"), visit);
        }
        if let Some(AdditionalProperties::Schema(schema)) = &self.additional_properties {
            schema.walk(&format!("{root}/additionalProperties"), visit);
        }
        for (keyword, group) in [
            ("allOf", &self.all_of),
            ("oneOf", &self.one_of),
            ("anyOf", &self.any_of),
        ] {
            for (index, schema) in group.iter().enumerate() {
                schema.walk(&format!("{root}/{keyword}/{index}"), visit);
            }
        }
        if let Some(not) = &self.not {
            not.walk(&format!("{root}/not"), visit);
        }
    }
}
