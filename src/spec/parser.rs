//! OpenAPI document parser
//!
//! Turns an already-deserialized document into the [`ValidatedSpec`] domain
//! model. Handles:
//! - `$ref` resolution for parameters, request bodies and responses
//! - Merging of path-level and operation-level parameters
//! - Component schemas, kept by name so recursive models stay finite
//! - Synthesized operation ids when `operationId` is absent

use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};

use crate::spec::{
    ApiInfo, HttpMethod, Operation, Parameter, ParameterLocation, RequestBody, Response, Schema,
    Server, SpecError, SpecFingerprint, SpecFormat, ValidatedSpec,
};

/// Everything the parser extracts, before the raw text and fingerprint are attached
#[derive(Debug)]
pub(crate) struct ParsedDocument {
    pub openapi_version: String,
    pub info: ApiInfo,
    pub servers: Vec<Server>,
    pub operations: Vec<Operation>,
    pub schemas: BTreeMap<String, Schema>,
}

impl ParsedDocument {
    pub(crate) fn into_spec(
        self,
        format: SpecFormat,
        raw: String,
        fingerprint: SpecFingerprint,
    ) -> ValidatedSpec {
        ValidatedSpec {
            openapi_version: self.openapi_version,
            info: self.info,
            servers: self.servers,
            operations: self.operations,
            schemas: self.schemas,
            format,
            raw,
            fingerprint,
        }
    }
}

/// OpenAPI specification parser
pub struct OpenApiParser<'a> {
    json: &'a JsonValue,
}

impl<'a> OpenApiParser<'a> {
    /// Create a new parser over a deserialized document
    pub fn new(json: &'a JsonValue) -> Self {
        Self { json }
    }

    /// Parse the complete document into the domain model
    pub(crate) fn parse(&self) -> Result<ParsedDocument, SpecError> {
        let openapi_version = self
            .json
            .get("openapi")
            .or_else(|| self.json.get("swagger"))
            .and_then(scalar_to_string)
            .ok_or_else(|| SpecError::semantic("missing `openapi` version field"))?;

        let info = ApiInfo {
            title: self
                .info_field("title")
                .filter(|title| !title.trim().is_empty())
                .ok_or_else(|| SpecError::semantic("missing info.title"))?,
            version: self
                .info_field("version")
                .filter(|version| !version.trim().is_empty())
                .ok_or_else(|| SpecError::semantic("missing info.version"))?,
            description: self.info_field("description"),
        };

        let servers = self
            .json
            .get("servers")
            .and_then(JsonValue::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|s| {
                        Some(Server {
                            url: s.get("url").and_then(JsonValue::as_str)?.to_string(),
                            description: s
                                .get("description")
                                .and_then(JsonValue::as_str)
                                .map(String::from),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let schemas = self.parse_component_schemas()?;
        let operations = self.parse_operations()?;
        tracing::debug!(
            operations = operations.len(),
            schemas = schemas.len(),
            "OpenAPI parser finished"
        );

        let parsed = ParsedDocument {
            openapi_version,
            info,
            servers,
            operations,
            schemas,
        };
        self.check_references(&parsed)?;
        Ok(parsed)
    }

    /// `info.<field>`, accepting numbers for fields like `version: 1.0`
    fn info_field(&self, field: &str) -> Option<String> {
        self.json.get("info")?.get(field).and_then(scalar_to_string)
    }

    fn parse_component_schemas(&self) -> Result<BTreeMap<String, Schema>, SpecError> {
        let Some(schemas) = self
            .json
            .pointer("/components/schemas")
            .and_then(JsonValue::as_object)
        else {
            return Ok(BTreeMap::new());
        };

        schemas
            .iter()
            .map(|(name, value)| {
                parse_schema(value, &format!("#/components/schemas/{name}"))
                    .map(|schema| (name.clone(), schema))
            })
            .collect()
    }

    /// Parse all operations, in path order then method order
    pub(crate) fn parse_operations(&self) -> Result<Vec<Operation>, SpecError> {
        let paths = self
            .json
            .get("paths")
            .and_then(JsonValue::as_object)
            .ok_or_else(|| SpecError::semantic("missing `paths` object"))?;

        let operations = paths
            .iter()
            .flat_map(|(path, path_item)| {
                HttpMethod::all().iter().filter_map(move |method| {
                    path_item
                        .get(method.as_str())
                        .and_then(JsonValue::as_object)
                        .map(|method_item| (path, *method, path_item, method_item))
                })
            })
            .map(|(path, method, path_item, method_item)| {
                self.build_operation(path, method, path_item, method_item)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        for operation in &operations {
            if !seen.insert(operation.id.as_str()) {
                return Err(SpecError::semantic(format!(
                    "duplicate operationId `{}`",
                    operation.id
                )));
            }
        }

        Ok(operations)
    }

    fn build_operation(
        &self,
        path: &str,
        method: HttpMethod,
        path_item: &JsonValue,
        method_item: &serde_json::Map<String, JsonValue>,
    ) -> Result<Operation, SpecError> {
        let id = method_item
            .get("operationId")
            .and_then(JsonValue::as_str)
            .filter(|id| !id.trim().is_empty())
            .map(String::from)
            .unwrap_or_else(|| synthesize_operation_id(method, path));

        // Operation-level parameters override path-level ones with the same name and location
        let mut parameters = self.extract_parameters(path_item.get("parameters"))?;
        for parameter in self.extract_parameters(method_item.get("parameters"))? {
            parameters.retain(|existing: &Parameter| {
                existing.name != parameter.name || existing.location != parameter.location
            });
            parameters.push(parameter);
        }

        let request_body = method_item
            .get("requestBody")
            .map(|body| self.parse_request_body(body, &format!("{method} {path}")))
            .transpose()?;

        let responses = method_item
            .get("responses")
            .and_then(JsonValue::as_object)
            .map(|map| {
                map.iter()
                    .map(|(status, response)| self.parse_response(status, response, path, method))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let tags = method_item
            .get("tags")
            .and_then(JsonValue::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(JsonValue::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Operation {
            id,
            path: path.to_string(),
            method,
            summary: string_field(method_item.get("summary")),
            description: string_field(method_item.get("description")),
            tags,
            parameters,
            request_body,
            responses,
            deprecated: method_item
                .get("deprecated")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
        })
    }

    fn extract_parameters(&self, list: Option<&JsonValue>) -> Result<Vec<Parameter>, SpecError> {
        let Some(list) = list else {
            return Ok(Vec::new());
        };
        let items = list
            .as_array()
            .ok_or_else(|| SpecError::semantic("`parameters` must be a list"))?;

        items
            .iter()
            .map(|param| {
                let resolved = self.resolve(param)?;
                self.parse_parameter(resolved)
            })
            .collect()
    }

    fn parse_parameter(&self, param: &JsonValue) -> Result<Parameter, SpecError> {
        let name = param
            .get("name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| SpecError::semantic("parameter missing `name`"))?
            .to_string();

        let location = param
            .get("in")
            .and_then(JsonValue::as_str)
            .and_then(ParameterLocation::parse)
            .ok_or_else(|| {
                SpecError::semantic(format!("parameter `{name}` has an invalid `in` location"))
            })?;

        // Swagger 2 style parameters carry their type inline instead of under `schema`
        let schema = parse_schema(
            param.get("schema").unwrap_or(param),
            &format!("parameter `{name}`"),
        )?;

        Ok(Parameter {
            required: location == ParameterLocation::Path
                || param
                    .get("required")
                    .and_then(JsonValue::as_bool)
                    .unwrap_or(false),
            name,
            location,
            schema,
            description: string_field(param.get("description")),
        })
    }

    fn parse_request_body(&self, body: &JsonValue, label: &str) -> Result<RequestBody, SpecError> {
        let body = self.resolve(body)?;
        let (content_type, schema) = self.first_media_schema(body.get("content"), label)?;

        Ok(RequestBody {
            required: body
                .get("required")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
            content_type: content_type.unwrap_or_else(|| "application/json".to_string()),
            schema,
            description: string_field(body.get("description")),
        })
    }

    fn parse_response(
        &self,
        status_code: &str,
        response: &JsonValue,
        path: &str,
        method: HttpMethod,
    ) -> Result<Response, SpecError> {
        let response = self.resolve(response)?;
        let label = format!("{method} {path} response {status_code}");
        let (_, schema) = self.first_media_schema(response.get("content"), &label)?;

        Ok(Response {
            status_code: status_code.to_string(),
            description: string_field(response.get("description")).unwrap_or_default(),
            schema,
        })
    }

    /// JSON media type wins; otherwise the first declared media type
    fn first_media_schema(
        &self,
        content: Option<&JsonValue>,
        label: &str,
    ) -> Result<(Option<String>, Option<Schema>), SpecError> {
        let Some(content) = content.and_then(JsonValue::as_object) else {
            return Ok((None, None));
        };

        let chosen = content
            .iter()
            .find(|(media_type, _)| media_type.contains("json"))
            .or_else(|| content.iter().next());

        match chosen {
            Some((media_type, media)) => {
                let schema = media
                    .get("schema")
                    .map(|schema| parse_schema(schema, label))
                    .transpose()?;
                Ok((Some(media_type.clone()), schema))
            }
            None => Ok((None, None)),
        }
    }

    /// Follow a local `$ref`, once per hop, failing on anything unresolvable
    fn resolve<'v>(&'v self, value: &'v JsonValue) -> Result<&'v JsonValue, SpecError> {
        let mut current = value;
        // Bounded so a ref cycle between components cannot loop forever
        for _ in 0..16 {
            match current.get("$ref").and_then(JsonValue::as_str) {
                Some(reference) => current = self.lookup(reference)?,
                None => return Ok(current),
            }
        }
        Err(SpecError::semantic("reference chain too deep or cyclic"))
    }

    fn lookup(&self, reference: &str) -> Result<&'a JsonValue, SpecError> {
        let pointer = reference.strip_prefix('#').ok_or_else(|| {
            SpecError::semantic(format!("external reference `{reference}` is not supported"))
        })?;
        self.json
            .pointer(pointer)
            .ok_or_else(|| SpecError::semantic(format!("unresolved reference `{reference}`")))
    }

    /// Every schema `$ref` must point at something inside the document
    fn check_references(&self, parsed: &ParsedDocument) -> Result<(), SpecError> {
        let mut roots: Vec<(String, &Schema)> = parsed
            .schemas
            .iter()
            .map(|(name, schema)| (format!("#/components/schemas/{name}"), schema))
            .collect();
        for operation in &parsed.operations {
            roots.extend(operation.schemas());
        }

        let mut failure = None;
        for (location, schema) in roots {
            schema.walk(&location, &mut |path, nested| {
                if failure.is_some() {
                    return;
                }
                if let Some(reference) = &nested.reference {
                    if let Err(error) = self.lookup(reference) {
                        failure = Some(SpecError::semantic(format!("{error} at {path}")));
                    }
                }
            });
            if let Some(error) = failure {
                return Err(error);
            }
        }
        Ok(())
    }
}

fn parse_schema(value: &JsonValue, location: &str) -> Result<Schema, SpecError> {
    serde_json::from_value(value.clone())
        .map_err(|e| SpecError::semantic(format!("invalid schema at {location}: {e}")))
}

fn string_field(value: Option<&JsonValue>) -> Option<String> {
    value.and_then(JsonValue::as_str).map(String::from)
}

fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn synthesize_operation_id(method: HttpMethod, path: &str) -> String {
    let path_part = path
        .trim_matches('/')
        .replace(['{', '}'], "")
        .replace(['/', '-', '.'], "_");
    if path_part.is_empty() {
        method.to_string()
    } else {
        format!("{method}_{path_part}")
    }
}
