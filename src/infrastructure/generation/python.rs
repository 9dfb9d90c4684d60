//! Python SDK generator
//!
//! Emits a small `httpx`-based package: a client class with one method per
//! operation and a `TypedDict` per component schema.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use std::collections::HashSet;

use super::schema_plan::{ModelPlan, PathSegment, all_schemas, is_record, path_segments};
use super::template_renderer::{TemplateFile, TeraTemplateRenderer};
use crate::generation::{
    GeneratedProject, GenerationCause, GenerationError, LanguageGenerator, LanguageId,
    ProjectManifest, RenderContext,
    sanitizers::sanitize_docstring,
    utils::{to_proper_case, to_snake_case, unique_identifier},
};
use crate::sdk_config::LanguageSettings;
use crate::spec::{AdditionalProperties, Operation, ParameterLocation, Schema, ValidatedSpec};

const TEMPLATES: &[TemplateFile] = &[
    TemplateFile::new(
        "pyproject.toml",
        include_str!("../../../templates/sdk/python/pyproject.toml"),
    ),
    TemplateFile::new(
        "README.md",
        include_str!("../../../templates/sdk/python/README.md"),
    ),
    TemplateFile::new(
        "{{ module_name }}/__init__.py",
        include_str!("../../../templates/sdk/python/__init__.py"),
    ),
    TemplateFile::new(
        "{{ module_name }}/client.py",
        include_str!("../../../templates/sdk/python/client.py"),
    ),
    TemplateFile::new(
        "{{ module_name }}/models.py",
        include_str!("../../../templates/sdk/python/models.py"),
    ),
];

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Names imported into `models.py` that a model must not shadow
const RESERVED_MODEL_NAMES: &[&str] = &[
    "Any", "Dict", "List", "Literal", "NotRequired", "Optional", "TypedDict", "Union",
];

/// Names the generated client class already uses
const RESERVED_METHOD_NAMES: &[&str] = &["close", "_request"];

/// Python-specific model information
#[derive(Debug, Serialize)]
struct PythonModel {
    name: String,
    /// `class`, `functional` (keys that are not identifiers) or `alias`
    kind: &'static str,
    bases: String,
    docstring: Option<String>,
    fields: Vec<PythonField>,
    alias: Option<String>,
}

#[derive(Debug, Serialize)]
struct PythonField {
    name: String,
    key_literal: String,
    annotation: String,
}

/// Python-specific operation information
#[derive(Debug, Serialize)]
struct PythonOperation {
    method_name: String,
    http_method: String,
    signature: String,
    return_type: String,
    docstring: String,
    path_expression: String,
    params: String,
    headers: String,
    cookies: String,
    body: String,
    deprecated: bool,
}

/// Python SDK generator
pub struct PythonGenerator {
    renderer: TeraTemplateRenderer,
}

impl PythonGenerator {
    pub fn new() -> Self {
        Self {
            renderer: TeraTemplateRenderer::new(),
        }
    }

    fn language_id() -> LanguageId {
        LanguageId::new("python")
    }

    /// TypedDict cannot mix declared keys with typed extra keys
    fn check_supported(spec: &ValidatedSpec) -> Result<(), GenerationError> {
        for (location, schema) in all_schemas(spec) {
            let mut offending = None;
            schema.walk(&location, &mut |path, nested| {
                if offending.is_none()
                    && !nested.properties.is_empty()
                    && matches!(
                        nested.additional_properties,
                        Some(AdditionalProperties::Schema(_))
                    )
                {
                    offending = Some(path.to_string());
                }
            });
            if let Some(path) = offending {
                return Err(GenerationError::unsupported(
                    Self::language_id(),
                    path,
                    "object declares both `properties` and a schema-valued \
                     `additionalProperties`; TypedDict cannot express it",
                ));
            }
        }
        Ok(())
    }

    fn build_context(
        &self,
        spec: &ValidatedSpec,
        settings: &LanguageSettings,
    ) -> Result<RenderContext, GenerationError> {
        let plan = ModelPlan::new(&Self::language_id(), spec, RESERVED_MODEL_NAMES)?;
        let module_name = python_identifier(&to_snake_case(&settings.package_name), "sdk_");
        let client_class = format!(
            "{}Client",
            python_identifier(&to_proper_case(&settings.namespace), "Api")
        );

        let mut render_context = RenderContext::new();

        // Base context
        render_context.add_variable("package_name", json!(settings.package_name));
        render_context.add_variable("package_version", json!(settings.package_version));
        render_context.add_variable("module_name", json!(module_name));
        render_context.add_variable("client_class", json!(client_class));
        render_context.add_variable("company_name", json!(settings.company_name));
        render_context.add_variable("repository", json!(settings.repository_path));
        render_context.add_variable("api_title", json!(sanitize_docstring(&spec.info.title)));
        render_context.add_variable("api_version", json!(spec.info.version));
        render_context.add_variable(
            "api_description",
            json!(spec.info.description.as_deref().map(sanitize_docstring)),
        );
        let description = format!("{} SDK for {}", settings.display_name, spec.info.title);
        render_context.add_variable("description_literal", json!(string_literal(&description)));
        render_context.add_variable(
            "version_literal",
            json!(string_literal(&settings.package_version)),
        );
        render_context.add_variable(
            "base_url_literal",
            json!(string_literal(spec.base_url().unwrap_or("http://localhost"))),
        );

        let models = plan
            .order()
            .iter()
            .filter_map(|name| spec.schemas.get_key_value(*name))
            .map(|(name, schema)| build_python_model(name, schema, spec, &plan))
            .collect::<Result<Vec<_>, _>>()?;
        render_context.add_variable("models", json!(models));

        let mut taken: HashSet<String> =
            RESERVED_METHOD_NAMES.iter().map(|n| n.to_string()).collect();
        let operations = spec
            .operations
            .iter()
            .map(|op| build_python_operation(op, &plan, &mut taken))
            .collect::<Result<Vec<_>, _>>()?;
        render_context.add_variable("operations", json!(operations));

        Ok(render_context)
    }
}

impl Default for PythonGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageGenerator for PythonGenerator {
    fn language(&self) -> LanguageId {
        Self::language_id()
    }

    async fn generate(
        &self,
        spec: &ValidatedSpec,
        settings: &LanguageSettings,
    ) -> Result<GeneratedProject, GenerationError> {
        if settings.language != Self::language_id() {
            return Err(GenerationError::new(
                Self::language_id(),
                GenerationCause::InvalidSettings(format!(
                    "PythonGenerator cannot use settings for {}",
                    settings.language
                )),
            ));
        }

        Self::check_supported(spec)?;
        let context = self.build_context(spec, settings)?;
        let artifacts = self
            .renderer
            .render(TEMPLATES, &context)
            .map_err(|e| GenerationError::render(Self::language_id(), e))?;

        tracing::debug!(
            language = "python",
            files = artifacts.len(),
            operations = spec.operations.len(),
            "Python SDK rendered"
        );

        Ok(GeneratedProject {
            manifest: ProjectManifest {
                name: settings.package_name.clone(),
                version: settings.package_version.clone(),
                language: Self::language_id(),
                generator: format!("sdkforge-python/{}", env!("CARGO_PKG_VERSION")),
            },
            artifacts,
        })
    }
}

fn build_python_model(
    name: &str,
    schema: &Schema,
    spec: &ValidatedSpec,
    plan: &ModelPlan<'_>,
) -> Result<PythonModel, GenerationError> {
    let type_name = plan.type_name(name).unwrap_or(name).to_string();
    let docstring = schema.description.as_deref().map(sanitize_docstring);

    if !is_record(schema) {
        return Ok(PythonModel {
            name: type_name,
            kind: "alias",
            bases: String::new(),
            docstring,
            fields: Vec::new(),
            alias: Some(python_type(schema, plan)),
        });
    }

    let mut bases = Vec::new();
    let mut members = vec![schema];
    for part in &schema.all_of {
        match part.ref_name() {
            Some(base) => {
                let is_class = spec.schemas.get(base).is_some_and(is_record);
                if !is_class {
                    return Err(GenerationError::unsupported(
                        LanguageId::new("python"),
                        format!("#/components/schemas/{name}/allOf"),
                        format!("`{base}` is not an object schema and cannot be a TypedDict base"),
                    ));
                }
                bases.push(plan.type_name(base).unwrap_or(base).to_string());
            }
            None => members.push(part),
        }
    }

    let mut fields = Vec::new();
    for member in members {
        for (key, property) in &member.properties {
            let annotation = python_type(property, plan);
            let required = member.required.contains(key) || schema.required.contains(key);
            fields.push(PythonField {
                name: key.clone(),
                key_literal: string_literal(key),
                annotation: if required {
                    annotation
                } else {
                    format!("NotRequired[{annotation}]")
                },
            });
        }
    }

    let functional = fields
        .iter()
        .any(|field| !is_identifier(&field.name) || KEYWORDS.contains(&field.name.as_str()));
    // Functional TypedDicts cannot inherit
    let kind = if functional && bases.is_empty() {
        "functional"
    } else if functional {
        return Err(GenerationError::unsupported(
            LanguageId::new("python"),
            format!("#/components/schemas/{name}"),
            "extended object has property names that are not Python identifiers",
        ));
    } else {
        "class"
    };

    Ok(PythonModel {
        name: type_name,
        kind,
        bases: if bases.is_empty() {
            "TypedDict".to_string()
        } else {
            bases.join(", ")
        },
        docstring,
        fields,
        alias: None,
    })
}

/// Map a schema to a Python annotation; component models are forward references
fn python_type(schema: &Schema, plan: &ModelPlan<'_>) -> String {
    python_type_with_prefix(schema, plan, "")
}

fn python_type_with_prefix(schema: &Schema, plan: &ModelPlan<'_>, prefix: &str) -> String {
    let base = if let Some(reference) = schema.reference.as_deref() {
        match schema.ref_name().and_then(|name| plan.type_name(name)) {
            Some(type_name) => format!("\"{prefix}{type_name}\""),
            None => {
                tracing::debug!(reference, "Non-schema reference mapped to Any");
                "Any".to_string()
            }
        }
    } else if !schema.enum_values.is_empty() {
        let literals: Vec<String> = schema.enum_values.iter().map(python_literal).collect();
        format!("Literal[{}]", literals.join(", "))
    } else if !schema.one_of.is_empty() || !schema.any_of.is_empty() {
        let variants: Vec<String> = schema
            .one_of
            .iter()
            .chain(&schema.any_of)
            .map(|variant| python_type_with_prefix(variant, plan, prefix))
            .collect();
        format!("Union[{}]", variants.join(", "))
    } else if schema.all_of.len() == 1 {
        python_type_with_prefix(&schema.all_of[0], plan, prefix)
    } else {
        match schema.primary_type() {
            Some("string") if schema.format.as_deref() == Some("binary") => "bytes".to_string(),
            Some("string") => "str".to_string(),
            Some("integer") => "int".to_string(),
            Some("number") => "float".to_string(),
            Some("boolean") => "bool".to_string(),
            Some("null") => "None".to_string(),
            Some("array") => match &schema.items {
                Some(items) => format!("List[{}]", python_type_with_prefix(items, plan, prefix)),
                None => "List[Any]".to_string(),
            },
            Some("object") => match &schema.additional_properties {
                Some(AdditionalProperties::Schema(values)) if schema.properties.is_empty() => {
                    format!("Dict[str, {}]", python_type_with_prefix(values, plan, prefix))
                }
                _ => "Dict[str, Any]".to_string(),
            },
            _ => "Any".to_string(),
        }
    };

    if schema.is_nullable() && base != "Any" && base != "None" {
        format!("Optional[{base}]")
    } else {
        base
    }
}

fn build_python_operation(
    op: &Operation,
    plan: &ModelPlan<'_>,
    taken_methods: &mut HashSet<String>,
) -> Result<PythonOperation, GenerationError> {
    let method_name = unique_identifier(
        &python_identifier(&to_snake_case(&op.id), "op_"),
        taken_methods,
    );

    // `body` is reserved for the request payload
    let mut taken_params: HashSet<String> =
        ["self", "body"].iter().map(|s| s.to_string()).collect();
    let mut positional = Vec::new();
    let mut required_keywords = Vec::new();
    let mut optional_keywords = Vec::new();
    let mut params = Vec::new();
    let mut headers = Vec::new();
    let mut cookies = Vec::new();
    let mut path_names = Vec::new();

    for parameter in &op.parameters {
        let ident = unique_identifier(
            &python_identifier(&to_snake_case(&parameter.name), "param_"),
            &mut taken_params,
        );
        let annotation = python_type_with_prefix(&parameter.schema, plan, "models.");
        let entry = format!("{}: {}", string_literal(&parameter.name), ident);

        match parameter.location {
            ParameterLocation::Path => {
                path_names.push((parameter.name.as_str(), ident.clone()));
                positional.push(format!("{ident}: {annotation}"));
                continue;
            }
            ParameterLocation::Query => params.push(entry),
            ParameterLocation::Header => headers.push(entry),
            ParameterLocation::Cookie => cookies.push(entry),
        }

        if parameter.required {
            required_keywords.push(format!("{ident}: {annotation}"));
        } else {
            optional_keywords.push(format!("{ident}: Optional[{annotation}] = None"));
        }
    }

    let body = match &op.request_body {
        Some(request_body) => {
            let annotation = request_body
                .schema
                .as_ref()
                .map(|schema| python_type_with_prefix(schema, plan, "models."))
                .unwrap_or_else(|| "Any".to_string());
            if request_body.required {
                required_keywords.push(format!("body: {annotation}"));
            } else {
                optional_keywords.push(format!("body: Optional[{annotation}] = None"));
            }
            "body"
        }
        None => "None",
    };

    let mut signature = vec!["self".to_string()];
    signature.extend(positional);
    if !required_keywords.is_empty() || !optional_keywords.is_empty() {
        signature.push("*".to_string());
        signature.extend(required_keywords);
        signature.extend(optional_keywords);
    }

    let docstring = op
        .summary
        .as_deref()
        .or(op.description.as_deref())
        .map(sanitize_docstring)
        .unwrap_or_else(|| {
            let method = op.method.as_str().to_uppercase();
            format!("{method} {}", sanitize_docstring(&op.path))
        });

    Ok(PythonOperation {
        method_name,
        http_method: op.method.as_str().to_uppercase(),
        signature: signature.join(", "),
        return_type: op
            .success_schema()
            .map(|schema| python_type_with_prefix(schema, plan, "models."))
            .unwrap_or_else(|| "None".to_string()),
        docstring,
        path_expression: path_expression(op, &path_names)?,
        params: dict_literal(&params),
        headers: dict_literal(&headers),
        cookies: dict_literal(&cookies),
        body: body.to_string(),
        deprecated: op.deprecated,
    })
}

/// f-string building the request path with each placeholder URL-quoted
fn path_expression(
    op: &Operation,
    path_names: &[(&str, String)],
) -> Result<String, GenerationError> {
    let mut expression = String::from("f\"");
    for segment in path_segments(&op.path) {
        match segment {
            PathSegment::Literal(text) => expression.push_str(
                &text
                    .replace('\\', "\\\\")
                    .replace('"', "\\\"")
                    .replace('{', "{{")
                    .replace('}', "}}"),
            ),
            PathSegment::Placeholder(name) => {
                let ident = path_names
                    .iter()
                    .find(|(wire, _)| *wire == name)
                    .map(|(_, ident)| ident)
                    .ok_or_else(|| {
                        GenerationError::unsupported(
                            LanguageId::new("python"),
                            format!("{} {}", op.method, op.path),
                            format!("path placeholder `{name}` has no path parameter"),
                        )
                    })?;
                expression.push_str(&format!("{{quote(str({ident}), safe='')}}"));
            }
        }
    }
    expression.push('"');
    Ok(expression)
}

fn dict_literal(entries: &[String]) -> String {
    if entries.is_empty() {
        "None".to_string()
    } else {
        format!("{{{}}}", entries.join(", "))
    }
}

/// A JSON string literal is also a valid Python and TOML string literal
fn string_literal(value: &str) -> String {
    JsonValue::String(value.to_string()).to_string()
}

fn python_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "None".to_string(),
        JsonValue::Bool(true) => "True".to_string(),
        JsonValue::Bool(false) => "False".to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => string_literal(s),
        other => string_literal(&other.to_string()),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Make `candidate` a usable Python identifier
fn python_identifier(candidate: &str, digit_prefix: &str) -> String {
    let mut ident: String = candidate
        .chars()
        .filter(|c| *c == '_' || c.is_ascii_alphanumeric())
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident = format!("{digit_prefix}{ident}");
    }
    if KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}
