//! TypeScript SDK generator
//!
//! Emits a dependency-free `fetch` client with one async method per
//! operation, plus an interface or type alias per component schema.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use std::collections::HashSet;

use super::schema_plan::{ModelPlan, PathSegment, all_schemas, is_record, path_segments};
use super::template_renderer::{TemplateFile, TeraTemplateRenderer};
use crate::generation::{
    GeneratedProject, GenerationCause, GenerationError, LanguageGenerator, LanguageId,
    ProjectManifest, RenderContext,
    sanitizers::sanitize_block_comment,
    utils::{to_camel_case, to_proper_case, unique_identifier},
};
use crate::sdk_config::LanguageSettings;
use crate::spec::{AdditionalProperties, Operation, ParameterLocation, Schema, ValidatedSpec};

const TEMPLATES: &[TemplateFile] = &[
    TemplateFile::new(
        "package.json",
        include_str!("../../../templates/sdk/typescript/package.json"),
    ),
    TemplateFile::new(
        "tsconfig.json",
        include_str!("../../../templates/sdk/typescript/tsconfig.json"),
    ),
    TemplateFile::new(
        "README.md",
        include_str!("../../../templates/sdk/typescript/README.md"),
    ),
    TemplateFile::new(
        "src/index.ts",
        include_str!("../../../templates/sdk/typescript/index.ts"),
    ),
    TemplateFile::new(
        "src/client.ts",
        include_str!("../../../templates/sdk/typescript/client.ts"),
    ),
    TemplateFile::new(
        "src/models.ts",
        include_str!("../../../templates/sdk/typescript/models.ts"),
    ),
];

const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Global types a model must not shadow
const RESERVED_MODEL_NAMES: &[&str] = &["Array", "Blob", "Date", "Promise", "Record"];

/// Members the generated client class already defines
const RESERVED_METHOD_NAMES: &[&str] = &["constructor", "request"];

/// TypeScript-specific model information
#[derive(Debug, Serialize)]
struct TypeScriptModel {
    name: String,
    /// `interface` or `alias`
    kind: &'static str,
    comment: Option<String>,
    fields: Vec<TypeScriptField>,
    alias: Option<String>,
}

#[derive(Debug, Serialize)]
struct TypeScriptField {
    key: String,
    optional: bool,
    ts_type: String,
    comment: Option<String>,
}

/// TypeScript-specific operation information
#[derive(Debug, Serialize)]
struct TypeScriptOperation {
    method_name: String,
    http_method: String,
    signature: String,
    return_type: String,
    comment: String,
    path_expression: String,
    query: String,
    headers: String,
    cookies: String,
    body: String,
    deprecated: bool,
}

/// TypeScript SDK generator
pub struct TypeScriptGenerator {
    renderer: TeraTemplateRenderer,
}

impl TypeScriptGenerator {
    pub fn new() -> Self {
        Self {
            renderer: TeraTemplateRenderer::new(),
        }
    }

    fn language_id() -> LanguageId {
        LanguageId::new("typescript")
    }

    /// TypeScript has no negated types
    fn check_supported(spec: &ValidatedSpec) -> Result<(), GenerationError> {
        for (location, schema) in all_schemas(spec) {
            let mut offending = None;
            schema.walk(&location, &mut |path, nested| {
                if offending.is_none() && nested.not.is_some() {
                    offending = Some(path.to_string());
                }
            });
            if let Some(path) = offending {
                return Err(GenerationError::unsupported(
                    Self::language_id(),
                    path,
                    "`not` schemas have no TypeScript equivalent",
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
        let mut client_class = format!("{}Client", to_proper_case(&settings.namespace));
        if !client_class.starts_with(|c: char| c.is_ascii_alphabetic()) {
            client_class = format!("Api{client_class}");
        }

        let mut render_context = RenderContext::new();

        // Base context
        render_context.add_variable("package_name", json!(settings.package_name));
        render_context.add_variable("package_version", json!(settings.package_version));
        render_context.add_variable("client_class", json!(client_class));
        render_context.add_variable("company_name", json!(settings.company_name));
        render_context.add_variable("repository", json!(settings.repository_path));
        render_context.add_variable("api_title", json!(sanitize_block_comment(&spec.info.title)));
        render_context.add_variable("api_version", json!(spec.info.version));
        render_context.add_variable(
            "api_description",
            json!(spec.info.description.as_deref().map(sanitize_block_comment)),
        );
        render_context.add_variable(
            "package_json",
            json!(package_json(spec, settings)?),
        );
        render_context.add_variable(
            "base_url_literal",
            json!(string_literal(spec.base_url().unwrap_or("http://localhost"))),
        );

        let models = plan
            .order()
            .iter()
            .filter_map(|name| spec.schemas.get_key_value(*name))
            .map(|(name, schema)| build_typescript_model(name, schema, &plan))
            .collect::<Vec<_>>();
        render_context.add_variable("models", json!(models));

        let mut taken: HashSet<String> =
            RESERVED_METHOD_NAMES.iter().map(|n| n.to_string()).collect();
        let operations = spec
            .operations
            .iter()
            .map(|op| build_typescript_operation(op, &plan, &mut taken))
            .collect::<Result<Vec<_>, _>>()?;
        render_context.add_variable("operations", json!(operations));

        Ok(render_context)
    }
}

impl Default for TypeScriptGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageGenerator for TypeScriptGenerator {
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
                    "TypeScriptGenerator cannot use settings for {}",
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
            language = "typescript",
            files = artifacts.len(),
            operations = spec.operations.len(),
            "TypeScript SDK rendered"
        );

        Ok(GeneratedProject {
            manifest: ProjectManifest {
                name: settings.package_name.clone(),
                version: settings.package_version.clone(),
                language: Self::language_id(),
                generator: format!("sdkforge-typescript/{}", env!("CARGO_PKG_VERSION")),
            },
            artifacts,
        })
    }
}

/// `package.json` is built as data so names and versions are always valid JSON
fn package_json(
    spec: &ValidatedSpec,
    settings: &LanguageSettings,
) -> Result<String, GenerationError> {
    let manifest = json!({
        "name": settings.package_name,
        "version": settings.package_version,
        "description": format!("{} SDK for {}", settings.display_name, spec.info.title),
        "main": "dist/index.js",
        "types": "dist/index.d.ts",
        "files": ["dist"],
        "repository": {
            "type": "git",
            "url": format!("https://github.com/{}.git", settings.repository_path),
        },
        "scripts": { "build": "tsc", "prepublishOnly": "tsc" },
        "devDependencies": { "typescript": "^5.4.0" },
    });
    serde_json::to_string_pretty(&manifest)
        .map_err(|e| GenerationError::render(LanguageId::new("typescript"), e))
}

fn build_typescript_model(name: &str, schema: &Schema, plan: &ModelPlan<'_>) -> TypeScriptModel {
    let type_name = plan.type_name(name).unwrap_or(name).to_string();
    let comment = schema.description.as_deref().map(sanitize_block_comment);

    if is_record(schema) && schema.all_of.is_empty() {
        TypeScriptModel {
            name: type_name,
            kind: "interface",
            comment,
            fields: object_fields(schema, plan, ""),
            alias: None,
        }
    } else {
        TypeScriptModel {
            name: type_name,
            kind: "alias",
            comment,
            fields: Vec::new(),
            alias: Some(typescript_type(schema, plan, "")),
        }
    }
}

fn object_fields(schema: &Schema, plan: &ModelPlan<'_>, prefix: &str) -> Vec<TypeScriptField> {
    schema
        .properties
        .iter()
        .map(|(key, property)| TypeScriptField {
            key: property_key(key),
            optional: !schema.required.contains(key),
            ts_type: typescript_type(property, plan, prefix),
            comment: property.description.as_deref().map(sanitize_block_comment),
        })
        .collect()
}

fn inline_object(schema: &Schema, plan: &ModelPlan<'_>, prefix: &str) -> String {
    let members: Vec<String> = object_fields(schema, plan, prefix)
        .into_iter()
        .map(|field| {
            format!(
                "{}{}: {}",
                field.key,
                if field.optional { "?" } else { "" },
                field.ts_type
            )
        })
        .collect();
    format!("{{ {} }}", members.join("; "))
}

/// Map a schema to a TypeScript type expression
fn typescript_type(schema: &Schema, plan: &ModelPlan<'_>, prefix: &str) -> String {
    let base = if schema.reference.is_some() {
        match schema.ref_name().and_then(|name| plan.type_name(name)) {
            Some(type_name) => format!("{prefix}{type_name}"),
            None => "unknown".to_string(),
        }
    } else if !schema.enum_values.is_empty() {
        let literals: Vec<String> = schema.enum_values.iter().map(JsonValue::to_string).collect();
        literals.join(" | ")
    } else if !schema.one_of.is_empty() || !schema.any_of.is_empty() {
        let variants: Vec<String> = schema
            .one_of
            .iter()
            .chain(&schema.any_of)
            .map(|variant| parenthesize(typescript_type(variant, plan, prefix)))
            .collect();
        variants.join(" | ")
    } else if !schema.all_of.is_empty() {
        let mut parts: Vec<String> = schema
            .all_of
            .iter()
            .map(|part| parenthesize(typescript_type(part, plan, prefix)))
            .collect();
        if !schema.properties.is_empty() {
            parts.push(inline_object(schema, plan, prefix));
        }
        parts.join(" & ")
    } else {
        match schema.primary_type() {
            Some("string") if schema.format.as_deref() == Some("binary") => "Blob".to_string(),
            Some("string") => "string".to_string(),
            Some("integer") | Some("number") => "number".to_string(),
            Some("boolean") => "boolean".to_string(),
            Some("null") => "null".to_string(),
            Some("array") => match &schema.items {
                Some(items) => format!("Array<{}>", typescript_type(items, plan, prefix)),
                None => "Array<unknown>".to_string(),
            },
            Some("object") | None if !schema.properties.is_empty() => {
                inline_object(schema, plan, prefix)
            }
            Some("object") => match &schema.additional_properties {
                Some(AdditionalProperties::Schema(values)) => {
                    format!("Record<string, {}>", typescript_type(values, plan, prefix))
                }
                _ => "Record<string, unknown>".to_string(),
            },
            _ => "unknown".to_string(),
        }
    };

    if schema.is_nullable() && base != "unknown" && base != "null" {
        format!("{} | null", parenthesize(base))
    } else {
        base
    }
}

/// Wrap union and intersection types so they compose safely
fn parenthesize(ts_type: String) -> String {
    if ts_type.contains(" | ") || ts_type.contains(" & ") {
        format!("({ts_type})")
    } else {
        ts_type
    }
}

fn build_typescript_operation(
    op: &Operation,
    plan: &ModelPlan<'_>,
    taken_methods: &mut HashSet<String>,
) -> Result<TypeScriptOperation, GenerationError> {
    let method_name = unique_identifier(
        &typescript_identifier(&to_camel_case(&op.id), "op"),
        taken_methods,
    );

    // `params` holds everything that is not a path placeholder
    let mut taken_params: HashSet<String> = ["params".to_string()].into_iter().collect();
    let mut positional = Vec::new();
    let mut option_fields = Vec::new();
    let mut any_required_option = false;
    let mut query = Vec::new();
    let mut headers = Vec::new();
    let mut cookies = Vec::new();
    let mut path_names = Vec::new();

    for parameter in &op.parameters {
        let ts_type = typescript_type(&parameter.schema, plan, "models.");
        if parameter.location == ParameterLocation::Path {
            let ident = unique_identifier(
                &typescript_identifier(&to_camel_case(&parameter.name), "param"),
                &mut taken_params,
            );
            positional.push(format!("{ident}: {ts_type}"));
            path_names.push((parameter.name.as_str(), ident));
            continue;
        }

        let key = string_literal(&parameter.name);
        let entry = format!("{key}: params[{key}]");
        match parameter.location {
            ParameterLocation::Header => headers.push(entry),
            ParameterLocation::Cookie => cookies.push(entry),
            _ => query.push(entry),
        }
        any_required_option |= parameter.required;
        option_fields.push(format!(
            "{key}{}: {ts_type}",
            if parameter.required { "" } else { "?" }
        ));
    }

    let body = match &op.request_body {
        Some(request_body) => {
            let ts_type = request_body
                .schema
                .as_ref()
                .map(|schema| typescript_type(schema, plan, "models."))
                .unwrap_or_else(|| "unknown".to_string());
            any_required_option |= request_body.required;
            option_fields.push(format!(
                "body{}: {ts_type}",
                if request_body.required { "" } else { "?" }
            ));
            "params.body"
        }
        None => "undefined",
    };

    let mut signature = positional;
    if !option_fields.is_empty() {
        signature.push(format!(
            "params: {{ {} }}{}",
            option_fields.join("; "),
            if any_required_option { "" } else { " = {}" }
        ));
    }

    let comment = op
        .summary
        .as_deref()
        .or(op.description.as_deref())
        .map(sanitize_block_comment)
        .unwrap_or_else(|| {
            format!("{} {}", op.method.as_str().to_uppercase(), sanitize_block_comment(&op.path))
        });

    Ok(TypeScriptOperation {
        method_name,
        http_method: op.method.as_str().to_uppercase(),
        signature: signature.join(", "),
        return_type: op
            .success_schema()
            .map(|schema| typescript_type(schema, plan, "models."))
            .unwrap_or_else(|| "void".to_string()),
        comment,
        path_expression: path_expression(op, &path_names)?,
        query: object_literal(&query),
        headers: object_literal(&headers),
        cookies: object_literal(&cookies),
        body: body.to_string(),
        deprecated: op.deprecated,
    })
}

/// Template literal building the request path with each placeholder encoded
fn path_expression(
    op: &Operation,
    path_names: &[(&str, String)],
) -> Result<String, GenerationError> {
    let mut expression = String::from("`");
    for segment in path_segments(&op.path) {
        match segment {
            PathSegment::Literal(text) => expression.push_str(
                &text
                    .replace('\\', "\\\\")
                    .replace('`', "\\`")
                    .replace("${", "\\${"),
            ),
            PathSegment::Placeholder(name) => {
                let ident = path_names
                    .iter()
                    .find(|(wire, _)| *wire == name)
                    .map(|(_, ident)| ident)
                    .ok_or_else(|| {
                        GenerationError::unsupported(
                            LanguageId::new("typescript"),
                            format!("{} {}", op.method, op.path),
                            format!("path placeholder `{name}` has no path parameter"),
                        )
                    })?;
                expression.push_str(&format!("${{encodeURIComponent(String({ident}))}}"));
            }
        }
    }
    expression.push('`');
    Ok(expression)
}

fn object_literal(entries: &[String]) -> String {
    if entries.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", entries.join(", "))
    }
}

fn string_literal(value: &str) -> String {
    JsonValue::String(value.to_string()).to_string()
}

/// Bare key when it is an identifier, quoted otherwise
fn property_key(key: &str) -> String {
    let mut chars = key.chars();
    let is_identifier = chars
        .next()
        .is_some_and(|c| c == '_' || c == '$' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c == '$' || c.is_ascii_alphanumeric());
    if is_identifier {
        key.to_string()
    } else {
        string_literal(key)
    }
}

/// Make `candidate` a usable TypeScript binding name
fn typescript_identifier(candidate: &str, digit_prefix: &str) -> String {
    let mut ident: String = candidate
        .chars()
        .filter(|c| *c == '_' || *c == '$' || c.is_ascii_alphanumeric())
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident = format!("{digit_prefix}{ident}");
    }
    if RESERVED_WORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk_config::ConfigBuilder;
    use crate::spec::validate;

    const PETSTORE: &str = r##"{
  "openapi": "3.0.3",
  "info": { "title": "Petstore", "version": "1.0.0" },
  "servers": [{ "url": "https://petstore.example.com/v1" }],
  "paths": {
    "/pets": {
      "get": {
        "operationId": "listPets",
        "parameters": [
          { "name": "limit", "in": "query", "schema": { "type": "integer" } },
          { "name": "status", "in": "query", "schema": { "$ref": "#/components/schemas/Status" } }
        ],
        "responses": {
          "200": {
            "description": "ok",
            "content": {
              "application/json": {
                "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Pet" } }
              }
            }
          }
        }
      }
    },
    "/pets/{pet-id}": {
      "delete": {
        "operationId": "delete",
        "parameters": [
          { "name": "pet-id", "in": "path", "required": true, "schema": { "type": "string" } }
        ],
        "requestBody": {
          "required": true,
          "content": {
            "application/json": {
              "schema": { "type": "object", "properties": { "reason": { "type": "string" } } }
            }
          }
        },
        "responses": { "204": { "description": "gone" } }
      }
    }
  },
  "components": {
    "schemas": {
      "Pet": {
        "type": "object",
        "required": ["id"],
        "properties": {
          "id": { "type": "integer" },
          "nick-name": { "type": "string", "nullable": true },
          "labels": { "type": "object", "additionalProperties": { "type": "string" } }
        }
      },
      "Status": { "type": "string", "enum": ["available", "sold"] },
      "Cat": {
        "allOf": [
          { "$ref": "#/components/schemas/Pet" },
          { "type": "object", "properties": { "lives": { "type": "integer" } } }
        ]
      }
    }
  }
}"##;

    async fn generate(document: &str) -> Result<GeneratedProject, GenerationError> {
        let spec = validate(document, Some("petstore.json")).unwrap();
        let config = ConfigBuilder::default()
            .build("Acme", &spec, &[LanguageId::new("typescript")])
            .unwrap();
        let settings = config.settings_for(&LanguageId::new("typescript")).unwrap();
        TypeScriptGenerator::new().generate(&spec, settings).await
    }

    #[tokio::test]
    async fn test_generates_project_layout() {
        let project = generate(PETSTORE).await.unwrap();

        assert_eq!(project.manifest.name, "acme-sdk");
        for path in [
            "package.json",
            "tsconfig.json",
            "README.md",
            "src/index.ts",
            "src/client.ts",
            "src/models.ts",
        ] {
            assert!(project.artifact(path).is_some(), "missing {path}");
        }

        let package: JsonValue =
            serde_json::from_str(&project.artifact("package.json").unwrap().content).unwrap();
        assert_eq!(package["name"], "acme-sdk");
        assert_eq!(package["version"], "1.0.0");
    }

    #[tokio::test]
    async fn test_models() {
        let project = generate(PETSTORE).await.unwrap();
        let models = &project.artifact("src/models.ts").unwrap().content;

        assert!(models.contains("export interface Pet {"));
        assert!(models.contains("  id: number;"));
        assert!(models.contains("  \"nick-name\"?: string | null;"));
        assert!(models.contains("  labels?: Record<string, string>;"));
        assert!(models.contains("export type Status = \"available\" | \"sold\";"));
        assert!(models.contains("export type Cat = Pet & { lives?: number };"));
    }

    #[tokio::test]
    async fn test_client_methods() {
        let project = generate(PETSTORE).await.unwrap();
        let client = &project.artifact("src/client.ts").unwrap().content;

        assert!(client.contains("export class AcmeClient {"));
        assert!(client.contains(concat!(
            "async listPets(params: { \"limit\"?: number; \"status\"?: models.Status } = {}): ",
            "Promise<Array<models.Pet>> {"
        )));
        assert!(client.contains(
            "async delete_(petId: string, params: { body: { reason?: string } }): Promise<void> {"
        ));
        assert!(client.contains("`/pets/${encodeURIComponent(String(petId))}`"));
    }

    #[tokio::test]
    async fn test_not_schema_is_unsupported() {
        let spec = PETSTORE.replace(
            "\"Status\": { \"type\": \"string\", \"enum\": [\"available\", \"sold\"] }",
            "\"Status\": { \"not\": { \"type\": \"integer\" } }",
        );
        let error = generate(&spec).await.unwrap_err();
        assert_eq!(error.language.as_str(), "typescript");
        match error.cause {
            GenerationCause::UnsupportedConstruct { location, .. } => {
                assert_eq!(location, "#/components/schemas/Status");
            }
            other => panic!("unexpected cause: {other:?}"),
        }
    }

    #[test]
    fn test_property_key_and_identifiers() {
        assert_eq!(property_key("id"), "id");
        assert_eq!(property_key("nick-name"), "\"nick-name\"");
        assert_eq!(typescript_identifier("delete", "op"), "delete_");
        assert_eq!(typescript_identifier("2fa", "param"), "param2fa");
    }
}
