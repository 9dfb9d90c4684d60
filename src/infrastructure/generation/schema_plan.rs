//! Component-schema bookkeeping shared by the language generators
//!
//! Assigns every component schema a unique type name and orders schemas so
//! that `allOf` bases come before the schemas that extend them.

use std::collections::{BTreeMap, HashSet};

use crate::generation::utils::{to_proper_case, unique_identifier};
use crate::generation::{GenerationError, LanguageId};
use crate::spec::{Schema, ValidatedSpec};

/// Type names and emission order for a spec's component schemas
#[derive(Debug)]
pub struct ModelPlan<'a> {
    names: BTreeMap<&'a str, String>,
    order: Vec<&'a str>,
}

impl<'a> ModelPlan<'a> {
    /// Plan the models of `spec`, never handing out a name in `reserved`
    pub fn new(
        language: &LanguageId,
        spec: &'a ValidatedSpec,
        reserved: &[&str],
    ) -> Result<Self, GenerationError> {
        let mut taken: HashSet<String> = reserved.iter().map(|name| name.to_string()).collect();
        let names = spec
            .schemas
            .keys()
            .map(|name| {
                let mut type_name = to_proper_case(name);
                if !type_name.starts_with(|c: char| c.is_ascii_alphabetic()) {
                    type_name = format!("Model{type_name}");
                }
                (name.as_str(), unique_identifier(&type_name, &mut taken))
            })
            .collect();

        let mut order = Vec::with_capacity(spec.schemas.len());
        let mut visiting = HashSet::new();
        let mut done = HashSet::new();
        for name in spec.schemas.keys() {
            visit(language, spec, name, &mut visiting, &mut done, &mut order)?;
        }

        Ok(Self { names, order })
    }

    /// Type name assigned to a component schema
    pub fn type_name(&self, schema_name: &str) -> Option<&str> {
        self.names.get(schema_name).map(String::as_str)
    }

    /// Component schema names, bases first
    pub fn order(&self) -> &[&'a str] {
        &self.order
    }
}

fn visit<'a>(
    language: &LanguageId,
    spec: &'a ValidatedSpec,
    name: &'a str,
    visiting: &mut HashSet<&'a str>,
    done: &mut HashSet<&'a str>,
    order: &mut Vec<&'a str>,
) -> Result<(), GenerationError> {
    if done.contains(name) {
        return Ok(());
    }
    if !visiting.insert(name) {
        return Err(GenerationError::unsupported(
            language.clone(),
            format!("#/components/schemas/{name}"),
            "allOf inheritance cycle",
        ));
    }

    if let Some(schema) = spec.schemas.get(name) {
        for base in schema.all_of.iter().filter_map(Schema::ref_name) {
            if let Some((base_name, _)) = spec.schemas.get_key_value(base) {
                visit(language, spec, base_name, visiting, done, order)?;
            }
        }
    }

    visiting.remove(name);
    done.insert(name);
    order.push(name);
    Ok(())
}

/// Whether a schema becomes a named record type (class / interface)
pub fn is_record(schema: &Schema) -> bool {
    schema.reference.is_none()
        && schema.enum_values.is_empty()
        && matches!(schema.primary_type(), None | Some("object"))
        && (!schema.properties.is_empty() || !schema.all_of.is_empty())
}

/// Every schema in the spec with a location label: component schemas first,
/// then each operation's parameters, bodies and responses
pub fn all_schemas(spec: &ValidatedSpec) -> Vec<(String, &Schema)> {
    let mut schemas: Vec<(String, &Schema)> = spec
        .schemas
        .iter()
        .map(|(name, schema)| (format!("#/components/schemas/{name}"), schema))
        .collect();
    for operation in &spec.operations {
        schemas.extend(operation.schemas());
    }
    schemas
}

/// Split an OpenAPI path template into literal text and placeholder names
pub fn path_segments(path: &str) -> Vec<PathSegment<'_>> {
    let mut segments = Vec::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|offset| open + offset) else {
            break;
        };
        if open > 0 {
            segments.push(PathSegment::Literal(&rest[..open]));
        }
        segments.push(PathSegment::Placeholder(&rest[open + 1..close]));
        rest = &rest[close + 1..];
    }
    if !rest.is_empty() {
        segments.push(PathSegment::Literal(rest));
    }
    segments
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::validate;

    const SPEC: &str = r##"
openapi: 3.0.0
info: { title: Zoo, version: "1" }
paths:
  /animals/{animalId}/toys/{toy-id}:
    get:
      responses: { "200": { description: ok } }
components:
  schemas:
    dog:
      allOf:
        - $ref: "#/components/schemas/pet"
        - type: object
          properties:
            bark: { type: boolean }
    pet:
      type: object
      properties:
        name: { type: string }
    List:
      type: array
      items: { type: string }
    2fa:
      type: string
"##;

    #[test]
    fn test_plan_names_and_order() {
        let spec = validate(SPEC, None).unwrap();
        let plan = ModelPlan::new(&LanguageId::new("python"), &spec, &["List"]).unwrap();

        assert_eq!(plan.type_name("pet"), Some("Pet"));
        assert_eq!(plan.type_name("List"), Some("List_2"));
        assert_eq!(plan.type_name("2fa"), Some("Model2fa"));

        let order = plan.order();
        let pet = order.iter().position(|n| *n == "pet").unwrap();
        let dog = order.iter().position(|n| *n == "dog").unwrap();
        assert!(pet < dog);
    }

    #[test]
    fn test_inheritance_cycle_is_unsupported() {
        let cyclic = r##"
openapi: 3.0.0
info: { title: Loop, version: "1" }
paths: { /a: { get: { responses: {} } } }
components:
  schemas:
    A: { allOf: [ { $ref: "#/components/schemas/B" } ] }
    B: { allOf: [ { $ref: "#/components/schemas/A" } ] }
"##;
        let spec = validate(cyclic, None).unwrap();
        let error = ModelPlan::new(&LanguageId::new("typescript"), &spec, &[]).unwrap_err();
        assert!(error.to_string().contains("allOf inheritance cycle"));
    }

    #[test]
    fn test_is_record() {
        let spec = validate(SPEC, None).unwrap();
        assert!(is_record(&spec.schemas["pet"]));
        assert!(is_record(&spec.schemas["dog"]));
        assert!(!is_record(&spec.schemas["List"]));
        assert!(!is_record(&spec.schemas["2fa"]));
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(
            path_segments("/animals/{animalId}/toys/{toy-id}"),
            vec![
                PathSegment::Literal("/animals/"),
                PathSegment::Placeholder("animalId"),
                PathSegment::Literal("/toys/"),
                PathSegment::Placeholder("toy-id"),
            ]
        );
        assert_eq!(path_segments("/"), vec![PathSegment::Literal("/")]);
    }
}
