//! Spec validation entry point
//!
//! Canonicalizes the submitted text, detects its format, and hands the
//! deserialized document to the [`OpenApiParser`].

use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

use super::parser::OpenApiParser;
use crate::spec::{SpecError, SpecFingerprint, SpecFormat, ValidatedSpec};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Validate a raw specification document.
///
/// `format_hint` is a file extension (`.json`, `yaml`) or a filename
/// (`petstore.yml`). YAML is always tried first, so a document that parses
/// as both is reported as YAML; the hint only picks which parse error is
/// reported when neither format accepts the document.
pub fn validate(document: &str, format_hint: Option<&str>) -> Result<ValidatedSpec, SpecError> {
    let hint = parse_format_hint(format_hint)?;
    let canonical = canonicalize(document);
    if canonical.is_empty() {
        return Err(SpecError::parse("document is empty"));
    }

    let (format, value) = deserialize(&canonical, hint)?;
    if !value.is_object() {
        return Err(SpecError::parse("top-level value must be a mapping"));
    }

    let parsed = OpenApiParser::new(&value).parse()?;
    if parsed.operations.is_empty() {
        return Err(SpecError::semantic("document declares no operations"));
    }

    let fingerprint = fingerprint(&canonical);
    tracing::debug!(
        %format,
        fingerprint = fingerprint.short(),
        operations = parsed.operations.len(),
        "Spec validated"
    );
    Ok(parsed.into_spec(format, canonical, fingerprint))
}

/// BOM stripped, line endings normalized to `\n`, surrounding whitespace trimmed
pub fn canonicalize(document: &str) -> String {
    let without_bom = document.strip_prefix(BYTE_ORDER_MARK).unwrap_or(document);
    without_bom
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim()
        .to_string()
}

/// SHA-256 over canonical document bytes
pub fn fingerprint(canonical: &str) -> SpecFingerprint {
    let digest = Sha256::digest(canonical.as_bytes());
    SpecFingerprint::from_hex(hex::encode(digest))
}

fn parse_format_hint(hint: Option<&str>) -> Result<Option<SpecFormat>, SpecError> {
    let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) else {
        return Ok(None);
    };

    let extension = hint
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or(hint)
        .to_ascii_lowercase();

    match extension.as_str() {
        "json" => Ok(Some(SpecFormat::Json)),
        "yaml" | "yml" => Ok(Some(SpecFormat::Yaml)),
        _ => Err(SpecError::parse(format!(
            "unsupported file type `{hint}`; expected .json, .yaml or .yml"
        ))),
    }
}

fn deserialize(
    canonical: &str,
    hint: Option<SpecFormat>,
) -> Result<(SpecFormat, JsonValue), SpecError> {
    let mut errors = Vec::with_capacity(2);
    for format in [SpecFormat::Yaml, SpecFormat::Json] {
        match deserialize_as(canonical, format) {
            Ok(value) => return Ok((format, value)),
            Err(e) => {
                tracing::debug!(%format, error = %e, "Document did not parse");
                errors.push((format, e));
            }
        }
    }

    let preferred = hint.unwrap_or(SpecFormat::Yaml);
    let message = errors
        .iter()
        .find(|(format, _)| *format == preferred)
        .or(errors.first())
        .map(|(_, e)| e.clone())
        .unwrap_or_default();
    Err(SpecError::parse(message))
}

fn deserialize_as(canonical: &str, format: SpecFormat) -> Result<JsonValue, String> {
    match format {
        SpecFormat::Json => {
            serde_json::from_str(canonical).map_err(|e| format!("invalid JSON: {e}"))
        }
        SpecFormat::Yaml => {
            // Through serde_yaml::Value so non-string keys like `200:` become strings
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(canonical).map_err(|e| format!("invalid YAML: {e}"))?;
            serde_json::to_value(yaml).map_err(|e| format!("unsupported YAML content: {e}"))
        }
    }
}
