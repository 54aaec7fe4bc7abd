//! Context-aware error suggestions.
//!
//! Complements the static suggestions in the `codes` module with hints that
//! name the offending value.

use serde_json::Value;

use super::codes::ErrorCode;

/// Generate a context-aware suggestion for an error.
pub fn suggest_for_error(code: ErrorCode, context: Option<&Value>) -> String {
    match code {
        ErrorCode::SecurityViolation => suggest_security_violation(context),
        ErrorCode::SourceNotFound => suggest_not_found(context),
        ErrorCode::SourceUnsupported => suggest_unsupported(context),
        _ => code.suggestion().to_string(),
    }
}

fn context_str<'a>(context: Option<&'a Value>, key: &str) -> Option<&'a str> {
    context.and_then(|c| c.get(key)).and_then(Value::as_str)
}

fn suggest_security_violation(context: Option<&Value>) -> String {
    let reason = context_str(context, "reason");
    let value = context_str(context, "value");

    match (reason, value) {
        (Some(reason), Some(value)) => format!(
            "'{value}' was rejected ({reason}). {}",
            ErrorCode::SecurityViolation.suggestion()
        ),
        _ => ErrorCode::SecurityViolation.suggestion().to_string(),
    }
}

fn suggest_not_found(context: Option<&Value>) -> String {
    context_str(context, "path").map_or_else(
        || ErrorCode::SourceNotFound.suggestion().to_string(),
        |path| format!("'{path}' does not exist. Check the spelling and that it is readable"),
    )
}

fn suggest_unsupported(context: Option<&Value>) -> String {
    let Some(source) = context_str(context, "source") else {
        return ErrorCode::SourceUnsupported.suggestion().to_string();
    };

    if source.starts_with("npm:") || source.starts_with("pypi:") {
        return format!(
            "Package registry references like '{source}' are not fetched. Download the package and pass its local path"
        );
    }

    format!(
        "'{source}' is not recognized. {}",
        ErrorCode::SourceUnsupported.suggestion()
    )
}
