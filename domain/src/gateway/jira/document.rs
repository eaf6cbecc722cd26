//! Atlassian Document Format encoding and Jira error bodies.

use serde_json::{json, Value};

use crate::integration::TaskDescription;

/// Wraps plain text in a single-paragraph ADF document; documents pass through.
pub(crate) fn to_adf(description: &TaskDescription) -> Value {
    match description {
        TaskDescription::Text(text) => json!({
            "type": "doc",
            "version": 1,
            "content": [
                {
                    "type": "paragraph",
                    "content": [{ "type": "text", "text": text }]
                }
            ]
        }),
        TaskDescription::Document(document) => Value::Object(document.clone()),
    }
}

/// Extracts a readable message from a Jira error body.
///
/// `errorMessages` wins over `errors`; a body with neither is returned as-is.
pub(crate) fn error_message(body: &str) -> String {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    if let Some(Value::Array(messages)) = map.get("errorMessages") {
        let messages: Vec<String> = messages
            .iter()
            .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
            .filter(|m| !m.is_empty())
            .collect();
        if !messages.is_empty() {
            return messages.join("; ");
        }
    }

    if let Some(Value::Object(errors)) = map.get("errors") {
        if !errors.is_empty() {
            return errors
                .iter()
                .map(|(field, message)| match message.as_str() {
                    Some(message) => format!("{field}: {message}"),
                    None => format!("{field}: {message}"),
                })
                .collect::<Vec<_>>()
                .join("; ");
        }
    }

    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_becomes_single_paragraph() {
        let adf = to_adf(&TaskDescription::Text("Check the logs".to_string()));
        assert_eq!(adf["type"], "doc");
        assert_eq!(adf["version"], 1);
        assert_eq!(adf["content"][0]["type"], "paragraph");
        assert_eq!(adf["content"][0]["content"][0]["text"], "Check the logs");
    }

    #[test]
    fn test_documents_pass_through_unchanged() {
        let document = json!({
            "type": "doc",
            "version": 1,
            "content": [{ "type": "bulletList", "content": [] }]
        });
        let description = TaskDescription::Document(document.as_object().cloned().unwrap());
        assert_eq!(to_adf(&description), document);
    }

    #[test]
    fn test_error_messages_are_joined() {
        let body = r#"{"errorMessages":["Project is archived","No permission"],"errors":{"summary":"ignored"}}"#;
        assert_eq!(error_message(body), "Project is archived; No permission");
    }

    #[test]
    fn test_field_errors_are_used_when_messages_are_empty() {
        let body = r#"{"errorMessages":[],"errors":{"duedate":"Invalid date","priority":"Unknown priority"}}"#;
        assert_eq!(
            error_message(body),
            "duedate: Invalid date; priority: Unknown priority"
        );
    }

    #[test]
    fn test_shapeless_bodies_are_returned_raw() {
        assert_eq!(error_message("<html>Bad gateway</html>"), "<html>Bad gateway</html>");
        assert_eq!(error_message(r#"{"message":"nope"}"#), r#"{"message":"nope"}"#);
    }
}
