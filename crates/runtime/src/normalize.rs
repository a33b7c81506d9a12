//! Shaping backend responses into tool outputs.

use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::backend::{ChatResponse, ListResponse, ModelSummary, ShowResponse};
use crate::tools::{ListModelsOutput, ModelDescriptor, ModelInfoOutput, PullModelOutput, PullStatus};

/// Wire form of a missing timestamp.
pub const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

/// Collects chat response content; the last non-empty chunk wins.
#[derive(Debug, Default)]
pub struct ResponseCollector {
    response: String,
}

impl ResponseCollector {
    pub fn push(&mut self, chunk: ChatResponse) {
        if !chunk.message.content.is_empty() {
            self.response = chunk.message.content;
        }
    }

    pub fn finish(self) -> String {
        self.response
    }
}

/// Format a backend timestamp as RFC 3339 with second precision.
pub fn format_time(time: Option<&DateTime<FixedOffset>>) -> String {
    match time {
        Some(time) => time.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => ZERO_TIME.to_string(),
    }
}

pub fn model_descriptor(model: ModelSummary) -> ModelDescriptor {
    ModelDescriptor {
        modified_at: format_time(model.modified_at.as_ref()),
        name: model.name,
        size: model.size,
        digest: model.digest,
    }
}

/// Backend order is preserved.
pub fn list_output(response: ListResponse) -> ListModelsOutput {
    ListModelsOutput {
        models: response.models.into_iter().map(model_descriptor).collect(),
    }
}

pub fn model_info_output(name: &str, response: ShowResponse) -> ModelInfoOutput {
    ModelInfoOutput {
        name: name.to_string(),
        license: response.license,
        modelfile: response.modelfile,
        parameters: response.parameters,
        template: response.template,
        system: response.system,
        modified_at: format_time(response.modified_at.as_ref()),
    }
}

pub fn pull_output(name: &str) -> PullModelOutput {
    PullModelOutput {
        status: PullStatus::Success,
        message: format!("Successfully pulled model {name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ResponseMessage;

    fn chunk(content: &str) -> ChatResponse {
        ChatResponse {
            message: ResponseMessage {
                role: "assistant".into(),
                content: content.into(),
            },
            ..ChatResponse::default()
        }
    }

    #[test]
    fn last_non_empty_chunk_wins() {
        let mut collector = ResponseCollector::default();
        collector.push(chunk("first"));
        collector.push(chunk("second"));
        collector.push(chunk(""));
        assert_eq!(collector.finish(), "second");

        assert_eq!(ResponseCollector::default().finish(), "");
    }

    #[test]
    fn timestamps_keep_their_offset() {
        let time = DateTime::parse_from_rfc3339("2024-05-01T10:20:30.123456789-07:00").unwrap();
        assert_eq!(format_time(Some(&time)), "2024-05-01T10:20:30-07:00");

        let utc = DateTime::parse_from_rfc3339("2024-05-01T10:20:30Z").unwrap();
        assert_eq!(format_time(Some(&utc)), "2024-05-01T10:20:30Z");

        assert_eq!(format_time(None), ZERO_TIME);
    }

    #[test]
    fn list_preserves_order() {
        let response = ListResponse {
            models: vec![
                ModelSummary {
                    name: "b".into(),
                    size: 2,
                    digest: "d2".into(),
                    modified_at: None,
                },
                ModelSummary {
                    name: "a".into(),
                    size: 1,
                    digest: "d1".into(),
                    modified_at: None,
                },
            ],
        };
        let output = list_output(response);
        let names: Vec<_> = output.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(output.models[0].size, 2);
        assert_eq!(output.models[0].digest, "d2");
        assert_eq!(output.models[0].modified_at, ZERO_TIME);
    }

    #[test]
    fn pull_message_names_the_model() {
        let output = pull_output("llama3");
        assert_eq!(output.status, PullStatus::Success);
        assert_eq!(output.message, "Successfully pulled model llama3");
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["status"], "success");
    }
}
