//! Input validation.
//!
//! Pure checks with no I/O. Each returns [`Error::InvalidInput`] carrying a
//! reason the caller can act on.

use crate::tools::ChatInput;
use crate::{Error, Result};

const FORBIDDEN_MODEL_CHARS: &[char] = &['<', '>', '|', '&', ';', '`', '$'];

/// Reject empty (or whitespace-only) message text.
pub fn validate_message(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        return Err(Error::invalid("message cannot be empty"));
    }
    Ok(())
}

/// Reject model identifiers that are empty or could be read as a path or
/// shell token.
pub fn validate_model_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid("model name cannot be empty"));
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(Error::invalid(format!("invalid model name: {name}")));
    }
    if name.contains(FORBIDDEN_MODEL_CHARS) {
        return Err(Error::invalid(format!(
            "model name contains invalid characters: {name}"
        )));
    }
    Ok(())
}

pub fn validate_context_size(context_size: Option<i64>) -> Result<()> {
    match context_size {
        Some(n) if n <= 0 => Err(Error::invalid("context size must be positive")),
        _ => Ok(()),
    }
}

pub fn validate_temperature(temperature: Option<f64>) -> Result<()> {
    match temperature {
        Some(t) if !(0.0..=2.0).contains(&t) => {
            Err(Error::invalid("temperature must be between 0 and 2.0"))
        }
        _ => Ok(()),
    }
}

pub fn validate_top_p(top_p: Option<f64>) -> Result<()> {
    match top_p {
        Some(p) if !(0.0..=1.0).contains(&p) => Err(Error::invalid("top_p must be between 0 and 1.0")),
        _ => Ok(()),
    }
}

pub fn validate_top_k(top_k: Option<i64>) -> Result<()> {
    match top_k {
        Some(k) if k < 0 => Err(Error::invalid("top_k must be non-negative")),
        _ => Ok(()),
    }
}

/// Check every caller-supplied field of a chat input.
///
/// The model name is checked separately, after default resolution.
pub fn validate_chat_input(input: &ChatInput) -> Result<()> {
    validate_message(&input.message)?;
    validate_context_size(input.context_size)?;
    validate_temperature(input.temperature)?;
    validate_top_p(input.top_p)?;
    validate_top_k(input.top_k)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(result: Result<()>) -> String {
        match result {
            Err(Error::InvalidInput(reason)) => reason,
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn empty_messages_are_rejected() {
        assert_eq!(reason(validate_message("")), "message cannot be empty");
        assert_eq!(reason(validate_message("  \n\t")), "message cannot be empty");
        assert!(validate_message("Hello").is_ok());
    }

    #[test]
    fn unsafe_model_names_are_rejected() {
        for name in [
            "../etc/passwd",
            "a..b",
            "library/llama3",
            "models\\llama",
            "llama<3",
            "llama>3",
            "llama|3",
            "llama&3",
            "llama;rm",
            "llama`id`",
            "llama$HOME",
        ] {
            assert!(validate_model_name(name).is_err(), "{name}");
        }
        assert_eq!(reason(validate_model_name("")), "model name cannot be empty");
        assert_eq!(reason(validate_model_name("a/b")), "invalid model name: a/b");
        assert_eq!(
            reason(validate_model_name("a;b")),
            "model name contains invalid characters: a;b"
        );
    }

    #[test]
    fn ordinary_model_names_pass() {
        for name in ["llama3", "llama3.2:3b", "qwen3-coder:30b", "gpt-oss:20b", "my_model-v1.0"] {
            assert!(validate_model_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn numeric_ranges() {
        assert!(validate_context_size(None).is_ok());
        assert!(validate_context_size(Some(1)).is_ok());
        assert!(validate_context_size(Some(0)).is_err());
        assert!(validate_context_size(Some(-1)).is_err());

        for t in [0.0, 1.0, 2.0] {
            assert!(validate_temperature(Some(t)).is_ok(), "{t}");
        }
        for t in [-0.1, 2.5, f64::NAN] {
            assert!(validate_temperature(Some(t)).is_err(), "{t}");
        }

        for p in [0.0, 0.5, 1.0] {
            assert!(validate_top_p(Some(p)).is_ok(), "{p}");
        }
        for p in [-0.01, 1.01] {
            assert!(validate_top_p(Some(p)).is_err(), "{p}");
        }

        assert!(validate_top_k(Some(0)).is_ok());
        assert!(validate_top_k(Some(40)).is_ok());
        assert!(validate_top_k(Some(-1)).is_err());
    }

    #[test]
    fn chat_input_checks_every_field() {
        let valid = ChatInput {
            message: "x".into(),
            ..ChatInput::default()
        };
        assert!(validate_chat_input(&valid).is_ok());

        let too_hot = ChatInput {
            temperature: Some(2.5),
            ..valid.clone()
        };
        assert_eq!(
            reason(validate_chat_input(&too_hot)),
            "temperature must be between 0 and 2.0"
        );

        let negative_k = ChatInput {
            top_k: Some(-3),
            ..valid
        };
        assert_eq!(reason(validate_chat_input(&negative_k)), "top_k must be non-negative");
    }
}
