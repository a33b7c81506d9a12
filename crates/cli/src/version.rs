//! Build information.
//!
//! Release builds set `OLLAMA_MCP_COMMIT` and `OLLAMA_MCP_BUILD_DATE` at
//! compile time.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMMIT: &str = match option_env!("OLLAMA_MCP_COMMIT") {
    Some(commit) => commit,
    None => "none",
};
pub const DATE: &str = match option_env!("OLLAMA_MCP_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};

/// Full version line, e.g. `ollama-mcp 0.1.0 (abc123) built on 2025-01-01 for linux/x86_64`.
pub fn long() -> String {
    format_version(VERSION, COMMIT, DATE)
}

/// Just the version number.
pub fn short() -> &'static str {
    VERSION
}

fn format_version(version: &str, commit: &str, date: &str) -> String {
    format!(
        "ollama-mcp {version} ({commit}) built on {date} for {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_version_format() {
        let line = format_version("1.2.3", "abc123", "2025-01-01");
        let expected = format!(
            "ollama-mcp 1.2.3 (abc123) built on 2025-01-01 for {}/{}",
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        assert_eq!(line, expected);
    }

    #[test]
    fn long_starts_with_package_version() {
        assert!(long().starts_with(&format!("ollama-mcp {VERSION} (")));
        assert_eq!(short(), VERSION);
    }
}
