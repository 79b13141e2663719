//! Optional system tools used by the server for extended media handling
//!
//! Their absence only degrades a few conversions, so it is reported as a
//! warning, and only when diagnostic output is allowed.

use std::process::{Command, Stdio};

/// An optional external tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalTool {
    pub name: &'static str,
    pub feature: &'static str,
    pub install_url: &'static str,
}

/// Tools checked after provisioning
pub const OPTIONAL_TOOLS: [OptionalTool; 2] = [
    OptionalTool {
        name: "ffmpeg",
        feature: "audio file processing",
        install_url: "https://ffmpeg.org/download.html",
    },
    OptionalTool {
        name: "exiftool",
        feature: "advanced image metadata",
        install_url: "https://exiftool.org/",
    },
];

/// Check if a command is available on the system
pub fn is_command_available(command: &str) -> bool {
    let check_cmd = if cfg!(windows) { "where" } else { "which" };
    Command::new(check_cmd)
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Tools from `tools` that are not on the PATH
pub fn missing_tools(tools: &[OptionalTool]) -> Vec<OptionalTool> {
    tools
        .iter()
        .copied()
        .filter(|tool| !is_command_available(tool.name))
        .collect()
}

/// Log availability of the optional tools
pub fn report_optional_tools() {
    let missing = missing_tools(&OPTIONAL_TOOLS);

    for tool in OPTIONAL_TOOLS.iter().filter(|t| !missing.contains(t)) {
        tracing::info!("{} found - {} available", tool.name, tool.feature);
    }
    if missing.is_empty() {
        return;
    }

    for tool in &missing {
        tracing::warn!(
            "{} not found - {} will be limited (install: {})",
            tool.name,
            tool.feature,
            tool.install_url
        );
    }
    tracing::warn!(
        "These are optional: PDF, Word, Excel and image conversion work without them"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_command_available() {
        assert!(!is_command_available("definitely-not-a-real-tool-xyz"));
    }

    #[test]
    fn test_missing_tools_reports_absent_tool() {
        let fake = OptionalTool {
            name: "definitely-not-a-real-tool-xyz",
            feature: "nothing",
            install_url: "https://example.invalid/",
        };
        assert_eq!(missing_tools(&[fake]), vec![fake]);
    }

    #[test]
    fn test_optional_tool_names() {
        let names: Vec<&str> = OPTIONAL_TOOLS.iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["ffmpeg", "exiftool"]);
    }
}
