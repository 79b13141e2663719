//! markitdown-mcp-launcher library
//!
//! Detects a Python interpreter, provisions a reusable virtual environment
//! with the MarkItDown MCP server, then runs the server with its standard
//! streams and termination signals relayed untouched.

pub mod args_parser;
pub mod config;
pub mod environment;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod optional_tools;
pub mod runtime_detector;
pub mod signal_handler;
pub mod supervisor;
pub mod usage;

// Re-export commonly used items
pub use args_parser::{classify, classify_args, parse_args, LaunchOptions, Mode};
pub use config::{venv_python, LaunchConfig};
pub use environment::{
    EnvironmentProvisioner, EnvironmentState, Installer, PipInstaller, ProvisionMarker,
    MARKER_FILE,
};
pub use error::{LaunchError, ProvisioningStep};
pub use launcher::prepare_environment;
pub use optional_tools::{is_command_available, OptionalTool, OPTIONAL_TOOLS};
pub use runtime_detector::{parse_python_version, probe, resolve, PythonVersion, RuntimeHandle};
pub use signal_handler::{ShutdownPhase, ShutdownState, SignalForwarding};
pub use supervisor::{supervise, ChildCommand, ChildOutcome, SIGNAL_FALLBACK_EXIT_CODE};
pub use usage::{print_usage, USAGE};
