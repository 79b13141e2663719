//! Argument parser and mode classification for the launcher
//!
//! Parsing happens in two stages:
//! 1. `parse_args` turns the raw argument list into `LaunchOptions`
//! 2. `classify` derives the operating `Mode` from those options
//!
//! Recognized options (all of them are still forwarded verbatim to the server):
//! --http                 Serve over Streamable HTTP / SSE (diagnostic output enabled)
//! --sse                  Alias for --http
//! --host <host>          Host to bind to
//! --port <port>          Port to listen on
//! --help, -h             Show usage and exit without provisioning

/// Options recognized in the launcher's argument list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// `--help` or `-h` was given
    pub help: bool,
    /// `--http` was given
    pub http: bool,
    /// `--sse` was given
    pub sse: bool,
    /// Value of `--host`
    pub host: Option<String>,
    /// Value of `--port`
    pub port: Option<String>,
    /// Arguments handed to the server, unchanged and in order
    pub forwarded: Vec<String>,
}

impl LaunchOptions {
    /// Whether a network transport was requested
    pub fn uses_server_transport(&self) -> bool {
        self.http || self.sse
    }
}

/// Operating mode of a single invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// stdio protocol mode; the launcher must stay silent
    Transparent,
    /// Network-served mode; progress output is safe
    Diagnostic,
    /// Print usage and stop
    Help,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Transparent => "transparent",
            Mode::Diagnostic => "diagnostic",
            Mode::Help => "help",
        }
    }

    /// Whether non-fatal console output is allowed in this mode
    pub fn allows_diagnostics(&self) -> bool {
        !matches!(self, Mode::Transparent)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse the raw argument list (without the program name)
pub fn parse_args(args: &[String]) -> LaunchOptions {
    let mut options = LaunchOptions {
        forwarded: args.to_vec(),
        ..LaunchOptions::default()
    };

    let mut i = 0;
    while i < args.len() {
        i += parse_option(args, i, &mut options);
    }

    options
}

/// Record a single option; returns the number of arguments consumed (at least 1)
fn parse_option(args: &[String], index: usize, options: &mut LaunchOptions) -> usize {
    let arg = args[index].as_str();

    match arg {
        "--help" | "-h" => {
            options.help = true;
            1
        }
        "--http" => {
            options.http = true;
            1
        }
        "--sse" => {
            options.sse = true;
            1
        }
        "--host" | "--port" => {
            // A missing value is the server's problem to report
            let value = args.get(index + 1).filter(|v| !v.starts_with('-')).cloned();
            let consumed = if value.is_some() { 2 } else { 1 };
            if arg == "--host" {
                options.host = value;
            } else {
                options.port = value;
            }
            consumed
        }
        _ => {
            if let Some(value) = arg.strip_prefix("--host=") {
                options.host = Some(value.to_string());
            } else if let Some(value) = arg.strip_prefix("--port=") {
                options.port = Some(value.to_string());
            }
            1
        }
    }
}

/// Derive the operating mode from parsed options
pub fn classify(options: &LaunchOptions) -> Mode {
    if options.help {
        Mode::Help
    } else if options.uses_server_transport() {
        Mode::Diagnostic
    } else {
        Mode::Transparent
    }
}

/// Convenience: parse and classify in one call
pub fn classify_args(args: &[String]) -> Mode {
    classify(&parse_args(args))
}
