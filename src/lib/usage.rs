//! Usage text

/// Usage block printed for `--help` / `-h`
pub const USAGE: &str = r#"MarkItDown MCP launcher

Usage: markitdown-mcp-launcher [options]

Options:
  --http           Run with Streamable HTTP and SSE transport (default: STDIO)
  --sse            Alias for --http (deprecated)
  --host HOST      Host to bind to (default: 127.0.0.1)
  --port PORT      Port to listen on (default: 3001)
  --help, -h       Show this help message

Environment:
  MARKITDOWN_MCP_PYTHON     Comma separated interpreter commands to try
  MARKITDOWN_MCP_CACHE_DIR  Directory holding the reusable environment
  MARKITDOWN_MCP_PACKAGE    pip requirement to install (default: markitdown-mcp)
  MARKITDOWN_MCP_DEBUG      Set to 1 for debug output in --http mode

Examples:
  markitdown-mcp-launcher                                     # STDIO mode
  markitdown-mcp-launcher --http                              # HTTP mode
  markitdown-mcp-launcher --http --host 0.0.0.0 --port 8080   # Custom host/port"#;

/// Print usage information
pub fn print_usage() {
    println!("{}", USAGE);
}
