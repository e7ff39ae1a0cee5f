//! CLI argument parsing using clap.
//!
//! Defines the command-line interface for docflow-cli.

use clap::Parser;
use std::path::PathBuf;

/// docflow CLI - Draft, verify and export enforcement documents
#[derive(Parser, Debug, Clone)]
#[command(name = "docflow-cli")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Draft a document from this raw input and exit
    #[arg(short = 'e', long, conflicts_with = "file")]
    pub execute: Option<String>,

    /// Draft one document per input file and exit (separate inputs with a line of `---`)
    #[arg(short = 'f', long, conflicts_with = "execute")]
    pub file: Option<PathBuf>,

    /// Document type (e.g. "Rectification Notice")
    #[arg(short = 't', long)]
    pub document_type: Option<String>,

    /// Settings file (default: ~/.docflow/settings.toml)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Corpus directory (overrides settings)
    #[arg(long, env = "DOCFLOW_CORPUS_DIR")]
    pub corpus: Option<PathBuf>,

    /// Override model from settings
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// API key (overrides settings and env vars)
    #[arg(long, env = "DOCFLOW_API_KEY")]
    pub api_key: Option<String>,

    /// Approve sessions that pause for human review instead of stopping
    #[arg(long)]
    pub auto_approve: bool,

    /// Write the exported document to this path
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Output events as JSON lines (for scripting/parsing)
    #[arg(long)]
    pub json: bool,

    /// Only output the final document (suppress progress)
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Show verbose output (debug information)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Run the HTTP/SSE gateway instead of a one-shot draft
    #[cfg(feature = "server")]
    #[arg(long, conflicts_with_all = ["execute", "file"])]
    pub server: bool,

    /// Port for the HTTP gateway (overrides settings; 0 picks a free port)
    #[cfg(feature = "server")]
    #[arg(short = 'p', long)]
    pub port: Option<u16>,
}

impl Args {
    /// Log filter directive for the crate.
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "docflow=debug"
        } else {
            "docflow=info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_values() {
        let args = Args::parse_from(["docflow-cli"]);
        assert!(args.execute.is_none());
        assert!(!args.auto_approve);
        assert!(!args.json);
        assert!(!args.quiet);
        assert!(!args.verbose);
        assert_eq!(args.log_directive(), "docflow=info");
    }

    #[test]
    fn test_args_execute_flag() {
        let args = Args::parse_from(["docflow-cli", "-e", "Sand mining at the north bend"]);
        assert_eq!(args.execute, Some("Sand mining at the north bend".to_string()));
    }

    #[test]
    fn test_args_execute_conflicts_with_file() {
        let result = Args::try_parse_from(["docflow-cli", "-e", "x", "-f", "inputs.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_args_document_options() {
        let args = Args::parse_from([
            "docflow-cli",
            "-t",
            "Rectification Notice",
            "-o",
            "out.txt",
            "--auto-approve",
        ]);
        assert_eq!(args.document_type.as_deref(), Some("Rectification Notice"));
        assert_eq!(args.output, Some(PathBuf::from("out.txt")));
        assert!(args.auto_approve);
    }

    #[test]
    fn test_args_output_modes() {
        let args = Args::parse_from(["docflow-cli", "--json", "--quiet", "-v"]);
        assert!(args.json);
        assert!(args.quiet);
        assert_eq!(args.log_directive(), "docflow=debug");
    }

    #[cfg(feature = "server")]
    #[test]
    fn test_args_server_mode() {
        let args = Args::parse_from(["docflow-cli", "--server", "--port", "0"]);
        assert!(args.server);
        assert_eq!(args.port, Some(0));
    }
}
