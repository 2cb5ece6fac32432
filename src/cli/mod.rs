use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "assistd")]
#[command(about = "Personal assistant backend: LLM proxy, RAG answers and accounts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Overrides the configured bind host
        #[arg(long)]
        host: Option<String>,
        /// Overrides the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Answer a question from retrieved documents
    Ask {
        prompt: String,
        #[arg(short, long)]
        json: bool,
    },
    /// Send a prompt straight to the model
    Generate { prompt: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::try_parse_from(["assistd", "serve", "--host", "0.0.0.0", "-p", "8080"]).unwrap();
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(8080));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn parses_ask_with_json_flag() {
        let cli = Cli::try_parse_from(["assistd", "ask", "what's next?", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Ask { json: true, .. }));
    }
}
