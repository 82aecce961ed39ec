use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Data directory. Defaults to $MEMO_BASE_PATH or ~/.local/share/memo
    #[clap(long, global = true)]
    pub base_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the memory tools over MCP (JSON-RPC on stdin/stdout)
    Mcp {
        /// Also start the web dashboard
        #[clap(long, default_value = "false")]
        web: bool,
    },

    /// Serve the web dashboard
    Web {
        /// Listen address, overrides web.listen from config
        #[clap(short, long)]
        listen: Option<String>,
    },

    /// Add a memory
    Add {
        content: String,

        /// Comma separated tags
        #[clap(short, long)]
        tags: Option<String>,

        /// Mark as favorite
        #[clap(short, long, default_value = "false")]
        favorite: bool,

        /// Extra property, repeatable
        #[clap(short, long = "prop", value_name = "KEY=VALUE", value_parser = parse_property)]
        props: Vec<(String, String)>,
    },

    /// Search memories by similarity
    Search {
        query: String,

        /// Maximum number of results
        #[clap(short, long)]
        limit: Option<usize>,

        /// Minimum similarity [0.0, 1.0]
        #[clap(long)]
        threshold: Option<f32>,
    },

    /// List every memory
    List {},

    /// Show one memory
    Get { id: String },

    /// Mark a memory as favorite
    Favorite {
        id: String,

        /// Remove the favorite mark instead
        #[clap(long, default_value = "false")]
        off: bool,
    },

    /// Delete a memory
    Delete {
        id: String,

        /// Auto confirm
        #[clap(short, long, default_value = "false")]
        yes: bool,
    },

    /// Print the embedding of a text
    Embed { text: String },
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got \"{raw}\"")),
    }
}
