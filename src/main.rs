mod host;
mod jsonc;
mod server;
mod snippet;
mod store;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use host::{ConsoleHost, Host};
use snippet::{Snippet, SnippetImporter};
use store::{OsFamily, PlatformContext};

const DEFAULT_EDITOR_NAME: &str = "Visual Studio Code";

#[derive(Parser)]
#[command(name = "snipport", about = "Add snippets to VS Code's per-language snippet files")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct PlatformArgs {
    /// Editor display name; "Code - Insiders" builds keep their own settings
    #[arg(long, default_value = DEFAULT_EDITOR_NAME)]
    editor_name: String,

    /// OS family whose layout to use (Darwin, Linux, Windows_NT); defaults to this one
    #[arg(long)]
    os: Option<String>,
}

impl PlatformArgs {
    fn os(&self) -> OsFamily {
        self.os
            .as_deref()
            .map_or_else(OsFamily::current, OsFamily::from_os_type)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Add a snippet to the snippet file of its language
    Add {
        /// Language id, e.g. python
        #[arg(short, long)]
        language: String,

        /// Snippet name; a unique id is appended if it is taken
        #[arg(short, long)]
        name: String,

        /// Trigger text (defaults to the name)
        #[arg(short, long, default_value = "")]
        prefix: String,

        /// Body line; repeat for multi-line snippets
        #[arg(short, long = "body", required = true)]
        body: Vec<String>,

        /// Description (defaults to "<name> description")
        #[arg(short, long, default_value = "")]
        description: String,

        #[command(flatten)]
        platform: PlatformArgs,
    },

    /// Print the snippet file used for a language
    Path {
        /// Language id, e.g. python
        #[arg(short, long)]
        language: String,

        #[command(flatten)]
        platform: PlatformArgs,
    },

    /// Serve JSON-RPC over stdio for an editor extension
    Serve {
        #[command(flatten)]
        platform: PlatformArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        None => {
            eprintln!("Usage: snipport add --language <id> --name <name> --body <line>...");
            eprintln!("       snipport path --language <id>");
            eprintln!("       snipport serve");
            std::process::exit(1);
        }

        Some(Commands::Add {
            language,
            name,
            prefix,
            body,
            description,
            platform,
        }) => {
            let host = ConsoleHost::new(platform.editor_name.clone());
            let ctx = PlatformContext::detect(platform.os(), host.current_editor_name())?;
            let importer = SnippetImporter::new(host, ctx);
            tracing::debug!("Snippet files under {}", importer.platform().user_dir());

            let snippet = Snippet {
                language,
                name,
                prefix,
                body: body.into(),
                description,
            };
            if importer.add_snippet(snippet).await.is_err() {
                std::process::exit(1);
            }
        }

        Some(Commands::Path { language, platform }) => {
            let ctx = PlatformContext::detect(platform.os(), &platform.editor_name)?;
            println!("{}", ctx.snippet_file(&language).display());
        }

        Some(Commands::Serve { platform }) => {
            let os = platform.os();
            server::stdio::run(
                platform.editor_name,
                Box::new(move |editor_name: &str| PlatformContext::detect(os, editor_name)),
            )
            .await?;
        }
    }

    Ok(())
}
