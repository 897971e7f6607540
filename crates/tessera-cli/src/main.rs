use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "tessera", version, about = "Tessera token service")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP token service with a freshly generated key pair.
    Serve {
        /// Path to the configuration file (defaults to tessera.toml)
        #[arg(long, env = "TESSERA_CONFIG")]
        config: Option<PathBuf>,

        /// Override the bind address, e.g. 127.0.0.1:8080
        #[arg(long)]
        bind: Option<String>,
    },

    /// Token utilities
    Token {
        #[command(subcommand)]
        cmd: TokenCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Print a token's claims and footer without verifying it.
    Inspect {
        /// Token string or path to a file containing one
        token: String,
    },

    /// Verify a token offline with the issuer's public key.
    Verify {
        /// Public key as hex, PASERK (k4.public.…), or a file containing either
        #[arg(long = "public-key", env = "TESSERA_PUBLIC_KEY")]
        public_key: Option<String>,

        /// Expected issuer
        #[arg(long)]
        issuer: Option<String>,

        /// Expected audience
        #[arg(long)]
        audience: Option<String>,

        /// Token string or path to a file containing one
        token: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve { config, bind } => commands::serve::run(config, bind).await,
        Command::Token { cmd } => match cmd {
            TokenCommand::Inspect { token } => commands::token::inspect(token),
            TokenCommand::Verify {
                public_key,
                issuer,
                audience,
                token,
            } => commands::token::verify(public_key, issuer, audience, token),
        },
    }
}
