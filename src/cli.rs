use clap::{Parser, Subcommand};
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a subtitle file
    Translate {
        /// Subtitle file: absolute, network share (\\server\Media\...) or relative path
        path: String,

        /// Target language code (en, es, ja, fr, de, ...)
        #[arg(short, long)]
        lang: String,

        /// Model to use (defaults to endpoint.default_model)
        #[arg(short, long)]
        model: Option<String>,

        /// Background on the show or film: character names, tone, terminology
        #[arg(long)]
        context: Option<String>,

        /// Test mode: only translate the first N entries
        #[arg(short, long, value_name = "N")]
        test: Option<NonZeroUsize>,
    },

    /// List models available on the inference endpoint
    Models,

    /// Write the default configuration to a file
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "subtranslate.toml")]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_arguments() {
        let args = Args::parse_from([
            "subtranslate", "translate", "show.en.srt", "--lang", "ja", "--test", "5", "--context", "Space opera", "-v",
        ]);

        assert!(args.verbose);
        match args.command {
            Commands::Translate { path, lang, model, context, test } => {
                assert_eq!(path, "show.en.srt");
                assert_eq!(lang, "ja");
                assert_eq!(model, None);
                assert_eq!(context.as_deref(), Some("Space opera"));
                assert_eq!(test, NonZeroUsize::new(5));
            }
            _ => panic!("expected translate command"),
        }
    }

    #[test]
    fn test_rejects_zero_entry_limit() {
        let result = Args::try_parse_from(["subtranslate", "translate", "a.srt", "--lang", "es", "--test", "0"]);
        assert!(result.is_err());
    }
}
