//! Command-line interface definitions for PR News Digest.
//!
//! Secrets and the config path can be provided through the environment
//! (a `.env` file is loaded first), everything else through flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the PR News Digest application.
///
/// # Examples
///
/// ```sh
/// # Crawl with the built-in seeds and write ./news.csv
/// pr_news_digest crawl
///
/// # Crawl with a config file and a custom output path
/// pr_news_digest --config news.yaml crawl -o data/news.csv
///
/// # Build the top-10 digest from the last crawl
/// pr_news_digest digest -i data/news.csv -r ops@example.com
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true, env = "NEWS_CONFIG")]
    pub config: Option<PathBuf>,

    /// API key for the OpenAI-compatible endpoint (overrides the config file)
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Crawl the listing, classify every article and write the CSV artifact
    Crawl {
        /// Path of the CSV artifact; any previous file there is replaced
        #[arg(short, long, default_value = "news.csv")]
        output: PathBuf,

        /// Columns to export, comma-separated (default: every column)
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,
    },

    /// Select the most important articles of a crawl and write a digest message
    Digest {
        /// CSV artifact produced by `crawl`
        #[arg(short, long, default_value = "news.csv")]
        input: PathBuf,

        /// Recipient address of the digest
        #[arg(short, long)]
        recipient: String,

        /// Number of articles to include
        #[arg(short = 'k', long, default_value_t = crate::digest::DEFAULT_TOP_K)]
        top: usize,

        /// Directory the rendered message is dropped into
        #[arg(long, default_value = "outbox")]
        outbox: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_defaults() {
        let cli = Cli::parse_from(["pr_news_digest", "crawl"]);
        assert_eq!(
            cli.command,
            Command::Crawl {
                output: PathBuf::from("news.csv"),
                fields: None,
            }
        );
    }

    #[test]
    fn test_crawl_short_flags_and_fields() {
        let cli = Cli::parse_from([
            "pr_news_digest",
            "crawl",
            "-o",
            "/tmp/out.csv",
            "--fields",
            "title,link,date",
        ]);
        assert_eq!(
            cli.command,
            Command::Crawl {
                output: PathBuf::from("/tmp/out.csv"),
                fields: Some(vec!["title".into(), "link".into(), "date".into()]),
            }
        );
    }

    #[test]
    fn test_digest_parsing() {
        let cli = Cli::parse_from([
            "pr_news_digest",
            "--config",
            "news.yaml",
            "digest",
            "-r",
            "ops@example.com",
            "-k",
            "5",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("news.yaml")));
        assert_eq!(
            cli.command,
            Command::Digest {
                input: PathBuf::from("news.csv"),
                recipient: "ops@example.com".into(),
                top: 5,
                outbox: PathBuf::from("outbox"),
            }
        );
    }

    #[test]
    fn test_digest_requires_recipient() {
        assert!(Cli::try_parse_from(["pr_news_digest", "digest"]).is_err());
    }
}
