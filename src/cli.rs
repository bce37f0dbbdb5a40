// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
//   kyobo-lookup identify --isbn 9788936470111
//   kyobo-lookup identify --title "나의 문화유산답사기 1" --author 유홍준 --json
//   kyobo-lookup cover --id 9788932008486 --output cover.jpg
//
// Options that change how a lookup runs (--config, --max-results...) are
// global, so they can be given before or after the subcommand.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use kyobo_lookup::identify::DEFAULT_TIMEOUT;
use kyobo_lookup::{Identifiers, LookupRequest, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "kyobo-lookup",
    version,
    about = "Look up Korean book metadata and covers on kyobobook.co.kr",
    long_about = "kyobo-lookup searches the Kyobobook online store by ISBN, title or author, \
                  scrapes the matching product pages and prints the book metadata it finds."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML settings file ([prefs] and [site] tables)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Maximum title/author search matches to evaluate (1 = fastest)
    #[arg(long, global = true)]
    pub max_results: Option<usize>,

    /// Keep every contributor (illustrators, translators...), not only primary authors
    #[arg(long, global = true)]
    pub all_authors: bool,

    /// Do not turn the category breadcrumb into tags
    #[arg(long, global = true)]
    pub no_category: bool,

    /// Do not append the table of contents to the comments
    #[arg(long, global = true)]
    pub no_toc: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find metadata for a book
    ///
    /// Example: kyobo-lookup identify --isbn 9788936470111
    Identify {
        #[command(flatten)]
        lookup: LookupArgs,

        /// Output results in JSON format instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Download the cover image of a book
    ///
    /// Example: kyobo-lookup cover --isbn 9788936470111 --output cover.jpg
    Cover {
        #[command(flatten)]
        lookup: LookupArgs,

        /// Where to write the image
        #[arg(long, short)]
        output: PathBuf,
    },
}

/// What we know about the book.
#[derive(Args, Debug, Clone)]
pub struct LookupArgs {
    /// Book title
    #[arg(long)]
    pub title: Option<String>,

    /// Author name (repeat for several authors)
    #[arg(long = "author")]
    pub authors: Vec<String>,

    /// ISBN-10 or ISBN-13
    #[arg(long)]
    pub isbn: Option<String>,

    /// Kyobobook product code (skips the search)
    #[arg(long)]
    pub id: Option<String>,
}

impl LookupArgs {
    pub fn to_request(&self) -> LookupRequest {
        LookupRequest {
            title: self.title.clone(),
            authors: self.authors.clone(),
            identifiers: Identifiers {
                isbn: self.isbn.clone(),
                kyobobook: self.id.clone(),
            },
        }
    }
}

impl Cli {
    /// Settings file (or defaults) with the command-line overrides applied.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        if let Some(max) = self.max_results {
            settings.prefs.max_downloads = max;
        }
        if self.all_authors {
            settings.prefs.get_all_authors = true;
        }
        if self.no_category {
            settings.prefs.get_category = false;
        }
        if self.no_toc {
            settings.prefs.append_toc = false;
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_args() {
        let cli = Cli::parse_from([
            "kyobo-lookup",
            "identify",
            "--title",
            "체 게바라",
            "--author",
            "장 코르미에",
            "--author",
            "김미선",
            "--json",
            "--all-authors",
        ]);
        let Commands::Identify { lookup, json } = &cli.command else {
            panic!("expected identify");
        };
        assert!(json);
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT.as_secs());
        let request = lookup.to_request();
        assert_eq!(request.authors.len(), 2);
        assert!(request.identifiers.is_empty());
        assert!(cli.settings().unwrap().prefs.get_all_authors);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "kyobo-lookup",
            "--max-results",
            "3",
            "--no-toc",
            "cover",
            "--isbn",
            "9788936470111",
            "-o",
            "cover.jpg",
        ]);
        let settings = cli.settings().unwrap();
        assert_eq!(settings.prefs.max_downloads, 3);
        assert!(!settings.prefs.append_toc);
        assert!(settings.prefs.get_category);
    }
}
