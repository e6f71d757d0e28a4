//! bookmirror - mirror online books into offline HTML bundles

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use url::Url;

use bookmirror::{BookCrawler, HttpFetcher};

#[derive(Parser)]
#[command(name = "bookmirror")]
#[command(version, about = "Mirror an online book into an offline HTML bundle", long_about = None)]
#[command(after_help = "EXAMPLES:
    bookmirror https://wikidocs.net/book/31              Mirror the whole book
    bookmirror https://wikidocs.net/book/31 -o out       Mirror into ./out
    bookmirror https://wikidocs.net/book/31 --page https://wikidocs.net/204
                                                         Mirror a single page")]
struct Cli {
    /// Book index URL
    #[arg(value_name = "BOOK_URL")]
    url: String,

    /// Mirror only this page instead of crawling the whole index
    #[arg(long, value_name = "PAGE_URL")]
    page: Option<String>,

    /// Output root directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Reserved sequence offset; page filenames start at OFFSET + 1
    #[arg(long, default_value_t = 100)]
    offset: u32,

    /// Suppress progress messages
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let book_url = Url::parse(&cli.url).map_err(|e| e.to_string())?;

    let fetcher = HttpFetcher::new();
    let crawler =
        BookCrawler::new(book_url, &cli.output, &fetcher).with_page_offset(cli.offset);

    match &cli.page {
        Some(page) => {
            let page_url = Url::parse(page).map_err(|e| e.to_string())?;
            crawler
                .mirror_page(&page_url, cli.offset)
                .map_err(|e| e.to_string())?;
        }
        None => {
            crawler.run().map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}
