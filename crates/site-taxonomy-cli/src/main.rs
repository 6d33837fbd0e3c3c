//! `site-taxonomy`: crawl a site and classify its pages.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::{categories_cmd, crawl_cmd};

#[derive(Parser, Debug)]
#[command(
    name = "site-taxonomy",
    version,
    about = "Crawl a website and classify every page against an ontology"
)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "SITE_TAXONOMY_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site breadth-first and print one record per page
    Crawl(crawl_cmd::CrawlArgs),
    /// Scrape and classify a single page
    Scrape(crawl_cmd::ScrapeArgs),
    /// List the ontology's partitions and their sizes
    Categories(categories_cmd::CategoriesArgs),
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("site_taxonomy=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Crawl(args) => crawl_cmd::run_crawl(args).await,
        Command::Scrape(args) => crawl_cmd::run_scrape(args).await,
        Command::Categories(args) => categories_cmd::run(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crawl_flags() {
        let cli = Cli::try_parse_from([
            "site-taxonomy",
            "crawl",
            "https://example.org",
            "--max-pages",
            "25",
            "--delay-ms",
            "0",
            "--concurrency",
            "3",
            "--log-json",
        ])
        .unwrap();
        assert!(cli.log_json);
        let Command::Crawl(args) = cli.command else {
            panic!("expected crawl");
        };
        assert_eq!(args.url.as_deref(), Some("https://example.org"));
        assert_eq!(args.max_pages, Some(25));
        assert_eq!(args.concurrency, Some(3));
    }

    #[test]
    fn test_parse_categories() {
        let cli =
            Cli::try_parse_from(["site-taxonomy", "categories", "--ontology", "tax.owl"]).unwrap();
        let Command::Categories(args) = cli.command else {
            panic!("expected categories");
        };
        assert_eq!(args.ontology, std::path::PathBuf::from("tax.owl"));
    }
}
