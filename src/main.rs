mod dashboard;
mod http;
mod scrape;
mod sentiment;
mod store;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "brandpulse", about = "Brand reputation scraper for web-scraping.dev")]
struct Cli {
    /// Base URL of the target site
    #[arg(long, global = true, default_value = "https://web-scraping.dev")]
    base_url: String,

    /// Directory holding the CSV tables
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl reviews via the GraphQL API
    Reviews {
        /// Page size requested per GraphQL call
        #[arg(long, default_value = "50")]
        first: i64,
        /// Max pages to fetch
        #[arg(short = 'n', long, default_value = "50")]
        max_pages: usize,
        /// Keep only reviews dated in this year
        #[arg(long, default_value = "2023")]
        year: i32,
    },
    /// Crawl the HTML product listing
    Products {
        /// Max pages to fetch
        #[arg(short = 'n', long, default_value = "20")]
        max_pages: usize,
    },
    /// Crawl the testimonials API
    Testimonials {
        /// Max pages to fetch
        #[arg(short = 'n', long, default_value = "20")]
        max_pages: usize,
    },
    /// Run all three crawlers in sequence
    Scrape {
        /// Keep only reviews dated in this year
        #[arg(long, default_value = "2023")]
        year: i32,
    },
    /// Score crawled reviews with the sentiment classifier
    Score {
        /// Reviews classified per batch
        #[arg(long, default_value = "16")]
        batch_size: usize,
    },
    /// Show row counts for the stored tables
    Stats,
    /// Render a dashboard section in the terminal
    Dashboard {
        /// Which section to render
        #[arg(short, long, value_enum, default_value = "reviews")]
        section: Section,
        /// Restrict the reviews section to one month (YYYY-MM)
        #[arg(short, long)]
        month: Option<String>,
        /// Year the reviews section covers
        #[arg(long, default_value = "2023")]
        year: i32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Section {
    Products,
    Testimonials,
    Reviews,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let dir = cli.data_dir.as_path();

    let result = match cli.command {
        Commands::Reviews { first, max_pages, year } => {
            store::ensure_data_dir(dir)?;
            let client = http::build_client()?;
            let rows = scrape::reviews::scrape_reviews(&client, &cli.base_url, first, max_pages, year).await?;
            store::write_reviews(dir, &rows)?;
            println!("Saved {} reviews from {}.", rows.len(), year);
            Ok(())
        }
        Commands::Products { max_pages } => {
            store::ensure_data_dir(dir)?;
            let client = http::build_client()?;
            let rows = scrape::products::scrape_products(&client, &cli.base_url, max_pages).await?;
            store::write_products(dir, &rows)?;
            println!("Saved {} products.", rows.len());
            Ok(())
        }
        Commands::Testimonials { max_pages } => {
            store::ensure_data_dir(dir)?;
            let client = http::build_client()?;
            let rows = scrape::testimonials::scrape_testimonials(&client, &cli.base_url, max_pages).await?;
            store::write_testimonials(dir, &rows)?;
            println!("Saved {} testimonials.", rows.len());
            Ok(())
        }
        Commands::Scrape { year } => {
            store::ensure_data_dir(dir)?;
            let client = http::build_client()?;

            let reviews =
                scrape::reviews::scrape_reviews(&client, &cli.base_url, 50, 50, year).await?;
            store::write_reviews(dir, &reviews)?;
            println!("Saved {} reviews from {}.", reviews.len(), year);

            let products = scrape::products::scrape_products(&client, &cli.base_url, 20).await?;
            store::write_products(dir, &products)?;
            println!("Saved {} products.", products.len());

            let testimonials =
                scrape::testimonials::scrape_testimonials(&client, &cli.base_url, 20).await?;
            store::write_testimonials(dir, &testimonials)?;
            println!("Saved {} testimonials.", testimonials.len());
            Ok(())
        }
        Commands::Score { batch_size } => {
            let rows = store::read_reviews(dir)?;
            if rows.is_empty() {
                println!("No reviews to score.");
                return Ok(());
            }
            println!("Scoring {} reviews...", rows.len());
            let scored = sentiment::score_reviews(rows, batch_size);
            store::write_scored(dir, &scored)?;
            println!("Saved {} scored reviews.", scored.len());
            Ok(())
        }
        Commands::Stats => {
            for s in store::collect_stats(dir)? {
                let rows = s
                    .rows
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "missing".into());
                println!("{:<20} {:>8}", s.file, rows);
            }
            Ok(())
        }
        Commands::Dashboard { section, month, year } => match section {
            Section::Products => dashboard::render_products(dir),
            Section::Testimonials => dashboard::render_testimonials(dir),
            Section::Reviews => dashboard::render_reviews(dir, year, month.as_deref()),
        },
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
