use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use sprite_harvest::{Config, PipelineOrchestrator};

#[derive(Parser)]
#[command(
    name = "sprite-harvest",
    about = "Download every sprite sheet listed on a catalog page"
)]
struct Cli {
    /// JSON config file (CLI flags override its values)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Catalog page URL
    #[arg(short, long)]
    url: Option<String>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Delay between entries in milliseconds (sections wait twice as long)
    #[arg(long)]
    delay: Option<u64>,

    /// Maximum retries per download
    #[arg(long)]
    retries: Option<u32>,

    /// Delay between retries in milliseconds
    #[arg(long)]
    retry_delay: Option<u64>,

    /// Entries in flight at once
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Process at most this many sections
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Write everything into the output root instead of per-section folders
    #[arg(long)]
    no_categorize: bool,

    /// Skip writing metadata.json
    #[arg(long)]
    no_metadata: bool,

    /// Leave the sheet id out of filenames
    #[arg(long)]
    no_id: bool,

    /// Resolve sheets without downloading them
    #[arg(long)]
    no_images: bool,

    /// Skip catalog icons
    #[arg(long)]
    no_icons: bool,

    /// Verbose logging
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn into_config(self) -> sprite_harvest::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(url) = self.url {
            config.catalog_url = url;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(ms) = self.delay {
            config.delay = Duration::from_millis(ms);
        }
        if let Some(retries) = self.retries {
            config.retries = retries;
        }
        if let Some(ms) = self.retry_delay {
            config.retry_delay = Duration::from_millis(ms);
        }
        if let Some(n) = self.max_concurrent {
            config.max_concurrent = n;
        }
        if self.limit.is_some() {
            config.max_sections = self.limit;
        }
        config.categorize &= !self.no_categorize;
        config.save_metadata &= !self.no_metadata;
        config.include_id &= !self.no_id;
        config.download_images &= !self.no_images;
        config.download_icons &= !self.no_icons;
        config.debug |= self.debug;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let debug = cli.debug;
    let config = cli.into_config();

    let verbose = debug || config.as_ref().map(|c| c.debug).unwrap_or(false);
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let t0 = Instant::now();
    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            println!("Done in {:.1}s", t0.elapsed().as_secs_f64());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Scrape run aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> sprite_harvest::Result<()> {
    let pipeline = PipelineOrchestrator::new(config)?;
    let report = pipeline.run().await?;

    println!(
        "Downloaded {}/{} sprite sheets ({:.1}%)",
        report.successful_downloads,
        report.total_sprites,
        report.success_ratio() * 100.0
    );
    Ok(())
}
