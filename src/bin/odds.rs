use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use chrono::NaiveDate;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info, warn};

use hipodrom::data::{BetType, OddsPayload};
use hipodrom::feed::{FeedConfig, FeedError, FeedResultExt, HttpTransport, RaceFeed};
use hipodrom::file::ReadJsonFile;
use hipodrom::generation::Latest;
use hipodrom::grid::OddsGrid;
use hipodrom::print::tabulate_grid;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// file to source the odds payload from
    #[clap(short = 'f', long)]
    file: Option<PathBuf>,

    /// download odds for the given date (YYYY-MM-DD)
    #[clap(short = 'd', long)]
    date: Option<NaiveDate>,

    /// race key, as listed in the day's odds checksum
    #[clap(short = 'r', long)]
    race: Option<String>,

    /// feed configuration file
    #[clap(long)]
    config: Option<PathBuf>,

    /// keep refreshing the grid every given number of seconds
    #[clap(long)]
    follow: Option<u64>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<Source> {
        if self.follow == Some(0) {
            bail!("--follow interval must be at least one second");
        }
        match (self.file.as_ref(), self.date, self.race.as_ref()) {
            (Some(path), None, None) if self.follow.is_none() => Ok(Source::File(path.clone())),
            (Some(_), None, None) => bail!("--follow only applies to downloaded odds"),
            (None, Some(date), Some(race)) => Ok(Source::Download {
                date,
                race: race.clone(),
            }),
            (None, Some(_), None) => bail!("the -r flag must accompany -d"),
            _ => bail!("either the -f or the -d flag must be specified"),
        }
    }
}

enum Source {
    File(PathBuf),
    Download { date: NaiveDate, race: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let source = args.validate()?;
    debug!("args: {args:?}");

    let (date, race) = match source {
        Source::File(path) => {
            let payload = OddsPayload::read_json_file(path)?;
            render(&payload.into_bet_types());
            return Ok(());
        }
        Source::Download { date, race } => (date, race),
    };

    let config = match args.config.as_ref() {
        Some(path) => FeedConfig::read_json_file(path)?,
        None => FeedConfig::default(),
    };
    let transport = HttpTransport::new(&config)?;
    let feed = Arc::new(RaceFeed::new(transport).with_domestic_cutoff(config.domestic_cutoff));

    let Some(interval) = args.follow else {
        match feed.fetch_odds(date, &race).await.or_empty() {
            Ok(bet_types) => render(&bet_types),
            Err(err) => report(&err),
        }
        return Ok(());
    };

    // each refresh runs on its own task; a slow one must not overwrite a newer grid
    let latest: Latest<Result<Vec<BetType>, FeedError>> = Latest::new();
    let mut refresh = tokio::time::interval(Duration::from_secs(interval));
    loop {
        refresh.tick().await;
        if let Some(fetched) = latest.take() {
            match fetched {
                Ok(bet_types) => render(&bet_types),
                Err(err) => report(&err),
            }
        }
        if latest.is_pending() {
            debug!("previous refresh of {race} still in flight");
            continue;
        }

        let ticket = latest.issue();
        let (feed, latest, race) = (feed.clone(), latest.clone(), race.clone());
        tokio::spawn(async move {
            let fetched = feed.fetch_odds(date, &race).await.or_empty();
            if !latest.offer(ticket, fetched) {
                debug!("superseded odds for {race}");
            }
        });
    }
}

fn render(bet_types: &[BetType]) {
    let grid = OddsGrid::build(bet_types);
    if grid.row_count() == 0 {
        info!("no odds published for this race");
        return;
    }
    if let Some((index, row)) = grid.favorite() {
        debug!("favourite at row {index}: {:?}", row.cells.first());
    }
    info!("\n{}", Console::default().render(&tabulate_grid(&grid)));
}

fn report(err: &FeedError) {
    warn!("{err}");
    info!("{}", err.user_message());
}
