use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail};
use chrono::NaiveDate;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tinyrand::{Seeded, StdRand};
use tracing::{debug, info, warn};

use hipodrom::data::RaceProgram;
use hipodrom::feed::{FeedConfig, FeedResultExt, HttpTransport, RaceFeed};
use hipodrom::file::{ReadJsonFile, WriteJsonFile};
use hipodrom::orientation::{Headless, Orientation, OrientationLease};
use hipodrom::print::{describe_weather, tabulate_card, tabulate_result, tabulate_standings};
use hipodrom::sim::{RaceSimulation, SimConfig, Tick};

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// file to source the race program from
    #[clap(short = 'f', long)]
    file: Option<PathBuf>,

    /// download the program for the given date (YYYY-MM-DD)
    #[clap(short = 'd', long)]
    date: Option<NaiveDate>,

    /// city of the meeting to download
    #[clap(short = 'c', long)]
    city: Option<String>,

    /// race number or code; the first race on the card if omitted
    #[clap(long)]
    race: Option<String>,

    /// seed for the random number generator
    #[clap(long)]
    seed: Option<u64>,

    /// simulation configuration file
    #[clap(long)]
    config: Option<PathBuf>,

    /// use the track preset instead of the planar one
    #[clap(long)]
    track: bool,

    /// feed configuration file
    #[clap(long)]
    feed_config: Option<PathBuf>,

    /// pace ticks in real time
    #[clap(long)]
    realtime: bool,

    /// file to write the final simulation state to
    #[clap(short = 'o', long)]
    out: Option<PathBuf>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<Source> {
        if self.config.is_some() && self.track {
            bail!("--config and --track are mutually exclusive");
        }
        match (self.file.as_ref(), self.date, self.city.as_ref()) {
            (Some(path), None, None) => Ok(Source::File(path.clone())),
            (None, Some(date), Some(city)) => Ok(Source::Download {
                date,
                city: city.clone(),
            }),
            (None, Some(_), None) => bail!("the -c flag must accompany -d"),
            _ => bail!("either the -f or the -d flag must be specified"),
        }
    }
}

enum Source {
    File(PathBuf),
    Download { date: NaiveDate, city: String },
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

    let config = match (args.config.as_ref(), args.track) {
        (Some(path), _) => SimConfig::read_json_file(path)?,
        (None, true) => SimConfig::track(),
        (None, false) => SimConfig::planar(),
    };

    let (program, download) = match source {
        Source::File(path) => (RaceProgram::read_json_file(path)?, None),
        Source::Download { date, city } => {
            let feed_config = match args.feed_config.as_ref() {
                Some(path) => FeedConfig::read_json_file(path)?,
                None => FeedConfig::default(),
            };
            let transport = HttpTransport::new(&feed_config)?;
            let feed =
                RaceFeed::new(transport).with_domestic_cutoff(feed_config.domestic_cutoff);
            let cities = feed.fetch_race_list(date).await.or_empty()?;
            if !cities.contains(&city) {
                warn!("{city} is not among today's meetings: {cities:?}");
            }
            let program = feed.fetch_program(date, &city).await.or_empty()?;
            (program, Some((feed, date, city)))
        }
    };
    info!("weather: {}", describe_weather(program.weather.as_ref()));

    let race = match args.race.as_deref() {
        Some(number_or_code) => program.race(number_or_code),
        None => program.races.first(),
    }
    .ok_or_else(|| anyhow!("no such race on the card"))?;
    info!(
        "race {} ({}) at {}, {}m {}",
        race.number,
        race.code,
        race.time.as_deref().unwrap_or("?"),
        race.distance.as_deref().unwrap_or("?"),
        race.track.as_deref().unwrap_or("")
    );
    info!("\n{}", Console::default().render(&tabulate_card(race)));

    let seed = args.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default()
    });
    debug!("seed: {seed}");
    let mut sim = RaceSimulation::new(config, race.runners.clone(), StdRand::seed(seed))?;
    sim.check_field()?;
    let tick_interval = Duration::from_secs_f64(sim.config().tick_interval);
    let ranking_interval = sim.config().ranking_interval;

    {
        let _lease = OrientationLease::acquire(Headless, Orientation::Landscape);
        sim.start()?;
        let mut logged_at = 0.0;
        let mut pace = tokio::time::interval(tick_interval);
        loop {
            if args.realtime {
                pace.tick().await;
            }
            match sim.tick() {
                Tick::Finished(_) => break,
                Tick::Advanced => {
                    if sim.elapsed() - logged_at >= ranking_interval {
                        logged_at = sim.elapsed();
                        let leaders: Vec<_> = sim
                            .ranking()
                            .take(3)
                            .map(|runner| runner.number.as_str())
                            .collect();
                        info!("{:.1}: leaders {}", sim.elapsed(), leaders.join(", "));
                    }
                }
                Tick::Idle => return Err("simulation stopped before a winner emerged".into()),
            }
        }
    }

    if let Some(winner) = sim.winner() {
        info!("winner: {} ({}), ridden by {}", winner.name, winner.number, winner.jockey);
    }
    info!("\n{}", Console::default().render(&tabulate_standings(&sim)));

    if let Some(path) = args.out.as_ref() {
        sim.snapshot().write_json_file(path)?;
        info!("wrote final state to {}", path.display());
    }

    if let Some((feed, date, city)) = download.as_ref() {
        match feed.fetch_result(*date, city, &race.code).await {
            Ok(result) => {
                let table = tabulate_result(&result);
                info!("official result:\n{}", Console::default().render(&table));
            }
            Err(err) => info!("official result: {}", err.user_message()),
        }
    }
    Ok(())
}
