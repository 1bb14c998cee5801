use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use serde::Serialize;

use shortsboard::config::{self, AppPaths, QuotaBackend, Settings};
use shortsboard::errors::{Result, ShortsError};
use shortsboard::export;
use shortsboard::keywords::{KeywordEntry, KeywordExtractor, KeywordStats, Lexicon};
use shortsboard::logging;
use shortsboard::normalize::VideoRecord;
use shortsboard::pipeline::{Pipeline, RankBy, RankOptions, Report, ScanMode, ScanOptions};
use shortsboard::quota::json::JsonQuotaStore;
use shortsboard::quota::sqlite::SqliteQuotaStore;
use shortsboard::quota::{QuotaLedger, QuotaPolicy, QuotaSnapshot, QuotaStore};
use shortsboard::trends::matcher::{self, KeywordMatcher};
use shortsboard::trends::{FailedAttempt, HttpFetcher, TREND_TIMEOUT, TrendChain, TrendMode};
use shortsboard::tui;
use shortsboard::youtube::channels::split_channel_list;
use shortsboard::youtube::client::YouTubeClient;

#[derive(Parser)]
#[command(
    name = "shorts",
    version,
    about = "Trending YouTube Shorts board with keyword and trend matching"
)]
struct Cli {
    /// Output results as JSON
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, rank and print recent shorts
    Scan(ScanArgs),

    /// Show today's quota usage
    Quota,

    /// Show external trend keywords
    Trends {
        /// Trend source: auto, google, naver, youtube
        #[arg(short, long, value_enum)]
        source: Option<TrendMode>,
    },

    /// Extract keywords from a file (one text per line) or stdin
    Keywords {
        /// Input file; stdin when omitted
        file: Option<PathBuf>,

        /// Number of keywords
        #[arg(short, long)]
        top: Option<usize>,

        /// Also write the table to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Interactive table
    Tui(ScanArgs),
}

#[derive(Args, Clone)]
struct ScanArgs {
    /// trend: news category with a canned query; keyword: --query;
    /// channels: uploads of --channel (or `channels` in config.toml)
    #[arg(short, long, value_enum, default_value_t = ScanMode::Trend)]
    mode: ScanMode,

    /// Search text for keyword mode
    #[arg(short, long)]
    query: Option<String>,

    /// Channel id, @handle or channel URL; repeatable, comma lists accepted
    #[arg(short, long = "channel")]
    channels: Vec<String>,

    /// Listing pages (50 results each): 1, 2 or 4
    #[arg(short, long, default_value = "1")]
    pages: usize,

    /// Only clips published within the last N hours
    #[arg(long)]
    window_hours: Option<i64>,

    /// Longest clip length in seconds
    #[arg(long)]
    max_secs: Option<u64>,

    /// Ranking column: views-per-hour, views, likes, comments
    #[arg(short, long, value_enum)]
    rank: Option<RankBy>,

    /// Sort ascending
    #[arg(long)]
    asc: bool,

    /// Rows to display
    #[arg(short, long)]
    top: Option<usize>,

    /// Only rows whose title or description contains this text
    #[arg(short, long)]
    filter: Option<String>,

    /// Write the displayed rows to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Trend source: auto, google, naver, youtube
    #[arg(long, value_enum)]
    trend_source: Option<TrendMode>,
}

impl ScanArgs {
    fn scan_options(&self, settings: &Settings) -> ScanOptions {
        let channels: Vec<String> = self
            .channels
            .iter()
            .flat_map(|c| split_channel_list(c))
            .collect();
        ScanOptions {
            mode: self.mode,
            query: self.query.clone(),
            channels: if channels.is_empty() {
                settings.channels.clone()
            } else {
                channels
            },
            pages: self.pages,
            window_hours: self.window_hours.unwrap_or(settings.window_hours),
            max_duration_secs: self.max_secs.unwrap_or(settings.max_duration_secs),
            ..ScanOptions::from_settings(settings)
        }
    }

    fn rank_options(&self, settings: &Settings) -> RankOptions {
        RankOptions {
            rank_by: self.rank.unwrap_or(settings.rank_by),
            ascending: self.asc,
            top: self.top.unwrap_or(settings.top_rows),
            filter: self.filter.clone(),
        }
    }
}

#[derive(Serialize)]
struct QuotaResponse<'a> {
    #[serde(flatten)]
    snapshot: &'a QuotaSnapshot,
    timezone: String,
    next_reset_local: String,
}

#[derive(Serialize)]
struct ScanResponse<'a> {
    quota: &'a QuotaSnapshot,
    pages: usize,
    ids_collected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    listing_error: Option<&'a str>,
    keywords: &'a [KeywordEntry],
    keyword_stats: &'a [KeywordStats],
    trend_source: &'a str,
    trends: &'a [String],
    trend_failures: &'a [FailedAttempt],
    hot: &'a [String],
    rows: Vec<&'a VideoRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    csv: Option<PathBuf>,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let json = cli.json;
    logging::init(cli.verbose, matches!(cli.command, Some(Commands::Tui(_))));

    if let Err(e) = run(cli) {
        if json {
            eprintln!("{}", serde_json::json!({"error": e.to_string()}));
        } else {
            eprintln!("error: {}", e);
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = AppPaths::new();
    let settings = Settings::load(&paths.config_file)?;
    let json = cli.json;

    match cli.command {
        None | Some(Commands::Quota) => cmd_quota(&paths, &settings, json),
        Some(Commands::Scan(args)) => cmd_scan(&paths, &settings, &args, json),
        Some(Commands::Trends { source }) => cmd_trends(&paths, &settings, source, json),
        Some(Commands::Keywords { file, top, csv }) => {
            cmd_keywords(&paths, &settings, file, top, csv, json)
        }
        Some(Commands::Tui(args)) => cmd_tui(&paths, &settings, &args),
    }
}

fn open_ledger(paths: &AppPaths, settings: &Settings) -> Result<QuotaLedger> {
    let policy = QuotaPolicy {
        daily_budget: settings.daily_budget,
        timezone: settings.quota_tz()?,
        reset_hour: settings.quota_reset_hour,
    };
    let store: Box<dyn QuotaStore> = match settings.quota_backend {
        QuotaBackend::Json => Box::new(JsonQuotaStore::new(paths.quota_json.clone())),
        QuotaBackend::Sqlite => {
            fs::create_dir_all(&paths.base_dir)?;
            let conn = Connection::open(&paths.quota_db)?;
            Box::new(SqliteQuotaStore::new(conn)?)
        }
    };
    Ok(QuotaLedger::new(store, policy))
}

fn load_extractor(paths: &AppPaths) -> Result<KeywordExtractor> {
    Ok(KeywordExtractor::new(Lexicon::load_or_builtin(
        &paths.lexicon_file,
    )?))
}

fn trend_http() -> Result<HttpFetcher> {
    HttpFetcher::new(TREND_TIMEOUT).map_err(|e| ShortsError::Config(e.to_string()))
}

/// Everything a pipeline run borrows.
struct Services {
    client: YouTubeClient,
    extractor: KeywordExtractor,
    chain: TrendChain,
    matcher: Box<dyn KeywordMatcher>,
    display_tz: Tz,
}

impl Services {
    fn build(paths: &AppPaths, settings: &Settings, trend_mode: TrendMode) -> Result<Self> {
        let api_key = config::api_key_from_env()?;
        let client = YouTubeClient::new(
            settings.api_base.as_str(),
            api_key,
            Duration::from_secs(settings.request_timeout_secs),
        )
        .map_err(|e| ShortsError::Config(e.to_string()))?;
        let extractor = load_extractor(paths)?;
        let chain = TrendChain::for_mode(trend_mode, &trend_http()?, &extractor);
        Ok(Self {
            client,
            extractor,
            chain,
            matcher: matcher::build(settings.matcher, settings.jaccard_threshold),
            display_tz: settings.display_tz()?,
        })
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline {
            api: &self.client,
            extractor: &self.extractor,
            trends: &self.chain,
            matcher: self.matcher.as_ref(),
            display_tz: self.display_tz,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn cmd_quota(paths: &AppPaths, settings: &Settings, json: bool) -> Result<()> {
    let ledger = open_ledger(paths, settings)?;
    let snapshot = ledger.snapshot();
    let display_tz = settings.display_tz()?;
    let next_local = snapshot.next_reset.with_timezone(&display_tz);

    if json {
        return print_json(&QuotaResponse {
            snapshot: &snapshot,
            timezone: settings.quota_timezone.clone(),
            next_reset_local: next_local.to_rfc3339(),
        });
    }

    print_quota_panel(&snapshot, settings, display_tz);
    Ok(())
}

fn print_quota_panel(snapshot: &QuotaSnapshot, settings: &Settings, display_tz: Tz) {
    let quota_tz = settings.quota_tz().unwrap_or(chrono_tz::America::Los_Angeles);
    println!("Quota ({} day {})", settings.quota_timezone, snapshot.day);
    println!("──────────────────────────────");
    println!(
        "Used:       {} / {} ({:.1}%)",
        export::group_digits(snapshot.used),
        export::group_digits(snapshot.budget),
        snapshot.percent_used
    );
    println!("Remaining:  {}", export::group_digits(snapshot.remaining));
    println!(
        "Next reset: {}  ({})",
        snapshot
            .next_reset
            .with_timezone(&quota_tz)
            .format("%Y-%m-%d %H:%M %Z"),
        snapshot
            .next_reset
            .with_timezone(&display_tz)
            .format("%Y-%m-%d %H:%M %Z"),
    );
}

fn cmd_scan(paths: &AppPaths, settings: &Settings, args: &ScanArgs, json: bool) -> Result<()> {
    let opts = args.scan_options(settings);
    opts.validate()?;
    let view = args.rank_options(settings);
    let services = Services::build(
        paths,
        settings,
        args.trend_source.unwrap_or(settings.trend_source),
    )?;
    let mut ledger = open_ledger(paths, settings)?;

    let report = services.pipeline().run(&mut ledger, &opts)?;
    let rows = report.rows(&view);
    let csv = match &args.csv {
        Some(path) => Some(export::export_rows(path, &rows)?),
        None => None,
    };

    if json {
        return print_json(&ScanResponse {
            quota: &report.quota,
            pages: report.pages,
            ids_collected: report.ids_collected,
            listing_error: report.listing_error.as_deref(),
            keywords: &report.keywords,
            keyword_stats: &report.keyword_stats,
            trend_source: &report.trends.source,
            trends: &report.trends.keywords,
            trend_failures: &report.trends.attempts,
            hot: &report.hot,
            rows,
            csv,
        });
    }

    print_quota_panel(&report.quota, settings, services.display_tz);
    println!();
    print_report_summary(&report);
    println!();
    if rows.is_empty() {
        println!("No shorts found.");
    } else {
        print!("{}", export::render_table(&rows));
    }
    if let Some(path) = csv {
        println!();
        println!("Saved {} row(s) to {}", rows.len(), path.display());
    }
    Ok(())
}

fn print_report_summary(report: &Report) {
    println!(
        "Collected {} id(s) over {} page(s); {} short(s) after filtering.",
        report.ids_collected,
        report.pages,
        report.records.len()
    );
    if let Some(err) = &report.listing_error {
        println!("Listing stopped early: {}", err);
    }

    let keywords: Vec<String> = report
        .keywords
        .iter()
        .map(|e| format!("{}({})", e.keyword, e.count))
        .collect();
    println!("Keywords:   {}", or_dash(&keywords.join(", ")));
    for stats in report.keyword_stats.iter().filter(|s| s.channel_overlap > 1).take(5) {
        println!(
            "  {:<12} {} channel(s), top {} views · {}",
            stats.keyword,
            stats.channel_overlap,
            export::group_digits(stats.top_view_count),
            stats.top_channel
        );
    }
    println!(
        "Trends [{}]: {}",
        report.trends.source,
        or_dash(&report.trends.keywords.join(", "))
    );
    println!("Hot:        {}", or_dash(&report.hot.join(", ")));
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}

fn cmd_trends(
    paths: &AppPaths,
    settings: &Settings,
    source: Option<TrendMode>,
    json: bool,
) -> Result<()> {
    let extractor = load_extractor(paths)?;
    let mode = source.unwrap_or(settings.trend_source);
    let chain = TrendChain::for_mode(mode, &trend_http()?, &extractor);
    let outcome = chain.resolve(extractor.lexicon(), &[]);

    if json {
        return print_json(&outcome);
    }

    for attempt in &outcome.attempts {
        println!("  ✗ {:<16} {}", attempt.source, attempt.error);
    }
    if outcome.keywords.is_empty() {
        println!("No trend keywords (mode {}).", mode);
        return Ok(());
    }
    println!("Trend keywords via {}:", outcome.source);
    for (i, word) in outcome.keywords.iter().enumerate() {
        println!("{:>3}. {}", i + 1, word);
    }
    Ok(())
}

fn cmd_keywords(
    paths: &AppPaths,
    settings: &Settings,
    file: Option<PathBuf>,
    top: Option<usize>,
    csv: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let text = match &file {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let extractor = load_extractor(paths)?;
    let keywords = extractor.top_k(text.lines(), top.unwrap_or(settings.top_keywords));
    if let Some(path) = &csv {
        export::export_keywords(path, &keywords, &[])?;
    }

    if json {
        return print_json(&keywords);
    }

    if keywords.is_empty() {
        println!("No keywords found.");
        return Ok(());
    }
    for (i, entry) in keywords.iter().enumerate() {
        println!("{:>3}. {:<20} {}", i + 1, entry.keyword, entry.count);
    }
    Ok(())
}

fn cmd_tui(paths: &AppPaths, settings: &Settings, args: &ScanArgs) -> Result<()> {
    let opts = args.scan_options(settings);
    opts.validate()?;
    let view = args.rank_options(settings);
    let services = Services::build(
        paths,
        settings,
        args.trend_source.unwrap_or(settings.trend_source),
    )?;
    let mut ledger = open_ledger(paths, settings)?;
    let pipeline = services.pipeline();

    let report = pipeline.run(&mut ledger, &opts)?;
    let export_dir = args
        .csv
        .as_ref()
        .and_then(|p| p.parent().map(PathBuf::from))
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| paths.export_dir.clone());

    tui::run(report, view, &export_dir, services.display_tz, || {
        pipeline.run(&mut ledger, &opts)
    })?;

    let snapshot = ledger.snapshot_at(Utc::now());
    println!(
        "Quota used today: {} / {}",
        export::group_digits(snapshot.used),
        export::group_digits(snapshot.budget)
    );
    Ok(())
}
