// ============================================================================
// purge-gate - command line harness for the /Purge access gate
// ============================================================================
// Usage:
//   purge-gate new-tab                 Open a simulated tab and make it current
//   purge-gate login IMPOOR            Run the landing page key prompt
//   purge-gate visit /tools.html       Load a page through the gate
//   purge-gate check-auth              Print the current session
//   purge-gate clear-auth              Wipe the current tab's session
//   purge-gate test-key UNHIIN         Check a key without logging in
//   purge-gate tabs                    List simulated tabs
//   purge-gate close-tab               Close the current tab
// ============================================================================

use anyhow::{anyhow, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use gate_core::{
    AccessGate, AuthFlow, DbTab, FlowDelays, GateConfig, LandingOutcome, PageDecision, PageKind,
    RecordingSurface, SubmitOutcome, SurfaceEvent, TabDb,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Drive the /Purge access gate from the terminal
#[derive(Parser)]
#[command(name = "purge-gate", version, about = "Simulate the /Purge key gate in a terminal tab")]
struct Cli {
    /// Path to the tab database (default: ~/.purge/tabs.redb)
    #[arg(long, global = true)]
    db_path: Option<String>,

    /// Tab to act on (default: the most recently opened tab)
    #[arg(long, global = true)]
    tab: Option<String>,

    /// JSON gate config (default: PURGE_GATE_CONFIG or built-in)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip the cosmetic pauses between flow stages
    #[arg(long, global = true)]
    no_delay: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a new empty tab and make it current
    NewTab,

    /// List open tabs
    Tabs,

    /// Close a tab and drop its storage
    CloseTab,

    /// Enter a key on the landing page
    Login {
        /// The key as typed
        key: String,
    },

    /// Load a page, e.g. /tools.html or index.html
    Visit {
        path: String,
    },

    /// Print the current session (debug hook)
    CheckAuth,

    /// Clear the current session (debug hook)
    ClearAuth,

    /// Check what a key would unlock without logging in (debug hook)
    TestKey {
        key: String,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gate_core=info,purge_gate=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn format_timestamp(ts_ms: i64) -> String {
    Utc.timestamp_millis_opt(ts_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("(invalid: {})", ts_ms))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file, if present
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let mut config = GateConfig::load(cli.config.as_deref())?;
    if cli.no_delay {
        config.delays = FlowDelays::none();
    }

    let db = TabDb::open(cli.db_path.as_deref())?;

    match cli.command {
        Commands::NewTab => cmd_new_tab(&db),
        Commands::Tabs => cmd_tabs(&db),
        Commands::CloseTab => cmd_close_tab(&db, cli.tab),
        Commands::Login { key } => cmd_login(&db, cli.tab, config, &key).await,
        Commands::Visit { path } => cmd_visit(&db, cli.tab, config, &path).await,
        Commands::CheckAuth => cmd_check_auth(&db, cli.tab, config),
        Commands::ClearAuth => cmd_clear_auth(&db, cli.tab, config),
        Commands::TestKey { key } => cmd_test_key(config, &key),
    }
}

/// Tab named on the command line, else the current one
fn resolve_tab(db: &TabDb, tab: Option<String>) -> Result<DbTab> {
    let tab_id = match tab {
        Some(id) => id,
        None => db
            .current_tab()?
            .ok_or_else(|| anyhow!("No open tab. Run `purge-gate new-tab` first."))?,
    };
    db.tab(&tab_id)
}

/// Like `resolve_tab`, but opens a tab when none is current
fn login_tab(db: &TabDb, tab: Option<String>) -> Result<DbTab> {
    let tab_id = match tab {
        Some(id) => id,
        None => match db.current_tab()? {
            Some(id) => id,
            None => {
                let opened = db.open_tab()?;
                println!("Opened tab {}", opened.tab_id);
                opened.tab_id
            }
        },
    };
    db.tab(&tab_id)
}

fn category_links(config: &GateConfig) -> Vec<String> {
    config.pages.premium_pages.clone()
}

fn print_events(events: &[SurfaceEvent]) {
    for event in events {
        match event {
            SurfaceEvent::OverlayShown => println!("  [overlay] shown"),
            SurfaceEvent::OverlayFading => println!("  [overlay] fading out"),
            SurfaceEvent::OverlayHidden => println!("  [overlay] hidden"),
            SurfaceEvent::SubmitLoading { loading } => {
                println!("  [submit] {}", if *loading { "loading" } else { "ready" })
            }
            SurfaceEvent::Status { message, kind } => println!("  [status:{:?}] {}", kind, message),
            SurfaceEvent::InputShaken => println!("  [input] shake"),
            SurfaceEvent::CategoryUnlocked(unlock) => {
                let state = if unlock.restricted { "locked" } else { "open" };
                match &unlock.hint {
                    Some(hint) => println!("  [category] {:<10} {} ({})", unlock.category, state, hint),
                    None => println!("  [category] {:<10} {}", unlock.category, state),
                }
            }
            SurfaceEvent::AnnouncementShown => println!("  [announcement] shown"),
            SurfaceEvent::AnnouncementHidden => println!("  [announcement] hidden"),
        }
    }
}

fn cmd_new_tab(db: &TabDb) -> Result<()> {
    let tab = db.open_tab()?;
    println!("Opened tab {}", tab.tab_id);
    Ok(())
}

fn cmd_tabs(db: &TabDb) -> Result<()> {
    let tabs = db.list_tabs()?;
    if tabs.is_empty() {
        println!("No open tabs.");
        return Ok(());
    }

    let current = db.current_tab()?;
    println!("{:<2} {:<36}  {:<22}  {}", "", "TAB ID", "OPENED AT", "ITEMS");
    println!("{}", "-".repeat(72));
    for tab in &tabs {
        let marker = if current.as_deref() == Some(tab.tab_id.as_str()) { "*" } else { "" };
        println!(
            "{:<2} {:<36}  {:<22}  {}",
            marker,
            tab.tab_id,
            format_timestamp(tab.opened_at),
            tab.items
        );
    }
    println!("\nTotal: {} tabs (database: {})", tabs.len(), db.path().display());
    Ok(())
}

fn cmd_close_tab(db: &TabDb, tab: Option<String>) -> Result<()> {
    let tab = resolve_tab(db, tab)?;
    db.close_tab(tab.tab_id())?;
    println!("Closed tab {}", tab.tab_id());
    Ok(())
}

async fn cmd_login(db: &TabDb, tab: Option<String>, config: GateConfig, key: &str) -> Result<()> {
    let tab = login_tab(db, tab)?;
    let mut surface = RecordingSurface::full(category_links(&config));
    let gate = AccessGate::new(config, tab);
    let mut flow = AuthFlow::new(&gate);

    if let LandingOutcome::AlreadyAuthenticated(tier) = flow.init_landing(&mut surface).await? {
        println!("Already signed in ({} tier); submitting new key anyway.", tier);
    }
    print_events(&surface.take_events());

    let outcome = flow.submit_key(key, &mut surface).await?;
    print_events(&surface.take_events());

    match outcome {
        SubmitOutcome::Granted { tier, .. } => {
            info!("Login succeeded");
            println!("Signed in: {} tier", tier);
        }
        SubmitOutcome::Rejected(reason) => {
            println!("Key rejected ({:?})", reason);
        }
    }
    Ok(())
}

async fn cmd_visit(db: &TabDb, tab: Option<String>, config: GateConfig, path: &str) -> Result<()> {
    let tab = resolve_tab(db, tab)?;
    let mut surface = RecordingSurface::full(category_links(&config));
    let gate = AccessGate::new(config, tab);

    match gate.classify(path) {
        PageKind::Landing => {
            let mut flow = AuthFlow::new(&gate);
            let outcome = flow.init_landing(&mut surface).await?;
            print_events(surface.events());
            match outcome {
                LandingOutcome::AlreadyAuthenticated(tier) => println!("Landing page: signed in ({})", tier),
                LandingOutcome::AwaitingKey => println!("Landing page: enter a key with `purge-gate login <KEY>`"),
                LandingOutcome::Unavailable => println!("Landing page: no key prompt"),
            }
        }
        PageKind::Protected(page) => {
            let pages = &gate.config().pages;
            match gate.protect_page(&page)? {
                PageDecision::Allow(tier) => println!("{}: access granted ({})", page, tier),
                PageDecision::Exempt => println!("{}: no check", page),
                PageDecision::RedirectToLanding => {
                    println!("{}: no valid session -> {}", page, pages.landing_page)
                }
                PageDecision::RedirectToBlocked => {
                    println!("{}: tier too low -> {}", page, pages.blocked_page)
                }
            }
        }
    }
    Ok(())
}

fn cmd_check_auth(db: &TabDb, tab: Option<String>, config: GateConfig) -> Result<()> {
    let tab = resolve_tab(db, tab)?;
    let gate = AccessGate::new(config, tab);

    match gate.check_session()? {
        Some(session) => {
            let expires = session.expires_at(gate.store().ttl_secs());
            println!("{} user ({})", session.tier.as_str().to_uppercase(), session.key);
            println!("  issued:  {}", format_timestamp(session.issued_at));
            println!("  expires: {}", format_timestamp(expires));
            println!("  stamp:   {}", session.checksum);
        }
        None => println!("No active session"),
    }
    Ok(())
}

fn cmd_clear_auth(db: &TabDb, tab: Option<String>, config: GateConfig) -> Result<()> {
    let tab = resolve_tab(db, tab)?;
    let gate = AccessGate::new(config, tab);
    gate.logout()?;
    println!("Session cleared - reload page");
    Ok(())
}

fn cmd_test_key(config: GateConfig, key: &str) -> Result<()> {
    let validation = config.keys.validate(key);
    let report = serde_json::json!({
        "input": key,
        "valid": validation.valid,
        "tier": validation.tier,
        "pages": validation
            .tier
            .map(|tier| {
                config
                    .pages
                    .premium_pages
                    .iter()
                    .filter(|p| config.pages.can_access(Some(tier), p))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
