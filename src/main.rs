use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen},
};
use log::{debug, error, info, warn};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{collections::HashSet, io, sync::Arc, time::Duration};
use tokio::sync::{broadcast::error::RecvError, mpsc, Notify, RwLock};

use folio_deck::alert;
use folio_deck::api::{BackendSource, MockSource, PortfolioSource, RealtimeFeed, Table};
use folio_deck::config::{self, Config, OperatingMode};
use folio_deck::model::wallet::ProviderId;
use folio_deck::model::*;
use folio_deck::portfolio::{
    self,
    transactions::{sort_transactions, summarize_transactions, TransactionSortKey},
    SortDirection,
};
use folio_deck::ui::{self, DashboardState, UIState};
use folio_deck::wallet::demo::DemoWalletProvider;
use folio_deck::wallet::{ProviderRegistry, WalletCoordinator};

#[derive(Parser)]
#[command(name = "folio-deck")]
#[command(about = "Terminal crypto portfolio dashboard with wallet connections")]
struct Args {
    #[arg(long)]
    generate_config: bool,

    #[arg(short, long)]
    config: Option<String>,

    /// Use generated demo data and the demo wallet regardless of config.
    #[arg(long)]
    demo: bool,

    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        tui_logger::init_logger(log::LevelFilter::Debug)?;
        tui_logger::set_default_level(log::LevelFilter::Debug);
    }

    print_startup_banner();

    if args.generate_config {
        config::generate_sample_config()?;
        println!("✅ Sample configuration generated at config.toml");
        return Ok(());
    }

    let mut config = config::load_config(args.config.as_deref())?;
    if args.demo {
        config.operating_mode = OperatingMode::Demo;
    }

    match config.operating_mode {
        OperatingMode::Live => run_live_mode(config, args.debug).await,
        OperatingMode::Demo => run_demo_mode(config, args.debug).await,
    }
}

pub fn print_startup_banner() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                        FOLIO DECK                            ║");
    println!("║                                                              ║");
    println!("║            Crypto Portfolio & Wallet Dashboard               ║");
    println!("║                                                              ║");
    println!("║   Assets | Transactions | DeFi & NFTs | Alerts | Wallets     ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

async fn run_live_mode(config: Config, debug_mode: bool) -> Result<()> {
    info!("🚀 Starting live mode (debug: {})", debug_mode);

    let source = BackendSource::new(&config.backend)?;
    let registry = ProviderRegistry::from_settings(&config.wallet);
    let coordinator = WalletCoordinator::new(registry, &config.wallet);

    let refresh = Arc::new(Notify::new());

    if let Some(url) = config.backend.realtime_url.clone() {
        let feed = RealtimeFeed::new(url, config.backend.api_key.clone(), config.backend.user_id.clone());
        match feed.connect_and_subscribe(&Table::ALL).await {
            Ok(()) => {
                let mut changes = feed.subscribe();
                let refresh = refresh.clone();
                tokio::spawn(async move {
                    // Keeps the feed alive for as long as changes arrive.
                    let _feed = feed;
                    loop {
                        match changes.recv().await {
                            Ok(change) => {
                                info!("🔄 Backend {:?} on {}, refreshing", change.event, change.table);
                                refresh.notify_one();
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                warn!("⚠️ Missed {} realtime changes, refreshing", skipped);
                                refresh.notify_one();
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                });
            }
            Err(e) => warn!("⚠️ Realtime feed unavailable, falling back to polling: {}", e),
        }
    }

    run_dashboard(source, coordinator, config, refresh, debug_mode).await
}

async fn run_demo_mode(mut config: Config, debug_mode: bool) -> Result<()> {
    info!("🧪 Starting demo mode (debug: {})", debug_mode);

    let registry = ProviderRegistry::new().with(Arc::new(DemoWalletProvider::new()));
    config.wallet.default_provider = ProviderId::Demo.to_string();
    let coordinator = WalletCoordinator::new(registry, &config.wallet);

    run_dashboard(MockSource::new(), coordinator, config, Arc::new(Notify::new()), debug_mode).await
}

async fn run_dashboard<S: PortfolioSource + 'static>(
    source: S,
    coordinator: WalletCoordinator,
    config: Config,
    refresh: Arc<Notify>,
    debug_mode: bool,
) -> Result<()> {
    let source = Arc::new(source);
    let state = Arc::new(RwLock::new(DashboardState::default()));

    let state_clone = state.clone();
    let config_clone = config.clone();
    let refresh_clone = refresh.clone();

    tokio::spawn(async move {
        data_collection_loop(source, state_clone, config_clone, refresh_clone).await;
    });

    run_ui(state, coordinator, config, refresh, debug_mode).await
}

async fn data_collection_loop<S: PortfolioSource>(
    source: Arc<S>,
    state: Arc<RwLock<DashboardState>>,
    config: Config,
    refresh: Arc<Notify>,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(config.portfolio.refresh_interval_ms));
    let mut update_counter: u32 = 0;
    let mut raised: HashSet<String> = HashSet::new();

    info!(
        "📡 Starting data collection loop (interval: {}ms)",
        config.portfolio.refresh_interval_ms
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = refresh.notified() => debug!("🔄 Refresh requested"),
        }
        update_counter += 1;

        debug!("📊 Starting portfolio update cycle #{}", update_counter);

        match update_dashboard(&*source, &config).await {
            Ok((mut fresh, price_alerts)) => {
                let new_alerts = alert::check_alerts(&fresh.snapshot, &fresh.assets, &price_alerts, &config.alert_thresholds);

                // Only conditions that were not already firing last cycle are recorded.
                let keys: HashSet<String> = new_alerts.iter().map(alert_key).collect();
                let fresh_alerts: Vec<Alert> = new_alerts
                    .into_iter()
                    .filter(|a| !raised.contains(&alert_key(a)))
                    .collect();
                raised = keys;

                let mut guard = state.write().await;
                fresh.alerts = std::mem::take(&mut guard.alerts);
                if !fresh_alerts.is_empty() {
                    info!("🔔 Generated {} new alerts", fresh_alerts.len());
                    fresh.alerts.extend(fresh_alerts);
                }
                let max_alerts = config.alert_thresholds.max_alerts.max(1);
                if fresh.alerts.len() > max_alerts {
                    let excess = fresh.alerts.len() - max_alerts;
                    fresh.alerts.drain(0..excess);
                }
                *guard = fresh;

                if update_counter % 10 == 0 {
                    info!(
                        "📊 Data update #{} - Total: ${:.2}, 24h: {:+.2}%, Assets: {}",
                        update_counter,
                        guard.snapshot.total_value,
                        guard.snapshot.change_24h_pct,
                        guard.snapshot.asset_count
                    );
                }
            }
            Err(e) => {
                error!("❌ Failed to update portfolio (attempt #{}): {}", update_counter, e);
                state.write().await.source_status = source.get_status().await;

                if update_counter % 5 == 0 {
                    warn!("⚠️ Portfolio update has been failing for {} attempts", update_counter);
                }
            }
        }
    }
}

fn alert_key(alert: &Alert) -> String {
    format!("{:?}:{}", alert.level, alert.metric)
}

async fn update_dashboard<S: PortfolioSource + ?Sized>(
    source: &S,
    config: &Config,
) -> Result<(DashboardState, Vec<PriceAlert>)> {
    debug!("📊 Fetching data from source...");

    let assets = source.get_assets().await.map_err(|e| {
        error!("❌ Failed to get assets: {}", e);
        e
    })?;

    let transactions = source.get_transactions().await.map_err(|e| {
        error!("❌ Failed to get transactions: {}", e);
        e
    })?;

    let defi_positions = source.get_defi_positions().await.map_err(|e| {
        error!("❌ Failed to get DeFi positions: {}", e);
        e
    })?;

    let nfts = source.get_nfts().await.map_err(|e| {
        error!("❌ Failed to get NFTs: {}", e);
        e
    })?;

    let watchlist = source.get_watchlist().await.unwrap_or_else(|e| {
        warn!("⚠️ Failed to get watchlist: {}", e);
        Vec::new()
    });

    let price_alerts = source.get_price_alerts().await.unwrap_or_else(|e| {
        warn!("⚠️ Failed to get price alerts: {}", e);
        Vec::new()
    });

    let snapshot = portfolio::compute_snapshot_with(&assets, config.portfolio.top_performers);
    let net_worth = portfolio::compute_net_worth(&snapshot, &defi_positions, &nfts);
    let transactions = sort_transactions(&transactions, TransactionSortKey::Timestamp, SortDirection::Desc);

    debug!("📊 Calculated snapshot for {} assets", snapshot.asset_count);

    let state = DashboardState {
        transaction_summary: summarize_transactions(&transactions),
        defi_apy: portfolio::weighted_apy(&defi_positions),
        assets,
        snapshot,
        transactions,
        defi_positions,
        nfts,
        watchlist,
        net_worth,
        source_status: source.get_status().await,
        last_update: Some(chrono::Utc::now()),
        ..DashboardState::default()
    };

    Ok((state, price_alerts))
}

async fn run_ui(
    state: Arc<RwLock<DashboardState>>,
    coordinator: WalletCoordinator,
    config: Config,
    refresh: Arc<Notify>,
    debug_mode: bool,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut ui_state = UIState::new(config.portfolio.high_change_threshold).with_ui_settings(&config.ui_settings);
    let mut last_alert_count = 0;
    let mut update_counter: u64 = 0;

    let providers = coordinator.providers();
    let mut selected_provider = providers
        .iter()
        .position(|p| p.as_str() == config.wallet.default_provider)
        .unwrap_or(0);

    let (status_tx, mut status_rx) = mpsc::unbounded_channel::<String>();

    show_loading_screen(&mut terminal, &config)?;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    info!("🎨 Starting UI loop (debug: {})", debug_mode);

    loop {
        update_counter += 1;

        while let Ok(message) = status_rx.try_recv() {
            ui_state.status_message = Some(message);
        }

        let mut frame_state = state.read().await.clone();
        frame_state.wallet_status = coordinator.status().await;
        frame_state.wallet = coordinator.active_connection().await;

        if debug_mode && update_counter % 100 == 0 {
            debug!(
                "📊 UI Update #{} - Total: ${:.2}, Wallet: {}, Last Update: {:?}",
                update_counter,
                frame_state.snapshot.total_value,
                frame_state.wallet_status.label(),
                frame_state.last_update
            );
        }

        check_critical_alerts(&frame_state.alerts, &mut last_alert_count);
        ui_state.note_alerts(frame_state.alerts.len());

        terminal.draw(|f| ui::draw(f, &ui_state, &frame_state))?;

        if !event::poll(Duration::from_millis(config.ui_settings.refresh_rate_ms))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        if ui_state.searching {
            match key.code {
                KeyCode::Enter => ui_state.searching = false,
                KeyCode::Esc => {
                    ui_state.searching = false;
                    ui_state.query.clear();
                }
                KeyCode::Backspace => {
                    ui_state.query.pop();
                }
                KeyCode::Char(c) => ui_state.query.push(c),
                _ => {}
            }
            ui_state.scroll_offset = 0;
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                if key.modifiers.contains(KeyModifiers::CONTROL) || key.modifiers.is_empty() {
                    info!("👋 User requested quit");
                    break;
                }
            }
            KeyCode::Esc => {
                info!("👋 User pressed escape");
                break;
            }
            KeyCode::Tab => {
                ui_state.next_tab();
                debug!("📑 Switched to {} tab", ui_state.tab.title());
            }
            KeyCode::Up => ui_state.scroll_up(),
            KeyCode::Down => ui_state.scroll_down(),
            KeyCode::PageUp => {
                for _ in 0..10 {
                    ui_state.scroll_up();
                }
            }
            KeyCode::PageDown => {
                for _ in 0..10 {
                    ui_state.scroll_down();
                }
            }
            KeyCode::Home => ui_state.scroll_offset = 0,
            KeyCode::Char('s') | KeyCode::Char('S') => ui_state.cycle_sort_key(),
            KeyCode::Char('o') | KeyCode::Char('O') => ui_state.toggle_sort_direction(),
            KeyCode::Char('f') | KeyCode::Char('F') => ui_state.cycle_bucket(),
            KeyCode::Char('/') => {
                ui_state.searching = true;
                ui_state.status_message = None;
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                if !providers.is_empty() {
                    selected_provider = (selected_provider + 1) % providers.len();
                    ui_state.status_message = Some(format!("Wallet provider: {}", providers[selected_provider]));
                }
            }
            KeyCode::Char('c') | KeyCode::Char('C') => match providers.get(selected_provider) {
                Some(provider) => {
                    let coordinator = coordinator.clone();
                    let status_tx = status_tx.clone();
                    let provider = *provider;
                    ui_state.status_message = Some(format!("Connecting to {}...", provider));
                    tokio::spawn(async move {
                        let message = match coordinator.connect(provider.as_str()).await {
                            Ok(connection) => format!("✅ Connected {}", connection.short_address()),
                            Err(e) => format!("❌ {} [{}]", e, e.code()),
                        };
                        let _ = status_tx.send(message);
                    });
                }
                None => ui_state.status_message = Some("No wallet providers configured".to_string()),
            },
            KeyCode::Char('d') | KeyCode::Char('D') => {
                let coordinator = coordinator.clone();
                let status_tx = status_tx.clone();
                tokio::spawn(async move {
                    let message = match coordinator.disconnect().await {
                        Ok(()) => "👋 Wallet disconnected".to_string(),
                        Err(e) => format!("⚠️ Disconnected locally: {}", e),
                    };
                    let _ = status_tx.send(message);
                });
            }
            KeyCode::Char('b') | KeyCode::Char('B') => {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    if let Err(e) = coordinator.refresh_balance().await {
                        warn!("⚠️ Balance refresh failed: {}", e);
                    }
                });
            }
            KeyCode::Char('r') | KeyCode::Char('R') | KeyCode::F(5) => {
                info!("🔄 User requested refresh");
                ui_state.scroll_offset = 0;
                refresh.notify_one();
            }
            KeyCode::Char('w') | KeyCode::Char('W') => {
                info!("💾 Saving configuration");
                if let Err(e) = config::save_config_to_file(&config, "config.toml") {
                    error!("❌ Failed to save configuration: {}", e);
                } else {
                    info!("✅ Configuration saved to config.toml");
                }
            }
            KeyCode::Char('h') | KeyCode::Char('H') => {
                info!("❓ Showing help screen");
                show_help_screen(&mut terminal, &config, debug_mode)?;
            }
            _ => {}
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

fn show_loading_screen(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, config: &Config) -> Result<()> {
    use ratatui::{
        layout::{Alignment, Constraint, Direction, Layout},
        style::{Color, Modifier, Style},
        text::{Line, Span},
        widgets::{Block, Borders, Paragraph},
    };

    let demo = config.operating_mode == OperatingMode::Demo;

    terminal.draw(|f| {
        let size = f.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(30),
                Constraint::Length(12),
                Constraint::Percentage(58),
            ])
            .split(size);

        let title = Paragraph::new(vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                "💼  FOLIO DECK",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(vec![Span::styled(
                "Crypto Portfolio & Wallet Dashboard",
                Style::default().fg(Color::White),
            )]),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));

        let mode_text = if demo { "DEMO MODE - Simulated Data" } else { "LIVE MODE - Backend Data" };
        let mode_color = if demo { Color::Yellow } else { Color::Green };
        let endpoint = if demo { "built-in demo data".to_string() } else { config.backend.rest_url.clone() };

        let loading = Paragraph::new(vec![
            Line::from(vec![Span::styled(
                mode_text,
                Style::default().fg(mode_color).add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(vec![
                Span::raw("Data Source: "),
                Span::styled(endpoint, Style::default().fg(Color::Cyan)),
            ]),
            Line::from(vec![
                Span::raw("Default Wallet: "),
                Span::styled(config.wallet.default_provider.clone(), Style::default().fg(Color::Yellow)),
            ]),
            Line::from(vec![
                Span::raw("Refresh Interval: "),
                Span::styled(
                    format!("{}ms", config.portfolio.refresh_interval_ms),
                    Style::default().fg(Color::Green),
                ),
            ]),
            Line::from(""),
            Line::from("Loading holdings, transactions and DeFi positions..."),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().title("Initializing").borders(Borders::ALL));

        f.render_widget(title, chunks[0]);
        f.render_widget(loading, chunks[1]);
    })?;

    Ok(())
}

fn show_help_screen(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &Config,
    debug_mode: bool,
) -> Result<()> {
    use ratatui::{
        layout::{Alignment, Constraint, Direction, Layout},
        style::{Color, Modifier, Style},
        text::{Line, Span},
        widgets::{Block, Borders, Paragraph},
    };

    let demo = config.operating_mode == OperatingMode::Demo;
    let section = |name: &'static str| {
        Line::from(vec![Span::styled(
            name,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )])
    };

    terminal.draw(|f| {
        let size = f.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        let title = Paragraph::new(format!(
            "Help - Folio Deck ({})",
            if demo { "DEMO MODE" } else { "LIVE MODE" }
        ))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));

        let help_text = Paragraph::new(vec![
            section("NAVIGATION"),
            Line::from("Tab                 - Switch between tabs"),
            Line::from("↑/↓ Arrow Keys      - Scroll content"),
            Line::from("Page Up/Page Down   - Fast scroll"),
            Line::from("Home                - Jump to top"),
            Line::from(""),
            section("ASSETS"),
            Line::from("S                   - Cycle sort column"),
            Line::from("O                   - Toggle ascending/descending"),
            Line::from("F                   - Cycle gainers/losers filter"),
            Line::from("/                   - Search by symbol or name (Enter keeps, Esc clears)"),
            Line::from(""),
            section("WALLET"),
            Line::from("P                   - Choose wallet provider"),
            Line::from("C                   - Connect selected provider"),
            Line::from("D                   - Disconnect"),
            Line::from("B                   - Refresh wallet balance"),
            Line::from(""),
            section("CONTROLS"),
            Line::from("Q or Ctrl+Q / Esc   - Quit application"),
            Line::from("R or F5             - Refresh data now"),
            Line::from("W                   - Save configuration"),
            Line::from("H                   - Show this help"),
            Line::from(""),
            section("CURRENT SESSION"),
            Line::from(format!("Mode: {}", if demo { "DEMO (Simulated Data)" } else { "LIVE (Backend Data)" })),
            Line::from(format!("Debug: {}", if debug_mode { "ENABLED" } else { "DISABLED" })),
            Line::from(format!("Supported chains: {:?}", config.wallet.supported_chains)),
            Line::from(""),
            Line::from("Press any key to return to dashboard..."),
        ])
        .block(Block::default().borders(Borders::ALL));

        let footer = Paragraph::new("Portfolio values are estimates from the latest market data")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));

        f.render_widget(title, chunks[0]);
        f.render_widget(help_text, chunks[1]);
        f.render_widget(footer, chunks[2]);
    })?;

    loop {
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(_) = event::read()? {
                break;
            }
        }
    }

    Ok(())
}

fn check_critical_alerts(alerts: &[Alert], last_count: &mut usize) {
    let critical_alerts: Vec<_> = alerts
        .iter()
        .filter(|alert| alert.level == AlertLevel::Critical)
        .collect();

    let current_critical_count = critical_alerts.len();

    if current_critical_count > *last_count {
        let new_alerts_count = current_critical_count - *last_count;
        warn!("🔴 {} new critical alert(s) detected!", new_alerts_count);

        for alert in critical_alerts.iter().rev().take(new_alerts_count) {
            error!("CRITICAL: {} - {}", alert.metric, alert.message);
        }
    }

    *last_count = current_critical_count;
}
