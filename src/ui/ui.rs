use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs},
    Frame,
};
use rust_decimal::prelude::*;

use crate::api::DataSourceStatus;
use crate::config::UiSettings;
use crate::model::wallet::{chain_name, ConnectionStatus, WalletConnection};
use crate::model::*;
use crate::portfolio::transactions::{filter_transactions, TransactionFilter, TransactionSummary};
use crate::portfolio::{
    filter_assets, search_and_rank, sort_assets, FilterCriteria, PerformanceBucket, SortDirection, SortKey,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Assets,
    Transactions,
    DefiNfts,
    Alerts,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Assets, Tab::Transactions, Tab::DefiNfts, Tab::Alerts];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Assets => "Assets",
            Tab::Transactions => "Transactions",
            Tab::DefiNfts => "DeFi & NFTs",
            Tab::Alerts => "Alerts",
        }
    }

    fn index(&self) -> usize {
        Tab::ALL.iter().position(|t| t == self).unwrap_or(0)
    }
}

/// Everything the data loop collects for one frame.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub assets: Vec<Asset>,
    pub snapshot: PortfolioSnapshot,
    pub transactions: Vec<Transaction>,
    pub transaction_summary: TransactionSummary,
    pub defi_positions: Vec<DefiPosition>,
    pub defi_apy: f64,
    pub nfts: Vec<NftHolding>,
    pub watchlist: Vec<WatchlistEntry>,
    pub net_worth: NetWorth,
    pub alerts: Vec<Alert>,
    pub source_status: DataSourceStatus,
    pub wallet_status: ConnectionStatus,
    pub wallet: Option<WalletConnection>,
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            assets: Vec::new(),
            snapshot: PortfolioSnapshot::default(),
            transactions: Vec::new(),
            transaction_summary: TransactionSummary::default(),
            defi_positions: Vec::new(),
            defi_apy: 0.0,
            nfts: Vec::new(),
            watchlist: Vec::new(),
            net_worth: NetWorth::default(),
            alerts: Vec::new(),
            source_status: DataSourceStatus::Disconnected,
            wallet_status: ConnectionStatus::Disconnected,
            wallet: None,
            last_update: None,
        }
    }
}

pub struct UIState {
    pub tab: Tab,
    pub scroll_offset: usize,
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,
    pub bucket: PerformanceBucket,
    pub query: String,
    pub searching: bool,
    pub high_change_threshold: f64,
    pub status_message: Option<String>,
    pub show_debug_info: bool,
    pub auto_scroll_alerts: bool,
    seen_alerts: usize,
}

impl UIState {
    pub fn new(high_change_threshold: f64) -> Self {
        Self {
            tab: Tab::Assets,
            scroll_offset: 0,
            sort_key: SortKey::Value,
            sort_direction: SortDirection::Desc,
            bucket: PerformanceBucket::All,
            query: String::new(),
            searching: false,
            high_change_threshold,
            status_message: None,
            show_debug_info: false,
            auto_scroll_alerts: true,
            seen_alerts: 0,
        }
    }

    pub fn with_ui_settings(mut self, settings: &UiSettings) -> Self {
        self.show_debug_info = settings.show_debug_info;
        self.auto_scroll_alerts = settings.auto_scroll_alerts;
        self
    }

    /// Keeps the alerts view steady as alerts arrive. Newest alerts render
    /// first, so auto-scroll jumps back to the top and otherwise the offset
    /// grows to keep the rows being read in place.
    pub fn note_alerts(&mut self, total: usize) {
        let added = total.saturating_sub(self.seen_alerts);
        self.seen_alerts = total;
        if added == 0 || self.tab != Tab::Alerts {
            return;
        }
        if self.auto_scroll_alerts {
            self.scroll_offset = 0;
        } else {
            self.scroll_offset += added;
        }
    }

    pub fn next_tab(&mut self) {
        let next = (self.tab.index() + 1) % Tab::ALL.len();
        self.tab = Tab::ALL[next];
        self.scroll_offset = 0;
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset += 1;
    }

    pub fn cycle_sort_key(&mut self) {
        self.sort_key = self.sort_key.next();
    }

    pub fn toggle_sort_direction(&mut self) {
        self.sort_direction = self.sort_direction.toggle();
    }

    pub fn cycle_bucket(&mut self) {
        self.bucket = self.bucket.next();
        self.scroll_offset = 0;
    }

    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            high_change_threshold: self.high_change_threshold,
            ..FilterCriteria::default()
        }
        .with_performance(self.bucket)
    }

    /// Rows for the assets table. A search query ranks by relevance,
    /// otherwise the chosen sort applies.
    pub fn visible_assets(&self, assets: &[Asset]) -> Vec<Asset> {
        let filtered = filter_assets(assets, &self.criteria());
        if self.query.trim().is_empty() {
            sort_assets(&filtered, self.sort_key, self.sort_direction)
        } else {
            search_and_rank(&filtered, &self.query)
        }
    }

    /// The search query also narrows transactions by asset or hash.
    pub fn visible_transactions(&self, transactions: &[Transaction]) -> Vec<Transaction> {
        let filter = TransactionFilter {
            query: Some(self.query.clone()),
            ..TransactionFilter::default()
        };
        filter_transactions(transactions, &filter)
    }
}

pub fn format_usd(value: Decimal) -> String {
    let dp = if value.abs() < Decimal::ONE && !value.is_zero() { 6 } else { 2 };
    let rounded = value.round_dp(dp);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.*}", dp as usize, rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    if fraction.is_empty() {
        format!("{}${}", sign, grouped)
    } else {
        format!("{}${}.{}", sign, grouped, fraction)
    }
}

pub fn format_pct(value: f64) -> String {
    format!("{:+.2}%", value)
}

fn change_color(value: f64) -> Color {
    if value > 0.0 {
        Color::Green
    } else if value < 0.0 {
        Color::Red
    } else {
        Color::Gray
    }
}

pub fn draw(f: &mut Frame, ui_state: &UIState, state: &DashboardState) {
    let size = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(size);

    draw_header(f, chunks[0], state);
    draw_summary(f, chunks[1], state);

    let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
    let tabs = Tabs::new(titles)
        .select(ui_state.tab.index())
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, chunks[2]);

    match ui_state.tab {
        Tab::Assets => draw_assets(f, chunks[3], ui_state, state),
        Tab::Transactions => draw_transactions(f, chunks[3], ui_state, state),
        Tab::DefiNfts => draw_defi_nfts(f, chunks[3], ui_state, state),
        Tab::Alerts => draw_alerts(f, chunks[3], ui_state, state),
    }

    draw_footer(f, chunks[4], ui_state, state);
}

fn draw_header(f: &mut Frame, area: Rect, state: &DashboardState) {
    let (wallet_text, wallet_color) = match (&state.wallet_status, &state.wallet) {
        (ConnectionStatus::Connected, Some(wallet)) => (
            format!(
                "👛 {} {} on {} | {:.4} native",
                wallet.provider,
                wallet.short_address(),
                chain_name(wallet.chain_id),
                wallet.balance
            ),
            Color::Green,
        ),
        (ConnectionStatus::Connecting, _) => ("👛 Connecting...".to_string(), Color::Yellow),
        (ConnectionStatus::Error(e), _) => (format!("👛 {}", e), Color::Red),
        _ => ("👛 No wallet connected".to_string(), Color::DarkGray),
    };

    let (source_text, source_color) = match &state.source_status {
        DataSourceStatus::Connected => ("● Data: live".to_string(), Color::Green),
        DataSourceStatus::Disconnected => ("● Data: offline".to_string(), Color::Red),
        DataSourceStatus::Error(e) => (format!("● Data: {}", e), Color::Yellow),
    };

    let updated = state
        .last_update
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());

    let header = Paragraph::new(Line::from(vec![
        Span::styled("FOLIO DECK  ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(wallet_text, Style::default().fg(wallet_color)),
        Span::raw("  "),
        Span::styled(source_text, Style::default().fg(source_color)),
        Span::styled(format!("  updated {}", updated), Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(header, area);
}

fn draw_summary(f: &mut Frame, area: Rect, state: &DashboardState) {
    let snapshot = &state.snapshot;
    let performer = |p: &Option<Performer>| {
        p.as_ref()
            .map(|p| format!("{} {}", p.symbol, format_pct(p.change_24h)))
            .unwrap_or_else(|| "-".to_string())
    };

    let lines = vec![
        Line::from(vec![
            Span::raw("Total "),
            Span::styled(format_usd(snapshot.total_value), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("   24h "),
            Span::styled(
                format!("{} ({})", format_usd(snapshot.change_24h_value), format_pct(snapshot.change_24h_pct)),
                Style::default().fg(change_color(snapshot.change_24h_pct)),
            ),
            Span::raw(format!("   Net worth {}", format_usd(state.net_worth.total))),
        ]),
        Line::from(vec![
            Span::raw("Best "),
            Span::styled(performer(&snapshot.best_performer), Style::default().fg(Color::Green)),
            Span::raw("   Worst "),
            Span::styled(performer(&snapshot.worst_performer), Style::default().fg(Color::Red)),
            Span::raw(format!("   {} assets", snapshot.asset_count)),
        ]),
        Line::from(vec![Span::raw("Top "), Span::raw(top_performers_line(&snapshot.top_performers))]),
    ];

    let summary = Paragraph::new(lines).block(Block::default().title("Portfolio").borders(Borders::ALL));
    f.render_widget(summary, area);
}

fn top_performers_line(performers: &[Performer]) -> String {
    if performers.is_empty() {
        return "-".to_string();
    }
    performers
        .iter()
        .map(|p| format!("{} {}", p.symbol, format_pct(p.change_24h)))
        .collect::<Vec<_>>()
        .join("  ")
}

fn draw_assets(f: &mut Frame, area: Rect, ui_state: &UIState, state: &DashboardState) {
    let assets = ui_state.visible_assets(&state.assets);

    let header = Row::new(vec!["Symbol", "Name", "Price", "24h", "Qty", "Value", "Alloc"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = assets
        .iter()
        .skip(ui_state.scroll_offset)
        .map(|asset| {
            let alloc = state.snapshot.allocation_of(&asset.symbol).unwrap_or(0.0);
            Row::new(vec![
                Cell::from(asset.symbol.clone()),
                Cell::from(asset.name.clone()),
                Cell::from(format_usd(asset.price)),
                Cell::from(format_pct(asset.change_24h)).style(Style::default().fg(change_color(asset.change_24h))),
                Cell::from(asset.quantity.normalize().to_string()),
                Cell::from(format_usd(asset.value())),
                Cell::from(format!("{:.1}%", alloc)),
            ])
        })
        .collect();

    let mut title = format!(
        "Assets ({}/{}) | sort {} {} | {}",
        assets.len(),
        state.assets.len(),
        ui_state.sort_key.label(),
        match ui_state.sort_direction {
            SortDirection::Asc => "↑",
            SortDirection::Desc => "↓",
        },
        ui_state.bucket.label()
    );
    if !ui_state.query.trim().is_empty() {
        title.push_str(&format!(" | search \"{}\"", ui_state.query));
    }

    let widths = [
        Constraint::Length(8),
        Constraint::Length(14),
        Constraint::Length(16),
        Constraint::Length(9),
        Constraint::Length(14),
        Constraint::Length(16),
        Constraint::Length(7),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(table, area);
}

fn draw_transactions(f: &mut Frame, area: Rect, ui_state: &UIState, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let summary = &state.transaction_summary;
    let summary_line = Paragraph::new(format!(
        "{} transactions | completed volume {} | {} pending | {} failed | gas {}",
        summary.count,
        format_usd(summary.completed_volume),
        summary.pending,
        summary.failed,
        summary.total_gas.normalize()
    ))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(summary_line, chunks[0]);

    let header = Row::new(vec!["Time", "Type", "Asset", "Amount", "Value", "Status"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let transactions = ui_state.visible_transactions(&state.transactions);
    let rows: Vec<Row> = transactions
        .iter()
        .skip(ui_state.scroll_offset)
        .map(|tx| {
            let status_color = match tx.status {
                TransactionStatus::Completed => Color::Green,
                TransactionStatus::Pending => Color::Yellow,
                TransactionStatus::Failed => Color::Red,
            };
            Row::new(vec![
                Cell::from(tx.timestamp.format("%m-%d %H:%M").to_string()),
                Cell::from(tx.kind.to_string()),
                Cell::from(tx.asset.clone()),
                Cell::from(tx.amount.normalize().to_string()),
                Cell::from(format_usd(tx.value_usd)),
                Cell::from(tx.status.to_string()).style(Style::default().fg(status_color)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(16),
        Constraint::Length(14),
        Constraint::Length(10),
    ];
    let mut title = format!("Transactions ({}/{})", transactions.len(), state.transactions.len());
    if !ui_state.query.trim().is_empty() {
        title.push_str(&format!(" | search \"{}\"", ui_state.query));
    }
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(table, chunks[1]);
}

fn draw_defi_nfts(f: &mut Frame, area: Rect, ui_state: &UIState, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let defi_rows: Vec<Row> = state
        .defi_positions
        .iter()
        .skip(ui_state.scroll_offset)
        .map(|p| {
            Row::new(vec![
                Cell::from(p.protocol.clone()),
                Cell::from(format!("{:?}", p.kind)),
                Cell::from(p.asset.clone()),
                Cell::from(format_usd(p.value)),
                Cell::from(format!("{:.2}%", p.apy)),
            ])
        })
        .collect();

    let defi = Table::new(
        defi_rows,
        [
            Constraint::Length(12),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(14),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(vec!["Protocol", "Type", "Asset", "Value", "APY"])
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
    )
    .block(
        Block::default()
            .title(format!(
                "DeFi | supplied {} borrowed {} | avg APY {:.2}%",
                format_usd(state.net_worth.defi_supplied),
                format_usd(state.net_worth.defi_borrowed),
                state.defi_apy
            ))
            .borders(Borders::ALL),
    );
    f.render_widget(defi, chunks[0]);

    let nft_rows: Vec<Row> = state
        .nfts
        .iter()
        .map(|n| {
            Row::new(vec![
                Cell::from(n.collection.clone()),
                Cell::from(format!("#{}", n.token_id)),
                Cell::from(format_usd(n.floor_price)),
            ])
        })
        .collect();

    let nfts = Table::new(
        nft_rows,
        [Constraint::Percentage(50), Constraint::Percentage(20), Constraint::Percentage(30)],
    )
    .header(
        Row::new(vec!["Collection", "Token", "Floor"])
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
    )
    .block(
        Block::default()
            .title(format!("NFTs | floor {}", format_usd(state.net_worth.nft_floor)))
            .borders(Borders::ALL),
    );
    f.render_widget(nfts, chunks[1]);
}

fn draw_alerts(f: &mut Frame, area: Rect, ui_state: &UIState, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(6)])
        .split(area);

    let lines: Vec<Line> = state
        .alerts
        .iter()
        .rev()
        .skip(ui_state.scroll_offset)
        .map(|alert| {
            let (icon, color) = match alert.level {
                AlertLevel::Critical => ("🔴", Color::Red),
                AlertLevel::Warning => ("🟡", Color::Yellow),
                AlertLevel::Info => ("🔵", Color::Cyan),
            };
            Line::from(vec![
                Span::styled(alert.timestamp.format("%H:%M:%S ").to_string(), Style::default().fg(Color::DarkGray)),
                Span::raw(format!("{} ", icon)),
                Span::styled(format!("{}: ", alert.metric), Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(alert.message.clone()),
            ])
        })
        .collect();

    let alerts = Paragraph::new(lines).block(
        Block::default()
            .title(format!("Alerts ({})", state.alerts.len()))
            .borders(Borders::ALL),
    );
    f.render_widget(alerts, chunks[0]);

    let watch: Vec<Line> = state
        .watchlist
        .iter()
        .map(|entry| {
            let target = entry
                .target_price
                .map(|t| format!(" target {}", format_usd(t)))
                .unwrap_or_default();
            Line::from(format!("{}{} (added {})", entry.symbol, target, entry.added_at.format("%Y-%m-%d")))
        })
        .collect();
    let watchlist = Paragraph::new(watch).block(Block::default().title("Watchlist").borders(Borders::ALL));
    f.render_widget(watchlist, chunks[1]);
}

fn draw_footer(f: &mut Frame, area: Rect, ui_state: &UIState, state: &DashboardState) {
    let content = if ui_state.searching {
        Line::from(vec![
            Span::styled("Search: ", Style::default().fg(Color::Yellow)),
            Span::raw(ui_state.query.clone()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
        ])
    } else if let Some(message) = &ui_state.status_message {
        Line::from(Span::styled(message.clone(), Style::default().fg(Color::Cyan)))
    } else {
        Line::from(Span::styled(
            "q quit | tab switch | s sort | o order | f filter | / search | c connect | d disconnect | r refresh | h help",
            Style::default().fg(Color::DarkGray),
        ))
    };

    let mut block = Block::default().borders(Borders::ALL);
    if ui_state.show_debug_info {
        block = block.title(format!(
            "debug | {} offset {} | {} assets {} txs {} alerts | wallet {}",
            ui_state.tab.title(),
            ui_state.scroll_offset,
            state.assets.len(),
            state.transactions.len(),
            state.alerts.len(),
            state.wallet_status.label()
        ));
    }
    let footer = Paragraph::new(content).alignment(Alignment::Center).block(block);
    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn assets() -> Vec<Asset> {
        vec![
            Asset::new("BTC", "Bitcoin", dec!(43000), dec!(1), 2.0),
            Asset::new("ETH", "Ethereum", dec!(2500), dec!(2), -1.0),
            Asset::new("UNI", "Uniswap", dec!(6), dec!(100), 12.0),
        ]
    }

    #[test]
    fn formats_usd_with_grouping() {
        assert_eq!(format_usd(dec!(48000)), "$48,000.00");
        assert_eq!(format_usd(dec!(1234567.891)), "$1,234,567.89");
        assert_eq!(format_usd(dec!(-950.5)), "-$950.50");
        assert_eq!(format_usd(dec!(0.0000012)), "$0.000001");
        assert_eq!(format_usd(Decimal::ZERO), "$0.00");
    }

    #[test]
    fn tabs_wrap_around() {
        let mut ui_state = UIState::new(10.0);
        ui_state.scroll_down();
        for _ in 0..Tab::ALL.len() {
            ui_state.next_tab();
        }
        assert_eq!(ui_state.tab, Tab::Assets);
        assert_eq!(ui_state.scroll_offset, 0);
    }

    #[test]
    fn visible_assets_sorts_by_value_by_default() {
        let ui_state = UIState::new(10.0);
        let symbols: Vec<String> = ui_state.visible_assets(&assets()).into_iter().map(|a| a.symbol).collect();
        assert_eq!(symbols, vec!["BTC", "ETH", "UNI"]);
    }

    #[test]
    fn visible_assets_applies_bucket_and_search() {
        let mut ui_state = UIState::new(10.0);
        ui_state.cycle_bucket();
        let gainers: Vec<String> = ui_state.visible_assets(&assets()).into_iter().map(|a| a.symbol).collect();
        assert_eq!(gainers, vec!["BTC", "UNI"]);

        ui_state.query = "u".to_string();
        let searched: Vec<String> = ui_state.visible_assets(&assets()).into_iter().map(|a| a.symbol).collect();
        assert_eq!(searched, vec!["UNI"]);
    }

    fn transaction(id: &str, asset: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            kind: TransactionKind::Buy,
            asset: asset.to_string(),
            amount: dec!(1),
            value_usd: dec!(100),
            timestamp: Utc::now(),
            status: TransactionStatus::Completed,
            chain: None,
        }
    }

    #[test]
    fn search_narrows_transactions() {
        let transactions = vec![transaction("1", "BTC"), transaction("2", "ETH"), transaction("3", "WBTC")];
        let mut ui_state = UIState::new(10.0);
        assert_eq!(ui_state.visible_transactions(&transactions).len(), 3);

        ui_state.query = "btc".to_string();
        let ids: Vec<String> = ui_state.visible_transactions(&transactions).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn new_alerts_scroll_back_to_the_newest() {
        let mut ui_state = UIState::new(10.0);
        ui_state.note_alerts(3);
        ui_state.tab = Tab::Alerts;
        ui_state.scroll_offset = 2;

        ui_state.note_alerts(5);
        assert_eq!(ui_state.scroll_offset, 0);
    }

    #[test]
    fn without_auto_scroll_the_viewed_alerts_stay_put() {
        let settings = UiSettings {
            refresh_rate_ms: 250,
            show_debug_info: true,
            auto_scroll_alerts: false,
        };
        let mut ui_state = UIState::new(10.0).with_ui_settings(&settings);
        assert!(ui_state.show_debug_info);
        ui_state.note_alerts(3);
        ui_state.tab = Tab::Alerts;
        ui_state.scroll_offset = 2;

        ui_state.note_alerts(5);
        assert_eq!(ui_state.scroll_offset, 4);
        ui_state.note_alerts(5);
        assert_eq!(ui_state.scroll_offset, 4);
    }

    #[test]
    fn top_performers_line_lists_each_symbol() {
        let snapshot = crate::portfolio::compute_snapshot_with(&assets(), 2);
        assert_eq!(top_performers_line(&snapshot.top_performers), "UNI +12.00%  BTC +2.00%");
        assert_eq!(top_performers_line(&[]), "-");
    }
}
