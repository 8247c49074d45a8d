use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use std::io::stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strum::IntoEnumIterator;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::Backend;
use crate::app::{App, Effect, FlashKind};
use crate::callback::{landing_from_launch_url, CallbackListener};
use crate::config::Config;
use crate::dispatch::{Completion, Dispatcher};
use crate::form::{Field, FormMode};
use crate::models::{JobApplication, JobQuery, JobStatus};
use crate::store::QueryStatus;
use crate::table::{SortColumn, SortDirection};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(config: &Config, backend: Arc<dyn Backend>, launch_url: Option<&str>) -> Result<()> {
    let mut app = App::new(JobQuery {
        limit: Some(config.effective_page_limit()),
        ..Default::default()
    });

    if let Some(raw) = launch_url {
        if let Some(landing) = landing_from_launch_url(raw)? {
            tracing::info!(url = %landing.clean_url, "launched from auth landing");
            app.handle_auth_landing(landing.email);
        }
    }

    let (dispatcher, mut completions) = Dispatcher::new(backend)?;

    if config.listen_for_callback {
        match config
            .frontend_base()
            .and_then(|url| CallbackListener::bind(&url))
        {
            Ok(listener) => {
                tracing::info!(port = ?listener.local_port(), "listening for auth callback");
                listener.spawn(dispatcher.sender());
            }
            // Another process (usually the web frontend) owns the port.
            Err(e) => tracing::warn!(error = %e, "auth callback listener disabled"),
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut app, &dispatcher, &mut completions);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    dispatcher: &Dispatcher,
    completions: &mut UnboundedReceiver<Completion>,
) -> Result<()> {
    let mut table_state = TableState::default();

    loop {
        while let Ok(completion) = completions.try_recv() {
            app.handle_completion(completion);
        }
        for request in app.take_requests() {
            dispatcher.submit(request);
        }
        for effect in app.take_effects() {
            match effect {
                Effect::OpenUrl(url) => {
                    if let Err(e) = open::that(&url) {
                        tracing::warn!(url = %url, error = %e, "failed to open browser");
                        app.notify(format!("Could not open browser: {}", e), FlashKind::Error);
                    }
                }
            }
        }
        app.tick(Instant::now());

        table_state.select(Some(app.table().selected()));
        terminal
            .draw(|frame| draw(frame, app, &mut table_state))
            .context("Failed to draw")?;

        if app.should_quit() {
            break;
        }

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key);
                }
            }
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if app.confirm().is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => app.confirm_delete(),
            KeyCode::Char('n') | KeyCode::Esc => app.cancel_delete(),
            _ => {}
        }
        return;
    }

    if app.form().is_some() {
        handle_form_key(app, key);
        return;
    }

    if app.table().is_editing_filter() {
        let table = app.table_mut();
        match key.code {
            KeyCode::Esc => {
                table.set_filter("");
                table.set_editing_filter(false);
            }
            KeyCode::Enter => table.set_editing_filter(false),
            KeyCode::Backspace => table.pop_filter_char(),
            KeyCode::Char(c) => table.push_filter_char(c),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Char('/') => app.table_mut().set_editing_filter(true),
        KeyCode::Char('c') => app.table_mut().toggle_sort(SortColumn::Company),
        KeyCode::Char('t') => app.table_mut().toggle_sort(SortColumn::AppliedDate),
        KeyCode::Char('n') => app.open_create(chrono::Local::now().date_naive()),
        KeyCode::Char('e') | KeyCode::Enter => app.open_edit_selected(),
        KeyCode::Char('d') => app.request_delete_selected(),
        KeyCode::Char('u') => app.open_selected_url(),
        KeyCode::Char('g') => app.sync_gmail(),
        KeyCode::Char('l') => app.login(),
        KeyCode::Char('L') => app.logout(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('a') => app.set_selected_status(JobStatus::Applied),
        KeyCode::Char('s') => app.set_selected_status(JobStatus::Screening),
        KeyCode::Char('i') => app.set_selected_status(JobStatus::Interviewing),
        KeyCode::Char('o') => app.set_selected_status(JobStatus::Offer),
        KeyCode::Char('x') => app.set_selected_status(JobStatus::Rejected),
        KeyCode::Char('w') => app.set_selected_status(JobStatus::Withdrawn),
        _ => {}
    }
}

fn handle_form_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.close_form();
            return;
        }
        KeyCode::Enter => {
            // Validation errors land in the form; nothing else to do here.
            let _ = app.submit_form();
            return;
        }
        _ => {}
    }

    let Some(form) = app.form_mut() else { return };
    match key.code {
        KeyCode::Tab | KeyCode::Down => form.focus_next(),
        KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
        KeyCode::Left if form.focus() == Field::Status => form.cycle_status(false),
        KeyCode::Right | KeyCode::Char(' ') if form.focus() == Field::Status => {
            form.cycle_status(true)
        }
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(c) => form.input_char(c),
        _ => {}
    }
}

// --- Rendering ---

fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Applied => Style::default().fg(Color::Blue),
        JobStatus::Screening => Style::default().fg(Color::Yellow),
        JobStatus::Interviewing => Style::default().fg(Color::Magenta),
        JobStatus::Offer => Style::default().fg(Color::Green),
        JobStatus::Rejected => Style::default().fg(Color::Red),
        JobStatus::Withdrawn => Style::default().fg(Color::DarkGray),
    }
}

fn draw(frame: &mut Frame, app: &App, table_state: &mut TableState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_header(frame, app, rows[0]);
    draw_flash(frame, app, rows[1]);
    draw_stats(frame, app, rows[2]);
    draw_filter(frame, app, rows[3]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(rows[4]);
    draw_table(frame, app, body[0], table_state);

    let detail = Paragraph::new(build_detail(app.selected_job(), body[1].width))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, body[1]);

    draw_footer(frame, app, rows[5]);

    let help = Paragraph::new(
        " j/k:move  n:new e:edit d:delete u:open url  a/s/i/o/x/w:status  /:filter c/t:sort  g:sync l/L:login/out r:refresh q:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[6]);

    if let Some(confirm) = app.confirm() {
        let area = centered_rect(50, 5, frame.area());
        frame.render_widget(Clear, area);
        let text = vec![
            Line::from(confirm.description()),
            Line::from(""),
            Line::from(Span::styled(
                "y: delete   n: cancel",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        let popup = Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Delete Application ")
                    .border_style(Style::default().fg(Color::Red)),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(popup, area);
    } else if app.form().is_some() {
        draw_form(frame, app);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        " Job Application Tracker ",
        Style::default().add_modifier(Modifier::BOLD),
    )];

    let auth = app.store().auth();
    let gmail = if auth.is_initial_load() {
        Span::styled("checking Gmail...", Style::default().fg(Color::DarkGray))
    } else if let Some(email) = app.auth_email().filter(|_| app.is_authenticated()) {
        Span::styled(format!("Gmail: {}", email), Style::default().fg(Color::Green))
    } else if app.is_authenticated() {
        Span::styled("Gmail connected", Style::default().fg(Color::Green))
    } else if auth.status() == QueryStatus::Errored && auth.data().is_none() {
        Span::styled("Gmail status unavailable", Style::default().fg(Color::Red))
    } else {
        Span::styled("Gmail not connected (l to connect)", Style::default().fg(Color::Yellow))
    };
    spans.push(Span::raw(" | "));
    spans.push(gmail);

    if app.is_sync_pending() {
        spans.push(Span::styled("  syncing...", Style::default().fg(Color::Cyan)));
    }
    if app.is_login_pending() {
        spans.push(Span::styled("  connecting...", Style::default().fg(Color::Cyan)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_flash(frame: &mut Frame, app: &App, area: Rect) {
    let Some(flash) = app.flash() else { return };
    let style = match flash.kind {
        FlashKind::Info => Style::default().fg(Color::Green),
        FlashKind::Error => Style::default().fg(Color::Red),
    };
    frame.render_widget(
        Paragraph::new(Span::styled(format!(" {}", flash.message), style)),
        area,
    );
}

fn draw_stats(frame: &mut Frame, app: &App, area: Rect) {
    let tiles = app.stats().tiles();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, tiles.len() as u32); 5])
        .split(area);

    for (i, (title, value)) in tiles.iter().enumerate() {
        let tile = Paragraph::new(Span::styled(
            value.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", title)));
        frame.render_widget(tile, chunks[i]);
    }
}

fn draw_filter(frame: &mut Frame, app: &App, area: Rect) {
    let table = app.table();
    let line = if table.is_editing_filter() {
        Line::from(vec![
            Span::raw(" Filter: "),
            Span::styled(format!("{}_", table.filter()), Style::default().fg(Color::Yellow)),
        ])
    } else if !table.filter().is_empty() {
        Line::from(format!(" Filter: {}  (/ to edit)", table.filter()))
    } else {
        Line::from(Span::styled(
            " Search companies or positions... (/)",
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn sort_marker(app: &App, column: SortColumn) -> &'static str {
    match app.table().sort() {
        Some((c, SortDirection::Asc)) if c == column => " ^",
        Some((c, SortDirection::Desc)) if c == column => " v",
        _ => "",
    }
}

/// What the table area shows instead of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TableMessage {
    Loading,
    Failed(String),
    Empty,
    NoMatches(String),
}

impl TableMessage {
    fn for_app(app: &App) -> Option<Self> {
        let jobs = app.store().jobs();
        if jobs.is_initial_load() {
            Some(TableMessage::Loading)
        } else if jobs.status() == QueryStatus::Errored && jobs.data().is_none() {
            let reason = jobs.error().map(|e| e.user_message()).unwrap_or_default();
            Some(TableMessage::Failed(reason))
        } else if app.jobs().is_empty() {
            Some(TableMessage::Empty)
        } else if app.visible_jobs().is_empty() {
            Some(TableMessage::NoMatches(app.table().filter().to_string()))
        } else {
            None
        }
    }

    fn to_span(&self) -> Span<'static> {
        match self {
            TableMessage::Loading => {
                Span::styled("Loading applications...", Style::default().fg(Color::DarkGray))
            }
            TableMessage::Failed(reason) => Span::styled(
                format!("Failed to load applications: {} (press r to retry)", reason),
                Style::default().fg(Color::Red),
            ),
            TableMessage::Empty => {
                Span::raw("No job applications yet. Sync from Gmail or add one manually!")
            }
            TableMessage::NoMatches(filter) => {
                Span::raw(format!("No applications match \"{}\"", filter))
            }
        }
    }
}

fn draw_table(frame: &mut Frame, app: &App, area: Rect, table_state: &mut TableState) {
    let block = Block::default().borders(Borders::ALL).title(" Applications ");

    if let Some(message) = TableMessage::for_app(app) {
        let paragraph = Paragraph::new(message.to_span())
            .alignment(Alignment::Center)
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from(format!("Company{}", sort_marker(app, SortColumn::Company))),
        Cell::from("Position"),
        Cell::from("Status"),
        Cell::from("Location"),
        Cell::from(format!("Applied{}", sort_marker(app, SortColumn::AppliedDate))),
        Cell::from("Source"),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .visible_jobs()
        .into_iter()
        .map(|job| {
            Row::new(vec![
                Cell::from(job.company.clone()),
                Cell::from(job.position.clone()),
                Cell::from(Span::styled(job.status.label(), status_style(job.status))),
                Cell::from(job.location.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(applied_label(job)),
                Cell::from(job.source.clone().unwrap_or_else(|| "-".to_string())),
            ])
        })
        .collect();

    let widths = [
        Constraint::Percentage(20),
        Constraint::Percentage(24),
        Constraint::Length(13),
        Constraint::Percentage(16),
        Constraint::Length(11),
        Constraint::Percentage(14),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, table_state);
}

fn applied_label(job: &JobApplication) -> String {
    job.applied_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn footer_spans(app: &App) -> Vec<Span<'static>> {
    let mut spans = vec![Span::styled(
        format!(
            " Showing {} of {} applications",
            app.visible_jobs().len(),
            app.total_jobs()
        ),
        Style::default().fg(Color::DarkGray),
    )];

    let loaded = app.jobs().len();
    if loaded < app.total_jobs() {
        spans.push(Span::styled(
            format!("  (first {} loaded; stats cover these)", loaded),
            Style::default().fg(Color::Yellow),
        ));
    }

    let jobs = app.store().jobs();
    if jobs.status() == QueryStatus::Errored && jobs.data().is_some() {
        let reason = jobs.error().map(|e| e.user_message()).unwrap_or_default();
        spans.push(Span::styled(
            format!("  refresh failed: {} (r to retry)", reason),
            Style::default().fg(Color::Red),
        ));
    } else if jobs.status() == QueryStatus::Loading || jobs.is_stale() {
        spans.push(Span::styled("  refreshing...", Style::default().fg(Color::Cyan)));
    }
    spans
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    frame.render_widget(Paragraph::new(Line::from(footer_spans(app))), area);
}

fn build_detail(job: Option<&JobApplication>, width: u16) -> Text<'static> {
    let Some(job) = job else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        job.position.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", job.company)));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", job.status.label()),
        status_style(job.status),
    )));

    let optional = [
        ("Location", &job.location),
        ("Salary", &job.salary_range),
        ("Source", &job.source),
        ("URL", &job.job_url),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            lines.push(Line::from(format!("{}: {}", label, value)));
        }
    }
    lines.push(Line::from(format!("Applied: {}", applied_label(job))));
    if job.email_id.is_some() {
        lines.push(Line::from(Span::styled(
            "Imported from Gmail",
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::from(Span::styled(
        format!("Updated: {}", job.updated_at.format("%Y-%m-%d %H:%M")),
        Style::default().fg(Color::DarkGray),
    )));

    if let Some(notes) = &job.notes {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Notes",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        let wrap_at = width.saturating_sub(4).max(20) as usize;
        for line in textwrap::fill(notes, wrap_at).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}

fn draw_form(frame: &mut Frame, app: &App) {
    let Some(form) = app.form() else { return };
    let field_count = Field::iter().count() as u16;
    let area = centered_rect(60, field_count + 6, frame.area());
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = Vec::new();
    for field in Field::iter() {
        let focused = form.focus() == field;
        let label_style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let value = form.value(field);
        let value_span = if field == Field::Status {
            Span::styled(format!("< {} >", value), status_style(form.status()))
        } else if value.is_empty() {
            Span::styled(field.placeholder(), Style::default().fg(Color::DarkGray))
        } else {
            Span::raw(value.to_string())
        };
        let cursor = if focused && field != Field::Status { "_" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!("{:>14}: ", field.label()), label_style),
            value_span,
            Span::raw(cursor),
        ]));
    }

    lines.push(Line::from(""));
    if let Some(error) = app.form_error() {
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(""));
    }

    let action = if app.is_form_pending() {
        "Saving...".to_string()
    } else {
        format!("Enter: {}", form.submit_label())
    };
    lines.push(Line::from(Span::styled(
        format!("{}   Tab: next field   Left/Right: status   Esc: cancel", action),
        Style::default().fg(Color::DarkGray),
    )));

    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(match form.mode() {
                FormMode::Create => format!(" {} ", form.title()),
                FormMode::Edit { id } => format!(" {} #{} ", form.title(), id),
            }),
    );
    frame.render_widget(popup, area);
}

/// Rect of `percent_x` width and `height` rows centered in `area`.
fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height.min(area.height)),
            Constraint::Fill(1),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::{job, MemoryBackend};
    use crate::dispatch::{execute, Request};
    use crate::error::ApiError;
    use crate::store::{Fetched, QueryKey};
    use crossterm::event::KeyModifiers;

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn pump(app: &mut App, backend: &MemoryBackend) {
        loop {
            let requests = app.take_requests();
            if requests.is_empty() {
                break;
            }
            for request in requests {
                app.handle_completion(execute(backend, request));
            }
        }
    }

    /// Answer the pending jobs fetch with `err` and everything else normally.
    fn fail_jobs_fetch(app: &mut App, backend: &MemoryBackend, err: ApiError) {
        for request in app.take_requests() {
            match request {
                Request::Fetch { ticket, .. } if ticket.key == QueryKey::Jobs => {
                    app.handle_completion(Completion::Fetched {
                        ticket,
                        fetched: Fetched::Jobs(Err(err.clone())),
                    });
                }
                other => app.handle_completion(execute(backend, other)),
            }
        }
    }

    fn footer_text(app: &App) -> String {
        footer_spans(app).iter().map(|s| s.content.as_ref()).collect()
    }

    fn seeded(limit: Option<u32>) -> (App, MemoryBackend) {
        let backend = MemoryBackend::with_jobs(vec![
            job(1, "Google", "SRE", JobStatus::Applied),
            job(2, "Amazon", "SDE", JobStatus::Interviewing),
            job(3, "Googol", "Analyst", JobStatus::Offer),
        ]);
        let mut app = App::new(JobQuery {
            limit,
            ..Default::default()
        });
        pump(&mut app, &backend);
        (app, backend)
    }

    #[test]
    fn test_table_shows_loading_before_first_result() {
        let mut app = App::new(JobQuery::default());
        assert_eq!(TableMessage::for_app(&app), Some(TableMessage::Loading));
        let _ = app.take_requests();
        assert_eq!(TableMessage::for_app(&app), Some(TableMessage::Loading));
    }

    #[test]
    fn test_table_shows_error_when_nothing_cached() {
        let backend = MemoryBackend::with_jobs(vec![]);
        let mut app = App::new(JobQuery::default());
        fail_jobs_fetch(
            &mut app,
            &backend,
            ApiError::Transport("connection refused".to_string()),
        );
        let message = TableMessage::for_app(&app);
        assert_eq!(
            message,
            Some(TableMessage::Failed(
                "Backend unreachable: connection refused".to_string()
            ))
        );
        let text = message.unwrap().to_span().content.into_owned();
        assert!(text.contains("press r to retry"), "{}", text);
    }

    #[test]
    fn test_table_empty_and_filtered_messages_differ() {
        let backend = MemoryBackend::with_jobs(vec![]);
        let mut app = App::new(JobQuery::default());
        pump(&mut app, &backend);
        assert_eq!(TableMessage::for_app(&app), Some(TableMessage::Empty));

        let (mut app, _) = seeded(None);
        assert_eq!(TableMessage::for_app(&app), None);
        app.table_mut().set_filter("zzz");
        assert_eq!(
            TableMessage::for_app(&app),
            Some(TableMessage::NoMatches("zzz".to_string()))
        );
    }

    #[test]
    fn test_failed_refresh_keeps_rows_and_flags_footer() {
        let (mut app, backend) = seeded(None);
        app.refresh();
        fail_jobs_fetch(
            &mut app,
            &backend,
            ApiError::Http {
                status: 500,
                detail: Some("database is locked".to_string()),
            },
        );
        assert_eq!(TableMessage::for_app(&app), None);
        let footer = footer_text(&app);
        assert!(footer.contains("Showing 3 of 3 applications"), "{}", footer);
        assert!(footer.contains("refresh failed: database is locked"), "{}", footer);
    }

    #[test]
    fn test_footer_counts_server_total() {
        let (app, _) = seeded(Some(2));
        assert_eq!(app.jobs().len(), 2);
        let footer = footer_text(&app);
        assert!(footer.contains("Showing 2 of 3 applications"), "{}", footer);
        assert!(footer.contains("first 2 loaded"), "{}", footer);

        let (mut app, _) = seeded(None);
        app.table_mut().set_filter("goog");
        assert_eq!(footer_text(&app), " Showing 2 of 3 applications");
    }

    #[test]
    fn test_filter_keys_edit_filter_not_status() {
        let mut app = App::new(JobQuery::default());
        press(&mut app, KeyCode::Char('/'));
        assert!(app.table().is_editing_filter());
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.table().filter(), "ax");
        assert!(app.take_requests().iter().all(|r| matches!(r, crate::dispatch::Request::Fetch { .. })));

        press(&mut app, KeyCode::Esc);
        assert!(!app.table().is_editing_filter());
        assert_eq!(app.table().filter(), "");
        assert!(!app.should_quit());
    }

    #[test]
    fn test_form_keys_type_into_focused_field() {
        let mut app = App::new(JobQuery::default());
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit());
        assert_eq!(app.form().unwrap().value(Field::Company), "q");

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.form().unwrap().focus(), Field::Status);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.form().unwrap().status(), JobStatus::Screening);

        // Position is still blank, so Enter only reports the problem.
        press(&mut app, KeyCode::Enter);
        assert!(app.form().is_some());
        assert!(app.form_error().is_some());

        press(&mut app, KeyCode::Esc);
        assert!(app.form().is_none());
    }

    #[test]
    fn test_delete_without_selection_does_nothing() {
        let mut app = App::new(JobQuery::default());
        press(&mut app, KeyCode::Char('d'));
        assert!(app.confirm().is_none());
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());
    }

    #[test]
    fn test_detail_wraps_notes() {
        let mut j = job(1, "Google", "SRE", JobStatus::Offer);
        j.notes = Some("word ".repeat(30));
        let text = build_detail(Some(&j), 30);
        assert!(text.lines.len() > 6);
        assert!(text.lines.iter().all(|l| l.width() <= 30));
    }
}
