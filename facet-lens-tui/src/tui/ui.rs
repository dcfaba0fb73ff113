use crate::tui::app::{App, View};
use crate::tui::theme::Theme;
use facet_lens_core::{describe_chain, SelectAll};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

const DEFAULT_COLUMN_WIDTH: u16 = 18;

pub fn render(frame: &mut Frame, app: &App) {
    let theme = &app.theme;
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);
    render_topbar(frame, app, chunks[0], theme);
    render_records(frame, app, chunks[1], theme);
    render_filter_line(frame, app, chunks[2], theme);
    render_bottombar(frame, app, chunks[3], theme);
    match app.view {
        View::Help => render_help(frame, app, area),
        View::ConditionInput => render_condition_input(frame, app, area),
        View::ColumnFilter => render_column_filter(frame, app, area, theme),
        View::SavedSets => render_saved_sets(frame, app, area),
        View::SaveSetInput => render_save_set_input(frame, app, area),
        View::History => render_history(frame, app, area),
        View::Records => {}
    }
}

fn render_topbar(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let mut spans = vec![Span::raw(format!(
        " {} | {} | {}/{} records",
        app.input_path,
        app.tool_id,
        app.visible.len(),
        app.records.len()
    ))];
    if let Some(name) = &app.active_set {
        spans.push(Span::styled(format!(" [{name}]"), Style::default().fg(theme.success)));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.bg).fg(theme.fg)),
        area,
    );
}

fn render_records(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let width = app.config.display.column_width.unwrap_or(DEFAULT_COLUMN_WIDTH).max(4);
    let fit = (area.width.saturating_sub(2) / (width + 1)).max(1) as usize;
    let offset = (app.selected_col + 1).saturating_sub(fit);
    let cols: Vec<_> = app.fields.iter().enumerate().skip(offset).take(fit).collect();

    let header = Row::new(cols.iter().map(|(i, f)| {
        let mut style = Style::default().fg(theme.kind_color(f.kind)).add_modifier(Modifier::BOLD);
        let mut label = f.label.clone();
        if app.selections.is_filtered(&f.name) {
            style = style.fg(theme.filtered);
            label.push_str(" *");
        }
        if *i == app.selected_col {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        Cell::from(truncate(&label, width as usize)).style(style)
    }));

    let height = area.height.saturating_sub(3) as usize;
    let row_offset = (app.selected_row + 1).saturating_sub(height.max(1));
    let rows: Vec<Row> = app
        .visible
        .iter()
        .take(app.browsable_rows())
        .skip(row_offset)
        .take(height)
        .map(|&idx| {
            let record = &app.records[idx];
            Row::new(cols.iter().map(|(i, f)| {
                let cell = Cell::from(truncate(&app.cell(record, f), width as usize));
                if *i == app.selected_col {
                    cell.style(Style::default().fg(theme.highlight))
                } else {
                    cell
                }
            }))
        })
        .collect();

    let widths: Vec<Constraint> = cols.iter().map(|_| Constraint::Length(width)).collect();
    let title = if app.visible.len() > app.browsable_rows() {
        format!("Records (first {} of {})", app.browsable_rows(), app.visible.len())
    } else {
        String::from("Records")
    };
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = TableState::default();
    if !app.visible.is_empty() {
        state.select(Some(app.selected_row - row_offset));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_filter_line(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let mut spans = Vec::new();
    if app.searching {
        spans.push(Span::styled(format!(" /{}_", app.search), Style::default().fg(theme.highlight)));
    } else if !app.search.is_empty() {
        spans.push(Span::raw(format!(" /{}", app.search)));
    }
    if !app.conditions.is_empty() {
        spans.push(Span::styled(
            format!(" where {}", describe_chain(&app.conditions)),
            Style::default().fg(theme.warning),
        ));
    }
    if !app.selections.is_empty() {
        spans.push(Span::styled(
            format!(" [{} column filter(s)]", app.selections.len()),
            Style::default().fg(theme.filtered),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_bottombar(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let bar_text = format!(
        " {} | q:quit ?:help /:search f:column filter c:conditions s:sets S:save H:history x:clear",
        app.status_msg
    );
    frame.render_widget(Paragraph::new(bar_text).style(Style::default().bg(theme.bg).fg(theme.fg)), area);
}

fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let text = vec![
        Line::from(Span::styled("Keybindings", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  q        Quit"),
        Line::from("  ?        Toggle help"),
        Line::from("  j/k      Move between rows"),
        Line::from("  h/l      Move between columns"),
        Line::from("  g/G      First / last row"),
        Line::from("  /        Search text (Enter keeps, Esc clears)"),
        Line::from("  f        Filter values of the current column"),
        Line::from("  F        Drop the current column's value filter"),
        Line::from("  c        Edit the condition chain"),
        Line::from("  C        Clear conditions"),
        Line::from("  s        Saved filter sets"),
        Line::from("  S        Save conditions as a set"),
        Line::from("  H        Search history"),
        Line::from("  x        Clear every filter"),
        Line::from("  y        Copy current cell"),
        Line::from(""),
        Line::from(Span::styled("Column filter", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  type     Narrow the value list"),
        Line::from("  Space    Toggle value"),
        Line::from("  Tab      Select / deselect all shown"),
        Line::from("  Enter    Apply  Esc: discard"),
        Line::from(""),
        Line::from(Span::styled("Conditions", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  state = 'Active' and priority >= 2"),
        Line::from("  owner is null or tag in (a, b)"),
        Line::from("  due between 2024-01-01 and 2024-06-30"),
    ];
    let popup = centered_rect(60, 80, area);
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text)
            .scroll((app.help_scroll as u16, 0))
            .block(Block::default().borders(Borders::ALL).title("Help (?)")),
        popup,
    );
}

fn render_condition_input(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(70, 25, area);
    frame.render_widget(Clear, popup);
    let content = format!(
        "> {}_\n\n{}\nEnter: apply  Esc: cancel",
        app.condition_input, app.status_msg
    );
    frame.render_widget(
        Paragraph::new(content)
            .block(Block::default().borders(Borders::ALL).title("Conditions (c)"))
            .wrap(Wrap { trim: false }),
        popup,
    );
}

fn render_column_filter(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let Some(filter) = &app.column_filter else { return };
    let popup = centered_rect(50, 70, area);
    frame.render_widget(Clear, popup);
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1), Constraint::Min(0)])
        .split(popup);

    frame.render_widget(
        Paragraph::new(format!("{}_", filter.query()))
            .block(Block::default().borders(Borders::ALL).title(format!("Filter {} (f)", filter.column()))),
        parts[0],
    );
    let mark = match filter.select_all_state() {
        SelectAll::Checked => "[x]",
        SelectAll::Unchecked => "[ ]",
        SelectAll::Indeterminate => "[-]",
    };
    frame.render_widget(
        Paragraph::new(format!(
            " {mark} Select all  ({} of {} included)",
            filter.included_count(),
            filter.len()
        ))
        .style(Style::default().fg(theme.highlight)),
        parts[1],
    );
    let items: Vec<ListItem> = filter
        .visible()
        .map(|e| {
            let check = if e.included { "[x]" } else { "[ ]" };
            ListItem::new(Line::from(vec![
                Span::raw(format!(" {check} {}", e.display)),
                Span::styled(format!("  ({})", e.count), Style::default().fg(theme.number)),
            ]))
        })
        .collect();
    let mut state = ListState::default();
    if !items.is_empty() {
        state.select(Some(app.column_filter_cursor.min(items.len() - 1)));
    }
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Space: toggle  Tab: all  Enter: apply  Esc: cancel"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, parts[2], &mut state);
}

fn render_saved_sets(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup);
    let items: Vec<ListItem> = app
        .saved_sets
        .iter()
        .map(|s| {
            let scope = if s.is_global { "global" } else { s.tool_id.as_str() };
            ListItem::new(vec![
                Line::from(format!("{}  ({scope})", s.name)),
                Line::from(format!("    {}", describe_chain(&s.conditions))),
            ])
        })
        .collect();
    let mut state = ListState::default();
    if !items.is_empty() {
        state.select(Some(app.sets_selected.min(items.len() - 1)));
    }
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Saved sets (s) | Enter: load  d: delete  Esc: back"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, popup, &mut state);
}

fn render_save_set_input(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(50, 20, area);
    frame.render_widget(Clear, popup);
    let scope = if app.set_global { "global" } else { app.tool_id.as_str() };
    let content = format!(
        "name: {}_\nscope: {scope} (Tab to switch)\n{} condition(s)\nEnter: save  Esc: cancel",
        app.set_name_input,
        app.conditions.len()
    );
    frame.render_widget(
        Paragraph::new(content).block(Block::default().borders(Borders::ALL).title("Save filter set (S)")),
        popup,
    );
}

fn render_history(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup);
    let items: Vec<ListItem> = app
        .history
        .iter()
        .map(|h| {
            ListItem::new(format!(
                "{:<30} {:>6} hits  {}",
                truncate(&h.text, 30),
                h.result_count,
                h.searched_at.format("%Y-%m-%d %H:%M")
            ))
        })
        .collect();
    let mut state = ListState::default();
    if !items.is_empty() {
        state.select(Some(app.history_selected.min(items.len() - 1)));
    }
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("History (H) | Enter: search  D: clear  Esc: back"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, popup, &mut state);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}~")
    }
}

fn centered_rect(px: u16, py: u16, r: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - py) / 2),
            Constraint::Percentage(py),
            Constraint::Percentage((100 - py) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - px) / 2),
            Constraint::Percentage(px),
            Constraint::Percentage((100 - px) / 2),
        ])
        .split(v[1])[1]
}
