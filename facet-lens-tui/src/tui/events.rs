use crate::tui::app::{App, View};
use crossterm::event::{KeyCode, KeyEvent};

const PAGE: usize = 10;

pub fn handle_key(app: &mut App, key: KeyEvent) {
    match app.view {
        View::Records if app.searching => handle_search(app, key),
        View::Records => handle_records(app, key),
        View::Help => handle_help(app, key),
        View::ConditionInput => handle_condition_input(app, key),
        View::ColumnFilter => handle_column_filter(app, key),
        View::SavedSets => handle_saved_sets(app, key),
        View::SaveSetInput => handle_save_set_input(app, key),
        View::History => handle_history(app, key),
    }
}

fn handle_records(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.view = View::Help,
        KeyCode::Char('j') | KeyCode::Down => app.row_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.row_up(1),
        KeyCode::PageDown => app.row_down(PAGE),
        KeyCode::PageUp => app.row_up(PAGE),
        KeyCode::Char('g') | KeyCode::Home => app.selected_row = 0,
        KeyCode::Char('G') | KeyCode::End => app.row_down(usize::MAX / 2),
        KeyCode::Char('l') | KeyCode::Right => app.col_right(),
        KeyCode::Char('h') | KeyCode::Left => app.col_left(),
        KeyCode::Char('/') => app.searching = true,
        KeyCode::Char('f') => app.open_column_filter(),
        KeyCode::Char('F') => app.clear_column_restriction(),
        KeyCode::Char('c') => app.begin_condition_edit(),
        KeyCode::Char('C') => app.clear_conditions(),
        KeyCode::Char('s') => app.open_saved_sets(),
        KeyCode::Char('S') => app.begin_save_set(),
        KeyCode::Char('H') => app.open_history(),
        KeyCode::Char('x') => app.clear_all_filters(),
        KeyCode::Char('y') => copy_cell(app),
        _ => {}
    }
}

fn copy_cell(app: &mut App) {
    let (Some(record), Some(field)) = (app.selected_record(), app.selected_field()) else {
        return;
    };
    let text = app.cell(record, field);
    #[cfg(feature = "clipboard")]
    {
        if cli_clipboard::set_contents(text.clone()).is_ok() {
            app.status_msg = format!("copied: {text}");
            return;
        }
    }
    app.status_msg = format!("cell: {text}");
}

fn handle_search(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.commit_search(),
        KeyCode::Esc => app.clear_search(),
        KeyCode::Backspace => {
            app.search.pop();
            app.schedule_refresh();
        }
        KeyCode::Char(c) => {
            app.search.push(c);
            app.schedule_refresh();
        }
        _ => {}
    }
}

fn handle_help(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.help_scroll += 1,
        KeyCode::Char('k') | KeyCode::Up => app.help_scroll = app.help_scroll.saturating_sub(1),
        KeyCode::Char('q') | KeyCode::Char('?') | KeyCode::Esc => {
            app.view = View::Records;
            app.help_scroll = 0;
        }
        _ => {}
    }
}

fn handle_condition_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.apply_condition_input(),
        KeyCode::Esc => app.view = View::Records,
        KeyCode::Backspace => {
            app.condition_input.pop();
        }
        KeyCode::Char(c) => app.condition_input.push(c),
        _ => {}
    }
}

fn handle_column_filter(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.commit_column_filter(),
        KeyCode::Esc => app.cancel_column_filter(),
        KeyCode::Down => app.filter_cursor_down(),
        KeyCode::Up => app.filter_cursor_up(),
        KeyCode::PageDown => (0..PAGE).for_each(|_| app.filter_cursor_down()),
        KeyCode::PageUp => (0..PAGE).for_each(|_| app.filter_cursor_up()),
        KeyCode::Char(' ') => app.filter_toggle_current(),
        KeyCode::Tab => app.filter_toggle_all(),
        KeyCode::Backspace => app.filter_edit_query(|q| {
            q.pop();
        }),
        KeyCode::Char(c) => app.filter_edit_query(|q| q.push(c)),
        _ => {}
    }
}

fn handle_saved_sets(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if app.sets_selected + 1 < app.saved_sets.len() {
                app.sets_selected += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => app.sets_selected = app.sets_selected.saturating_sub(1),
        KeyCode::Enter => app.load_selected_set(),
        KeyCode::Char('d') => app.delete_selected_set(),
        KeyCode::Esc | KeyCode::Char('q') => app.view = View::Records,
        _ => {}
    }
}

fn handle_save_set_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.save_current_set(),
        KeyCode::Esc => app.view = View::Records,
        KeyCode::Tab => app.set_global = !app.set_global,
        KeyCode::Backspace => {
            app.set_name_input.pop();
        }
        KeyCode::Char(c) => app.set_name_input.push(c),
        _ => {}
    }
}

fn handle_history(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if app.history_selected + 1 < app.history.len() {
                app.history_selected += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.history_selected = app.history_selected.saturating_sub(1)
        }
        KeyCode::Enter => app.reuse_selected_history(),
        KeyCode::Char('D') => app.clear_history(),
        KeyCode::Esc | KeyCode::Char('q') => app.view = View::Records,
        _ => {}
    }
}
