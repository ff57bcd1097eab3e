use anyhow::Result;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    crossterm::{
        event::{
            self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        },
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use std::io;
use todo_core::{Todo, TodoPriority, TodoStatus};

use crate::api::TodoApi;
use crate::app::{App, InputMode, NotificationKind};
use crate::form::{FormField, TodoForm};

pub async fn run_app<C: TodoApi>(api: C) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(api);

    let res = run_app_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

async fn run_app_loop<C: TodoApi>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<C>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if app.reload_pending {
            app.reload().await;
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !handle_key(app, key).await {
                return Ok(());
            }
        }
    }
}

/// Applies one key press. Returns `false` when the user asked to quit.
async fn handle_key<C: TodoApi>(app: &mut App<C>, key: KeyEvent) -> bool {
    match app.input_mode {
        InputMode::Normal => match key.code {
            KeyCode::Char('q') => return false,
            KeyCode::Down | KeyCode::Char('j') => app.next_todo(),
            KeyCode::Up | KeyCode::Char('k') => app.previous_todo(),
            KeyCode::Char('n') | KeyCode::Char('a') => app.start_creating(),
            KeyCode::Char('e') | KeyCode::Enter => app.start_editing(),
            KeyCode::Char('D') => app.start_delete_confirm(),
            KeyCode::Char('1') => app.toggle_status(TodoStatus::Todo),
            KeyCode::Char('2') => app.toggle_status(TodoStatus::InProgress),
            KeyCode::Char('3') => app.toggle_status(TodoStatus::Done),
            KeyCode::Char('4') => app.toggle_priority(TodoPriority::Low),
            KeyCode::Char('5') => app.toggle_priority(TodoPriority::Medium),
            KeyCode::Char('6') => app.toggle_priority(TodoPriority::High),
            KeyCode::Char('/') => app.start_search(),
            KeyCode::Char('s') => app.cycle_sort(),
            KeyCode::Char('R') => app.reset_filters(),
            KeyCode::Char('r') => app.request_reload(),
            KeyCode::Esc => app.dismiss_notification(),
            KeyCode::Char('?') => app.show_help(),
            _ => {}
        },
        InputMode::Search => match key.code {
            KeyCode::Enter | KeyCode::Esc => app.finish_search(),
            KeyCode::Backspace => app.pop_search_char(),
            KeyCode::Char(c) => app.push_search_char(c),
            _ => {}
        },
        InputMode::Form => match key.code {
            KeyCode::Enter => app.submit_form().await,
            KeyCode::Esc => app.cancel_form(),
            other => {
                if let Some(form) = app.form.as_mut() {
                    match other {
                        KeyCode::Tab | KeyCode::Down => form.focus_next(),
                        KeyCode::BackTab | KeyCode::Up => form.focus_previous(),
                        KeyCode::Left => form.cycle_choice(false),
                        KeyCode::Right => form.cycle_choice(true),
                        KeyCode::Backspace => form.backspace(),
                        KeyCode::Char(c) => form.input(c),
                        _ => {}
                    }
                }
            }
        },
        InputMode::DeleteConfirm => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_delete().await,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_delete_confirm(),
            _ => {}
        },
        InputMode::Help => match key.code {
            KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => app.hide_help(),
            _ => {}
        },
    }
    true
}

fn status_color(status: TodoStatus) -> Color {
    match status {
        TodoStatus::Todo => Color::Gray,
        TodoStatus::InProgress => Color::Blue,
        TodoStatus::Done => Color::Green,
    }
}

fn priority_color(priority: TodoPriority) -> Color {
    match priority {
        TodoPriority::Low => Color::DarkGray,
        TodoPriority::Medium => Color::Yellow,
        TodoPriority::High => Color::Red,
    }
}

fn toggle_span(label: &str, key: char, active: bool) -> Span<'static> {
    let text = format!("{key}:{label} ");
    if active {
        Span::styled(
            text,
            Style::default().fg(Color::Black).bg(Color::White).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(text, Style::default().fg(Color::DarkGray))
    }
}

fn filter_lines<C: TodoApi>(app: &App<C>) -> Vec<Line<'static>> {
    let search_style = if app.input_mode == InputMode::Search {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let cursor = if app.input_mode == InputMode::Search { "_" } else { "" };

    let mut status = vec![Span::raw("status   ")];
    for (status_value, key) in TodoStatus::ALL.into_iter().zip(['1', '2', '3']) {
        status.push(toggle_span(
            status_value.label(),
            key,
            app.filter.status.contains(&status_value),
        ));
    }

    let mut priority = vec![Span::raw("priority ")];
    for (priority_value, key) in TodoPriority::ALL.into_iter().zip(['4', '5', '6']) {
        priority.push(toggle_span(
            priority_value.label(),
            key,
            app.filter.priority.contains(&priority_value),
        ));
    }

    vec![
        Line::from(vec![
            Span::raw("search   "),
            Span::styled(format!("{}{cursor}", app.filter.search), search_style),
        ]),
        Line::from(status),
        Line::from(priority),
        Line::from(vec![
            Span::raw("sort     "),
            Span::styled(app.sort_label(), Style::default().fg(Color::Cyan)),
        ]),
    ]
}

fn todo_item(todo: &Todo) -> ListItem<'static> {
    let title_style = if todo.status == TodoStatus::Done {
        Style::default()
            .add_modifier(Modifier::CROSSED_OUT)
            .fg(Color::DarkGray)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };

    let mut header = vec![
        Span::styled(todo.title.clone(), title_style),
        Span::raw(" "),
        Span::styled(
            format!("[{}]", todo.status.label()),
            Style::default().fg(status_color(todo.status)),
        ),
        Span::raw(" "),
        Span::styled(
            format!("[{}]", todo.priority.label()),
            Style::default().fg(priority_color(todo.priority)),
        ),
    ];
    if let Some(due) = todo.due_date {
        header.push(Span::styled(
            format!(" due {}", due.format("%b %d, %Y")),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let mut lines = vec![Line::from(header)];
    if let Some(description) = &todo.description {
        lines.push(Line::from(Span::styled(
            format!("  {description}"),
            Style::default().fg(Color::Gray),
        )));
    }
    ListItem::new(lines)
}

fn form_lines(form: &TodoForm) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for field in FormField::ALL {
        let focused = form.focus == field;
        let label_style = if focused {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let value = match field {
            FormField::Title => form.title.clone(),
            FormField::Description => form.description.clone(),
            FormField::DueDate => form.due_date.clone(),
            FormField::Status => format!("< {} >", form.status.label()),
            FormField::Priority => format!("< {} >", form.priority.label()),
        };
        let cursor = if focused && !field.is_choice() { "_" } else { "" };

        lines.push(Line::from(Span::styled(field.label(), label_style)));
        lines.push(Line::from(format!("  {value}{cursor}")));
    }
    if let Some(error) = &form.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "tab: next field | ←/→ or space: change choice | enter: save | esc: cancel",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

fn ui<C: TodoApi>(f: &mut Frame, app: &mut App<C>) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    let filter_block = if app.input_mode == InputMode::Search {
        Block::default()
            .title("filters")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue))
    } else {
        Block::default().title("filters").borders(Borders::ALL)
    };
    f.render_widget(Paragraph::new(filter_lines(app)).block(filter_block), main_chunks[0]);

    let todo_block = Block::default()
        .title(format!("todos ({})", app.todos.len()))
        .borders(Borders::ALL);
    if app.loading {
        let loading = Paragraph::new("Loading todos...")
            .block(todo_block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(loading, main_chunks[1]);
    } else if app.todos.is_empty() {
        let empty = Paragraph::new("No todos found. Create your first todo!")
            .block(todo_block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(empty, main_chunks[1]);
    } else {
        let items: Vec<ListItem> = app.todos.iter().map(todo_item).collect();
        let todos = List::new(items)
            .block(todo_block)
            .style(Style::default().fg(Color::White))
            .highlight_style(Style::default().add_modifier(Modifier::BOLD))
            .highlight_symbol(">> ");
        f.render_stateful_widget(todos, main_chunks[1], &mut app.list_state);
    }

    match app.input_mode {
        InputMode::Form => {
            if let Some(form) = &app.form {
                let popup_area = centered_rect(70, 70, f.area());
                f.render_widget(Clear, popup_area);

                let title = if app.submitting {
                    format!("{} (saving...)", form.title_text())
                } else {
                    form.title_text().to_string()
                };
                let input = Paragraph::new(form_lines(form))
                    .block(Block::default().title(title).borders(Borders::ALL))
                    .wrap(Wrap { trim: false });
                f.render_widget(input, popup_area);
            }
        }
        InputMode::DeleteConfirm => {
            let popup_area = centered_rect(60, 20, f.area());
            f.render_widget(Clear, popup_area);

            let target_name = app
                .delete_target
                .as_ref()
                .map(|t| t.title.as_str())
                .unwrap_or("todo");
            let confirm_text = format!(
                "Delete '{target_name}'?\nThis cannot be undone.\n\ny: confirm | n/esc: cancel"
            );
            let confirm = Paragraph::new(confirm_text)
                .block(
                    Block::default()
                        .title("confirm delete")
                        .borders(Borders::ALL),
                )
                .style(Style::default().fg(Color::Red));
            f.render_widget(confirm, popup_area);
        }
        InputMode::Help => {
            let popup_area = centered_rect(80, 70, f.area());
            f.render_widget(Clear, popup_area);

            let help_text = r#"Navigation:
  j/k: move up/down in the list

Filters (each change reloads the list):
  1/2/3: toggle To Do / In Progress / Done
  4/5/6: toggle Low / Medium / High
  /: edit search text (enter/esc to finish)
  s: next sort order
  R: reset filters
  r: reload

Actions:
  n: new todo
  e/enter: edit selected todo
  D: delete selected todo
  esc: dismiss notification
  ?: show/hide this help
  q: quit

Press ? or ESC to close"#;
            let help = Paragraph::new(help_text)
                .block(Block::default().title("help").borders(Borders::ALL))
                .style(Style::default().fg(Color::White));
            f.render_widget(help, popup_area);
        }
        InputMode::Normal | InputMode::Search => {}
    }

    let status_bar = match &app.notification {
        Some(notification) => {
            let bg = match notification.kind {
                NotificationKind::Success => Color::Green,
                NotificationKind::Error => Color::Red,
            };
            Paragraph::new(format!("{} (esc to dismiss)", notification.message))
                .style(Style::default().fg(Color::White).bg(bg))
        }
        None => Paragraph::new("q: quit | n: new | /: search | s: sort | ?: help")
            .style(Style::default().fg(Color::White).bg(Color::DarkGray)),
    };
    f.render_widget(status_bar, main_chunks[2]);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
