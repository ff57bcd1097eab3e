use ratatui::widgets::ListState;
use todo_core::{SortDirection, SortField, SortSpec, Todo, TodoPriority, TodoStatus};

use crate::api::{ListFilter, TodoApi};
use crate::form::TodoForm;

pub const SORT_PRESETS: [(SortSpec, &str); 6] = [
    (SortSpec::new(SortField::CreatedAt, SortDirection::Desc), "Created (Newest)"),
    (SortSpec::new(SortField::CreatedAt, SortDirection::Asc), "Created (Oldest)"),
    (SortSpec::new(SortField::DueDate, SortDirection::Asc), "Due Date (Earliest)"),
    (SortSpec::new(SortField::DueDate, SortDirection::Desc), "Due Date (Latest)"),
    (SortSpec::new(SortField::Title, SortDirection::Asc), "Title (A-Z)"),
    (SortSpec::new(SortField::Title, SortDirection::Desc), "Title (Z-A)"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Form,
    DeleteConfirm,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

pub struct App<C: TodoApi> {
    pub api: C,
    pub filter: ListFilter,
    pub sort_preset: usize,
    pub todos: Vec<Todo>,
    pub list_state: ListState,
    pub loading: bool,
    pub reload_pending: bool,
    pub input_mode: InputMode,
    pub form: Option<TodoForm>,
    pub submitting: bool,
    pub delete_target: Option<Todo>,
    pub notification: Option<Notification>,
}

fn toggle<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if let Some(index) = values.iter().position(|v| *v == value) {
        values.remove(index);
    } else {
        values.push(value);
    }
}

impl<C: TodoApi> App<C> {
    pub fn new(api: C) -> Self {
        let mut app = Self {
            api,
            filter: ListFilter::default(),
            sort_preset: 0,
            todos: vec![],
            list_state: ListState::default(),
            loading: false,
            reload_pending: false,
            input_mode: InputMode::Normal,
            form: None,
            submitting: false,
            delete_target: None,
            notification: None,
        };
        app.request_reload();
        app
    }

    /// Marks the list stale. The event loop draws the loading state and then
    /// calls [`App::reload`].
    pub fn request_reload(&mut self) {
        self.reload_pending = true;
        self.loading = true;
    }

    pub async fn reload(&mut self) {
        self.reload_pending = false;
        self.loading = true;

        match self.api.list_todos(&self.filter).await {
            Ok(todos) => {
                self.todos = todos;
                let selected = self.list_state.selected().unwrap_or(0);
                self.list_state.select(if self.todos.is_empty() {
                    None
                } else {
                    Some(selected.min(self.todos.len() - 1))
                });
            }
            Err(e) => {
                tracing::warn!("Failed to fetch todos: {}", e);
                self.notify_error("Failed to fetch todos. Please check your API connection.");
            }
        }

        self.loading = false;
    }

    pub fn notify_success(&mut self, message: impl Into<String>) {
        self.notification = Some(Notification {
            kind: NotificationKind::Success,
            message: message.into(),
        });
    }

    pub fn notify_error(&mut self, message: impl Into<String>) {
        self.notification = Some(Notification {
            kind: NotificationKind::Error,
            message: message.into(),
        });
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }

    pub fn selected_todo(&self) -> Option<&Todo> {
        self.list_state.selected().and_then(|i| self.todos.get(i))
    }

    pub fn next_todo(&mut self) {
        if self.todos.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.todos.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous_todo(&mut self) {
        if self.todos.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.todos.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn toggle_status(&mut self, status: TodoStatus) {
        toggle(&mut self.filter.status, status);
        self.request_reload();
    }

    pub fn toggle_priority(&mut self, priority: TodoPriority) {
        toggle(&mut self.filter.priority, priority);
        self.request_reload();
    }

    pub fn start_search(&mut self) {
        self.input_mode = InputMode::Search;
    }

    pub fn finish_search(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn push_search_char(&mut self, c: char) {
        self.filter.search.push(c);
        self.request_reload();
    }

    pub fn pop_search_char(&mut self) {
        if self.filter.search.pop().is_some() {
            self.request_reload();
        }
    }

    pub fn sort_label(&self) -> &'static str {
        SORT_PRESETS[self.sort_preset].1
    }

    pub fn cycle_sort(&mut self) {
        self.sort_preset = (self.sort_preset + 1) % SORT_PRESETS.len();
        self.filter.sort = SORT_PRESETS[self.sort_preset].0;
        self.request_reload();
    }

    pub fn reset_filters(&mut self) {
        self.filter = ListFilter::default();
        self.sort_preset = 0;
        self.request_reload();
    }

    pub fn start_creating(&mut self) {
        self.form = Some(TodoForm::default());
        self.input_mode = InputMode::Form;
    }

    pub fn start_editing(&mut self) {
        if let Some(todo) = self.selected_todo() {
            self.form = Some(TodoForm::edit(todo));
            self.input_mode = InputMode::Form;
        }
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
        self.input_mode = InputMode::Normal;
    }

    /// Validates locally, then creates or updates. The dialog only closes on
    /// success; failures stay visible inside it.
    pub async fn submit_form(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };

        let payload = match form.validate() {
            Ok(payload) => payload,
            Err(errors) => {
                form.error = Some(errors.to_string());
                return;
            }
        };
        form.error = None;
        let editing = form.editing;

        self.submitting = true;
        let result = match editing {
            Some(id) => self.api.update_todo(id, &payload).await,
            None => self.api.create_todo(&payload).await,
        };
        self.submitting = false;

        let verb = if editing.is_some() { "update" } else { "create" };
        match result {
            Ok(_) => {
                self.cancel_form();
                self.notify_success(format!("Todo {verb}d successfully"));
                self.request_reload();
            }
            Err(e) => {
                tracing::warn!("Failed to {} todo: {}", verb, e);
                if let Some(form) = self.form.as_mut() {
                    form.error = Some(e.to_string());
                }
                self.notify_error(format!("Failed to {verb} todo"));
            }
        }
    }

    pub fn start_delete_confirm(&mut self) {
        if let Some(todo) = self.selected_todo() {
            self.delete_target = Some(todo.clone());
            self.input_mode = InputMode::DeleteConfirm;
        }
    }

    pub async fn confirm_delete(&mut self) {
        if let Some(todo) = self.delete_target.take() {
            match self.api.delete_todo(todo.id).await {
                Ok(()) => {
                    self.notify_success("Todo deleted successfully");
                    self.request_reload();
                }
                Err(e) => {
                    tracing::warn!("Failed to delete todo {}: {}", todo.id, e);
                    self.notify_error("Failed to delete todo");
                }
            }
        }
        self.input_mode = InputMode::Normal;
    }

    pub fn cancel_delete_confirm(&mut self) {
        self.input_mode = InputMode::Normal;
        self.delete_target = None;
    }

    pub fn show_help(&mut self) {
        self.input_mode = InputMode::Help;
    }

    pub fn hide_help(&mut self) {
        self.input_mode = InputMode::Normal;
    }
}
