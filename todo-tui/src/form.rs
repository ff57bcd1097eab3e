use serde_json::Value;
use todo_core::{Todo, TodoPayload, TodoPriority, TodoStatus, ValidationErrors, validate_create};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    DueDate,
    Status,
    Priority,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::Title,
        FormField::Description,
        FormField::DueDate,
        FormField::Status,
        FormField::Priority,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Description => "Description (optional)",
            FormField::DueDate => "Due date (optional, YYYY-MM-DD)",
            FormField::Status => "Status",
            FormField::Priority => "Priority",
        }
    }

    pub fn is_choice(self) -> bool {
        matches!(self, FormField::Status | FormField::Priority)
    }
}

/// Steps through `all` from `current`, wrapping at either end.
pub fn cycle<T: Copy + PartialEq>(all: &[T], current: T, forward: bool) -> T {
    let len = all.len();
    let index = all.iter().position(|v| *v == current).unwrap_or(0);
    let next = if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    };
    all[next]
}

/// State of the create/edit dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct TodoForm {
    pub editing: Option<i64>,
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    pub focus: FormField,
    pub error: Option<String>,
}

impl Default for TodoForm {
    fn default() -> Self {
        Self {
            editing: None,
            title: String::new(),
            description: String::new(),
            due_date: String::new(),
            status: TodoStatus::Todo,
            priority: TodoPriority::Medium,
            focus: FormField::Title,
            error: None,
        }
    }
}

impl TodoForm {
    pub fn edit(todo: &Todo) -> Self {
        Self {
            editing: Some(todo.id),
            title: todo.title.clone(),
            description: todo.description.clone().unwrap_or_default(),
            due_date: todo
                .due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            status: todo.status,
            priority: todo.priority,
            ..Self::default()
        }
    }

    pub fn title_text(&self) -> &'static str {
        if self.editing.is_some() {
            "edit todo"
        } else {
            "new todo"
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = cycle(&FormField::ALL, self.focus, true);
    }

    pub fn focus_previous(&mut self) {
        self.focus = cycle(&FormField::ALL, self.focus, false);
    }

    fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::DueDate => Some(&mut self.due_date),
            FormField::Status | FormField::Priority => None,
        }
    }

    pub fn input(&mut self, c: char) {
        if let Some(text) = self.focused_text() {
            text.push(c);
        } else if c == ' ' {
            self.cycle_choice(true);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(text) = self.focused_text() {
            text.pop();
        }
    }

    pub fn cycle_choice(&mut self, forward: bool) {
        match self.focus {
            FormField::Status => self.status = cycle(&TodoStatus::ALL, self.status, forward),
            FormField::Priority => {
                self.priority = cycle(&TodoPriority::ALL, self.priority, forward)
            }
            _ => {}
        }
    }

    /// Body sent to the service. Blank optional fields are omitted on create
    /// and sent as `null` on edit so that clearing them sticks.
    pub fn payload(&self) -> TodoPayload {
        let optional = |text: &str| {
            let text = text.trim();
            if !text.is_empty() {
                Some(Value::String(text.to_string()))
            } else if self.editing.is_some() {
                Some(Value::Null)
            } else {
                None
            }
        };
        TodoPayload {
            title: Some(Value::String(self.title.clone())),
            description: optional(&self.description),
            status: Some(Value::String(self.status.as_str().to_string())),
            priority: Some(Value::String(self.priority.as_str().to_string())),
            due_date: optional(&self.due_date),
        }
    }

    /// Runs the same validation pass the service applies to creates; the
    /// form always carries every required field, edits included.
    pub fn validate(&self) -> Result<TodoPayload, ValidationErrors> {
        let payload = self.payload();
        validate_create(&payload)?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn todo() -> Todo {
        Todo {
            id: 12,
            title: "Renew passport".to_string(),
            description: Some("photos first".to_string()),
            status: TodoStatus::InProgress,
            priority: TodoPriority::High,
            due_date: NaiveDate::from_ymd_opt(2025, 8, 9),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn new_form_defaults_to_todo_and_medium() {
        let form = TodoForm::default();
        assert_eq!(form.status, TodoStatus::Todo);
        assert_eq!(form.priority, TodoPriority::Medium);
        assert_eq!(form.title_text(), "new todo");
    }

    #[test]
    fn edit_form_is_prefilled() {
        let form = TodoForm::edit(&todo());
        assert_eq!(form.editing, Some(12));
        assert_eq!(form.title, "Renew passport");
        assert_eq!(form.description, "photos first");
        assert_eq!(form.due_date, "2025-08-09");
        assert_eq!(form.status, TodoStatus::InProgress);
    }

    #[test]
    fn typing_goes_to_text_fields_and_space_cycles_choices() {
        let mut form = TodoForm::default();
        for c in "Tax".chars() {
            form.input(c);
        }
        form.backspace();
        assert_eq!(form.title, "Ta");

        form.focus = FormField::Status;
        form.input(' ');
        assert_eq!(form.status, TodoStatus::InProgress);
        form.cycle_choice(false);
        form.cycle_choice(false);
        assert_eq!(form.status, TodoStatus::Done);
    }

    #[test]
    fn focus_wraps_around() {
        let mut form = TodoForm::default();
        form.focus_previous();
        assert_eq!(form.focus, FormField::Priority);
        form.focus_next();
        assert_eq!(form.focus, FormField::Title);
    }

    #[test]
    fn create_payload_omits_blank_optionals() {
        let mut form = TodoForm::default();
        form.title = "Buy milk".to_string();
        form.description = "   ".to_string();

        let payload = serde_json::to_value(form.validate().unwrap()).unwrap();
        assert_eq!(
            payload,
            json!({ "title": "Buy milk", "status": "todo", "priority": "medium" })
        );
    }

    #[test]
    fn edit_payload_clears_blank_optionals() {
        let mut form = TodoForm::edit(&todo());
        form.description.clear();
        form.due_date.clear();

        let payload = serde_json::to_value(form.payload()).unwrap();
        assert_eq!(payload["description"], Value::Null);
        assert_eq!(payload["dueDate"], Value::Null);
    }

    #[test]
    fn local_validation_matches_service_rules() {
        let mut form = TodoForm::default();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.violations()[0].field, "title");

        form.title = "x".repeat(256);
        assert!(form.validate().is_err());

        form.title = "ok".to_string();
        form.due_date = "next week".to_string();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.violations()[0].field, "dueDate");
    }
}
