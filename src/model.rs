use chrono::NaiveDate;
use std::fmt;

pub type TaskId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub category: String,
    /// `None` means unscheduled: the task never shows up on the calendar.
    pub due: Option<NaiveDate>,
    pub priority: Priority,
    pub completed: bool,
    pub description: Option<String>,
}

/// Everything a caller supplies when creating a task. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub category: String,
    pub due: Option<NaiveDate>,
    pub priority: Priority,
    pub description: Option<String>,
}

/// Time-estimate bucket. Doubles as the color cue on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    Long,
    #[default]
    Medium,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swatch {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const COMPLETED_SWATCH: Swatch = Swatch::rgb(0x9e, 0x9e, 0x9e);

#[derive(thiserror::Error, Debug)]
pub enum MutationError {
    #[error("task title must not be empty")]
    EmptyTitle,
    #[error("save failed: {0:#}")]
    SaveFailed(anyhow::Error),
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Long, Priority::Medium, Priority::Short];

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Long => "> 45 Minutes",
            Priority::Medium => "15-45 Minutes",
            Priority::Short => "< 15 Minutes",
        }
    }

    /// Strict lookup. Also understands the High/Medium/Low labels older task
    /// files were written with.
    pub fn from_label(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Some(p) = Priority::ALL.iter().find(|p| p.label() == trimmed) {
            return Some(*p);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "high" => Some(Priority::Long),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Short),
            _ => None,
        }
    }

    /// Unknown labels fall back to the default bucket.
    pub fn parse_lenient(raw: &str) -> Self {
        match Priority::from_label(raw) {
            Some(p) => p,
            None => {
                log::warn!("unknown priority {:?}, using {:?}", raw, Priority::default().label());
                Priority::default()
            }
        }
    }

    pub fn swatch(&self) -> Swatch {
        match self {
            Priority::Long => Swatch::rgb(0xff, 0x6b, 0x6b),
            Priority::Medium => Swatch::rgb(0xff, 0xa5, 0x00),
            Priority::Short => Swatch::rgb(0x90, 0xee, 0x90),
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Priority::Long => Priority::Medium,
            Priority::Medium => Priority::Short,
            Priority::Short => Priority::Long,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Swatch {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Swatch { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Task {
    pub fn from_new(id: TaskId, new: NewTask) -> Self {
        Task {
            id,
            title: new.title,
            category: new.category,
            due: new.due,
            priority: new.priority,
            completed: false,
            description: new.description,
        }
    }
}

impl NewTask {
    pub fn new(title: impl Into<String>, category: impl Into<String>, due: Option<NaiveDate>) -> Self {
        NewTask {
            title: title.into(),
            category: category.into(),
            due,
            priority: Priority::default(),
            description: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
