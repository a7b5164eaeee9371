use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOver {
    pub list_id: String,
    pub item_id: Option<String>,
    pub placement: Placement,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarOver {
    pub date: NaiveDate,
    pub minutes: i32,
}

/// Resolved target of an in-flight drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOver {
    List(ListOver),
    Calendar(CalendarOver),
}

impl DragOver {
    pub fn as_list(&self) -> Option<&ListOver> {
        match self {
            Self::List(over) => Some(over),
            Self::Calendar(_) => None,
        }
    }

    pub fn as_calendar(&self) -> Option<&CalendarOver> {
        match self {
            Self::List(_) => None,
            Self::Calendar(over) => Some(over),
        }
    }

    pub fn is_list(&self, list_id: &str) -> bool {
        self.as_list().is_some_and(|over| over.list_id == list_id)
    }
}

/// Where a drag started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSource {
    List { list_id: String },
    Calendar { date: Option<NaiveDate> },
}

impl DragSource {
    pub fn list(list_id: impl Into<String>) -> Self {
        Self::List {
            list_id: list_id.into(),
        }
    }

    pub fn is_calendar(&self) -> bool {
        matches!(self, Self::Calendar { .. })
    }

    pub fn is_list(&self, list_id: &str) -> bool {
        matches!(self, Self::List { list_id: id } if id == list_id)
    }
}
