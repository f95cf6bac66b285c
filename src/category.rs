//! Notification categories
use serde::{Deserialize, Serialize};

/// Kind of notification. Each configured category gets its own quota.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Status,
    News,
    Marketing,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Status, Category::News, Category::Marketing];

    /// Stable display name handed to sinks
    pub fn name(&self) -> &'static str {
        match self {
            Category::Status => "Status",
            Category::News => "News",
            Category::Marketing => "Marketing",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "status" => Ok(Category::Status),
            "news" => Ok(Category::News),
            "marketing" => Ok(Category::Marketing),
            _ => Err(format!("Invalid category: {}", s)),
        }
    }
}
