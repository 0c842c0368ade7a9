use crate::error::ValidationError;

/// Place-search filter a preference label resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySpec {
    pub place_type: String,
    pub keywords: Vec<String>,
}

impl CategorySpec {
    pub fn new(place_type: &str, keywords: &[&str]) -> Self {
        Self {
            place_type: place_type.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Space-joined keywords, or `None` when the category has none.
    pub fn keyword_filter(&self) -> Option<String> {
        if self.keywords.is_empty() {
            None
        } else {
            Some(self.keywords.join(" "))
        }
    }
}

/// Lookup table from user-facing preference label to search filter.
///
/// Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    entries: Vec<(String, CategorySpec)>,
}

impl CategoryTable {
    pub fn builtin() -> Self {
        Self::from_entries([
            ("Restaurant", CategorySpec::new("restaurant", &[])),
            (
                "Veg Restaurant",
                CategorySpec::new("restaurant", &["veg", "vegetarian"]),
            ),
            ("Beach", CategorySpec::new("natural_feature", &["beach"])),
            (
                "Tourist attraction",
                CategorySpec::new("tourist_attraction", &[]),
            ),
            ("Famous temples", CategorySpec::new("hindu_temple", &["temple"])),
            (
                "Children fun or play spot",
                CategorySpec::new("amusement_park", &["kids", "children", "play", "park"]),
            ),
            (
                "Famous food point",
                CategorySpec::new("restaurant", &["famous", "special", "popular"]),
            ),
        ])
    }

    /// Later duplicates of a label are ignored.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, CategorySpec)>) -> Self {
        let mut table = Self {
            entries: Vec::new(),
        };
        for (label, spec) in entries {
            if !table.contains(label) {
                table.entries.push((label.to_string(), spec));
            }
        }
        table
    }

    pub fn resolve(&self, label: &str) -> Result<&CategorySpec, ValidationError> {
        self.entries
            .iter()
            .find(|(known, _)| known == label)
            .map(|(_, spec)| spec)
            .ok_or_else(|| ValidationError::UnknownPreferences(vec![label.to_string()]))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|(known, _)| known == label)
    }

    /// Labels in table order, for error responses.
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|(label, _)| label.clone()).collect()
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::builtin()
    }
}
