use std::collections::HashSet;

use crate::settings::CacheSettings;

/// The set of installed font families and the family used when a request
/// names one that is not installed.
pub struct FontRegistry {
    families: HashSet<String>,
    default_family: String,
}

impl FontRegistry {
    pub fn new(
        default_family: impl Into<String>,
        families: impl IntoIterator<Item = String>,
    ) -> Self {
        let default_family = default_family.into();
        let mut families: HashSet<String> = families.into_iter().collect();
        families.insert(default_family.clone());
        Self {
            families,
            default_family,
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(
            settings.default_font_family.clone(),
            settings.font_families.iter().cloned(),
        )
    }

    pub fn contains(&self, family: &str) -> bool {
        self.families.contains(family)
    }

    pub fn default_family(&self) -> &str {
        &self.default_family
    }

    /// Resolve a requested family to an installed one, falling back to the
    /// default with a warning when the request is unknown.
    pub fn resolve<'a>(&'a self, family: &'a str) -> &'a str {
        if self.contains(family) {
            family
        } else {
            log::warn!(
                "Font family '{}' is not installed, using default '{}'",
                family,
                self.default_family
            );
            &self.default_family
        }
    }
}
