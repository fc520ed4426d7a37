//! Theme state container.
//!
//! Two independent fields: the theme the shopper is looking at and the light/dark
//! preference reported by their operating system. Changing the system
//! preference never changes the active theme by itself; the follow-the-system
//! rule lives in [`ThemeState::follow_system`] and only applies when no explicit
//! theme has been saved.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key under which the last chosen theme is persisted.
pub const THEME_PREFERENCE_KEY: &str = "theme";

/// A visual theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Neon,
    Minimal,
}

impl Theme {
    pub const ALL: [Self; 4] = [Self::Light, Self::Dark, Self::Neon, Self::Minimal];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::Neon => "neon",
            Self::Minimal => "minimal",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SystemTheme> for Theme {
    fn from(system: SystemTheme) -> Self {
        match system {
            SystemTheme::Light => Self::Light,
            SystemTheme::Dark => Self::Dark,
        }
    }
}

/// Error parsing a theme name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown theme: {0}")]
pub struct UnknownTheme(pub String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|theme| theme.as_str() == s)
            .ok_or_else(|| UnknownTheme(s.to_string()))
    }
}

/// Light/dark preference reported by the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SystemTheme {
    #[default]
    Light,
    Dark,
}

impl SystemTheme {
    /// Parse a `prefers-color-scheme` value (`light` or `dark`).
    ///
    /// Anything else yields `None`.
    #[must_use]
    pub fn from_color_scheme(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }
}

/// The value stored under [`THEME_PREFERENCE_KEY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemePreference {
    /// The shopper picked this theme.
    Explicit(Theme),
    /// Track the operating system.
    System,
}

impl ThemePreference {
    /// Parse a stored preference string. Unknown strings are treated as unset.
    #[must_use]
    pub fn from_stored(value: &str) -> Option<Self> {
        if value == "system" {
            return Some(Self::System);
        }
        value.parse().ok().map(Self::Explicit)
    }

    /// String form for storage.
    #[must_use]
    pub const fn as_stored(self) -> &'static str {
        match self {
            Self::Explicit(theme) => theme.as_str(),
            Self::System => "system",
        }
    }

    /// The explicit theme, if any.
    #[must_use]
    pub const fn explicit(self) -> Option<Theme> {
        match self {
            Self::Explicit(theme) => Some(theme),
            Self::System => None,
        }
    }
}

impl Serialize for ThemePreference {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_stored())
    }
}

impl<'de> Deserialize<'de> for ThemePreference {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_stored(&raw)
            .ok_or_else(|| serde::de::Error::custom(UnknownTheme(raw)))
    }
}

/// Active theme plus detected system preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThemeState {
    pub current_theme: Theme,
    pub system_theme: SystemTheme,
}

impl ThemeState {
    /// First-render state: a saved explicit theme wins, otherwise follow the system.
    #[must_use]
    pub fn initial(saved: Option<ThemePreference>, system: SystemTheme) -> Self {
        let current_theme = saved
            .and_then(ThemePreference::explicit)
            .unwrap_or_else(|| system.into());
        Self {
            current_theme,
            system_theme: system,
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.current_theme = theme;
    }

    /// Record the system preference. Leaves the active theme alone.
    pub fn set_system_theme(&mut self, system: SystemTheme) {
        self.system_theme = system;
    }

    /// Handle a system preference change.
    ///
    /// Switches the active theme only when the shopper has not saved an
    /// explicit choice. Returns whether the active theme changed.
    pub fn follow_system(&mut self, saved: Option<ThemePreference>, system: SystemTheme) -> bool {
        self.set_system_theme(system);
        if saved.and_then(ThemePreference::explicit).is_some() {
            return false;
        }
        let next = Theme::from(system);
        let changed = next != self.current_theme;
        self.set_theme(next);
        changed
    }

    /// Apply a newly chosen preference, resolving `System` against the current
    /// system preference.
    pub fn apply_preference(&mut self, preference: ThemePreference) {
        let theme = preference
            .explicit()
            .unwrap_or_else(|| self.system_theme.into());
        self.set_theme(theme);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_change_does_not_override_choice() {
        let mut state = ThemeState::default();
        state.set_theme(Theme::Dark);
        state.set_system_theme(SystemTheme::Light);

        assert_eq!(state.current_theme, Theme::Dark);
        assert_eq!(state.system_theme, SystemTheme::Light);
    }

    #[test]
    fn test_initial_prefers_saved_theme() {
        let state = ThemeState::initial(
            Some(ThemePreference::Explicit(Theme::Neon)),
            SystemTheme::Dark,
        );
        assert_eq!(state.current_theme, Theme::Neon);
        assert_eq!(state.system_theme, SystemTheme::Dark);
    }

    #[test]
    fn test_initial_without_saved_follows_system() {
        let state = ThemeState::initial(None, SystemTheme::Dark);
        assert_eq!(state.current_theme, Theme::Dark);

        let state = ThemeState::initial(Some(ThemePreference::System), SystemTheme::Dark);
        assert_eq!(state.current_theme, Theme::Dark);
    }

    #[test]
    fn test_follow_system_respects_explicit_choice() {
        let saved = Some(ThemePreference::Explicit(Theme::Minimal));
        let mut state = ThemeState::initial(saved, SystemTheme::Light);

        let changed = state.follow_system(saved, SystemTheme::Dark);

        assert!(!changed);
        assert_eq!(state.current_theme, Theme::Minimal);
        assert_eq!(state.system_theme, SystemTheme::Dark);
    }

    #[test]
    fn test_follow_system_switches_when_unset() {
        let mut state = ThemeState::initial(None, SystemTheme::Light);

        assert!(state.follow_system(None, SystemTheme::Dark));
        assert_eq!(state.current_theme, Theme::Dark);

        assert!(!state.follow_system(Some(ThemePreference::System), SystemTheme::Dark));
    }

    #[test]
    fn test_preference_parsing() {
        assert_eq!(
            ThemePreference::from_stored("neon"),
            Some(ThemePreference::Explicit(Theme::Neon))
        );
        assert_eq!(
            ThemePreference::from_stored("system"),
            Some(ThemePreference::System)
        );
        assert_eq!(ThemePreference::from_stored("sepia"), None);
    }

    #[test]
    fn test_apply_system_preference_resolves_to_system_theme() {
        let mut state = ThemeState::initial(Some(ThemePreference::Explicit(Theme::Neon)), SystemTheme::Dark);
        state.apply_preference(ThemePreference::System);
        assert_eq!(state.current_theme, Theme::Dark);
    }

    #[test]
    fn test_color_scheme_hint() {
        assert_eq!(SystemTheme::from_color_scheme(" Dark "), Some(SystemTheme::Dark));
        assert_eq!(SystemTheme::from_color_scheme("light"), Some(SystemTheme::Light));
        assert_eq!(SystemTheme::from_color_scheme("no-preference"), None);
    }
}
