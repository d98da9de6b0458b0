use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::datekey::DateKey;
use crate::model::{Scope, ScopeLayout, Selection, SlotType};

/// Last-selected date/slot/country, persisted across sessions. Read once at
/// startup, written on every selection change, cleared on sign-out. Not part
/// of the engine's pure core and never required for booking correctness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub date: Option<DateKey>,
    pub slot: Option<SlotType>,
    pub country: Option<String>,
}

impl Preferences {
    /// Turn saved preferences into an initial selection for the layout in
    /// use. A saved country is meaningless in a flat deployment.
    pub fn to_selection(&self, layout: &ScopeLayout) -> Selection {
        let scope = match layout {
            ScopeLayout::Flat(_) => Some(Scope::Global),
            ScopeLayout::PerCountry(_) => self.country.clone().map(Scope::Country),
        };
        Selection {
            scope,
            date: self.date.clone(),
            slot: self.slot,
        }
    }
}

/// Key-value side-effect seam for UI preferences. Failures are swallowed by
/// implementations (logged, defaulted) — a lost preference is cosmetic.
pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Preferences;
    fn save(&self, prefs: &Preferences);
    fn clear(&self);
}

/// Process-local store, mostly for tests.
pub struct MemoryPrefs {
    current: std::sync::RwLock<Preferences>,
}

impl MemoryPrefs {
    pub fn new() -> Self {
        Self {
            current: std::sync::RwLock::new(Preferences::default()),
        }
    }
}

impl Default for MemoryPrefs {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceStore for MemoryPrefs {
    fn load(&self) -> Preferences {
        self.current
            .read()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn save(&self, prefs: &Preferences) {
        if let Ok(mut current) = self.current.write() {
            *current = prefs.clone();
        }
    }

    fn clear(&self) {
        if let Ok(mut current) = self.current.write() {
            *current = Preferences::default();
        }
    }
}

/// JSON file on disk, the localStorage stand-in.
pub struct JsonFilePrefs {
    path: PathBuf,
}

impl JsonFilePrefs {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PreferenceStore for JsonFilePrefs {
    fn load(&self) -> Preferences {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("ignoring malformed preferences file: {e}");
                Preferences::default()
            }),
            Err(_) => Preferences::default(),
        }
    }

    fn save(&self, prefs: &Preferences) {
        let result = serde_json::to_string_pretty(prefs)
            .map_err(|e| e.to_string())
            .and_then(|raw| std::fs::write(&self.path, raw).map_err(|e| e.to_string()));
        if let Err(e) = result {
            tracing::warn!("failed to save preferences: {e}");
        }
    }

    fn clear(&self) {
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!("failed to clear preferences: {e}");
        }
    }
}
