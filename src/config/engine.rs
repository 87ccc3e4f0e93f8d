//! Configuration resolution engine
//!
//! Rebuilds the whole lookup table from the settings store on every load:
//! global toggles, the `@default` base, exact `app:`/`class:` keys and
//! compiled `regex.*` rules. Resolved configs are shared as `Rc`s, and a
//! reload hands out the previous `Rc` for any config whose value did not
//! change, so callers can skip work on pointer equality.

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use tracing::{debug, info, warn};

use crate::config::accent::accent_to_rgba;
use crate::config::normalize::{GlobalConfig, ResolvedConfig};
use crate::config::raw::{MarginsValue, MatchRule, RadiusValue, RawConfig, RawConfigStore};
use crate::config::settings::{SettingsStore, read_or_default};
use crate::constants::rules::{APP_PREFIX, CLASS_PREFIX};
use crate::constants::{color, keys, revision};

/// Built-in presets and rules seeded on first run
const FALLBACK_APP_CONFIGS: &str = r##"{
    "@default": {"width": 3},
    "@zeroPreset": {"maximizedBorder": true},
    "@zeroNoMaxPreset": {"maximizedBorder": false},
    "@electronPreset": {"maximizedBorder": true},
    "@adwPreset": {"margins": -25, "radius": 18},
    "@gtkPreset": {
        "margins": {"top": -22, "right": -25, "bottom": -28, "left": -25},
        "radius": {"tl": 10, "tr": 10, "br": 0, "bl": 0}
    },
    "@qtPreset": {
        "margins": {"top": -25, "right": -25, "bottom": -24, "left": -25},
        "radius": {"tl": 18, "tr": 18, "br": 0, "bl": 0}
    },
    "@chromePreset": {
        "margins": {"top": -10, "right": -16, "bottom": -32, "left": -16},
        "radius": {"tl": 12, "tr": 12, "br": 0, "bl": 0}
    },
    "@chromeGtkPreset": {
        "margins": {"top": -8, "right": -11, "bottom": -13, "left": -11},
        "radius": {"tl": 14, "tr": 14, "br": 0, "bl": 0}
    },
    "@zedPreset": {
        "margins": {"top": -10, "right": -11, "bottom": -11, "left": -10},
        "radius": 14
    },
    "@footPreset": {"margins": {"top": 27}, "maximizedBorder": true},

    "regex.class:^org.gnome.*": "@adwPreset",
    "class:com.github.tchx84.Flatseal": "@adwPreset",
    "class:simple-scan": "@adwPreset",
    "class:re.sonny.Workbench": "@adwPreset",
    "class:com.mattjakeman.ExtensionManager": "@adwPreset",

    "class:org.gnome.Terminal": "@gtkPreset",
    "class:org.gnome.seahorse.Application": "@gtkPreset",
    "class:firefox": "@gtkPreset",
    "class:io.ente.auth": "@gtkPreset",
    "class:dconf-editor": "@gtkPreset",
    "class:org.gimp.GIMP": "@gtkPreset",
    "class:gimp": "@gtkPreset",
    "class:org.inkscape.Inkscape": "@gtkPreset",
    "class:system-config-printer": "@gtkPreset",
    "class:libreoffice-calc": "@gtkPreset",
    "class:libreoffice-writer": "@gtkPreset",
    "class:libreoffice-impress": "@gtkPreset",
    "class:libreoffice-draw": "@gtkPreset",
    "class:gnome-power-statistics": "@gtkPreset",
    "class:cheese": "@gtkPreset",
    "class:solaar": "@gtkPreset",
    "class:org.pulseaudio.pavucontrol": "@gtkPreset",

    "regex.class:^google-chrome*": "@chromePreset",
    "regex.class:^chrome-*": "@chromePreset",
    "regex.class:^chromium*": "@chromePreset",

    "class:obsidian": "@electronPreset",
    "class:zulip": "@electronPreset",
    "class:slack": "@electronPreset",
    "class:code": "@electronPreset",
    "class:antigravity": "@electronPreset",
    "class:spotify": "@electronPreset",
    "class:discord": "@electronPreset",

    "class:vlc": "@qtPreset",
    "class:krita": "@qtPreset",
    "class:qpwgraph": "@qtPreset",

    "class:dev.zed.Zed": "@zedPreset",
    "class:mpv": "@zeroPreset",

    "class:foot": "@footPreset",
    "class:footclient": "@footPreset",
    "class:Alacritty": {
        "margins": {"top": 36},
        "radius": {"tl": 12, "tr": 12},
        "maximizedBorder": true
    }
}"##;

/// The table written to settings on first run
pub fn fallback_app_configs() -> Result<RawConfigStore> {
    RawConfigStore::parse(FALLBACK_APP_CONFIGS).context("Built-in app-configs table is invalid")
}

/// Change reason passed to listeners after a settings reload
pub const REASON_SETTINGS: &str = "settings-changed";
/// Change reason passed to listeners after an accent preference change
pub const REASON_ACCENT: &str = "accent-color";

/// The parts of a window's identity that select its config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowIdentity {
    pub app_id: Option<String>,
    pub wm_class: Option<String>,
    pub title: Option<String>,
}

impl WindowIdentity {
    pub fn new(app_id: Option<&str>, wm_class: Option<&str>) -> Self {
        Self {
            app_id: app_id.map(str::to_string),
            wm_class: wm_class.map(str::to_string),
            title: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&str)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternField {
    AppId,
    WmClass,
}

#[derive(Debug)]
struct PatternRule {
    key: String,
    field: PatternField,
    /// `None` when the pattern failed to compile; such a rule never matches
    regex: Option<Regex>,
    config: Rc<ResolvedConfig>,
}

impl PatternRule {
    fn matches(&self, identity: &WindowIdentity) -> bool {
        let subject = match self.field {
            PatternField::AppId => identity.app_id.as_deref(),
            PatternField::WmClass => identity.wm_class.as_deref(),
        };
        match (subject, &self.regex) {
            (Some(text), Some(regex)) if !text.is_empty() => regex.is_match(text),
            _ => false,
        }
    }
}

pub struct ConfigEngine<S: SettingsStore> {
    settings: S,
    global: GlobalConfig,
    /// Last table that parsed successfully
    raw: RawConfigStore,
    default: Rc<ResolvedConfig>,
    exact: HashMap<String, Rc<ResolvedConfig>>,
    patterns: Vec<PatternRule>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl<S: SettingsStore> ConfigEngine<S> {
    /// Load from `settings`, seeding built-in defaults if the stored revision is old
    pub fn new(settings: S) -> Self {
        let mut engine = Self {
            settings,
            global: GlobalConfig::default(),
            raw: RawConfigStore::new(),
            default: Rc::new(ResolvedConfig::normalize(
                &RawConfig::default(),
                &GlobalConfig::default(),
            )),
            exact: HashMap::new(),
            patterns: Vec::new(),
            listeners: Vec::new(),
            next_listener: 0,
        };
        engine.load();
        let _ = engine
            .ensure_defaults_saved()
            .inspect_err(|e| warn!(error = %e, "Failed to save default configuration"));
        engine
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// Direct store access; callers must [`load`](Self::load) after writing
    pub fn settings_mut(&mut self) -> &mut S {
        &mut self.settings
    }

    pub fn global(&self) -> GlobalConfig {
        self.global
    }

    /// The last successfully parsed raw table
    pub fn raw(&self) -> &RawConfigStore {
        &self.raw
    }

    pub fn default_config(&self) -> Rc<ResolvedConfig> {
        Rc::clone(&self.default)
    }

    /// Rebuild everything from the settings store
    ///
    /// Never fails: unusable scalars read as their defaults and an unparsable
    /// table keeps the last one that parsed.
    pub fn load(&mut self) {
        let radius_enabled = self.read_bool(keys::RADIUS_ENABLED);
        self.global = GlobalConfig {
            radius_enabled,
            modal_enabled: self.read_bool(keys::MODAL_ENABLED),
            verbose_logging: self.read_bool(keys::VERBOSE_LOGGING),
        };

        let blob = self.read_string(keys::APP_CONFIGS);
        match RawConfigStore::parse(&blob) {
            Ok(store) => self.raw = store,
            Err(err) => warn!(
                error = %format!("{err:#}"),
                entries = self.raw.entries.len(),
                "Failed to parse saved app configs, keeping previous table"
            ),
        }

        // Reuse previous allocations for unchanged values
        let mut interned: HashMap<ResolvedConfig, Rc<ResolvedConfig>> = HashMap::new();
        for config in std::iter::once(&self.default)
            .chain(self.exact.values())
            .chain(self.patterns.iter().map(|p| &p.config))
        {
            interned.insert((**config).clone(), Rc::clone(config));
        }
        let mut intern = |config: ResolvedConfig| -> Rc<ResolvedConfig> {
            Rc::clone(
                interned
                    .entry(config.clone())
                    .or_insert_with(|| Rc::new(config)),
            )
        };

        let default_config = ResolvedConfig::normalize(
            &self.raw.default_config().overlay_on(&self.fallback_scalars()),
            &self.global,
        );
        let rule_base = RawConfig {
            enabled: Some(true),
            ..Default::default()
        }
        .overlay_on(&default_config.to_raw());

        let mut exact = HashMap::new();
        let mut patterns = Vec::new();
        for (key, raw) in self.raw.resolve_presets() {
            let config = intern(ResolvedConfig::normalize(&raw.overlay_on(&rule_base), &self.global));
            match MatchRule::parse(key) {
                MatchRule::App(_) | MatchRule::Class(_) => {
                    exact.insert(key.to_lowercase(), config);
                }
                MatchRule::RegexApp(pattern) => {
                    patterns.push(compile_rule(key, PatternField::AppId, pattern, config));
                }
                MatchRule::RegexClass(pattern) => {
                    patterns.push(compile_rule(key, PatternField::WmClass, pattern, config));
                }
                MatchRule::Default | MatchRule::Preset(_) => {}
                MatchRule::Unknown => debug!(key = %key, "Ignoring app config with unknown key form"),
            }
        }

        self.default = intern(default_config);
        self.exact = exact;
        self.patterns = patterns;

        debug!(
            exact = self.exact.len(),
            patterns = self.patterns.len(),
            radius_enabled = self.global.radius_enabled,
            modal_enabled = self.global.modal_enabled,
            "Configuration loaded"
        );
    }

    /// Config for a window: exact app id, exact class, first matching pattern, then `@default`
    pub fn resolve_for_window(&self, identity: &WindowIdentity) -> Rc<ResolvedConfig> {
        exact_keys(identity)
            .find_map(|key| self.exact.get(&key))
            .or_else(|| {
                self.patterns
                    .iter()
                    .find(|rule| rule.matches(identity))
                    .map(|rule| &rule.config)
            })
            .map(Rc::clone)
            .unwrap_or_else(|| Rc::clone(&self.default))
    }

    /// Key of the rule that applies to `identity`, `None` for `@default`
    pub fn matching_key(&self, identity: &WindowIdentity) -> Option<String> {
        exact_keys(identity)
            .find(|key| self.exact.contains_key(key))
            .or_else(|| {
                self.patterns
                    .iter()
                    .find(|rule| rule.matches(identity))
                    .map(|rule| rule.key.clone())
            })
    }

    pub fn add_config_change_listener(&mut self, listener: impl FnMut(&str) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_config_change_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// A persisted key changed externally
    pub fn handle_setting_changed(&mut self, key: &str) {
        debug!(key = %key, "Setting changed");
        self.load();
        self.notify(REASON_SETTINGS);
    }

    /// The system accent preference changed
    pub fn handle_accent_changed(&mut self) {
        debug!(accent = ?self.settings.accent_color(), "Accent color changed");
        self.load();
        self.notify(REASON_ACCENT);
    }

    /// Persist a full table, then reload
    pub fn save_app_configs(&mut self, store: &RawConfigStore) -> Result<()> {
        let json = store.to_json()?;
        self.settings
            .set_string(keys::APP_CONFIGS, &json)
            .context("Failed to save app configs")?;
        self.load();
        Ok(())
    }

    /// Version-gated first-run seeding
    ///
    /// Below the current revision every scalar is written back with its
    /// current value. The built-in table is only written when nothing was
    /// ever seeded or the stored table is empty, so user rules survive
    /// revision bumps. Returns whether anything was written.
    pub fn ensure_defaults_saved(&mut self) -> Result<bool> {
        let stored_revision = self.read_int(keys::CONFIG_VERSION);
        if stored_revision >= revision::CURRENT {
            return Ok(false);
        }

        info!(
            from = stored_revision,
            to = revision::CURRENT,
            "Saving default configuration values"
        );

        for key in [
            keys::RADIUS_ENABLED,
            keys::DEFAULT_MAXIMIZED_BORDERS,
            keys::DEFAULT_ENABLED,
            keys::MODAL_ENABLED,
            keys::VERBOSE_LOGGING,
            keys::DEFAULT_MARGINS,
            keys::DEFAULT_RADIUS,
            keys::DEFAULT_WIDTH,
            keys::DEFAULT_ACTIVE_COLOR,
            keys::DEFAULT_INACTIVE_COLOR,
        ] {
            let value = read_or_default(&self.settings, key);
            self.settings
                .set(key, value)
                .with_context(|| format!("Failed to save default for '{key}'"))?;
        }

        let stored_table = RawConfigStore::parse(&self.read_string(keys::APP_CONFIGS));
        let table_empty = stored_table.map(|t| t.is_empty()).unwrap_or(false);
        if stored_revision == 0 || table_empty {
            let json = fallback_app_configs()?.to_json()?;
            self.settings
                .set_string(keys::APP_CONFIGS, &json)
                .context("Failed to seed app configs")?;
            info!("Seeded built-in app configs");
        }

        self.settings
            .set_int(keys::CONFIG_VERSION, revision::CURRENT)
            .context("Failed to save config revision")?;
        self.load();
        Ok(true)
    }

    fn notify(&mut self, reason: &str) {
        for (_, listener) in &mut self.listeners {
            listener(reason);
        }
    }

    /// Raw form of the scalar defaults every `@default` starts from
    fn fallback_scalars(&self) -> RawConfig {
        let active = self.read_string(keys::DEFAULT_ACTIVE_COLOR);
        let active_color = if active == color::AUTO {
            accent_to_rgba(self.settings.accent_color().as_deref()).to_string()
        } else {
            active
        };

        RawConfig {
            enabled: Some(self.read_bool(keys::DEFAULT_ENABLED)),
            maximized_border: Some(self.read_bool(keys::DEFAULT_MAXIMIZED_BORDERS)),
            width: Some(self.read_int(keys::DEFAULT_WIDTH)),
            margins: Some(MarginsValue::Uniform(self.read_int(keys::DEFAULT_MARGINS))),
            radius: Some(RadiusValue::Uniform(self.read_int(keys::DEFAULT_RADIUS))),
            active_color: Some(active_color),
            inactive_color: Some(self.read_string(keys::DEFAULT_INACTIVE_COLOR)),
            extra: serde_json::Map::new(),
        }
    }

    fn read_bool(&self, key: &str) -> bool {
        read_or_default(&self.settings, key).as_bool().unwrap_or_default()
    }

    fn read_int(&self, key: &str) -> i64 {
        read_or_default(&self.settings, key).as_int().unwrap_or_default()
    }

    fn read_string(&self, key: &str) -> String {
        read_or_default(&self.settings, key)
            .as_str()
            .map(str::to_string)
            .unwrap_or_default()
    }
}

/// Lowercased exact-match keys for `identity`, app id first
fn exact_keys(identity: &WindowIdentity) -> impl Iterator<Item = String> + '_ {
    [
        (APP_PREFIX, identity.app_id.as_deref()),
        (CLASS_PREFIX, identity.wm_class.as_deref()),
    ]
    .into_iter()
    .filter_map(|(prefix, value)| {
        value
            .filter(|v| !v.is_empty())
            .map(|v| format!("{prefix}{}", v.to_lowercase()))
    })
}

fn compile_rule(
    key: &str,
    field: PatternField,
    pattern: &str,
    config: Rc<ResolvedConfig>,
) -> PatternRule {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .inspect_err(|e| warn!(key = %key, error = %e, "Invalid pattern, rule will never match"))
        .ok();
    PatternRule {
        key: key.to_string(),
        field,
        regex,
        config,
    }
}
