#![forbid(unsafe_code)]

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use window_borders::config::raw::RawEntry;
use window_borders::config::settings::lookup;
use window_borders::config::{ConfigEngine, RawConfig, RawConfigStore, SettingsStore, WindowIdentity};
use window_borders::geometry::{MaximizeState, WindowSnapshot};
use window_borders::overlay::OverlayStyle;
use window_borders::persistence::JsonFileSettings;
use window_borders::policy::{self, BorderState};
use window_borders::prefs::{self, Field};
use window_borders::types::{Rect, Size};

#[derive(Debug, Parser)]
#[command(name = "window-borders", version, about = "Manage window border styles")]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log at debug level regardless of LOG_LEVEL
    #[arg(long, short, global = true)]
    verbose: bool,

    /// System accent color name used when the active color is `auto`
    #[arg(long, global = true)]
    accent: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print global settings and the whole config table
    Show,
    /// List app configs and presets
    List,
    /// Replace the whole config table with a JSON object read from a file or `-` for stdin
    Apply { source: PathBuf },
    /// Add an app config or preset
    Add {
        key: String,
        /// Reference this preset instead of creating an empty override
        #[arg(long, conflicts_with = "json")]
        preset: Option<String>,
        /// Initial overrides as a JSON object
        #[arg(long)]
        json: Option<String>,
    },
    /// Remove an entry
    Remove { key: String },
    /// Rename an entry; renaming a preset updates its references
    Rename { old: String, new: String },
    /// Set one field of a custom entry
    Set { key: String, field: Field, value: String },
    /// Point an app config at a preset
    UsePreset { key: String, preset: String },
    /// Turn a preset reference into an editable copy
    Customize { key: String },
    /// Clear every override of an entry
    Reset { key: String },
    /// Read a global setting
    Get { name: String },
    /// Write a global setting
    Put { name: String, value: String },
    /// Show which rule and style a window would get
    Resolve {
        #[arg(long)]
        app_id: Option<String>,
        #[arg(long = "class")]
        wm_class: Option<String>,
    },
    /// Compute the border for a window placed on screen
    Preview {
        #[arg(long)]
        app_id: Option<String>,
        #[arg(long = "class")]
        wm_class: Option<String>,
        /// Content size as WxH (defaults to the frame size)
        #[arg(long, value_parser = parse_size)]
        size: Option<Size>,
        /// Window frame as x,y,width,height
        #[arg(long, value_parser = parse_rect)]
        frame: Rect,
        /// Work area as x,y,width,height
        #[arg(long, value_parser = parse_rect)]
        work_area: Option<Rect>,
        #[arg(long)]
        focused: bool,
        #[arg(long)]
        fullscreen: bool,
        #[arg(long, value_enum)]
        maximized: Option<Maximized>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Maximized {
    #[value(name = "h")]
    Horizontal,
    #[value(name = "v")]
    Vertical,
    Both,
}

impl Maximized {
    fn state(maximized: Option<Maximized>) -> MaximizeState {
        match maximized {
            None => MaximizeState::default(),
            Some(Maximized::Horizontal) => MaximizeState::from_axes(true, false),
            Some(Maximized::Vertical) => MaximizeState::from_axes(false, true),
            Some(Maximized::Both) => MaximizeState::from_axes(true, true),
        }
    }
}

fn parse_size(value: &str) -> Result<Size, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{value}'"))?;
    let parse = |p: &str| p.trim().parse::<i32>().map_err(|e| format!("'{p}': {e}"));
    Ok(Size::new(parse(width)?, parse(height)?))
}

fn parse_rect(value: &str) -> Result<Rect, String> {
    let parts: Vec<i32> = value
        .split(',')
        .map(|p| p.trim().parse::<i32>().map_err(|e| format!("'{p}': {e}")))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [x, y, width, height] => Ok(Rect::new(*x, *y, *width, *height)),
        _ => Err(format!("expected x,y,width,height, got '{value}'")),
    }
}

fn read_source(source: &Path) -> Result<String> {
    if source == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read config table from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(source).context(format!("Failed to read {}", source.display()))
}

/// Apply `edit` to a copy of the current table and persist it
fn edit_table(
    engine: &mut ConfigEngine<JsonFileSettings>,
    edit: impl FnOnce(&mut RawConfigStore) -> Result<()>,
) -> Result<()> {
    let mut table = engine.raw().clone();
    edit(&mut table)?;
    engine.save_app_configs(&table)
}

fn describe(entry: &RawEntry) -> Result<String> {
    match entry {
        RawEntry::Preset(name) => Ok(name.clone()),
        RawEntry::Config(config) if *config == RawConfig::default() => Ok("(default)".to_string()),
        RawEntry::Config(config) => {
            serde_json::to_string(config).context("Failed to serialize config entry")
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let path = cli.settings.unwrap_or_else(JsonFileSettings::default_path);
    let settings = JsonFileSettings::open(&path)?.with_accent(cli.accent);
    let mut engine = ConfigEngine::new(settings);

    match cli.command {
        Command::Show => {
            println!("settings: {}", engine.settings().path().display());
            println!("{:#?}", engine.global());
            println!("{}", engine.raw().to_json_pretty()?);
        }
        Command::List => {
            println!("App configs:");
            for key in engine.raw().app_keys() {
                if let Some(entry) = engine.raw().get(key) {
                    println!("  {key}: {}", describe(entry)?);
                }
            }
            println!("Presets:");
            for key in engine.raw().preset_keys(true) {
                if let Some(entry) = engine.raw().get(key) {
                    println!("  {key}: {}", describe(entry)?);
                }
            }
        }
        Command::Apply { source } => {
            let table = prefs::table_from_json(&read_source(&source)?)?;
            engine.save_app_configs(&table)?;
        }
        Command::Add { key, preset, json } => {
            let entry = match (preset, json) {
                (Some(preset), _) => RawEntry::Preset(preset),
                (None, Some(json)) => RawEntry::Config(prefs::entry_from_json(&json)?),
                (None, None) => RawEntry::Config(RawConfig::default()),
            };
            edit_table(&mut engine, |t| prefs::add_entry(t, &key, entry))?;
        }
        Command::Remove { key } => {
            edit_table(&mut engine, |t| prefs::remove_entry(t, &key).map(|_| ()))?;
        }
        Command::Rename { old, new } => {
            edit_table(&mut engine, |t| prefs::rename_entry(t, &old, &new))?;
        }
        Command::Set { key, field, value } => {
            edit_table(&mut engine, |t| prefs::set_field(t, &key, field, &value))?;
        }
        Command::UsePreset { key, preset } => {
            edit_table(&mut engine, |t| prefs::use_preset(t, &key, &preset))?;
        }
        Command::Customize { key } => {
            edit_table(&mut engine, |t| prefs::customize(t, &key))?;
        }
        Command::Reset { key } => {
            edit_table(&mut engine, |t| prefs::reset(t, &key))?;
        }
        Command::Get { name } => {
            println!("{}", engine.settings().get(&name)?);
        }
        Command::Put { name, value } => {
            let value = lookup(&name)?.parse_value(&value)?;
            engine.settings_mut().set(&name, value)?;
            engine.handle_setting_changed(&name);
            info!(setting = %name, "Setting saved");
        }
        Command::Resolve { app_id, wm_class } => {
            let identity = WindowIdentity::new(app_id.as_deref(), wm_class.as_deref());
            let rule = engine.matching_key(&identity);
            println!("rule: {}", rule.as_deref().unwrap_or("@default"));
            let resolved = engine.resolve_for_window(&identity);
            let json = serde_json::to_string_pretty(resolved.as_ref())
                .context("Failed to serialize resolved config")?;
            println!("{json}");
        }
        Command::Preview {
            app_id,
            wm_class,
            size,
            frame,
            work_area,
            focused,
            fullscreen,
            maximized,
        } => {
            let identity = WindowIdentity::new(app_id.as_deref(), wm_class.as_deref());
            let resolved = engine.resolve_for_window(&identity);
            let snapshot = WindowSnapshot {
                content_size: size.unwrap_or_else(|| frame.size()),
                frame,
                work_area,
                maximize: Maximized::state(maximized),
                is_fullscreen: fullscreen,
                is_focused: focused,
            };
            match policy::decide(&snapshot, &resolved, engine.global().radius_enabled) {
                BorderState::Hidden => println!("hidden"),
                BorderState::Visible { border_widths, radius, position, size, color } => {
                    println!("position: {},{}", position.x, position.y);
                    println!("size: {}x{}", size.width, size.height);
                    let style = OverlayStyle { border_widths, radius, color };
                    println!("style: {}", style.to_css());
                }
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let log_level = if cli.verbose { log_level.max(TraceLevel::DEBUG) } else { log_level };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    run(cli)
}
