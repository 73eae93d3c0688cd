use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use cross_xdg::BaseDirs;
use tracing::{debug, warn};

use crate::tape::DEFAULT_INITIAL_CELLS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Cells a fresh tape starts with
    pub initial_cells: usize,
    /// Default step budget for `run` (None = unlimited)
    pub max_steps: Option<usize>,
    /// Entries kept in the shell's line history
    pub history_size: usize,
    /// Shell prompt label
    pub prompt: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_cells: DEFAULT_INITIAL_CELLS,
            max_steps: None,
            history_size: 1_000,
            prompt: "bfdb".to_string(),
        }
    }
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Settings resolved from env -> config file -> defaults, loaded once.
pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(|| {
        let base = load_from_toml().unwrap_or_default();
        apply_env(base)
    })
}

fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("BFSTEP_CONFIG") {
        return Some(PathBuf::from(path));
    }

    // On Linux: resolves to /home/<user>/.config
    // On Windows: resolves to C:\Users\<user>\.config
    // On macOS: resolves to /Users/<user>/.config
    let base_dirs = BaseDirs::new().ok()?;
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push("bfstep.toml");
    Some(path)
}

fn load_from_toml() -> Option<Settings> {
    let path = config_path()?;
    let content = fs::read_to_string(&path).ok()?;
    debug!(target: "bfstep::config", path = %path.display(), "loaded config file");
    Some(parse_config(&content))
}

/// Parse the small TOML subset we accept: `[section]` headers and
/// `key = value` pairs, values optionally quoted. Unknown keys are ignored.
pub fn parse_config(content: &str) -> Settings {
    let mut section = String::new();
    let mut map: HashMap<String, String> = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }
        if line.starts_with('[') && line.ends_with(']') {
            section = line[1..line.len()-1].trim().to_string();
            continue;
        }
        if let Some(eq) = line.find('=') {
            let key = line[..eq].trim();
            let val_raw = line[eq+1..].trim();
            // Accept quoted or unquoted
            let val = if val_raw.starts_with('"') && val_raw.ends_with('"') && val_raw.len() >= 2 {
                val_raw[1..val_raw.len()-1].to_string()
            } else { val_raw.to_string() };
            map.insert(format!("{section}.{key}"), val);
        }
    }

    let mut cfg = Settings::default();

    macro_rules! set_parsed {
        ($field:ident, $key:literal) => {
            if let Some(v) = map.get($key) {
                match v.parse() {
                    Ok(parsed) => cfg.$field = parsed,
                    Err(_) => warn!(target: "bfstep::config", key = $key, value = %v, "ignoring invalid config value"),
                }
            }
        };
    }

    set_parsed!(initial_cells, "engine.initial_cells");
    set_parsed!(history_size, "repl.history_size");
    if let Some(v) = map.get("repl.prompt") {
        cfg.prompt = v.clone();
    }
    if let Some(v) = map.get("engine.max_steps") {
        match v.parse::<usize>() {
            Ok(n) => cfg.max_steps = Some(n),
            Err(_) => warn!(target: "bfstep::config", key = "engine.max_steps", value = %v, "ignoring invalid config value"),
        }
    }

    cfg.initial_cells = cfg.initial_cells.max(1);
    cfg
}

fn apply_env(mut cfg: Settings) -> Settings {
    if let Some(n) = env_usize("BFSTEP_INITIAL_CELLS") {
        cfg.initial_cells = n.max(1);
    }
    if let Some(n) = env_usize("BFSTEP_MAX_STEPS") {
        cfg.max_steps = Some(n);
    }
    cfg
}

fn env_usize(name: &str) -> Option<usize> {
    env::var(name).ok().and_then(|s| s.trim().parse::<usize>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        assert_eq!(parse_config(""), Settings::default());
    }

    #[test]
    fn reads_sections_and_keys() {
        let cfg = parse_config(
            r#"
# engine options
[engine]
initial_cells = 64
max_steps = 5000

[repl]
history_size = 10
prompt = "dbg"
"#,
        );
        assert_eq!(cfg.initial_cells, 64);
        assert_eq!(cfg.max_steps, Some(5000));
        assert_eq!(cfg.history_size, 10);
        assert_eq!(cfg.prompt, "dbg");
    }

    #[test]
    fn keys_are_scoped_by_section() {
        let cfg = parse_config("[repl]\ninitial_cells = 99\n");
        assert_eq!(cfg.initial_cells, DEFAULT_INITIAL_CELLS);
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = parse_config("[engine]\ninitial_cells = lots\n");
        assert_eq!(cfg.initial_cells, DEFAULT_INITIAL_CELLS);
    }

    #[test]
    fn zero_cells_is_clamped() {
        let cfg = parse_config("[engine]\ninitial_cells = 0\n");
        assert_eq!(cfg.initial_cells, 1);
    }
}
