//! INI configuration loading, per §6: `[section]` headers, `key = value`
//! lines, `#` trailing comments, whitespace trimmed on both sides. The
//! config directory is resolved platform-appropriately (XDG on Unix, roaming
//! AppData on Windows, Application Support on macOS) via the `directories`
//! crate.

use ini::Ini;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub default_bpm: Option<u32>,
    pub default_octave: Option<i8>,
    pub midi_port_name: Option<String>,
}

/// Resolves the platform config file path: `<config dir>/musique/config.ini`.
pub fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "musique").map(|dirs| dirs.config_dir().join("config.ini"))
}

impl Config {
    pub fn load(path: &std::path::Path) -> Config {
        let Ok(ini) = Ini::load_from_file(path) else {
            return Config::default();
        };
        Config::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Config {
        let section = ini.section(Some("musique"));
        let get = |key: &str| section.and_then(|s| s.get(key));
        Config {
            default_bpm: get("bpm").and_then(|v| v.parse().ok()),
            default_octave: get("octave").and_then(|v| v.parse().ok()),
            midi_port_name: get("midi_port").map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ini_section() {
        let ini = Ini::load_from_str("[musique]\nbpm = 140\noctave = 5\nmidi_port = loopMIDI\n").unwrap();
        let config = Config::from_ini(&ini);
        assert_eq!(config.default_bpm, Some(140));
        assert_eq!(config.default_octave, Some(5));
        assert_eq!(config.midi_port_name.as_deref(), Some("loopMIDI"));
    }

    #[test]
    fn missing_file_yields_default() {
        let config = Config::load(std::path::Path::new("/nonexistent/path/config.ini"));
        assert_eq!(config.default_bpm, None);
    }
}
