use configparser::ini::Ini;
use log::{info, warn};
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Mutex;

const CONFIG_INI_PATH: &str = "ridevis.ini";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub display_width: u32,
    pub display_height: u32,
    pub vsync: bool,
    pub windowed: bool,
    pub update_rate_hz: u32,
    /// Screen shown at startup: "canvas" or "vector".
    pub start_screen: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_width: 960,
            display_height: 540,
            vsync: true,
            windowed: true,
            update_rate_hz: 30,
            start_screen: "canvas".to_string(),
        }
    }
}

static CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| Mutex::new(Config::default()));

fn create_default_file(path: &str) -> Result<(), std::io::Error> {
    info!("Config file not found, creating defaults at '{}'.", path);
    let defaults = Config::default();
    let mut conf = Ini::new();
    conf.set("display", "Width", Some(defaults.display_width.to_string()));
    conf.set("display", "Height", Some(defaults.display_height.to_string()));
    conf.set("display", "VSync", Some((defaults.vsync as u8).to_string()));
    conf.set("display", "Windowed", Some((defaults.windowed as u8).to_string()));
    conf.set("animation", "UpdateRateHz", Some(defaults.update_rate_hz.to_string()));
    conf.set("animation", "StartScreen", Some(defaults.start_screen.clone()));
    conf.write(path)
}

pub fn load() {
    load_from(CONFIG_INI_PATH);
}

fn load_from(path: &str) {
    if !Path::new(path).exists() {
        if let Err(e) = create_default_file(path) {
            warn!("Failed to create default config file: {}", e);
            return;
        }
    }

    let mut conf = Ini::new();
    if conf.load(path).is_err() {
        warn!("Failed to load '{}', using default config.", path);
        return;
    }

    let defaults = Config::default();
    let mut config = CONFIG.lock().unwrap();
    config.display_width = conf
        .get("display", "Width")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.display_width);
    config.display_height = conf
        .get("display", "Height")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.display_height);
    config.vsync = conf
        .get("display", "VSync")
        .and_then(|v| v.parse::<u8>().ok())
        .map_or(defaults.vsync, |v| v != 0);
    config.windowed = conf
        .get("display", "Windowed")
        .and_then(|v| v.parse::<u8>().ok())
        .map_or(defaults.windowed, |v| v != 0);
    config.update_rate_hz = conf
        .get("animation", "UpdateRateHz")
        .and_then(|v| v.parse().ok())
        .filter(|&hz: &u32| hz > 0)
        .unwrap_or(defaults.update_rate_hz);
    config.start_screen = conf
        .get("animation", "StartScreen")
        .map(|v| v.to_lowercase())
        .filter(|v| v == "canvas" || v == "vector")
        .unwrap_or(defaults.start_screen);
}

/// Returns a copy of the currently loaded configuration.
pub fn get() -> Config {
    CONFIG.lock().unwrap().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = Config::default();
        assert!(c.display_width > 0 && c.display_height > 0);
        assert!(c.update_rate_hz > 0);
        assert_eq!(c.start_screen, "canvas");
    }

    #[test]
    fn get_returns_independent_copies() {
        let mut a = get();
        a.update_rate_hz = 999;
        assert_ne!(get().update_rate_hz, 999);
    }

    #[test]
    fn default_file_round_trips_through_load() {
        let file = std::env::temp_dir().join(format!("ridevis-test-{}.ini", std::process::id()));
        let path = file.to_str().unwrap();
        let _ = std::fs::remove_file(path);

        // First load writes the default file, then parses it back.
        load_from(path);
        assert!(Path::new(path).exists());
        assert_eq!(get(), Config::default());

        let _ = std::fs::remove_file(path);
    }
}
