use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chartwatch_config::Config;
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "chartwatch";

fn config_root() -> anyhow::Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .context("No config directory on this platform")
}

fn profiles_dir() -> anyhow::Result<PathBuf> {
    Ok(config_root()?.join("profiles"))
}

/// Where history lives when the config does not say
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR))
}

/// Represents a user profile
#[derive(Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub value: Config,
}

fn read_profile(path: &Path) -> anyhow::Result<Config> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let profile: Profile =
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(profile.value)
}

/// Create the profiles folder and a `main` profile from defaults if missing
pub fn init_user_config() -> anyhow::Result<()> {
    let dir = profiles_dir()?;
    fs::create_dir_all(&dir)?;

    let main_profile = dir.join("main.json");
    if !main_profile.exists() {
        let profile = Profile {
            name: "main".into(),
            value: Config::default(),
        };
        fs::write(&main_profile, serde_json::to_string_pretty(&profile)?)?;
        tracing::info!("Created main profile at {}", main_profile.display());
    }

    Ok(())
}

/// Load a user profile by name, falling back to main
pub fn load_user_profile(name: &str) -> anyhow::Result<Config> {
    let dir = profiles_dir()?;
    let profile_file = dir.join(format!("{name}.json"));

    if profile_file.exists() {
        return read_profile(&profile_file);
    }

    tracing::warn!("Profile {name} not found, falling back to main profile");
    let main_file = dir.join("main.json");
    if main_file.exists() {
        read_profile(&main_file)
    } else {
        Ok(Config::default())
    }
}

/// A bare config file given on the command line, not wrapped in a profile
pub fn load_config_file(path: &Path) -> anyhow::Result<Config> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}
