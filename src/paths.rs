use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const BIN_DIR: &str = "bin";
const CONF_DIR: &str = "conf";
const DATA_DIR: &str = "data";
const HOME_ENV: &str = "SSIS_RUNNER_HOME";

pub fn install_root() -> Result<PathBuf> {
    let home = std::env::var(HOME_ENV).ok();
    let exe_path = std::env::current_exe().context("Failed to locate the running executable")?;
    resolve_root(home.as_deref(), &exe_path)
}

fn resolve_root(home: Option<&str>, exe_path: &Path) -> Result<PathBuf> {
    if let Some(home) = home {
        if home.trim().is_empty() {
            anyhow::bail!("{} is set but empty", HOME_ENV);
        }
        return Ok(PathBuf::from(home));
    }

    let exe_dir = exe_path
        .parent()
        .context("Failed to resolve executable directory")?;

    if exe_dir.file_name().and_then(|name| name.to_str()) == Some(BIN_DIR) {
        let root = exe_dir
            .parent()
            .context("Failed to resolve install root from bin")?;
        return Ok(root.to_path_buf());
    }

    Ok(exe_dir.to_path_buf())
}

pub fn conf_dir() -> Result<PathBuf> {
    Ok(install_root()?.join(CONF_DIR))
}

pub fn data_dir() -> Result<PathBuf> {
    Ok(install_root()?.join(DATA_DIR))
}
