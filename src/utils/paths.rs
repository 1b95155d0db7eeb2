use anyhow::{anyhow, Result};
use std::fs;
use std::path::PathBuf;

pub fn get_vox_todo_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
    Ok(home.join(".vox-todo"))
}

pub fn get_config_path() -> Result<PathBuf> {
    let dir = get_vox_todo_dir()?;
    Ok(dir.join("config.toml"))
}

pub fn get_database_path() -> Result<PathBuf> {
    let dir = get_vox_todo_dir()?;
    Ok(dir.join("todos.db"))
}

pub fn get_logs_dir() -> Result<PathBuf> {
    let dir = get_vox_todo_dir()?;
    Ok(dir.join("logs"))
}

pub fn get_pid_file_path() -> Result<PathBuf> {
    let dir = get_vox_todo_dir()?;
    Ok(dir.join("server.pid"))
}

pub fn ensure_data_dir_exists() -> Result<()> {
    let dir = get_vox_todo_dir()?;
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    Ok(())
}
