use dotenv::dotenv;
use rustyline::EditMode;
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

pub struct Config {
    pub name: String,
    pub theme: String,
    pub history_file: PathBuf,
    pub editor_mode: String,
    pub logger_level: String,
    pub logger_dir: PathBuf,
}

impl Config {
    fn get_config_dir() -> PathBuf {
        if let Ok(home) = env::var("HOME") {
            PathBuf::from(home).join(".config/pipesh")
        } else {
            env::temp_dir().join("pipesh")
        }
    }

    fn default() -> Self {
        let config_dir = Self::get_config_dir();
        Config {
            name: env!("CARGO_CRATE_NAME").to_string(),
            theme: String::from("default"),
            history_file: config_dir.join(".psh_history"),
            editor_mode: String::from("emacs"),
            logger_level: String::from("info"),
            logger_dir: config_dir.join("logs"),
        }
    }

    pub fn new() -> io::Result<Self> {
        // 优先加载环境变量
        if cfg!(debug_assertions) {
            dotenv::from_filename(".env.development").ok();
        } else {
            dotenv().ok();
        }

        // 默认配置
        let mut config = Config::default();

        // 从环境变量加载配置
        if let Ok(theme) = env::var("PSH_THEME") {
            config.theme = theme;
        }

        if let Ok(editor) = env::var("PSH_EDITOR") {
            config.editor_mode = editor;
        }

        if let Ok(history) = env::var("PSH_HISTORY") {
            config.history_file = PathBuf::from(history);
        }

        if let Ok(level) = env::var("PSH_LOG_LEVEL") {
            config.logger_level = level;
        }

        if let Ok(dir) = env::var("PSH_LOG_DIR") {
            config.logger_dir = PathBuf::from(dir);
        }

        // 确保历史文件目录存在
        if let Some(parent) = config.history_file.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(config)
    }

    pub fn get_edit_mode(&self) -> EditMode {
        match self.editor_mode.to_lowercase().as_str() {
            "vi" => EditMode::Vi,
            _ => EditMode::Emacs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_mode() {
        let mut config = Config::default();
        assert_eq!(config.get_edit_mode(), EditMode::Emacs);
        config.editor_mode = "VI".to_string();
        assert_eq!(config.get_edit_mode(), EditMode::Vi);
        config.editor_mode = "nano".to_string();
        assert_eq!(config.get_edit_mode(), EditMode::Emacs);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.name, "psh");
        assert!(config.history_file.ends_with(".psh_history"));
        assert!(config.logger_dir.ends_with("logs"));
    }
}
