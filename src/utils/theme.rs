use colored::Colorize;

pub struct Theme {
    pub prompt_style: Box<dyn Fn(String) -> String>,
    pub error_style: Box<dyn Fn(String) -> String>,
    pub failed_status_style: Box<dyn Fn(String) -> String>,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            prompt_style: Box::new(|s| s.bright_cyan().to_string()),
            error_style: Box::new(|s| s.bright_red().to_string()),
            failed_status_style: Box::new(|s| s.red().to_string()),
        }
    }
}

impl Theme {
    pub fn plain() -> Self {
        Theme {
            prompt_style: Box::new(|s| s),
            error_style: Box::new(|s| s),
            failed_status_style: Box::new(|s| s),
        }
    }

    pub fn load_theme(theme_name: &str) -> Theme {
        match theme_name {
            "plain" => Theme::plain(),
            _ => Theme::default(),
        }
    }

    /// `<cwd>> `，上一条命令失败时前面带上状态码
    pub fn prompt(&self, cwd: &str, last_status: i32) -> String {
        let prompt = (self.prompt_style)(format!("{}> ", cwd));
        if last_status == 0 {
            prompt
        } else {
            format!("{} {}", (self.failed_status_style)(format!("[{}]", last_status)), prompt)
        }
    }
}
