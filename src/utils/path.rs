use std::env;

use log::error;

pub fn current_dir() -> String {
    match env::current_dir() {
        Ok(dir) => dir.to_string_lossy().into_owned(),
        Err(e) => {
            error!("psh: PROMPT: env current_dir error: {}", e);
            String::new()
        }
    }
}
