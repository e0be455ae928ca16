use log::debug;
use std::process::ExitCode;

use crate::shell::Shell;
use crate::utils::config::Config;
use crate::utils::log::init_logger;

mod shell;
mod utils;

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::new()?;
    init_logger(&config);
    debug!("配置加载成功 {}", config.history_file.display());

    let mut shell = Shell::new(&config)?;
    let code = shell.run()?;
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
