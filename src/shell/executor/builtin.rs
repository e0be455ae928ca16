use std::env;
use std::path::{Path, PathBuf};

use log::debug;
use nix::unistd;

use crate::shell::error::ShellError;

/// `cd [dir]`：没有参数时切换到 `home`
///
/// 成功时返回新的工作目录；失败时工作目录保持不变。
pub fn change_directory(tokens: &[String], home: Option<&Path>) -> Result<PathBuf, ShellError> {
    match tokens.first() {
        Some(name) if name == "cd" => {}
        Some(name) => {
            return Err(ShellError::InvalidInvocation(format!(
                "`{}` is not the cd builtin",
                name
            )))
        }
        None => return Err(ShellError::InvalidInvocation("empty command".to_string())),
    }

    let target = match tokens {
        [_] => home
            .map(Path::to_path_buf)
            .ok_or_else(|| ShellError::InvalidInvocation("cd: HOME not set".to_string()))?,
        [_, path] => PathBuf::from(path),
        _ => {
            return Err(ShellError::InvalidInvocation(
                "cd: too many arguments".to_string(),
            ))
        }
    };

    debug!("切换目录: {}", target.display());
    unistd::chdir(target.as_path()).map_err(|source| ShellError::DirectoryChange {
        path: target.clone(),
        source,
    })?;

    Ok(env::current_dir().unwrap_or(target))
}
