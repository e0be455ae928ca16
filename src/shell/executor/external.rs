use std::ffi::CString;

use nix::unistd;

use crate::shell::error::ShellError;
use crate::shell::parser::ast::SimpleCommand;

/// 在 fork 之前准备好 argv，子进程里不再做转换
pub fn argv(command: &SimpleCommand) -> Result<Vec<CString>, ShellError> {
    if command.tokens.is_empty() {
        return Err(ShellError::InvalidInvocation("empty command".to_string()));
    }
    command
        .tokens
        .iter()
        .map(|token| {
            CString::new(token.as_bytes()).map_err(|_| {
                ShellError::InvalidInvocation(format!("argument contains NUL byte: {:?}", token))
            })
        })
        .collect()
}

/// 用 `argv[0]` 在 PATH 中查找程序并替换当前进程映像，只在失败时返回
pub fn invoke(argv: &[CString]) -> ShellError {
    let Some(program) = argv.first() else {
        return ShellError::InvalidInvocation("empty command".to_string());
    };
    match unistd::execvp(program, argv) {
        Ok(never) => match never {},
        Err(source) => ShellError::ProgramNotFound {
            program: program.to_string_lossy().into_owned(),
            source,
        },
    }
}
