use std::fmt;
use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// 子进程执行失败时的退出码
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CANNOT_EXECUTE: i32 = 126;
pub const EXIT_NOT_FOUND: i32 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamKind::Stdin => "stdin",
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),

    #[error("cd: {}: {source}", path.display())]
    DirectoryChange {
        path: PathBuf,
        #[source]
        source: Errno,
    },

    #[error("{}: cannot redirect {stream}: {source}", path.display())]
    Redirection {
        path: PathBuf,
        stream: StreamKind,
        #[source]
        source: io::Error,
    },

    #[error("{operation}: {source}")]
    ProcessCreation {
        operation: &'static str,
        #[source]
        source: Errno,
    },

    #[error("{program}: {source}")]
    ProgramNotFound {
        program: String,
        #[source]
        source: Errno,
    },
}

impl ShellError {
    pub fn process(operation: &'static str, source: Errno) -> Self {
        ShellError::ProcessCreation { operation, source }
    }

    /// 只有创建进程/管道这类内部错误才会终止读取循环
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::ProcessCreation { .. })
    }

    /// 子进程因该错误退出时使用的状态码
    pub fn exit_code(&self) -> i32 {
        match self {
            ShellError::ProgramNotFound {
                source: Errno::ENOENT,
                ..
            } => EXIT_NOT_FOUND,
            ShellError::ProgramNotFound { .. } => EXIT_CANNOT_EXECUTE,
            _ => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_subject() {
        let err = ShellError::DirectoryChange {
            path: PathBuf::from("/no/such/dir"),
            source: Errno::ENOENT,
        };
        assert!(err.to_string().starts_with("cd: /no/such/dir: "));

        let err = ShellError::Redirection {
            path: PathBuf::from("out.txt"),
            stream: StreamKind::Stdout,
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().starts_with("out.txt: cannot redirect stdout: "));

        let err = ShellError::process("fork", Errno::EAGAIN);
        assert!(err.to_string().starts_with("fork: "));

        let err = ShellError::ProgramNotFound {
            program: "nosuchprogram".to_string(),
            source: Errno::ENOENT,
        };
        assert!(err.to_string().starts_with("nosuchprogram: "));
    }

    #[test]
    fn test_only_process_creation_is_fatal() {
        assert!(ShellError::process("pipe", Errno::EMFILE).is_fatal());
        assert!(!ShellError::InvalidInvocation("cd".to_string()).is_fatal());
        assert!(!ShellError::DirectoryChange {
            path: PathBuf::from("x"),
            source: Errno::ENOTDIR,
        }
        .is_fatal());
    }

    #[test]
    fn test_exit_codes() {
        let not_found = ShellError::ProgramNotFound {
            program: "x".to_string(),
            source: Errno::ENOENT,
        };
        let not_executable = ShellError::ProgramNotFound {
            program: "x".to_string(),
            source: Errno::EACCES,
        };
        assert_eq!(not_found.exit_code(), EXIT_NOT_FOUND);
        assert_eq!(not_executable.exit_code(), EXIT_CANNOT_EXECUTE);
        assert_eq!(
            ShellError::InvalidInvocation("x".to_string()).exit_code(),
            EXIT_FAILURE
        );
    }
}
