use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use log::debug;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::unistd;

use crate::shell::error::{ShellError, StreamKind};
use crate::shell::parser::ast::SimpleCommand;

const FILE_MODE: u32 = 0o644;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Truncate,
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectTarget<'a> {
    pub path: &'a Path,
    pub stream: StreamKind,
    pub mode: OpenMode,
}

impl RedirectTarget<'_> {
    pub fn open(&self) -> Result<File, ShellError> {
        let mut options = OpenOptions::new();
        match self.mode {
            OpenMode::Read => options.read(true),
            OpenMode::Truncate => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true).create(true),
        };
        options
            .mode(FILE_MODE)
            .open(self.path)
            .map_err(|source| ShellError::Redirection {
                path: self.path.to_path_buf(),
                stream: self.stream,
                source,
            })
    }

    fn fd(&self) -> RawFd {
        match self.stream {
            StreamKind::Stdin => libc::STDIN_FILENO,
            StreamKind::Stdout => libc::STDOUT_FILENO,
            StreamKind::Stderr => libc::STDERR_FILENO,
        }
    }
}

/// 让 `fd` 占据 `target` 位置，原描述符随后关闭
///
/// `fd` 本身就是 `target` 时 dup2 什么也不做，此时保留它并去掉 close-on-exec。
pub fn install(fd: OwnedFd, target: RawFd) -> Result<(), Errno> {
    if fd.as_raw_fd() == target {
        let raw = fd.into_raw_fd();
        fcntl(raw, FcntlArg::F_SETFD(FdFlag::empty()))?;
        return Ok(());
    }
    unistd::dup2(fd.as_raw_fd(), target)?;
    Ok(())
}

/// 按 stdin、stdout、stderr 的顺序列出命令需要的重定向
pub fn targets(command: &SimpleCommand) -> Vec<RedirectTarget<'_>> {
    let mut targets = Vec::new();
    if let Some(path) = &command.input {
        targets.push(RedirectTarget {
            path,
            stream: StreamKind::Stdin,
            mode: OpenMode::Read,
        });
    }
    if let Some(path) = &command.output {
        targets.push(RedirectTarget {
            path,
            stream: StreamKind::Stdout,
            mode: OpenMode::Truncate,
        });
    }
    if let Some(path) = &command.error {
        // stdout 也被重定向时，stderr 追加在其后
        let mode = if command.output.is_some() {
            OpenMode::Append
        } else {
            OpenMode::Truncate
        };
        targets.push(RedirectTarget {
            path,
            stream: StreamKind::Stderr,
            mode,
        });
    }
    targets
}

/// 在 fork 之后、exec 之前重绑定当前进程的标准流
///
/// 打开的文件带 close-on-exec 标记，dup2 之后即被关闭，
/// 只有 0/1/2 会进入新的程序映像。
pub fn apply(command: &SimpleCommand) -> Result<(), ShellError> {
    for target in targets(command) {
        let file = target.open()?;
        debug!(
            "重定向 {} -> {} ({:?})",
            target.stream,
            target.path.display(),
            target.mode
        );
        install(OwnedFd::from(file), target.fd()).map_err(|errno| {
            ShellError::Redirection {
                path: target.path.to_path_buf(),
                stream: target.stream,
                source: errno.into(),
            }
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::fcntl::OFlag;
    use std::fs;
    use std::io::{Read, Write};
    use std::os::fd::FromRawFd;

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_install_duplicates_onto_target() {
        let (reader, writer) = unistd::pipe().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut slot = File::create(dir.path().join("slot")).unwrap();

        install(writer, slot.as_raw_fd()).unwrap();
        slot.write_all(b"through the pipe").unwrap();
        drop(slot);

        let mut received = String::new();
        File::from(reader).read_to_string(&mut received).unwrap();
        assert_eq!(received, "through the pipe");
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_install_keeps_descriptor_already_in_place() {
        let (reader, writer) = unistd::pipe2(OFlag::O_CLOEXEC).unwrap();
        let raw = writer.as_raw_fd();

        install(writer, raw).unwrap();

        // 描述符仍然打开，且不再带 close-on-exec
        let flags = fcntl(raw, FcntlArg::F_GETFD).unwrap();
        assert_eq!(FdFlag::from_bits_truncate(flags), FdFlag::empty());
        // SAFETY: install 放弃了所有权，这里重新接管以便关闭
        let mut kept = unsafe { File::from_raw_fd(raw) };
        kept.write_all(b"x").unwrap();
        drop(kept);

        let mut received = String::new();
        File::from(reader).read_to_string(&mut received).unwrap();
        assert_eq!(received, "x");
    }

    #[test]
    fn test_targets_follow_redirection_fields() {
        let cmd = SimpleCommand::new(["cat"]);
        assert!(targets(&cmd).is_empty());

        let cmd = SimpleCommand::new(["cat"]).with_input("in").with_error("err");
        let found = targets(&cmd);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].stream, StreamKind::Stdin);
        assert_eq!(found[0].mode, OpenMode::Read);
        assert_eq!(found[1].stream, StreamKind::Stderr);
        assert_eq!(found[1].mode, OpenMode::Truncate);
    }

    #[test]
    fn test_stderr_appends_when_stdout_redirected() {
        let cmd = SimpleCommand::new(["cmd"]).with_output("out").with_error("err");
        let found = targets(&cmd);
        assert_eq!(found[0].stream, StreamKind::Stdout);
        assert_eq!(found[0].mode, OpenMode::Truncate);
        assert_eq!(found[1].stream, StreamKind::Stderr);
        assert_eq!(found[1].mode, OpenMode::Append);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_truncate_creates_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "old content that is long").unwrap();

        let target = RedirectTarget {
            path: &path,
            stream: StreamKind::Stdout,
            mode: OpenMode::Truncate,
        };
        target.open().unwrap().write_all(b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");

        let fresh = dir.path().join("fresh.txt");
        let target = RedirectTarget {
            path: &fresh,
            ..target
        };
        target.open().unwrap();
        assert!(fresh.exists());
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_append_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, "stdout\n").unwrap();

        let target = RedirectTarget {
            path: &path,
            stream: StreamKind::Stderr,
            mode: OpenMode::Append,
        };
        target.open().unwrap().write_all(b"stderr\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "stdout\nstderr\n");
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_missing_input_names_path_and_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        let target = RedirectTarget {
            path: &path,
            stream: StreamKind::Stdin,
            mode: OpenMode::Read,
        };
        match target.open() {
            Err(ShellError::Redirection { path: p, stream, .. }) => {
                assert_eq!(p, path);
                assert_eq!(stream, StreamKind::Stdin);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
