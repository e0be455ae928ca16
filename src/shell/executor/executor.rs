use log::{debug, error, warn};
use std::env;
use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::{OwnedFd, RawFd};
use std::path::PathBuf;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

use crate::shell::error::ShellError;
use crate::shell::parser::ast::{BuiltinKind, PipelineNode, SimpleCommand};
use crate::shell::signals;

use super::{builtin, external, redirect};

/// 一次执行的结果；`Exit` 表示读取循环应该结束
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed(i32),
    Exit,
}

/// fork 之前准备好的管道阶段
enum Stage<'a> {
    External {
        command: &'a SimpleCommand,
        argv: Vec<CString>,
    },
    /// 管道中的内建命令不执行，子进程直接以 0 退出
    Skipped(&'a SimpleCommand),
}

impl<'a> Stage<'a> {
    fn prepare(command: &'a SimpleCommand) -> Result<Self, ShellError> {
        if command.builtin.is_builtin() {
            warn!("管道中的内建命令被忽略: {:?}", command.tokens);
            return Ok(Stage::Skipped(command));
        }
        Ok(Stage::External {
            command,
            argv: external::argv(command)?,
        })
    }

    fn name(&self) -> &str {
        let command = match self {
            Stage::External { command, .. } | Stage::Skipped(command) => command,
        };
        command.program().unwrap_or_default()
    }

    /// 在子进程中运行，返回子进程的退出码
    fn run_in_child(&self, stdin: Option<OwnedFd>, stdout: Option<OwnedFd>) -> i32 {
        let result = bind_stream(stdin, libc::STDIN_FILENO)
            .and_then(|_| bind_stream(stdout, libc::STDOUT_FILENO));
        if let Err(e) = result {
            eprintln!("psh: {}", e);
            return e.exit_code();
        }

        match self {
            Stage::Skipped(_) => 0,
            Stage::External { command, argv } => {
                let err = match redirect::apply(command) {
                    Ok(()) => external::invoke(argv),
                    Err(e) => e,
                };
                eprintln!("psh: {}", err);
                err.exit_code()
            }
        }
    }
}

/// 把管道端点重绑定到标准流上
fn bind_stream(fd: Option<OwnedFd>, target: RawFd) -> Result<(), ShellError> {
    match fd {
        Some(fd) => redirect::install(fd, target).map_err(|e| ShellError::process("dup2", e)),
        None => Ok(()),
    }
}

fn wait_child(pid: Pid) -> Result<i32, ShellError> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, sig, _)) => return Ok(128 + sig as i32),
            Ok(status) => debug!("忽略等待状态: {:?}", status),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(ShellError::process("waitpid", e)),
        }
    }
}

pub struct Executor {
    last_status: i32,
}

impl Executor {
    pub fn new() -> Self {
        Self { last_status: 0 }
    }

    pub fn last_status(&self) -> i32 {
        self.last_status
    }

    /// 执行一行解析出的管道；`None`（空行）不做任何事
    pub fn execute(&mut self, node: Option<PipelineNode>) -> Result<Outcome, ShellError> {
        let Some(node) = node else {
            return Ok(Outcome::Completed(self.last_status));
        };

        // 内建命令只在顶层、非管道时于当前进程执行
        if let PipelineNode::Leaf(command) = &node {
            if command.builtin.is_builtin() && command.has_redirections() {
                warn!("内建命令的重定向被忽略: {:?}", command.tokens);
            }
            match command.builtin {
                BuiltinKind::Exit => {
                    debug!("执行内建命令 exit");
                    return Ok(Outcome::Exit);
                }
                BuiltinKind::ChangeDirectory => return self.execute_cd(command),
                BuiltinKind::None => {}
            }
        }

        let status = self.execute_pipeline(&node)?;
        self.last_status = status;
        Ok(Outcome::Completed(status))
    }

    fn execute_cd(&mut self, command: &SimpleCommand) -> Result<Outcome, ShellError> {
        let home = env::var_os("HOME").map(PathBuf::from);
        match builtin::change_directory(&command.tokens, home.as_deref()) {
            Ok(dir) => {
                debug!("当前目录: {}", dir.display());
                self.last_status = 0;
                Ok(Outcome::Completed(0))
            }
            Err(e) => {
                self.last_status = 1;
                Err(e)
            }
        }
    }

    /// 每个阶段一个子进程，相邻阶段之间一条管道，等待全部子进程后返回最后一个阶段的状态
    fn execute_pipeline(&mut self, node: &PipelineNode) -> Result<i32, ShellError> {
        let stages = node
            .stages()
            .into_iter()
            .map(Stage::prepare)
            .collect::<Result<Vec<_>, _>>()?;
        let last = stages.len().saturating_sub(1);
        debug!("管道阶段数: {}", node.stage_count());

        let mut children: Vec<Pid> = Vec::with_capacity(stages.len());
        let mut previous: Option<OwnedFd> = None;

        for (index, stage) in stages.iter().enumerate() {
            let (reader, writer) = if index < last {
                match unistd::pipe2(OFlag::O_CLOEXEC) {
                    Ok((reader, writer)) => (Some(reader), Some(writer)),
                    Err(e) => {
                        drop(previous);
                        abort_children(&children);
                        return Err(ShellError::process("pipe", e));
                    }
                }
            } else {
                (None, None)
            };

            // 避免子进程继承未刷新的缓冲
            let _ = io::stdout().flush();
            let _ = io::stderr().flush();

            // SAFETY: shell 是单线程的，子进程只做 dup2、open 和 exec
            match unsafe { unistd::fork() } {
                Ok(ForkResult::Child) => {
                    drop(reader);
                    signals::restore_default_signals();
                    let code = stage.run_in_child(previous, writer);
                    // SAFETY: _exit 不运行父进程的 atexit 和缓冲刷新，只结束子进程
                    unsafe { libc::_exit(code) }
                }
                Ok(ForkResult::Parent { child }) => {
                    debug!("阶段 {} `{}` 的子进程: {}", index, stage.name(), child);
                    children.push(child);
                    // 父进程不参与数据流，立刻关闭用过的端点
                    drop(writer);
                    previous = reader;
                }
                Err(e) => {
                    drop(previous);
                    drop(reader);
                    drop(writer);
                    abort_children(&children);
                    return Err(ShellError::process("fork", e));
                }
            }
        }

        let statuses = wait_all(&children)?;
        debug!("管道退出状态: {:?}", statuses);
        Ok(statuses.last().copied().unwrap_or_default())
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

/// 等待所有子进程，即使中途出错也要回收剩下的
fn wait_all(children: &[Pid]) -> Result<Vec<i32>, ShellError> {
    let mut statuses = Vec::with_capacity(children.len());
    let mut first_error = None;
    for &pid in children {
        match wait_child(pid) {
            Ok(status) => statuses.push(status),
            Err(e) => {
                error!("等待子进程 {} 失败: {}", pid, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(statuses),
    }
}

/// 管道搭建失败时终止并回收已经启动的阶段
fn abort_children(children: &[Pid]) {
    for &pid in children {
        if let Err(e) = kill(pid, Signal::SIGTERM) {
            warn!("无法终止子进程 {}: {}", pid, e);
        }
    }
    let _ = wait_all(children);
}
