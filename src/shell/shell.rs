use log::{debug, error, warn};
use std::error::Error;
use std::ops::ControlFlow;

use crate::shell::executor::{Executor, Outcome};
use crate::shell::parser::Parser;
use crate::shell::readline::{ReadlineError, ReadlineManager};
use crate::shell::signals;
use crate::utils::config::Config;
use crate::utils::path;
use crate::utils::theme::Theme;

pub struct Shell<'a> {
    theme: Theme,
    readline: ReadlineManager<'a>,
    executor: Executor,
}

impl<'a> Shell<'a> {
    pub fn new(config: &'a Config) -> Result<Self, Box<dyn Error>> {
        let readline = ReadlineManager::new(config)?;
        // 非交互模式不输出颜色
        let theme = if readline.is_interactive() {
            Theme::load_theme(&config.theme)
        } else {
            Theme::plain()
        };
        Ok(Self {
            theme,
            readline,
            executor: Executor::new(),
        })
    }

    /// 运行读取-执行循环，返回 shell 的退出码
    pub fn run(&mut self) -> Result<i32, Box<dyn Error>> {
        debug!("初始化 psh...");

        if self.readline.is_interactive() {
            // 忽略 Ctrl-C 等信号，交给前台子进程处理
            signals::ignore_interactive_signals();
        }

        self.readline.load_history()?;
        debug!("psh 准备就绪...");

        let code = self.run_loop()?;
        self.readline.save_history()?;

        debug!("退出 psh，状态码 {}", code);
        Ok(code)
    }

    fn run_loop(&mut self) -> Result<i32, Box<dyn Error>> {
        loop {
            let prompt = if self.readline.is_interactive() {
                self.theme
                    .prompt(&path::current_dir(), self.executor.last_status())
            } else {
                String::new()
            };

            match self.readline.readline(&prompt) {
                Ok(line) => {
                    if let ControlFlow::Break(code) = self.handle_input(&line) {
                        return Ok(code);
                    }
                }
                Err(ReadlineError::Eof) => {
                    debug!("接收到 EOF，退出 psh...");
                    if self.readline.is_interactive() {
                        println!();
                    }
                    return Ok(0);
                }
                Err(ReadlineError::Interrupted) => {
                    debug!("接收到中断信号，丢弃当前输入");
                }
                Err(err) => {
                    error!("读取输入失败: {}", err);
                    return Err(err.into());
                }
            }
        }
    }

    fn handle_input(&mut self, line: &str) -> ControlFlow<i32> {
        if line.trim().is_empty() {
            return ControlFlow::Continue(());
        }

        if let Err(e) = self.readline.add_history(line) {
            warn!("无法添加历史记录: {}", e);
        }

        let node = match Parser::parse_line(line) {
            Ok(node) => node,
            Err(e) => {
                warn!("解析失败 {:?}: {}", line, e);
                self.report(&e);
                return ControlFlow::Continue(());
            }
        };

        debug!("执行命令: {:?}", node);
        match self.executor.execute(node) {
            Ok(Outcome::Completed(status)) => {
                debug!("命令结束，状态码 {}", status);
                ControlFlow::Continue(())
            }
            Ok(Outcome::Exit) => {
                debug!("exit 内建命令，结束读取循环");
                ControlFlow::Break(0)
            }
            Err(e) if e.is_fatal() => {
                error!("内部错误，终止 psh: {}", e);
                self.report(&e);
                ControlFlow::Break(1)
            }
            Err(e) => {
                warn!("命令失败: {}", e);
                self.report(&e);
                ControlFlow::Continue(())
            }
        }
    }

    fn report(&self, err: &dyn Error) {
        eprintln!("{}", (self.theme.error_style)(format!("psh: {}", err)));
    }
}
