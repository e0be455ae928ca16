use crate::utils::config::Config;
use log::{debug, error, warn};
pub use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use rustyline::{CompletionType, Config as RLConfig};
use std::fs::File;
use std::io::{self, IsTerminal, Read};
use std::os::fd::AsFd;

enum Input {
    /// 终端：行编辑 + 历史记录
    Interactive(Editor<(), FileHistory>),
    /// 管道或文件：逐行读取，不显示提示符
    Piped(LineReader<File>),
}

/// 不带缓冲的逐字节读取，读到换行为止
///
/// 不会越过当前行多读，子进程继承标准输入后能看到剩下的行。
/// 非 UTF-8 字节按替换字符处理，不会中断读取。
pub struct LineReader<R> {
    source: R,
}

impl<R: Read> LineReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// 读取下一行，去掉行尾的 `\n` 或 `\r\n`；输入结束时返回 `None`
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.source.read(&mut byte) {
                Ok(0) if line.is_empty() => return Ok(None),
                Ok(0) => break,
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => line.push(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        match String::from_utf8(line) {
            Ok(line) => Ok(Some(line)),
            Err(e) => {
                warn!("输入行包含非 UTF-8 字节，已替换");
                Ok(Some(String::from_utf8_lossy(e.as_bytes()).into_owned()))
            }
        }
    }
}

pub struct ReadlineManager<'a> {
    config: &'a Config,
    input: Input,
}

impl<'a> ReadlineManager<'a> {
    pub fn new(config: &'a Config) -> Result<Self, ReadlineError> {
        let input = if io::stdin().is_terminal() {
            let rl_config = RLConfig::builder()
                .history_ignore_space(true)
                .completion_type(CompletionType::List)
                .edit_mode(config.get_edit_mode())
                .build();
            Input::Interactive(Editor::with_config(rl_config)?)
        } else {
            debug!("标准输入不是终端，使用非交互模式");
            // 复制一份 fd 0，File 的读取不经过标准库的 stdin 缓冲
            let stdin = io::stdin().as_fd().try_clone_to_owned()?;
            Input::Piped(LineReader::new(File::from(stdin)))
        };
        Ok(Self { config, input })
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self.input, Input::Interactive(_))
    }

    pub fn load_history(&mut self) -> Result<(), ReadlineError> {
        let Input::Interactive(editor) = &mut self.input else {
            return Ok(());
        };
        if let Err(err) = editor.load_history(&self.config.history_file) {
            warn!(
                "无法加载历史记录: {} {}",
                self.config.history_file.display(),
                err
            );
        } else {
            debug!("历史记录加载成功");
        }
        Ok(())
    }

    pub fn readline(&mut self, prompt: &str) -> Result<String, ReadlineError> {
        match &mut self.input {
            Input::Interactive(editor) => editor.readline(prompt),
            Input::Piped(reader) => reader.next_line()?.ok_or(ReadlineError::Eof),
        }
    }

    pub fn add_history(&mut self, line: &str) -> Result<bool, ReadlineError> {
        match &mut self.input {
            Input::Interactive(editor) => editor.add_history_entry(line),
            Input::Piped(_) => Ok(false),
        }
    }

    pub fn save_history(&mut self) -> Result<(), ReadlineError> {
        let Input::Interactive(editor) = &mut self.input else {
            return Ok(());
        };
        if let Err(err) = editor.save_history(&self.config.history_file) {
            error!("保存历史记录失败: {}", err);
        } else {
            debug!("历史记录保存成功");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_lines_are_split_and_trimmed() {
        let mut reader = LineReader::new(&b"echo a\r\n\nlast"[..]);
        assert_eq!(reader.next_line().unwrap(), Some("echo a".to_string()));
        assert_eq!(reader.next_line().unwrap(), Some(String::new()));
        assert_eq!(reader.next_line().unwrap(), Some("last".to_string()));
        assert_eq!(reader.next_line().unwrap(), None);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut reader = LineReader::new(&b"echo \xff\necho ok\n"[..]);
        assert_eq!(reader.next_line().unwrap(), Some("echo \u{fffd}".to_string()));
        assert_eq!(reader.next_line().unwrap(), Some("echo ok".to_string()));
        assert_eq!(reader.next_line().unwrap(), None);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_reader_stops_at_line_end() {
        let mut source = &b"first\nsecond\n"[..];
        let mut reader = LineReader::new(&mut source);
        assert_eq!(reader.next_line().unwrap(), Some("first".to_string()));
        drop(reader);
        assert_eq!(source, b"second\n");
    }
}
