use log::{debug, warn};
use nix::sys::signal::{signal, SigHandler, Signal};

const INTERACTIVE_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGQUIT, Signal::SIGTSTP];

/// 交互模式下 shell 自身忽略 Ctrl-C、Ctrl-\、Ctrl-Z，只让前台子进程接收
pub fn ignore_interactive_signals() {
    for sig in INTERACTIVE_SIGNALS {
        // SAFETY: 只安装 SIG_IGN，不涉及自定义处理函数
        if let Err(e) = unsafe { signal(sig, SigHandler::SigIgn) } {
            warn!("无法忽略信号 {}: {}", sig, e);
        }
    }
    debug!("已忽略交互信号");
}

/// 子进程在 exec 前恢复默认处理，被忽略的信号会跨 exec 继承
pub fn restore_default_signals() {
    for sig in INTERACTIVE_SIGNALS.into_iter().chain([Signal::SIGPIPE]) {
        // SAFETY: 同上，只恢复 SIG_DFL
        let _ = unsafe { signal(sig, SigHandler::SigDfl) };
    }
}
