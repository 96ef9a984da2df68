//! Progress Module
//!
//! 批处理进度条 + 基于通道的进度上报：
//! workers 只发送 "advance by 1" 信号，由单独的 reporter 线程驱动进度条，
//! UI 刷新频率与 worker 执行解耦。

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::thread::JoinHandle;
use std::time::Duration;

pub mod templates {
    /// Spinner 字符序列 - 统一使用 Braille 点阵
    pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

    /// 进度条填充字符
    pub const PROGRESS_CHARS: &str = "█▓░";

    /// 批量处理进度条
    pub const BATCH: &str = "{spinner:.green} {prefix:.cyan.bold} ▕{bar:35.green/black}▏ {percent:>3}% • {pos}/{len} • ⏱️ {elapsed_precise} (ETA: {eta}) • {msg}";
}

/// Default capacity of the worker -> reporter channel.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 64;

pub fn create_progress_bar(total: u64, prefix: &str, hidden: bool) -> ProgressBar {
    let pb = ProgressBar::new(total);

    if hidden {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_bar()
                .template(templates::BATCH)
                .expect("Invalid progress bar template")
                .progress_chars(templates::PROGRESS_CHARS)
                .tick_chars(templates::SPINNER_CHARS),
        );
        pb.set_prefix(prefix.to_string());
        pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(20));
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb
}

/// Sending side of the progress channel. Cheap to clone, one per worker.
#[derive(Clone)]
pub struct ProgressHandle {
    tx: flume::Sender<u64>,
}

impl ProgressHandle {
    /// Report one finished job. Fire-and-forget: a reporter that has already
    /// gone away is ignored.
    pub fn advance(&self) {
        let _ = self.tx.send(1);
    }
}

/// Receiving side: the thread that owns the progress bar.
pub struct ProgressReporter {
    handle: JoinHandle<u64>,
}

impl ProgressReporter {
    /// Wait for every [`ProgressHandle`] to be dropped, finish the bar and
    /// return the number of units observed.
    ///
    /// Calling this while a handle is still alive blocks forever.
    pub fn finish(self) -> u64 {
        self.handle.join().unwrap_or_default()
    }
}

/// Spawn the reporter thread driving `bar`.
pub fn spawn_progress_reporter(bar: ProgressBar, capacity: usize) -> (ProgressReporter, ProgressHandle) {
    let (tx, rx) = flume::bounded::<u64>(capacity.max(1));

    let handle = std::thread::spawn(move || {
        let mut ticks = 0u64;
        for n in rx.iter() {
            ticks += n;
            bar.inc(n);
        }
        bar.finish_with_message("Complete!");
        ticks
    });

    (ProgressReporter { handle }, ProgressHandle { tx })
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}
