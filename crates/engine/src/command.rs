//! # 外部プロセスエンジン
//!
//! 外部プログラムを実行エンジンとして使用する。ROMは標準入力に渡し、
//! 標準出力をJSONとして解釈する（JSONでなければテキストとして扱う）。
//!
//! 標準入力への書き込みと標準出力・標準エラーの読み出しは別スレッドで並行に行う。
//! 制限時間を超えたプロセスは強制終了する。

use std::io::{ErrorKind, Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{EngineError, ExecutionEngine};

/// 既定の実行制限時間。
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// 外部プログラムを呼び出す実行エンジン。
///
/// 呼び出しごとに新しいプロセスを起動するため、実行間で状態を持たない。
/// 呼び出しはプロセスの終了までブロックする。
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandEngine {
    /// 新しいCommandEngineを作成する。
    ///
    /// # 引数
    /// - `program`: 実行するプログラム（例: "coco-vm-cli"）
    /// - `args`: プログラムに渡す引数
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// 実行制限時間を変更する。
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// プロセスの終了を待つ。制限時間を超えた場合は強制終了してエラーを返す。
    fn wait(&self, child: &mut Child) -> Result<std::process::ExitStatus, EngineError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(EngineError::Execution(format!(
                        "{} が制限時間 {:?} 内に終了しませんでした",
                        self.program, self.timeout
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(EngineError::Execution(format!(
                        "エンジンの終了待ちに失敗: {e}"
                    )));
                }
            }
        }
    }
}

impl ExecutionEngine for CommandEngine {
    fn execute(&self, rom: &[u8]) -> Result<serde_json::Value, EngineError> {
        tracing::debug!(program = %self.program, rom_len = rom.len(), "外部エンジンを起動");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::Spawn(format!("{}: {e}", self.program)))?;

        let writer = child.stdin.take().map(|mut stdin| {
            let rom = rom.to_vec();
            thread::spawn(move || match stdin.write_all(&rom) {
                // ROMを読み切らずに終了するエンジンもある
                Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
                other => other,
            })
        });
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        // 制限時間超過時はパイプ処理スレッドを待たない（子孫プロセスがパイプを保持している場合がある）
        let status = self.wait(&mut child)?;

        let written = writer.map(join_io).transpose();
        let stdout = stdout.map(join_io).transpose();
        let stderr = stderr.map(join_io).transpose();

        if let Err(e) = written {
            return Err(EngineError::Execution(format!("ROMの書き込みに失敗: {e}")));
        }
        let stdout = stdout
            .map_err(|e| EngineError::Execution(format!("標準出力の読み込みに失敗: {e}")))?
            .unwrap_or_default();
        let stderr = stderr.ok().flatten().unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(EngineError::Execution(format!(
                "{} が異常終了しました ({}): {}",
                self.program,
                status,
                stderr.trim()
            )));
        }

        Ok(parse_stdout(&stdout))
    }
}

fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join_io<T>(handle: JoinHandle<std::io::Result<T>>) -> std::io::Result<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(std::io::Error::other("パイプ処理スレッドがパニックしました")))
}

/// 標準出力を結果に変換する。
fn parse_stdout(stdout: &[u8]) -> serde_json::Value {
    use serde_json::Value;

    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        return Value::Null;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Object(_) | Value::String(_) | Value::Null)) => value,
        _ => Value::String(text.to_string()),
    }
}
