//! # 対話モード
//!
//! 標準入力から1行1コマンドを読み、Load Coordinatorに渡す。
//!
//! - `select <rom>`: ROMを選択してロード
//! - `file <path>`: ローカルファイルをロード（ロケータを使わない）
//! - `show <view>` / `hide <view>`: ビューの表示切り替え
//! - `status`: 現在の世代とビューの状態
//! - `quit`: 実行中のロードを待って終了

use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use coco_harness::{LoadCoordinator, LoadTicket, UserFile};
use coco_types::{RomId, ViewKind};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// 対話コマンド。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select(RomId),
    File(PathBuf),
    Show(ViewKind),
    Hide(ViewKind),
    Status,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };
        let require = |what: &str| {
            if arg.is_empty() {
                Err(format!("{verb}: {what}を指定してください"))
            } else {
                Ok(arg)
            }
        };
        match verb {
            "select" => Ok(Command::Select(RomId::new(require("ROM名")?))),
            "file" => Ok(Command::File(PathBuf::from(require("パス")?))),
            "show" => Ok(Command::Show(require("ビュー名")?.parse()?)),
            "hide" => Ok(Command::Hide(require("ビュー名")?.parse()?)),
            "status" => Ok(Command::Status),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("不明なコマンド: {other}")),
        }
    }
}

/// 入力が尽きるか `quit` を受け取るまでコマンドを処理する。
///
/// 終了前に最後に開始したロードの完了を待つ。
pub async fn run<R, W>(coordinator: &LoadCoordinator, input: R, out: &mut W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut last: Option<LoadTicket> = None;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                writeln!(out, "error: {e}")?;
                continue;
            }
        };
        tracing::debug!(?command, "コマンドを受信");

        match command {
            Command::Select(rom) => last = Some(coordinator.load(rom)),
            Command::File(path) => last = Some(coordinator.load_file(UserFile::from_path(path))),
            Command::Show(view) => toggle(coordinator, view, true, out)?,
            Command::Hide(view) => toggle(coordinator, view, false, out)?,
            Command::Status => {
                writeln!(out, "generation {}", coordinator.current_generation())?;
                for view in ViewKind::ALL {
                    let state = coordinator.presentation().state(view);
                    writeln!(
                        out,
                        "{view}: visible={} enabled={} {}",
                        state.visible,
                        state.control_enabled,
                        summary(&state.content)
                    )?;
                }
            }
            Command::Quit => break,
        }
    }

    if let Some(ticket) = last {
        ticket.settled().await;
    }
    Ok(())
}

fn toggle<W: Write>(
    coordinator: &LoadCoordinator,
    view: ViewKind,
    visible: bool,
    out: &mut W,
) -> std::io::Result<()> {
    if !coordinator.toggle(view, visible) {
        writeln!(out, "{view}: 切り替えできません（ロード中か、表示先がないか、既にその状態です）")?;
    }
    Ok(())
}

fn summary(content: &coco_types::ViewContent) -> String {
    use coco_types::ViewContent;
    match content {
        ViewContent::Empty => "empty".to_string(),
        ViewContent::Loading => "loading".to_string(),
        ViewContent::Ready { text } => format!("ready ({} chars)", text.chars().count()),
        failed @ ViewContent::Failed { .. } => failed.text(),
    }
}
