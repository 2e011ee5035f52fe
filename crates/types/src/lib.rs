//! # COCO ハーネス 共有型定義
//!
//! ROMのロード・実行・表示の各レイヤーで共有するデータ構造を提供する。
//!
//! ## 主な型
//! - `RomId`: ロード対象のROMを選択する識別子
//! - `LoadGeneration`: ロード要求ごとに単調増加する世代番号
//! - `ViewState`: 表示ビュー（bytecode / source）ごとの状態
//! - `ExecutionResult`: 実行エンジンの結果を正規化したもの

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// ロード中のビューに表示する文字列。
pub const LOADING_TEXT: &str = "Loading…";

/// バイナリROMのファイル拡張子。
pub const ROM_EXTENSION: &str = "rom";

/// 対になるソース成果物のファイル拡張子。
pub const SOURCE_EXTENSION: &str = "tal";

// ---------------------------------------------------------------------------
// ROM識別子・世代番号
// ---------------------------------------------------------------------------

/// ロード対象のROMを選択する識別子。
///
/// セレクタの値は `put_pixel.rom` のように拡張子付きで渡されることがあるため、
/// 末尾の `.rom` は取り除いて保持する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RomId(String);

impl RomId {
    /// セレクタの値からROM識別子を作成する。
    pub fn new(value: impl AsRef<str>) -> Self {
        let value = value.as_ref().trim();
        let suffix = format!(".{ROM_EXTENSION}");
        let name = value.strip_suffix(suffix.as_str()).unwrap_or(value);
        Self(name.to_string())
    }

    /// 拡張子を除いた識別子文字列を返す。
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ロード要求ごとに割り当てられる世代番号。
///
/// 一度発行した値は再利用しない。結果は発行時の世代と現在の世代が
/// 一致する場合にのみ表示へ反映される。
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LoadGeneration(u64);

impl LoadGeneration {
    /// まだ何もロードしていない状態の世代。
    pub const INITIAL: Self = Self(0);

    /// 次の世代を返す。
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// 世代番号の数値を返す。
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoadGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// リソース種別
// ---------------------------------------------------------------------------

/// 取得するリソースの種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// ROMバイナリ（生バイト列として取得）
    Binary,
    /// ソース成果物（UTF-8テキストとして取得）
    Text,
}

// ---------------------------------------------------------------------------
// ビュー状態
// ---------------------------------------------------------------------------

/// トグルで表示を切り替えるビューの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// ROMバイト列の16進表示
    Bytecode,
    /// 対になるソース成果物の表示
    Source,
}

impl ViewKind {
    /// 全てのビュー種別。
    pub const ALL: [ViewKind; 2] = [ViewKind::Bytecode, ViewKind::Source];

    /// ビュー名を返す。
    pub fn as_str(self) -> &'static str {
        match self {
            ViewKind::Bytecode => "bytecode",
            ViewKind::Source => "source",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bytecode" => Ok(ViewKind::Bytecode),
            "source" => Ok(ViewKind::Source),
            other => Err(format!("不明なビュー名: {other}")),
        }
    }
}

/// エラー表示の分類。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// ネットワーク・ファイル読み込みの失敗
    Transport,
    /// 実行エンジンの失敗
    Engine,
}

/// ビューに表示する内容。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewContent {
    /// 空（未ロード、またはソースなし）
    #[default]
    Empty,
    /// ロード中
    Loading,
    /// ロード完了（16進表示またはソーステキスト）
    Ready {
        /// 表示テキスト
        text: String,
    },
    /// エラー表示
    Failed {
        /// エラーの分類
        kind: FailureKind,
        /// エラー原因
        cause: String,
    },
}

impl ViewContent {
    /// ロード中かどうか。
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewContent::Loading)
    }

    /// 表示テキストを返す。
    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ViewContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewContent::Empty => Ok(()),
            ViewContent::Loading => f.write_str(LOADING_TEXT),
            ViewContent::Ready { text } => f.write_str(text),
            ViewContent::Failed {
                kind: FailureKind::Transport,
                cause,
            } => write!(f, "[load error] {cause}"),
            ViewContent::Failed {
                kind: FailureKind::Engine,
                cause,
            } => write!(f, "[engine error] {cause}"),
        }
    }
}

/// ビューごとの状態。
///
/// Presentation Syncのみが更新する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    /// 表示内容
    pub content: ViewContent,
    /// ビューが表示されているか（チェックボックスの状態）
    pub visible: bool,
    /// トグルが操作可能か
    pub control_enabled: bool,
}

impl ViewState {
    /// ビューが存在しない状態（ソース表示が無効なモードなど）。
    pub fn absent() -> Self {
        Self::default()
    }

    /// 初期状態。内容は空で、トグルは操作可能。
    pub fn idle(visible: bool) -> Self {
        Self {
            content: ViewContent::Empty,
            visible,
            control_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// 実行結果
// ---------------------------------------------------------------------------

/// 実行エンジンの結果を正規化したもの。
///
/// エンジンのバージョンによって `debug` / `message` などフィールド名が異なるが、
/// アダプタで `diagnostic` に統一する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// デバッグ出力（存在する場合）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}
