//! # ハーネス エラー型
//!
//! ロード処理と設定読み込みで共通のエラー型。
//! `EngineError`（`crates/engine/src/lib.rs`）と同パターン。

use coco_engine::EngineError;
use coco_types::{FailureKind, LoadGeneration, ViewContent};

/// ロード処理のエラー型。
///
/// `Transport` と `Engine` は該当ビューのエラー表示に変換される。
/// `Stale` はエラーではなく、古い世代の結果を破棄したことを表す。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// ネットワーク・ファイル読み込みの失敗
    #[error("リソースの取得に失敗: {0}")]
    Transport(String),
    /// 実行エンジンの失敗
    #[error("ROMの実行に失敗: {0}")]
    Engine(#[from] EngineError),
    /// 新しいロードが開始されたため結果を破棄した
    #[error("世代 {generation} の結果を破棄しました (現在: {current})")]
    Stale {
        /// 結果の世代
        generation: LoadGeneration,
        /// 現在の世代
        current: LoadGeneration,
    },
}

impl LoadError {
    /// ビューに表示するエラー内容を返す。`Stale` は表示しない。
    pub fn indicator(&self) -> Option<ViewContent> {
        match self {
            LoadError::Transport(cause) => Some(ViewContent::Failed {
                kind: FailureKind::Transport,
                cause: cause.clone(),
            }),
            LoadError::Engine(e) => Some(ViewContent::Failed {
                kind: FailureKind::Engine,
                cause: e.to_string(),
            }),
            LoadError::Stale { .. } => None,
        }
    }
}

/// 設定読み込みのエラー型。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 環境変数の値が不正
    #[error("環境変数 {name} の値が不正です: {value}")]
    InvalidValue {
        /// 環境変数名
        name: &'static str,
        /// 指定された値
        value: String,
    },
    /// HTTPクライアントの構築に失敗
    #[error("HTTPクライアントの構築に失敗: {0}")]
    HttpClient(String),
}
