//! # COCO 実行境界アダプタ
//!
//! ROMを実行する外部エンジンを不透明な境界として扱い、その結果を
//! `ExecutionResult` に正規化する。
//!
//! ## 安全性確保
//! - catch_unwind: エンジンのパニックをキャッチし、UI層への影響を遮断
//! - 結果の正規化: `debug` / `message` / `sys_stdout` のいずれかを `diagnostic` に統一
//! - リセット: 設定により実行ごとにエンジンを初期状態へ戻す
//!
//! ## エンジン実装
//! - `CommandEngine`: 外部プログラムの標準入力にROMを渡して実行する
//! - `NullEngine`: 何も実行しない（表示のみ確認したい場合）

pub mod command;

pub use command::CommandEngine;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use coco_types::ExecutionResult;

/// エンジンが診断出力を返すフィールド名（優先順）。
///
/// エンジンのバージョンによって名前が異なる。
pub const DIAGNOSTIC_FIELDS: [&str; 3] = ["debug", "message", "sys_stdout"];

/// 実行境界のエラー型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// エンジンの実行エラー
    #[error("エンジン実行エラー: {0}")]
    Execution(String),
    /// エンジンのパニック
    #[error("エンジンがパニックしました: {0}")]
    Panic(String),
    /// 結果の形式が解釈できない
    #[error("エンジンの結果を解釈できません: {0}")]
    UnusableResult(String),
    /// 実行前のリセットに失敗
    #[error("エンジンのリセットに失敗: {0}")]
    Reset(String),
    /// 外部エンジンプロセスの起動に失敗
    #[error("エンジンの起動に失敗: {0}")]
    Spawn(String),
}

/// ROMを実行する外部エンジンのトレイト。
///
/// 戻り値はエンジン固有の形式のJSON。フィールド名の揺れは
/// `EngineAdapter` が吸収する。
pub trait ExecutionEngine: Send + Sync {
    /// ROMのバイト列を実行し、エンジン固有の結果を返す。
    fn execute(&self, rom: &[u8]) -> Result<serde_json::Value, EngineError>;

    /// エンジンを初期状態に戻す。状態を持たないエンジンは何もしない。
    fn reset(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// 実行ごとのエンジンリセット方針。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineReset {
    /// 毎回の実行前に `reset` を呼ぶ
    #[default]
    BeforeEachRun,
    /// リセットしない（エンジンが実行ごとに状態を持たない場合）
    Never,
}

/// 何も実行しないエンジン。
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEngine;

impl ExecutionEngine for NullEngine {
    fn execute(&self, _rom: &[u8]) -> Result<serde_json::Value, EngineError> {
        Ok(serde_json::Value::Null)
    }
}

/// 実行境界アダプタ。
///
/// ROMの構造は検証せず、そのままエンジンに渡す。キャッシュは行わない。
#[derive(Clone)]
pub struct EngineAdapter {
    engine: Arc<dyn ExecutionEngine>,
    reset: EngineReset,
}

impl EngineAdapter {
    /// 新しいEngineAdapterを作成する。
    ///
    /// # 引数
    /// - `engine`: 実行エンジン
    /// - `reset`: 実行ごとのリセット方針
    pub fn new(engine: Arc<dyn ExecutionEngine>, reset: EngineReset) -> Self {
        Self { engine, reset }
    }

    /// ROMを実行し、正規化した結果を返す。
    ///
    /// catch_unwindによりエンジンのパニックを遮断し、`EngineError::Panic` として返す。
    pub fn run(&self, rom: &[u8]) -> Result<ExecutionResult, EngineError> {
        let engine = Arc::clone(&self.engine);
        let reset = self.reset;

        let result = panic::catch_unwind(AssertUnwindSafe(move || {
            if reset == EngineReset::BeforeEachRun {
                engine
                    .reset()
                    .map_err(|e| EngineError::Reset(e.to_string()))?;
            }
            engine.execute(rom)
        }));

        match result {
            Ok(inner) => normalize(inner?),
            Err(payload) => Err(EngineError::Panic(panic_message(payload.as_ref()))),
        }
    }
}

impl std::fmt::Debug for EngineAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineAdapter")
            .field("reset", &self.reset)
            .finish_non_exhaustive()
    }
}

/// エンジン固有の結果を `ExecutionResult` に正規化する。
///
/// - オブジェクト: `DIAGNOSTIC_FIELDS` の順で最初の空でない文字列を採用
/// - 文字列: そのまま診断出力とする
/// - null: 診断出力なし
/// - それ以外: `EngineError::UnusableResult`
pub fn normalize(raw: serde_json::Value) -> Result<ExecutionResult, EngineError> {
    use serde_json::Value;

    let diagnostic = match raw {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Object(fields) => DIAGNOSTIC_FIELDS
            .iter()
            .find_map(|name| fields.get(*name).and_then(Value::as_str))
            .filter(|text| !text.is_empty())
            .map(str::to_string),
        other => {
            return Err(EngineError::UnusableResult(format!(
                "オブジェクトまたは文字列を期待しましたが {other} でした"
            )))
        }
    };

    Ok(ExecutionResult {
        diagnostic: diagnostic.filter(|text| !text.is_empty()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "エンジンの実行中にパニックが発生しました".to_string()
    }
}
