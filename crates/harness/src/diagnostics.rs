//! エンジンの診断出力の転送先。

use coco_types::{LoadGeneration, RomId};

/// 診断出力を受け取るロギング先。
///
/// 呼び出し側は結果を待たず、失敗しても再送しない。
pub trait DiagnosticSink: Send + Sync {
    /// 診断出力を記録する。
    fn emit(&self, rom: &RomId, generation: LoadGeneration, diagnostic: &str);
}

/// `tracing` に出力する既定のロギング先。
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnosticSink;

impl DiagnosticSink for TracingDiagnosticSink {
    fn emit(&self, rom: &RomId, generation: LoadGeneration, diagnostic: &str) {
        tracing::info!(target: "coco::engine", %rom, %generation, "{diagnostic}");
    }
}
