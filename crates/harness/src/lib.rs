//! # COCO Harness
//!
//! ROMの取得・実行・表示を順序付けるオーケストレーション層。
//!
//! ## モジュール構成
//! - `coordinator`: 世代番号によるロードの調停
//! - `fetcher`: ロケータ・ユーザーファイルからのリソース取得
//! - `presentation`: bytecode/sourceビューの状態とトグル
//! - `diagnostics`: エンジン診断出力の転送先
//! - `hexdump`: 16進表示
//! - `config`: 環境変数による設定とロケータ規則

pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod error;
pub mod fetcher;
pub mod hexdump;
pub mod presentation;

#[cfg(test)]
mod test_helpers;

pub use config::{HarnessConfig, LocatorScheme, SourceMode};
pub use coordinator::{HarnessContext, LoadCoordinator, LoadTicket};
pub use diagnostics::{DiagnosticSink, TracingDiagnosticSink};
pub use error::{ConfigError, LoadError};
pub use fetcher::{Fetcher, UserFile};
pub use presentation::{InitialVisibility, PresentationContext, PresentationSync, ViewSurface};
