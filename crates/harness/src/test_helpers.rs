//! # テスト用共通ヘルパー
//!
//! Coordinator・Presentationテストで共有するモック群。

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use coco_engine::{EngineAdapter, EngineError, EngineReset, ExecutionEngine};
use coco_types::{LoadGeneration, RomId, ViewKind, ViewState};
use tokio::sync::oneshot;

use crate::config::{LocatorScheme, SourceMode};
use crate::coordinator::{HarnessContext, LoadCoordinator};
use crate::diagnostics::DiagnosticSink;
use crate::fetcher::{Fetcher, ResourceLoader};
use crate::presentation::{InitialVisibility, PresentationContext, PresentationSync, ViewSurface};

type Response = Result<Vec<u8>, String>;

/// テストが応答のタイミングを制御するローダー。
///
/// `gate` で登録した順に、同じロケータへの呼び出しへ応答を割り当てる。
#[derive(Default)]
pub struct GatedLoader {
    pending: Mutex<HashMap<String, VecDeque<oneshot::Receiver<Response>>>>,
    calls: Mutex<Vec<String>>,
}

/// 1回分の応答を送るハンドル。
pub struct Gate(oneshot::Sender<Response>);

impl Gate {
    /// 成功応答を返す。
    pub fn ok(self, bytes: impl Into<Vec<u8>>) {
        let _ = self.0.send(Ok(bytes.into()));
    }

    /// 失敗応答を返す。
    pub fn fail(self, cause: &str) {
        let _ = self.0.send(Err(cause.to_string()));
    }
}

impl GatedLoader {
    /// locatorへの次の呼び出しの応答を登録する。
    pub fn gate(&self, locator: &str) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap()
            .entry(locator.to_string())
            .or_default()
            .push_back(rx);
        Gate(tx)
    }

    /// これまでに呼ばれたロケータの一覧。
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ResourceLoader for GatedLoader {
    async fn load(&self, locator: &str) -> Result<Vec<u8>, String> {
        self.calls.lock().unwrap().push(locator.to_string());
        let receiver = self
            .pending
            .lock()
            .unwrap()
            .get_mut(locator)
            .and_then(VecDeque::pop_front);
        match receiver {
            Some(rx) => rx.await.unwrap_or_else(|_| Err("gate dropped".into())),
            None => Err(format!("no gate for {locator}")),
        }
    }
}

/// 描画履歴を記録するUI面。
#[derive(Default)]
pub struct RecordingSurface {
    renders: Mutex<Vec<(ViewKind, ViewState)>>,
}

impl RecordingSurface {
    /// ビューの描画履歴。
    pub fn history(&self, view: ViewKind) -> Vec<ViewState> {
        self.renders
            .lock()
            .unwrap()
            .iter()
            .filter(|(v, _)| *v == view)
            .map(|(_, state)| state.clone())
            .collect()
    }

    /// ビューに最後に描画された状態。
    pub fn last(&self, view: ViewKind) -> Option<ViewState> {
        self.history(view).pop()
    }
}

impl ViewSurface for RecordingSurface {
    fn render(&self, view: ViewKind, state: &ViewState) {
        self.renders.lock().unwrap().push((view, state.clone()));
    }
}

/// 診断出力を記録するロギング先。
#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<(String, LoadGeneration, String)>>,
}

impl RecordingSink {
    /// 記録された (ROM, 世代, 診断出力) の一覧。
    pub fn entries(&self) -> Vec<(String, LoadGeneration, String)> {
        self.entries.lock().unwrap().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, rom: &RomId, generation: LoadGeneration, diagnostic: &str) {
        self.entries
            .lock()
            .unwrap()
            .push((rom.to_string(), generation, diagnostic.to_string()));
    }
}

/// 先頭バイトに応じて振る舞いを変えるエンジン。
///
/// - `0xff`: パニック
/// - `0xee`: 実行エラーを返す
/// - `0xdd`: 解釈できない結果（数値）を返す
/// - それ以外: 長さを報告する
pub struct ScriptedEngine;

/// ScriptedEngineをパニックさせるROM。
pub const PANIC_ROM: [u8; 2] = [0xff, 0x00];

/// ScriptedEngineが実行エラーを返すROM。
pub const FAILING_ROM: [u8; 2] = [0xee, 0x00];

/// ScriptedEngineが解釈できない結果を返すROM。
pub const UNUSABLE_ROM: [u8; 2] = [0xdd, 0x00];

impl ExecutionEngine for ScriptedEngine {
    fn execute(&self, rom: &[u8]) -> Result<serde_json::Value, EngineError> {
        match rom.first() {
            Some(0xff) => panic!("scripted engine panic"),
            Some(0xee) => Err(EngineError::Execution("stack underflow".into())),
            Some(0xdd) => Ok(serde_json::json!(42)),
            _ => Ok(serde_json::json!({ "message": format!("ran {} bytes", rom.len()) })),
        }
    }
}

/// テスト用に組み立てたCoordinatorと各モック。
pub struct TestHarness {
    pub coordinator: LoadCoordinator,
    pub loader: Arc<GatedLoader>,
    pub surface: Arc<RecordingSurface>,
    pub sink: Arc<RecordingSink>,
}

impl TestHarness {
    /// ビューの現在の状態。
    pub fn state(&self, view: ViewKind) -> ViewState {
        self.coordinator.presentation().state(view)
    }

    /// ビューの表示テキスト。
    pub fn text(&self, view: ViewKind) -> String {
        self.state(view).content.text()
    }
}

/// ロケータベース `roms` のTestHarnessを組み立てる。
///
/// sourceビューの表示先はソース表示モードに合わせる。
pub fn harness(source_mode: SourceMode) -> TestHarness {
    build(
        source_mode,
        source_mode == SourceMode::Paired,
        Arc::new(ScriptedEngine),
    )
}

/// 任意のエンジンでTestHarnessを組み立てる。
pub fn harness_with_engine(engine: Arc<dyn ExecutionEngine>) -> TestHarness {
    build(SourceMode::Paired, true, engine)
}

/// ソース表示モードと表示先の有無を個別に指定してTestHarnessを組み立てる。
pub fn build(
    source_mode: SourceMode,
    source_view: bool,
    engine: Arc<dyn ExecutionEngine>,
) -> TestHarness {
    let loader = Arc::new(GatedLoader::default());
    let surface = Arc::new(RecordingSurface::default());
    let sink = Arc::new(RecordingSink::default());

    let source_surface = source_view.then(|| surface.clone() as Arc<dyn ViewSurface>);
    let presentation = Arc::new(PresentationSync::new(
        PresentationContext {
            bytecode: surface.clone(),
            source: source_surface,
        },
        InitialVisibility {
            bytecode: true,
            source: true,
        },
    ));

    let coordinator = LoadCoordinator::new(HarnessContext {
        fetcher: Fetcher::new(loader.clone()),
        engine: EngineAdapter::new(engine, EngineReset::BeforeEachRun),
        presentation,
        locators: LocatorScheme::new("roms"),
        source_mode,
        diagnostics: sink.clone(),
    });

    TestHarness {
        coordinator,
        loader,
        surface,
        sink,
    }
}
