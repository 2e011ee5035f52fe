//! # Load Coordinator
//!
//! ROMの選択（既定ROM、セレクタ変更、ファイルドロップ）を受け取り、
//! フェッチ・実行・表示更新を駆動する。
//!
//! ## 処理フロー
//! 1. 世代番号を進め、以前のロードを即座に置き換える（転送は中断しない）
//! 2. 対象ビューを同期的に「Loading…」にし、トグルを無効化する
//!    （ファイルドロップではsourceビューを空にする。ソースなしのモードでは触れない）
//! 3. バイナリの取得を開始し、完了時に世代を確認してから実行・表示する
//! 4. 対になるソースがあれば並行して取得し、同じく世代を確認して表示する
//!
//! 世代の確認とビューの更新は同じ臨界区間で行う。古い世代の結果は
//! ユーザーに通知せずに破棄する。


use std::sync::{Arc, Mutex, MutexGuard};

use coco_engine::{EngineAdapter, EngineError};
use coco_types::{LoadGeneration, ResourceKind, RomId, ViewContent, ViewKind};
use tokio::task::JoinHandle;

use crate::config::{LocatorScheme, SourceMode};
use crate::diagnostics::DiagnosticSink;
use crate::error::LoadError;
use crate::fetcher::{FetchOutcome, Fetcher, Resource, UserFile};
use crate::hexdump::render_hex;
use crate::presentation::{PresentationSync, ViewUpdate};

/// Load Coordinatorに注入する依存一式。
pub struct HarnessContext {
    /// リソースフェッチャー
    pub fetcher: Fetcher,
    /// 実行境界アダプタ
    pub engine: EngineAdapter,
    /// Presentation Sync
    pub presentation: Arc<PresentationSync>,
    /// ROM識別子からロケータを組み立てる規則
    pub locators: LocatorScheme,
    /// ソース表示モード
    pub source_mode: SourceMode,
    /// 診断出力の転送先
    pub diagnostics: Arc<dyn DiagnosticSink>,
}

struct Inner {
    generation: Mutex<LoadGeneration>,
    fetcher: Fetcher,
    engine: EngineAdapter,
    presentation: Arc<PresentationSync>,
    locators: LocatorScheme,
    source_mode: SourceMode,
    diagnostics: Arc<dyn DiagnosticSink>,
}

/// 1回のロード要求。
struct LoadRequest {
    rom: RomId,
    binary: Resource,
    source: Option<Resource>,
}

/// 開始したロードのハンドル。
///
/// 破棄しても処理は継続する。完了を待ちたい場合は `settled` を呼ぶ。
#[derive(Debug)]
pub struct LoadTicket {
    generation: LoadGeneration,
    tasks: Vec<JoinHandle<()>>,
}

impl LoadTicket {
    /// このロードの世代を返す。
    pub fn generation(&self) -> LoadGeneration {
        self.generation
    }

    /// このロードの全てのフェッチが完了するまで待つ。
    pub async fn settled(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(generation = %self.generation, error = %e, "ロードタスクが異常終了");
            }
        }
    }
}

/// Load Coordinator。
///
/// 世代番号を更新できるのはこの型だけ。`load` / `load_file` はtokioランタイム内で呼ぶ。
#[derive(Clone)]
pub struct LoadCoordinator {
    inner: Arc<Inner>,
}

impl LoadCoordinator {
    /// 新しいLoadCoordinatorを作成する。
    pub fn new(context: HarnessContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                generation: Mutex::new(LoadGeneration::INITIAL),
                fetcher: context.fetcher,
                engine: context.engine,
                presentation: context.presentation,
                locators: context.locators,
                source_mode: context.source_mode,
                diagnostics: context.diagnostics,
            }),
        }
    }

    /// Presentation Syncを返す。
    pub fn presentation(&self) -> &Arc<PresentationSync> {
        &self.inner.presentation
    }

    /// 現在の世代を返す。
    pub fn current_generation(&self) -> LoadGeneration {
        *self.inner.lock_generation()
    }

    /// ROM識別子でロードを開始する。
    ///
    /// 同じROMを続けて選択した場合も、新しい世代で取得し直す。
    pub fn load(&self, rom: RomId) -> LoadTicket {
        let binary = Resource::Locator(self.inner.locators.rom(&rom));
        let source = match self.inner.source_mode {
            SourceMode::Paired if self.inner.presentation.has_view(ViewKind::Source) => {
                Some(Resource::Locator(self.inner.locators.source(&rom)))
            }
            _ => None,
        };
        self.start(LoadRequest {
            rom,
            binary,
            source,
        })
    }

    /// ユーザーが指定したファイルでロードを開始する。
    ///
    /// ロケータは使わないが、世代の規則は `load` と同じ。ソースは表示しない。
    pub fn load_file(&self, file: UserFile) -> LoadTicket {
        self.start(LoadRequest {
            rom: RomId::new(file.name()),
            binary: Resource::File(file),
            source: None,
        })
    }

    /// ビューの表示/非表示を切り替える。フェッチは開始しない。
    pub fn toggle(&self, view: ViewKind, visible: bool) -> bool {
        self.inner.presentation.set_visible(view, visible)
    }

    fn start(&self, request: LoadRequest) -> LoadTicket {
        let LoadRequest {
            rom,
            binary,
            source,
        } = request;

        let generation = {
            let mut current = self.inner.lock_generation();
            *current = current.next();

            let presentation = &self.inner.presentation;
            presentation.apply(ViewKind::Bytecode, ViewUpdate::Loading);
            if source.is_some() {
                presentation.apply(ViewKind::Source, ViewUpdate::Loading);
            } else if matches!(binary, Resource::File(_)) {
                // ドロップしたファイルには対になるソースがない
                presentation.apply(ViewKind::Source, ViewUpdate::Retired);
            }
            *current
        };

        tracing::info!(
            %rom,
            %generation,
            binary = %binary.describe(),
            paired_source = source.is_some(),
            "ROMのロードを開始"
        );

        let mut tasks = Vec::with_capacity(2);
        tasks.push(tokio::spawn(run_binary(
            Arc::clone(&self.inner),
            rom.clone(),
            generation,
            binary,
        )));
        if let Some(source) = source {
            tasks.push(tokio::spawn(run_source(
                Arc::clone(&self.inner),
                rom,
                generation,
                source,
            )));
        }

        LoadTicket { generation, tasks }
    }
}

impl std::fmt::Debug for LoadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadCoordinator")
            .field("generation", &self.current_generation())
            .field("source_mode", &self.inner.source_mode)
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn lock_generation(&self) -> MutexGuard<'_, LoadGeneration> {
        self.generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_current(&self, generation: LoadGeneration) -> Result<(), LoadError> {
        let current = *self.lock_generation();
        if current == generation {
            Ok(())
        } else {
            Err(LoadError::Stale {
                generation,
                current,
            })
        }
    }

    /// 世代が現在のものと一致する場合のみビューに反映する。
    fn commit(
        &self,
        generation: LoadGeneration,
        view: ViewKind,
        content: ViewContent,
    ) -> Result<(), LoadError> {
        let current = self.lock_generation();
        if *current != generation {
            return Err(LoadError::Stale {
                generation,
                current: *current,
            });
        }
        self.presentation.apply(view, ViewUpdate::Settled(content));
        Ok(())
    }
}

/// バイナリを取得し、実行して16進表示をbytecodeビューに反映する。
async fn run_binary(inner: Arc<Inner>, rom: RomId, generation: LoadGeneration, resource: Resource) {
    let outcome = inner.fetcher.fetch(resource, ResourceKind::Binary).await;

    // 古い世代のROMは実行しない
    if let Err(stale) = inner.ensure_current(generation) {
        tracing::debug!(%rom, view = %ViewKind::Bytecode, "{stale}");
        return;
    }

    let (content, diagnostic) = match outcome {
        FetchOutcome::Bytes(bytes) => execute(&inner.engine, &rom, bytes).await,
        FetchOutcome::Text(text) => execute(&inner.engine, &rom, text.into_bytes()).await,
        FetchOutcome::Failed(cause) => (failure(LoadError::Transport(cause)), None),
    };

    match inner.commit(generation, ViewKind::Bytecode, content) {
        Ok(()) => {
            if let Some(diagnostic) = diagnostic {
                inner.diagnostics.emit(&rom, generation, &diagnostic);
            }
        }
        Err(stale) => tracing::debug!(%rom, view = %ViewKind::Bytecode, "{stale}"),
    }
}

/// 対になるソースを取得し、sourceビューに反映する。
async fn run_source(inner: Arc<Inner>, rom: RomId, generation: LoadGeneration, resource: Resource) {
    let content = match inner.fetcher.fetch(resource, ResourceKind::Text).await {
        FetchOutcome::Text(text) => ViewContent::Ready { text },
        FetchOutcome::Bytes(bytes) => ViewContent::Ready {
            text: String::from_utf8_lossy(&bytes).into_owned(),
        },
        FetchOutcome::Failed(cause) => failure(LoadError::Transport(cause)),
    };

    if let Err(stale) = inner.commit(generation, ViewKind::Source, content) {
        tracing::debug!(%rom, view = %ViewKind::Source, "{stale}");
    }
}

/// ROMを実行し、表示内容と診断出力を返す。
///
/// エンジンの呼び出しはブロッキングのため `spawn_blocking` で実行する。
async fn execute(
    engine: &EngineAdapter,
    rom: &RomId,
    bytes: Vec<u8>,
) -> (ViewContent, Option<String>) {
    let hex = render_hex(&bytes);
    let engine = engine.clone();
    let result = tokio::task::spawn_blocking(move || engine.run(&bytes))
        .await
        .unwrap_or_else(|e| Err(EngineError::Panic(e.to_string())));

    match result {
        Ok(result) => (ViewContent::Ready { text: hex }, result.diagnostic),
        Err(e) => {
            tracing::warn!(%rom, error = %e, "ROMの実行に失敗");
            (failure(LoadError::Engine(e)), None)
        }
    }
}

fn failure(err: LoadError) -> ViewContent {
    err.indicator().unwrap_or_default()
}
