//! # Presentation Sync
//!
//! Load Coordinatorからのビュー更新を、注入されたUI面（`ViewSurface`）に反映する。
//! 表示/非表示トグルの配線もここで持つ。トグル操作は世代に依存せず、
//! フェッチも開始しない。
//!
//! ## ビュー
//! - bytecode: ROMバイト列の16進表示（常に存在）
//! - source: 対になるソース成果物（表示モードによっては存在しない）

use std::sync::{Mutex, MutexGuard};

use coco_types::{ViewContent, ViewKind, ViewState};

/// ビューの表示先となるUI面。
///
/// 状態が変わるたびに、その時点の状態のコピーで `render` が呼ばれる。
/// ビューの状態のロックは解放済みなので `PresentationSync` の参照・トグルは呼べるが、
/// Load Coordinatorの世代は保持されたままのため、`render` からロードを開始してはならない。
pub trait ViewSurface: Send + Sync {
    /// ビューの状態を描画する。
    fn render(&self, view: ViewKind, state: &ViewState);
}

/// Presentation Syncに注入するUI面の一式。
///
/// グローバルなドキュメント検索の代わりに、構築時に明示的に渡す。
pub struct PresentationContext {
    /// bytecodeビューの表示先
    pub bytecode: std::sync::Arc<dyn ViewSurface>,
    /// sourceビューの表示先（ソース表示をしないモードではNone）
    pub source: Option<std::sync::Arc<dyn ViewSurface>>,
}

/// トグル（チェックボックス）の初期状態。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialVisibility {
    /// bytecodeビューを表示するか
    pub bytecode: bool,
    /// sourceビューを表示するか
    pub source: bool,
}

impl Default for InitialVisibility {
    fn default() -> Self {
        Self {
            bytecode: true,
            source: false,
        }
    }
}

/// ビューへの更新。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    /// ロード開始。内容を「Loading…」にしてトグルを無効化する
    Loading,
    /// ロード完了（成功・失敗とも）。内容を設定してトグルを有効化する
    Settled(ViewContent),
    /// このロードでは使用しない。内容を空にしてトグルを無効化する
    Retired,
}

#[derive(Debug)]
struct Views {
    bytecode: ViewState,
    source: ViewState,
}

impl Views {
    fn get_mut(&mut self, view: ViewKind) -> &mut ViewState {
        match view {
            ViewKind::Bytecode => &mut self.bytecode,
            ViewKind::Source => &mut self.source,
        }
    }

    fn get(&self, view: ViewKind) -> &ViewState {
        match view {
            ViewKind::Bytecode => &self.bytecode,
            ViewKind::Source => &self.source,
        }
    }
}

/// Presentation Sync。
///
/// `ViewState` を更新できるのはこの型だけ。
pub struct PresentationSync {
    context: PresentationContext,
    views: Mutex<Views>,
}

impl PresentationSync {
    /// 新しいPresentationSyncを作成し、初期状態を描画する。
    pub fn new(context: PresentationContext, initial: InitialVisibility) -> Self {
        let source = if context.source.is_some() {
            ViewState::idle(initial.source)
        } else {
            ViewState::absent()
        };
        let sync = Self {
            context,
            views: Mutex::new(Views {
                bytecode: ViewState::idle(initial.bytecode),
                source,
            }),
        };
        for view in ViewKind::ALL {
            let snapshot = sync.state(view);
            sync.render(view, &snapshot);
        }
        sync
    }

    /// ビューの表示先が存在するか。
    pub fn has_view(&self, view: ViewKind) -> bool {
        self.surface(view).is_some()
    }

    /// ビューの現在の状態を返す。
    pub fn state(&self, view: ViewKind) -> ViewState {
        self.lock().get(view).clone()
    }

    /// ロードの進行をビューに反映する。表示先がないビューへの更新は無視する。
    pub fn apply(&self, view: ViewKind, update: ViewUpdate) {
        if !self.has_view(view) {
            return;
        }
        let snapshot = {
            let mut views = self.lock();
            let state = views.get_mut(view);
            Self::transition(state, update);
            tracing::trace!(%view, ?state, "ビューを更新");
            state.clone()
        };
        self.render(view, &snapshot);
    }

    fn transition(state: &mut ViewState, update: ViewUpdate) {
        match update {
            ViewUpdate::Loading => {
                state.content = ViewContent::Loading;
                state.control_enabled = false;
            }
            ViewUpdate::Settled(content) => {
                state.content = content;
                state.control_enabled = true;
            }
            ViewUpdate::Retired => {
                state.content = ViewContent::Empty;
                state.control_enabled = false;
            }
        }
    }

    /// トグル操作でビューの表示/非表示を切り替える。
    ///
    /// 表示先がないビューや、トグルが無効化されている間は何もしない。
    /// 状態が変わった場合にtrueを返す。
    pub fn set_visible(&self, view: ViewKind, visible: bool) -> bool {
        if !self.has_view(view) {
            return false;
        }
        let snapshot = {
            let mut views = self.lock();
            let state = views.get_mut(view);
            if !state.control_enabled || state.visible == visible {
                return false;
            }
            state.visible = visible;
            state.clone()
        };
        self.render(view, &snapshot);
        true
    }

    fn surface(&self, view: ViewKind) -> Option<&dyn ViewSurface> {
        match view {
            ViewKind::Bytecode => Some(self.context.bytecode.as_ref()),
            ViewKind::Source => self.context.source.as_deref(),
        }
    }

    fn render(&self, view: ViewKind, state: &ViewState) {
        if let Some(surface) = self.surface(view) {
            surface.render(view, state);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Views> {
        self.views.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for PresentationSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationSync")
            .field("views", &*self.lock())
            .finish_non_exhaustive()
    }
}
