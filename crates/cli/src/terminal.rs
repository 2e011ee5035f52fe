//! 端末へビュー更新を書き出すUI面。

use std::io::Write;
use std::sync::Mutex;

use coco_harness::ViewSurface;
use coco_types::{ViewKind, ViewState};
use serde::Serialize;

/// 出力形式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// 人が読むテキスト
    Text,
    /// 1更新1行のJSON
    Json,
}

#[derive(Serialize)]
struct RenderLine<'a> {
    view: ViewKind,
    #[serde(flatten)]
    state: &'a ViewState,
}

/// ビューの状態が変わるたびに書き出すUI面。
pub struct TerminalSurface<W> {
    out: Mutex<W>,
    format: OutputFormat,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out: Mutex::new(out),
            format,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self, view: ViewKind, state: &ViewState) -> std::io::Result<()> {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match self.format {
            OutputFormat::Json => {
                let line = serde_json::to_string(&RenderLine { view, state })?;
                writeln!(out, "{line}")?;
            }
            OutputFormat::Text => {
                let lock = if state.control_enabled { "" } else { " (locked)" };
                if state.visible {
                    writeln!(out, "[{view}]{lock}")?;
                    let text = state.content.text();
                    if !text.is_empty() {
                        writeln!(out, "{text}")?;
                    }
                } else {
                    writeln!(out, "[{view}] (hidden){lock}")?;
                }
            }
        }
        out.flush()
    }
}

impl<W: Write + Send> ViewSurface for TerminalSurface<W> {
    fn render(&self, view: ViewKind, state: &ViewState) {
        if let Err(e) = self.write(view, state) {
            tracing::warn!(%view, error = %e, "ビューの書き出しに失敗");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coco_types::{FailureKind, ViewContent};

    fn rendered(format: OutputFormat, view: ViewKind, state: &ViewState) -> String {
        let surface = TerminalSurface::new(Vec::new(), format);
        surface.render(view, state);
        String::from_utf8(surface.into_inner()).unwrap()
    }

    #[test]
    fn test_text_shows_visible_content() {
        let state = ViewState {
            content: ViewContent::Ready {
                text: "80 01 00".into(),
            },
            visible: true,
            control_enabled: true,
        };
        assert_eq!(
            rendered(OutputFormat::Text, ViewKind::Bytecode, &state),
            "[bytecode]\n80 01 00\n"
        );
    }

    #[test]
    fn test_text_hides_content_when_hidden() {
        let state = ViewState {
            content: ViewContent::Loading,
            visible: false,
            control_enabled: false,
        };
        assert_eq!(
            rendered(OutputFormat::Text, ViewKind::Source, &state),
            "[source] (hidden) (locked)\n"
        );
    }

    #[test]
    fn test_json_line_flattens_state() {
        let state = ViewState {
            content: ViewContent::Failed {
                kind: FailureKind::Transport,
                cause: "HTTPエラー: ステータス 404".into(),
            },
            visible: true,
            control_enabled: true,
        };
        let out = rendered(OutputFormat::Json, ViewKind::Bytecode, &state);
        assert_eq!(out.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["view"], "bytecode");
        assert_eq!(value["visible"], true);
        assert_eq!(value["content"]["state"], "failed");
        assert_eq!(value["content"]["kind"], "transport");
    }
}
