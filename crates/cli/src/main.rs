//! # COCO Harness CLI
//!
//! ハーネスを端末に接続するエントリポイント。
//!
//! ## 起動シーケンス
//! 1. 環境変数から設定を読み込み、コマンドライン引数で上書きする
//! 2. 実行エンジン（外部コマンド、または何も実行しないNullEngine）を選択する
//! 3. 既定ROM（または `--file`）のロードを開始する
//! 4. 対話モードでは標準入力のコマンドを処理し、それ以外はロード完了を待って終了する

mod interactive;
mod terminal;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use coco_engine::{CommandEngine, EngineAdapter, ExecutionEngine, NullEngine};
use coco_harness::presentation::{PresentationContext, PresentationSync, ViewSurface};
use coco_harness::{
    Fetcher, HarnessConfig, HarnessContext, LoadCoordinator, SourceMode, TracingDiagnosticSink,
    UserFile,
};
use coco_types::RomId;
use tracing_subscriber::EnvFilter;

use crate::terminal::{OutputFormat, TerminalSurface};

/// `--file` で標準入力を表すパス。
const STDIN_PATH: &str = "-";

#[derive(Parser, Debug)]
#[command(name = "coco-cli", version, about = "Load a COCO ROM, run it and show its bytecode")]
struct Args {
    /// ROMのベースURLまたはディレクトリ（COCO_ROM_BASEを上書き）
    #[arg(long, value_name = "URL|DIR")]
    base: Option<String>,

    /// 起動時にロードするROM（COCO_DEFAULT_ROMを上書き）
    #[arg(long, value_name = "ROM")]
    rom: Option<String>,

    /// ロケータを使わずローカルファイルをロードする（`-` で標準入力）
    #[arg(long, value_name = "PATH", conflicts_with = "rom")]
    file: Option<PathBuf>,

    /// ROMを標準入力で受け取る実行エンジンのコマンド
    #[arg(long, value_name = "PROGRAM")]
    engine: Option<String>,

    /// 実行エンジンに渡す引数（複数指定可）
    #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// 実行エンジン1回の制限秒数（COCO_ENGINE_TIMEOUT_SECSを上書き）
    #[arg(long, value_name = "SECS")]
    engine_timeout: Option<u64>,

    /// 対になるソースを取得・表示しない
    #[arg(long, default_value_t = false)]
    no_source: bool,

    /// 標準入力からコマンドを受け付ける
    #[arg(long, default_value_t = false)]
    interactive: bool,

    /// ビュー更新をJSON Linesで出力する
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 標準出力はビュー更新に使うため、ログは標準エラーへ
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = HarnessConfig::from_env()?;
    if let Some(base) = args.base {
        config.rom_base = base;
    }
    if let Some(rom) = args.rom {
        config.default_rom = RomId::new(rom);
    }
    if args.no_source {
        config.source_mode = SourceMode::None;
    }
    if let Some(secs) = args.engine_timeout {
        config.engine_timeout = Duration::from_secs(secs);
    }
    if args.interactive && args.file.as_deref() == Some(Path::new(STDIN_PATH)) {
        anyhow::bail!("--interactive では標準入力からROMを読み込めません");
    }

    let engine: Arc<dyn ExecutionEngine> = match args.engine {
        Some(program) => {
            tracing::info!(%program, args = ?args.engine_args, "外部コマンドの実行エンジンを使用します");
            Arc::new(
                CommandEngine::new(program, args.engine_args).with_timeout(config.engine_timeout),
            )
        }
        None => {
            tracing::info!("実行エンジンが指定されていないため、ROMは実行しません");
            Arc::new(NullEngine)
        }
    };

    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let surface: Arc<dyn ViewSurface> = Arc::new(TerminalSurface::new(std::io::stdout(), format));
    let presentation = Arc::new(PresentationSync::new(
        PresentationContext {
            bytecode: surface.clone(),
            source: match config.source_mode {
                SourceMode::Paired => Some(surface),
                SourceMode::None => None,
            },
        },
        config.initial_visibility(),
    ));

    tracing::info!(
        base = %config.rom_base,
        source_mode = ?config.source_mode,
        engine_reset = ?config.engine_reset,
        "ハーネスを起動します"
    );

    let coordinator = LoadCoordinator::new(HarnessContext {
        fetcher: Fetcher::for_config(&config)?,
        engine: EngineAdapter::new(engine, config.engine_reset),
        presentation,
        locators: config.locators(),
        source_mode: config.source_mode,
        diagnostics: Arc::new(TracingDiagnosticSink),
    });

    let initial = match args.file {
        Some(path) => coordinator.load_file(user_file(path)),
        None => coordinator.load(config.default_rom.clone()),
    };

    if args.interactive {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        interactive::run(&coordinator, stdin, &mut std::io::stderr()).await?;
    }
    initial.settled().await;

    Ok(())
}

fn user_file(path: PathBuf) -> UserFile {
    if path.as_os_str() == STDIN_PATH {
        UserFile::from_reader(STDIN_PATH, tokio::io::stdin())
    } else {
        UserFile::from_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_args_parse_engine_options() {
        let args = Args::try_parse_from([
            "coco-cli",
            "--engine",
            "uxncli",
            "--engine-arg",
            "-v",
            "--engine-timeout",
            "3",
            "--file",
            "-",
        ])
        .unwrap();
        assert_eq!(args.engine.as_deref(), Some("uxncli"));
        assert_eq!(args.engine_args, vec!["-v".to_string()]);
        assert_eq!(args.engine_timeout, Some(3));
        assert_eq!(user_file(args.file.unwrap()).name(), STDIN_PATH);
    }

    #[test]
    fn test_file_conflicts_with_rom() {
        assert!(Args::try_parse_from(["coco-cli", "--rom", "a", "--file", "a.rom"]).is_err());
    }

    #[test]
    fn test_user_file_from_path_keeps_file_name() {
        assert_eq!(user_file(PathBuf::from("roms/fill.rom")).name(), "fill.rom");
    }
}
