//! # ハーネス設定
//!
//! 環境変数からの設定読み込みと、ROM識別子からリソースロケータを組み立てる規則。
//!
//! ## 環境変数
//! - `COCO_ROM_BASE`: ROMのベースURLまたはローカルディレクトリ（既定: `roms`）
//! - `COCO_DEFAULT_ROM`: 起動時にロードするROM（既定: `put_pixel`）
//! - `COCO_SOURCE_MODE`: `paired` | `none`（既定: `paired`）
//! - `COCO_ENGINE_RESET`: `each-run` | `never`（既定: `each-run`）
//! - `COCO_SHOW_BYTECODE` / `COCO_SHOW_SOURCE`: トグルの初期状態
//! - `COCO_HTTP_TIMEOUT_SECS`: HTTP取得のタイムアウト秒数（既定: 30）
//! - `COCO_ENGINE_TIMEOUT_SECS`: 外部エンジン1回の実行制限秒数（既定: 10）

use std::time::Duration;

use coco_engine::EngineReset;
use coco_types::{RomId, ROM_EXTENSION, SOURCE_EXTENSION};

use crate::error::ConfigError;
use crate::presentation::InitialVisibility;

/// 既定のROMベース。
pub const DEFAULT_ROM_BASE: &str = "roms";

/// 起動時にロードする既定のROM。
pub const DEFAULT_ROM: &str = "put_pixel";

/// 対になるソース成果物を表示するかどうか。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceMode {
    /// ROMごとに `.tal` ソースを取得して表示する
    #[default]
    Paired,
    /// ソースを表示しない
    None,
}

/// ROM識別子からリソースロケータを組み立てる規則。
///
/// ロケータ形式: `{base}/{rom}.rom`, `{base}/{rom}.tal`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorScheme {
    base: String,
    rom_extension: String,
    source_extension: String,
}

impl LocatorScheme {
    /// 新しいLocatorSchemeを作成する。
    ///
    /// # 引数
    /// - `base`: ベースURL（例: "http://localhost:8080/roms"）またはディレクトリ
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            rom_extension: ROM_EXTENSION.to_string(),
            source_extension: SOURCE_EXTENSION.to_string(),
        }
    }

    /// 拡張子を変更する。
    pub fn with_extensions(mut self, rom: &str, source: &str) -> Self {
        self.rom_extension = rom.trim_start_matches('.').to_string();
        self.source_extension = source.trim_start_matches('.').to_string();
        self
    }

    /// ベースがHTTP(S)のURLかどうか。
    pub fn is_remote(&self) -> bool {
        self.base.starts_with("http://") || self.base.starts_with("https://")
    }

    /// ROMバイナリのロケータを返す。
    pub fn rom(&self, rom: &RomId) -> String {
        self.join(rom, &self.rom_extension)
    }

    /// 対になるソース成果物のロケータを返す。
    pub fn source(&self, rom: &RomId) -> String {
        self.join(rom, &self.source_extension)
    }

    fn join(&self, rom: &RomId, extension: &str) -> String {
        let base = self.base.trim_end_matches('/');
        if base.is_empty() {
            format!("{rom}.{extension}")
        } else {
            format!("{base}/{rom}.{extension}")
        }
    }
}

/// ハーネスの設定。
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// ROMのベースURLまたはディレクトリ
    pub rom_base: String,
    /// 起動時にロードするROM
    pub default_rom: RomId,
    /// ソース表示モード
    pub source_mode: SourceMode,
    /// 実行ごとのエンジンリセット方針
    pub engine_reset: EngineReset,
    /// bytecodeトグルの初期状態
    pub show_bytecode: bool,
    /// sourceトグルの初期状態
    pub show_source: bool,
    /// HTTP取得のタイムアウト
    pub http_timeout: Duration,
    /// 外部エンジンの実行制限時間
    pub engine_timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            rom_base: DEFAULT_ROM_BASE.to_string(),
            default_rom: RomId::new(DEFAULT_ROM),
            source_mode: SourceMode::Paired,
            engine_reset: EngineReset::BeforeEachRun,
            show_bytecode: true,
            show_source: false,
            http_timeout: Duration::from_secs(30),
            engine_timeout: coco_engine::command::DEFAULT_TIMEOUT,
        }
    }
}

impl HarnessConfig {
    /// 環境変数から構築する。未設定の項目は既定値を使用する。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から構築する。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base) = lookup("COCO_ROM_BASE") {
            config.rom_base = base;
        }
        if let Some(rom) = lookup("COCO_DEFAULT_ROM") {
            config.default_rom = RomId::new(rom);
        }
        if let Some(mode) = lookup("COCO_SOURCE_MODE") {
            config.source_mode = parse_source_mode(&mode).ok_or(ConfigError::InvalidValue {
                name: "COCO_SOURCE_MODE",
                value: mode,
            })?;
        }
        if let Some(reset) = lookup("COCO_ENGINE_RESET") {
            config.engine_reset = parse_engine_reset(&reset).ok_or(ConfigError::InvalidValue {
                name: "COCO_ENGINE_RESET",
                value: reset,
            })?;
        }
        if let Some(value) = lookup("COCO_SHOW_BYTECODE") {
            config.show_bytecode = parse_bool("COCO_SHOW_BYTECODE", value)?;
        }
        if let Some(value) = lookup("COCO_SHOW_SOURCE") {
            config.show_source = parse_bool("COCO_SHOW_SOURCE", value)?;
        }
        if let Some(value) = lookup("COCO_HTTP_TIMEOUT_SECS") {
            config.http_timeout = parse_secs("COCO_HTTP_TIMEOUT_SECS", value)?;
        }
        if let Some(value) = lookup("COCO_ENGINE_TIMEOUT_SECS") {
            config.engine_timeout = parse_secs("COCO_ENGINE_TIMEOUT_SECS", value)?;
        }

        Ok(config)
    }

    /// ロケータ規則を返す。
    pub fn locators(&self) -> LocatorScheme {
        LocatorScheme::new(self.rom_base.clone())
    }

    /// トグルの初期状態を返す。
    pub fn initial_visibility(&self) -> InitialVisibility {
        InitialVisibility {
            bytecode: self.show_bytecode,
            source: self.show_source,
        }
    }
}

/// ソース表示モードを解釈する。
pub fn parse_source_mode(value: &str) -> Option<SourceMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "paired" => Some(SourceMode::Paired),
        "none" | "off" => Some(SourceMode::None),
        _ => None,
    }
}

/// エンジンリセット方針を解釈する。
pub fn parse_engine_reset(value: &str) -> Option<EngineReset> {
    match value.trim().to_ascii_lowercase().as_str() {
        "each-run" | "each_run" => Some(EngineReset::BeforeEachRun),
        "never" => Some(EngineReset::Never),
        _ => None,
    }
}

fn parse_secs(name: &'static str, value: String) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(ConfigError::InvalidValue { name, value }),
    }
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { name, value }),
    }
}
