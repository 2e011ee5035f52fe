//! # リソースフェッチャー
//!
//! ROMバイナリと対になるソース成果物の取得を抽象化する。
//!
//! ## ローダー実装
//! - `FileLoader`: ローカルディレクトリからROMを読み込む（開発・テスト用）
//! - `HttpLoader`: URL経由でROMを取得する
//!
//! ユーザーが指定したファイル（`UserFile`）もローダーと同じ
//! `Fetcher::fetch` を経由して `FetchOutcome` に正規化される。

pub mod file;
pub mod http;
pub mod user_file;

pub use file::FileLoader;
pub use http::HttpLoader;
pub use user_file::UserFile;

use std::fmt;
use std::sync::Arc;

use coco_types::ResourceKind;

use crate::config::HarnessConfig;
use crate::error::ConfigError;

/// ロケータに対応するバイト列をロードするトレイト。
///
/// ファイルシステム、HTTP、その他のソースに対応可能。
#[async_trait::async_trait]
pub trait ResourceLoader: Send + Sync {
    /// locatorに対応するバイト列をロードする。失敗時は原因を返す。
    async fn load(&self, locator: &str) -> Result<Vec<u8>, String>;
}

/// 取得対象のリソース。
pub enum Resource {
    /// ロケータで指定されるリソース（URLまたはパス）
    Locator(String),
    /// ユーザーが指定したファイル
    File(UserFile),
}

impl Resource {
    /// ログ用の説明を返す。
    pub fn describe(&self) -> String {
        match self {
            Resource::Locator(locator) => locator.clone(),
            Resource::File(file) => format!("file:{}", file.name()),
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resource").field(&self.describe()).finish()
    }
}

/// リソース取得の結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// バイナリリソースの生バイト列
    Bytes(Vec<u8>),
    /// ソース成果物のテキスト
    Text(String),
    /// 取得・読み込みの失敗
    Failed(String),
}

/// リソースフェッチャー。
///
/// 失敗はログに記録した上で `FetchOutcome::Failed` として返し、呼び出し元に
/// パニックを伝播させない。表示状態には触れない。
#[derive(Clone)]
pub struct Fetcher {
    loader: Arc<dyn ResourceLoader>,
}

impl Fetcher {
    /// 新しいFetcherを作成する。
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        Self { loader }
    }

    /// 設定のROMベースに応じたローダーでFetcherを作成する。
    ///
    /// ベースがHTTP(S)のURLなら `HttpLoader`、それ以外は `FileLoader` を使用する。
    pub fn for_config(config: &HarnessConfig) -> Result<Self, ConfigError> {
        let loader: Arc<dyn ResourceLoader> = if config.locators().is_remote() {
            Arc::new(HttpLoader::new(config.http_timeout)?)
        } else {
            Arc::new(FileLoader::new())
        };
        Ok(Self::new(loader))
    }

    /// リソースを取得し、種別に応じて `Bytes` または `Text` を返す。
    pub async fn fetch(&self, resource: Resource, kind: ResourceKind) -> FetchOutcome {
        let origin = resource.describe();
        let loaded = match resource {
            Resource::Locator(locator) => self.loader.load(&locator).await,
            Resource::File(file) => file
                .read_all()
                .await
                .map_err(|e| format!("ファイルの読み込みに失敗 ({origin}): {e}")),
        };

        let outcome = match loaded {
            Ok(bytes) => decode(bytes, kind),
            Err(cause) => FetchOutcome::Failed(cause),
        };

        if let FetchOutcome::Failed(cause) = &outcome {
            tracing::warn!(resource = %origin, ?kind, %cause, "リソースの取得に失敗");
        }
        outcome
    }
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher").finish_non_exhaustive()
    }
}

fn decode(bytes: Vec<u8>, kind: ResourceKind) -> FetchOutcome {
    match kind {
        ResourceKind::Binary => FetchOutcome::Bytes(bytes),
        ResourceKind::Text => match String::from_utf8(bytes) {
            Ok(text) => FetchOutcome::Text(text),
            Err(e) => FetchOutcome::Failed(format!("ソースがUTF-8ではありません: {e}")),
        },
    }
}
