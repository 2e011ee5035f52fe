//! # ファイルシステム ローダー
//!
//! ローカルディレクトリからROMとソース成果物を読み込む。
//! 開発・テスト環境用。

use super::ResourceLoader;

/// ローカルファイルを読み込むローダー。
///
/// ロケータはファイルパスとして扱う（例: `roms/put_pixel.rom`）。
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl FileLoader {
    /// 新しいFileLoaderを作成する。
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ResourceLoader for FileLoader {
    async fn load(&self, locator: &str) -> Result<Vec<u8>, String> {
        let path = locator.strip_prefix("file://").unwrap_or(locator);
        tokio::fs::read(path)
            .await
            .map_err(|e| format!("ファイルの読み込みに失敗 ({path}): {e}"))
    }
}
