//! # HTTP ローダー
//!
//! URL経由でROMとソース成果物を取得する。

use std::time::Duration;

use super::ResourceLoader;
use crate::error::ConfigError;

/// URL経由でリソースを取得するローダー。
///
/// ロケータは完全なURLとして扱う（例: `http://localhost:8080/roms/put_pixel.rom`）。
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: reqwest::Client,
}

impl HttpLoader {
    /// 新しいHttpLoaderを作成する。
    ///
    /// # 引数
    /// - `timeout`: 1リクエストあたりのタイムアウト
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl ResourceLoader for HttpLoader {
    async fn load(&self, locator: &str) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| format!("取得に失敗 ({locator}): {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTPエラー: ステータス {} ({locator})", status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| format!("レスポンスの読み込みに失敗 ({locator}): {e}"))?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// テスト用モックHTTPサーバーを起動し、ポート番号を返す。
    async fn start_mock_server() -> u16 {
        use axum::routing::get;

        let app = axum::Router::new()
            .route("/roms/put_pixel.rom", get(|| async { vec![0x80u8, 0x01, 0x00] }))
            .route("/roms/put_pixel.tal", get(|| async { "|0100 #01 BRK" }))
            .route("/roms/empty.rom", get(|| async { Vec::<u8>::new() }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        port
    }

    fn loader() -> HttpLoader {
        HttpLoader::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_http_load_binary() {
        let port = start_mock_server().await;
        let url = format!("http://127.0.0.1:{port}/roms/put_pixel.rom");
        assert_eq!(loader().load(&url).await.unwrap(), vec![0x80, 0x01, 0x00]);
    }

    #[tokio::test]
    async fn test_http_load_text() {
        let port = start_mock_server().await;
        let url = format!("http://127.0.0.1:{port}/roms/put_pixel.tal");
        assert_eq!(loader().load(&url).await.unwrap(), b"|0100 #01 BRK".to_vec());
    }

    /// 空のROMはそのまま返す（検証はエンジンの責務）
    #[tokio::test]
    async fn test_http_load_empty_body() {
        let port = start_mock_server().await;
        let url = format!("http://127.0.0.1:{port}/roms/empty.rom");
        assert!(loader().load(&url).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_not_found() {
        let port = start_mock_server().await;
        let url = format!("http://127.0.0.1:{port}/roms/missing.rom");
        let err = loader().load(&url).await.unwrap_err();
        assert!(err.contains("404"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_http_connection_refused() {
        // 使用済みポートを解放してから接続する
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = format!("http://127.0.0.1:{port}/roms/put_pixel.rom");
        let err = loader().load(&url).await.unwrap_err();
        assert!(err.contains("取得に失敗"));
    }
}
