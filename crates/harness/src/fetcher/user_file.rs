//! # ユーザー指定ファイル
//!
//! ファイル選択やドロップで渡されたROMを表す。中身は取得時に非同期で読み込む。

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncReadExt};

enum FileSource {
    Reader(Pin<Box<dyn AsyncRead + Send>>),
    Path(PathBuf),
}

/// ユーザーが指定したファイル。
pub struct UserFile {
    name: String,
    source: FileSource,
}

impl UserFile {
    /// メモリ上のバイト列からUserFileを作成する。
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::from_reader(name, io::Cursor::new(bytes))
    }

    /// 任意の非同期リーダーからUserFileを作成する。
    pub fn from_reader(name: impl Into<String>, reader: impl AsyncRead + Send + 'static) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Reader(Box::pin(reader)),
        }
    }

    /// ファイルパスからUserFileを作成する。ファイルは取得時に開く。
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            source: FileSource::Path(path),
        }
    }

    /// ファイル名を返す。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// ファイルの中身を全て読み込む。
    pub async fn read_all(self) -> io::Result<Vec<u8>> {
        match self.source {
            FileSource::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await?;
                Ok(buf)
            }
            FileSource::Path(path) => tokio::fs::read(path).await,
        }
    }
}

impl fmt::Debug for UserFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserFile")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
