use std::{
  collections::HashMap,
  fs, io,
  path::{Path, PathBuf},
  sync::Mutex,
};

/// キーと文字列値を保存する小さなストア（ブラウザの localStorage 相当）
pub trait QuotaStore: Send + Sync {
  fn read(&self, key: &str) -> io::Result<Option<String>>;
  fn write(&self, key: &str, value: &str) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryQuotaStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryQuotaStore {
  pub fn new() -> Self {
    Self::default()
  }
}

fn poisoned() -> io::Error {
  io::Error::other("quota store lock poisoned")
}

impl QuotaStore for MemoryQuotaStore {
  fn read(&self, key: &str) -> io::Result<Option<String>> {
    let entries = self.entries.lock().map_err(|_| poisoned())?;
    Ok(entries.get(key).cloned())
  }

  fn write(&self, key: &str, value: &str) -> io::Result<()> {
    let mut entries = self.entries.lock().map_err(|_| poisoned())?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// `{dir}/{key}.json` に値を1ファイルずつ保存する
#[derive(Debug, Clone)]
pub struct FileQuotaStore {
  dir: PathBuf,
}

impl FileQuotaStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn path_for(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{}.json", key))
  }
}

impl QuotaStore for FileQuotaStore {
  fn read(&self, key: &str) -> io::Result<Option<String>> {
    match fs::read_to_string(self.path_for(key)) {
      Ok(contents) => Ok(Some(contents)),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e),
    }
  }

  fn write(&self, key: &str, value: &str) -> io::Result<()> {
    fs::create_dir_all(&self.dir)?;
    fs::write(self.path_for(key), value)
  }
}
