// src/db/collection_store.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tokio::time::Instant;

use crate::common::{error::AppError, fs_utils::atomic_write};

/// Um registro persistido dentro de uma coleção nomeada.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Nome da coleção (também o nome do arquivo `<COLLECTION>.json`).
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

// Os guards só existem para serem segurados até o fim da mutação.
#[allow(dead_code)]
enum CollectionGuard {
    Read(OwnedRwLockReadGuard<()>),
    Write(OwnedRwLockWriteGuard<()>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Read,
    Write,
}

// ---
// Store
// ---
/// Armazenamento de coleções em arquivos JSON, um por coleção.
///
/// Toda escrita passa por [`CollectionStore::mutate`] ou
/// [`CollectionStore::transact`]: lock exclusivo por coleção, leitura do
/// estado atual, mutação em memória, persistência atômica, liberação.
/// Leituras pegam o lock compartilhado e nunca veem uma mutação pela metade.
pub struct CollectionStore {
    root: PathBuf,
    locks: DashMap<&'static str, Arc<RwLock<()>>>,
    lock_timeout: Duration,
}

impl CollectionStore {
    pub fn new(root: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            locks: DashMap::new(),
            lock_timeout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{}.json", collection))
    }

    fn lock_for(&self, collection: &'static str) -> Arc<RwLock<()>> {
        self.locks
            .entry(collection)
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Adquire os locks sempre na mesma ordem (por nome) para que duas
    /// operações multi-coleção nunca entrem em deadlock.
    /// O prazo vale para o conjunto inteiro, não para cada lock.
    async fn acquire(
        &self,
        writes: &[&'static str],
        reads: &[&'static str],
    ) -> Result<Vec<CollectionGuard>, AppError> {
        let mut wanted: Vec<(&'static str, LockMode)> = Vec::new();
        for &name in writes {
            wanted.push((name, LockMode::Write));
        }
        for &name in reads {
            if !writes.contains(&name) {
                wanted.push((name, LockMode::Read));
            }
        }
        wanted.sort_by(|a, b| a.0.cmp(b.0));
        wanted.dedup_by(|a, b| a.0 == b.0);

        let deadline = Instant::now() + self.lock_timeout;
        let mut guards = Vec::with_capacity(wanted.len());

        for (name, mode) in wanted {
            let lock = self.lock_for(name);
            let guard = match mode {
                LockMode::Write => tokio::time::timeout_at(deadline, lock.write_owned())
                    .await
                    .map(CollectionGuard::Write),
                LockMode::Read => tokio::time::timeout_at(deadline, lock.read_owned())
                    .await
                    .map(CollectionGuard::Read),
            };
            match guard {
                Ok(g) => guards.push(g),
                Err(_) => {
                    tracing::warn!(collection = name, "Timeout aguardando lock da coleção");
                    return Err(AppError::StoreBusy(name.to_string()));
                }
            }
        }
        Ok(guards)
    }

    /// Estado persistido atual da coleção. Se o arquivo ainda não existe,
    /// ele é criado vazio (bootstrap idempotente).
    pub async fn load<T: Document>(&self) -> Result<Vec<T>, AppError> {
        let guards = self.acquire(&[], &[T::COLLECTION]).await?;
        let path = self.path_for(T::COLLECTION);

        tokio::task::spawn_blocking(move || {
            let _guards = guards;
            read_collection::<T>(T::COLLECTION, &path)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de leitura: {}", e))?
    }

    pub async fn find<T: Document>(&self, id: &str) -> Result<Option<T>, AppError> {
        Ok(self.load::<T>().await?.into_iter().find(|d| d.id() == id))
    }

    /// Único caminho sancionado para alterar uma coleção.
    ///
    /// `f` recebe o estado atual; se retornar `Err`, nada é persistido.
    pub async fn mutate<T, R, F>(&self, f: F) -> Result<R, AppError>
    where
        T: Document,
        R: Send + 'static,
        F: FnOnce(&mut Vec<T>) -> Result<R, AppError> + Send + 'static,
    {
        self.transact(&[T::COLLECTION], &[], move |tx| {
            let mut docs = tx.load::<T>()?;
            let out = f(&mut docs)?;
            tx.stage(&docs)?;
            Ok(out)
        })
        .await
    }

    /// Mutação envolvendo várias coleções: `writes` ficam sob lock exclusivo,
    /// `reads` sob lock compartilhado, todas durante o ciclo inteiro.
    ///
    /// O ciclo roda numa task bloqueante dona dos guards: se quem chamou for
    /// cancelado, a gravação em andamento termina (ou aborta) por inteiro.
    pub async fn transact<R, F>(
        &self,
        writes: &[&'static str],
        reads: &[&'static str],
        f: F,
    ) -> Result<R, AppError>
    where
        R: Send + 'static,
        F: FnOnce(&mut StoreTx) -> Result<R, AppError> + Send + 'static,
    {
        let guards = self.acquire(writes, reads).await?;

        let mut readable: Vec<&'static str> = writes.to_vec();
        readable.extend_from_slice(reads);
        let mut tx = StoreTx {
            root: self.root.clone(),
            writable: writes.to_vec(),
            readable,
            staged: Vec::new(),
        };

        tokio::task::spawn_blocking(move || {
            let _guards = guards;
            let out = f(&mut tx)?;
            tx.commit()?;
            Ok(out)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de mutação: {}", e))?
    }
}

// ---
// Transação local (visão das coleções travadas)
// ---
struct Staged {
    collection: &'static str,
    bytes: Vec<u8>,
    required: bool,
}

/// Visão das coleções travadas por [`CollectionStore::transact`].
pub struct StoreTx {
    root: PathBuf,
    writable: Vec<&'static str>,
    readable: Vec<&'static str>,
    staged: Vec<Staged>,
}

impl StoreTx {
    /// Lê o estado persistido (não inclui o que já foi preparado nesta transação).
    pub fn load<T: Document>(&self) -> Result<Vec<T>, AppError> {
        if !self.readable.contains(&T::COLLECTION) {
            return Err(anyhow::anyhow!(
                "Coleção '{}' lida sem lock na transação",
                T::COLLECTION
            )
            .into());
        }
        let path = self.root.join(format!("{}.json", T::COLLECTION));
        read_collection::<T>(T::COLLECTION, &path)
    }

    /// Prepara o novo conteúdo da coleção; só é gravado se a transação terminar bem.
    pub fn stage<T: Document>(&mut self, docs: &[T]) -> Result<(), AppError> {
        self.push_stage(docs, true)
    }

    /// Como [`StoreTx::stage`], mas uma falha ao gravar apenas gera log.
    pub fn stage_best_effort<T: Document>(&mut self, docs: &[T]) -> Result<(), AppError> {
        self.push_stage(docs, false)
    }

    fn push_stage<T: Document>(&mut self, docs: &[T], required: bool) -> Result<(), AppError> {
        if !self.writable.contains(&T::COLLECTION) {
            return Err(anyhow::anyhow!(
                "Coleção '{}' alterada sem lock exclusivo",
                T::COLLECTION
            )
            .into());
        }
        let bytes = serde_json::to_vec_pretty(docs)
            .map_err(|e| anyhow::anyhow!("Falha ao serializar '{}': {}", T::COLLECTION, e))?;

        self.staged.retain(|s| s.collection != T::COLLECTION);
        self.staged.push(Staged {
            collection: T::COLLECTION,
            bytes,
            required,
        });
        Ok(())
    }

    // Grava na ordem em que as coleções foram preparadas.
    fn commit(self) -> Result<(), AppError> {
        for staged in self.staged {
            let path = self.root.join(format!("{}.json", staged.collection));
            match atomic_write(&path, &staged.bytes) {
                Ok(()) => {
                    tracing::debug!(collection = staged.collection, bytes = staged.bytes.len(), "Coleção gravada");
                }
                Err(e) if !staged.required => {
                    tracing::warn!(collection = staged.collection, error = %e, "Gravação opcional falhou");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

// Arquivo ausente = coleção nova (cria `[]`); qualquer outra falha é propagada.
// Nunca devolvemos vazio quando não conseguimos ler o que existe.
fn read_collection<T: DeserializeOwned>(collection: &str, path: &Path) -> Result<Vec<T>, AppError> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!(collection, error = %e, "Coleção corrompida");
            AppError::StorageCorruption {
                collection: collection.to_string(),
                detail: e.to_string(),
            }
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            atomic_write(path, b"[]")?;
            tracing::info!(collection, "Coleção inicializada");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}
