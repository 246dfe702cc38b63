use crate::crypto::code_key_digest;
use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

const TRX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// TRX + 12 upper-case alphanumerics
pub fn new_transaction_id() -> String {
    let mut rng = rand::thread_rng();
    let mut id = String::with_capacity(15);
    id.push_str("TRX");
    for _ in 0..12 {
        id.push(TRX_ALPHABET[rng.gen_range(0..TRX_ALPHABET.len())] as char);
    }
    id
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub id_pelanggan:   String,
    pub id_server:      String,
    pub id_sv:          String,
    pub kode_produk:    String,
    pub nominal:        u64,
    pub harga:          u64,
    pub pembayaran:     String,
    pub const_trx:      String,
    pub transaction_id: String,
    pub timestamp:      i64,            // unix epoch ms
}

impl TransactionDraft {
    // pembayaran and transaction_id are deliberately outside the tag
    pub fn code_key(&self) -> String {
        let input = format!(
            "{}{}{}{}{}{}{}{}",
            self.id_pelanggan,
            self.id_server,
            self.id_sv,
            self.kode_produk,
            self.nominal,
            self.harga,
            self.const_trx,
            self.timestamp,
        );
        code_key_digest(&input)
    }

    pub fn seal(self) -> TransactionData {
        let code_key = self.code_key();
        let TransactionDraft {
            id_pelanggan,
            id_server,
            id_sv,
            kode_produk,
            nominal,
            harga,
            pembayaran,
            const_trx,
            transaction_id,
            timestamp,
        } = self;

        TransactionData {
            id_pelanggan,
            id_server,
            id_sv,
            kode_produk,
            nominal,
            harga,
            pembayaran,
            const_trx,
            code_key,
            transaction_id,
            timestamp,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    pub id_pelanggan:   String,
    pub id_server:      String,
    pub id_sv:          String,
    pub kode_produk:    String,
    pub nominal:        u64,
    pub harga:          u64,
    pub pembayaran:     String,
    pub const_trx:      String,
    pub code_key:       String,         // 16 upper-case hex, display only
    pub transaction_id: String,
    pub timestamp:      i64,
}

impl TransactionData {
    pub fn draft(&self) -> TransactionDraft {
        TransactionDraft {
            id_pelanggan:   self.id_pelanggan.clone(),
            id_server:      self.id_server.clone(),
            id_sv:          self.id_sv.clone(),
            kode_produk:    self.kode_produk.clone(),
            nominal:        self.nominal,
            harga:          self.harga,
            pembayaran:     self.pembayaran.clone(),
            const_trx:      self.const_trx.clone(),
            transaction_id: self.transaction_id.clone(),
            timestamp:      self.timestamp,
        }
    }

    pub fn tag_matches(&self) -> bool {
        self.draft().code_key() == self.code_key
    }
}

pub struct TransactionStore {
    path: PathBuf,
}

impl TransactionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // missing or unreadable reads as empty
    pub fn load(&self) -> Vec<TransactionData> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "reading transactions");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(list) => list,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "transactions file is not a JSON list");
                Vec::new()
            }
        }
    }

    fn write(&self, list: &[TransactionData]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating `{}`", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(list)?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing `{}`", self.path.display()))
    }

    pub fn save(&self, draft: TransactionDraft) -> Result<TransactionData> {
        let data = draft.seal();
        let mut list = self.load();
        list.push(data.clone());
        self.write(&list)?;
        info!(transaction_id = %data.transaction_id, code_key = %data.code_key, "transaction saved");
        Ok(data)
    }

    pub fn get(&self, transaction_id: &str) -> Option<TransactionData> {
        self.load()
            .into_iter()
            .find(|t| t.transaction_id == transaction_id)
    }

    // newest first
    pub fn list_recent(&self) -> Vec<TransactionData> {
        let mut list = self.load();
        list.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        list
    }

    // true when something was removed
    pub fn delete(&self, transaction_id: &str) -> Result<bool> {
        let list = self.load();
        let before = list.len();
        let kept: Vec<_> = list
            .into_iter()
            .filter(|t| t.transaction_id != transaction_id)
            .collect();
        if kept.len() == before {
            return Ok(false);
        }
        self.write(&kept)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing `{}`", self.path.display())),
        }
    }
}
