use crate::{
    catalog::format_price,
    config::HistoryConfig,
    storage::{new_transaction_id, TransactionData, TransactionDraft, TransactionStore},
};
use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use std::{
    io::{stdout, Write},
    path::{Path, PathBuf},
};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "available: list, show <id>, add <idPelanggan> <idServer> <idSv> <kodeProduk> <nominal> <harga> <pembayaran> <constTrx>, verify, delete <id>, clear, exit";

fn store_path(cfg: &HistoryConfig) -> PathBuf {
    let p = Path::new(&cfg.store_path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(p)
    }
}

pub async fn run(cfg: HistoryConfig) -> Result<()> {
    let store = TransactionStore::new(store_path(&cfg));
    println!("[History] using {}", store.path().display());
    println!("[History] {} transaction(s) on file; {}", store.load().len(), HELP);

    let mut reader = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        stdout().flush().ok();

        let line = match reader.next_line().await? {
            Some(l) => l,
            None => break, // EOF
        };
        if !execute(&store, &line)? {
            break;
        }
    }

    Ok(())
}

// false once the user asks to leave; store failures are reported and the prompt stays up
fn execute(store: &TransactionStore, line: &str) -> Result<bool> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else { return Ok(true) };
    let args: Vec<&str> = words.collect();

    match (cmd, args.as_slice()) {
        ("exit" | "quit", _) => {
            println!("bye!");
            return Ok(false);
        }

        ("list", _) => {
            let list = store.list_recent();
            if list.is_empty() {
                println!("[History] no transactions yet");
            }
            for t in &list {
                println!("{}", summary(t));
            }
        }

        ("show", [id]) => match store.get(id) {
            Some(t) => println!("{}", serde_json::to_string_pretty(&t)?),
            None    => println!("[History] `{}` not found", id),
        },

        ("add", [id_pelanggan, id_server, id_sv, kode_produk, nominal, harga, pembayaran, const_trx]) => {
            let draft = match parse_draft(
                id_pelanggan, id_server, id_sv, kode_produk, nominal, harga, pembayaran, const_trx,
            ) {
                Ok(d) => d,
                Err(e) => {
                    eprintln!("[History] {:#}", e);
                    return Ok(true);
                }
            };
            match store.save(draft) {
                Ok(t)  => println!("[History] saved {} (code {})", t.transaction_id, t.code_key),
                Err(e) => eprintln!("[History] save failed: {:?}", e),
            }
        }

        ("verify", _) => {
            let list = store.list_recent();
            let bad: Vec<_> = list.iter().filter(|t| !t.tag_matches()).collect();
            for t in &bad {
                println!("[History] {} was edited after it was saved", t.transaction_id);
            }
            println!("[History] {} checked, {} mismatched", list.len(), bad.len());
        }

        ("delete", [id]) => match store.delete(id) {
            Ok(true)  => println!("[History] deleted {}", id),
            Ok(false) => println!("[History] `{}` not found", id),
            Err(e)    => eprintln!("[History] delete failed: {:?}", e),
        },

        ("clear", _) => match store.clear() {
            Ok(()) => println!("[History] cleared `{}`", store.path().display()),
            Err(e) => eprintln!("[History] clear failed: {:?}", e),
        },

        (other, _) => {
            println!("unknown command or arguments `{}`; {}", other, HELP);
        }
    }

    Ok(true)
}

#[allow(clippy::too_many_arguments)]
fn parse_draft(
    id_pelanggan: &str,
    id_server: &str,
    id_sv: &str,
    kode_produk: &str,
    nominal: &str,
    harga: &str,
    pembayaran: &str,
    const_trx: &str,
) -> Result<TransactionDraft> {
    let nominal: u64 = nominal
        .parse()
        .with_context(|| format!("nominal `{}` is not a whole number", nominal))?;
    let harga: u64 = harga
        .parse()
        .with_context(|| format!("harga `{}` is not a whole number", harga))?;
    if id_pelanggan.is_empty() || kode_produk.is_empty() {
        bail!("idPelanggan and kodeProduk are required");
    }

    Ok(TransactionDraft {
        id_pelanggan:   id_pelanggan.into(),
        id_server:      id_server.into(),
        id_sv:          id_sv.into(),
        kode_produk:    kode_produk.into(),
        nominal,
        harga,
        pembayaran:     pembayaran.into(),
        const_trx:      const_trx.into(),
        transaction_id: new_transaction_id(),
        timestamp:      Utc::now().timestamp_millis(),
    })
}

fn summary(t: &TransactionData) -> String {
    let when = Utc
        .timestamp_millis_opt(t.timestamp)
        .single()
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| t.timestamp.to_string());
    format!(
        "{}  {}  {} x{}  Rp {}  {}  [{}]",
        t.transaction_id,
        when,
        t.kode_produk,
        t.nominal,
        format_price(t.harga),
        t.pembayaran,
        t.code_key,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_draft_checks_numbers() {
        let d = parse_draft("12345678", "2001", "SV01", "ML56", "56", "15000", "qris", "CT1").unwrap();
        assert_eq!(d.harga, 15000);
        assert!(d.transaction_id.starts_with("TRX"));
        assert!(parse_draft("12345678", "2001", "SV01", "ML56", "lots", "15000", "qris", "CT1").is_err());
        assert!(parse_draft("", "2001", "SV01", "ML56", "56", "15000", "qris", "CT1").is_err());
    }

    #[test]
    fn summary_line() {
        let mut d = parse_draft("12345678", "2001", "SV01", "ML56", "56", "1500000", "QRIS", "CT1").unwrap();
        d.timestamp = 1_700_000_000_000;
        let line = summary(&d.seal());
        assert!(line.contains("2023-11-14 22:13"));
        assert!(line.contains("Rp 1.500.000"));
    }

    #[test]
    fn store_failures_keep_the_session_alive() {
        // a directory where the history file should be: remove_file fails, reads come back empty
        let dir = std::env::temp_dir().join(format!("history-dir-{}", new_transaction_id()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = TransactionStore::new(dir.clone());

        assert!(execute(&store, "clear").unwrap());
        assert!(execute(&store, "add 12345678 2001 SV01 ML56 56 15000 qris CT1").unwrap());
        assert!(execute(&store, "delete TRXNOPE").unwrap());
        assert!(execute(&store, "list").unwrap());
        assert!(execute(&store, "   ").unwrap());
        assert!(!execute(&store, "exit").unwrap());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
