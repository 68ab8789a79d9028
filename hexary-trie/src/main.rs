//! # Hexary trie CLI
//!
//! Builds tries from JSON batches and prints their root digests.
//!
//! Usage:
//!   hexary-trie root <entries.json>
//!   hexary-trie apply <ops.json>
//!
//! Keys and values are hex strings, with or without a `0x` prefix:
//!   entries.json: [{"key": "646f", "value": "76657262"}]
//!   ops.json:     [{"op": "set", "key": "646f", "value": "76657262"},
//!                  {"op": "delete", "key": "646f"}]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hexary_trie::Trie;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hexary-trie")]
#[command(author, version, about = "Merkle Patricia trie root calculator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log every trie operation to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert key-value entries into an empty trie and print the root
    Root {
        /// JSON array of {"key", "value"} entries
        file: PathBuf,
    },
    /// Apply set/delete operations in order and print a JSON report
    Apply {
        /// JSON array of {"op", "key", "value"} operations
        file: PathBuf,
    },
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Entry {
    key: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Op {
    Set { key: String, value: String },
    Delete { key: String },
}

#[derive(Debug, Serialize)]
struct Step {
    op: &'static str,
    key: String,
    root: String,
}

#[derive(Debug, Serialize)]
struct Report {
    steps: Vec<Step>,
    root: String,
    content: Vec<Entry>,
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).with_context(|| format!("invalid hex string {s:?}"))
}

fn read_json<T: DeserializeOwned>(file: &Path) -> Result<T> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", file.display()))
}

fn build_root(entries: &[Entry]) -> Result<Trie> {
    let mut trie = Trie::new_temp();
    for entry in entries {
        trie.set(&decode_hex(&entry.key)?, decode_hex(&entry.value)?)?;
    }
    Ok(trie)
}

fn apply_ops(ops: Vec<Op>) -> Result<Report> {
    let mut trie = Trie::new_temp();
    let mut steps = Vec::with_capacity(ops.len());

    for op in ops {
        let (name, key, root) = match op {
            Op::Set { key, value } => {
                let root = trie.set(&decode_hex(&key)?, decode_hex(&value)?)?;
                ("set", key, root)
            }
            Op::Delete { key } => {
                let root = trie.delete(&decode_hex(&key)?)?;
                ("delete", key, root)
            }
        };
        debug!(op = name, %key, %root, "applied");
        steps.push(Step {
            op: name,
            key,
            root: root.to_string(),
        });
    }

    let content = trie
        .iter()
        .content()
        .map(|entry| {
            entry.map(|(key, value)| Entry {
                key: hex::encode(key),
                value: hex::encode(value),
            })
        })
        .collect::<hexary_trie::Result<Vec<_>>>()?;

    Ok(Report {
        steps,
        root: trie.root_digest().to_string(),
        content,
    })
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Root { file } => {
            let entries: Vec<Entry> = read_json(&file)?;
            let trie = build_root(&entries)?;
            println!("{}", trie.root_digest());
        }
        Commands::Apply { file } => {
            let ops: Vec<Op> = read_json(&file)?;
            let report = apply_ops(ops)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexary_trie::EMPTY_TRIE_HASH;

    #[test]
    fn test_decode_hex_prefix() {
        assert_eq!(decode_hex("0x646f").unwrap(), b"do".to_vec());
        assert_eq!(decode_hex("646f").unwrap(), b"do".to_vec());
        assert_eq!(decode_hex("").unwrap(), Vec::<u8>::new());
        assert!(decode_hex("0xzz").is_err());
    }

    #[test]
    fn test_build_root() {
        let entries: Vec<Entry> = serde_json::from_str(
            r#"[
                {"key": "646f", "value": "76657262"},
                {"key": "0x686f727365", "value": "7374616c6c696f6e"},
                {"key": "646f6765", "value": "636f696e"},
                {"key": "646f67", "value": "7075707079"}
            ]"#,
        )
        .unwrap();

        let trie = build_root(&entries).unwrap();
        assert_eq!(
            trie.root_digest().to_string(),
            "0x5991bb8c6514148a29db676a14ac506cd2cd5775ace63c30a4fe457715e9ac84"
        );
    }

    #[test]
    fn test_apply_ops() {
        let ops: Vec<Op> = serde_json::from_str(
            r#"[
                {"op": "set", "key": "01", "value": "aa"},
                {"op": "set", "key": "02", "value": "bb"},
                {"op": "delete", "key": "01"},
                {"op": "delete", "key": "02"}
            ]"#,
        )
        .unwrap();

        let report = apply_ops(ops).unwrap();
        assert_eq!(report.steps.len(), 4);
        assert_eq!(report.steps[2].op, "delete");
        assert_eq!(report.steps[3].root, EMPTY_TRIE_HASH.to_string());
        assert_eq!(report.root, EMPTY_TRIE_HASH.to_string());
        assert!(report.content.is_empty());
    }

    #[test]
    fn test_apply_reports_content() {
        let ops: Vec<Op> = serde_json::from_str(
            r#"[
                {"op": "set", "key": "02", "value": "bb"},
                {"op": "set", "key": "01", "value": "aa"}
            ]"#,
        )
        .unwrap();

        let report = apply_ops(ops).unwrap();
        assert_eq!(
            report.content,
            vec![
                Entry { key: "01".into(), value: "aa".into() },
                Entry { key: "02".into(), value: "bb".into() },
            ]
        );
        assert_ne!(report.steps[0].root, report.steps[1].root);
    }

    #[test]
    fn test_unknown_op_rejected() {
        let parsed: std::result::Result<Vec<Op>, _> =
            serde_json::from_str(r#"[{"op": "upsert", "key": "01"}]"#);
        assert!(parsed.is_err());
    }
}
