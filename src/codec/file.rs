use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;

use super::RecordCodec;

/// Decodes every non-blank line of `path`.
///
/// The first malformed record aborts the read; the error names the file, the
/// line number and the offending record.
pub fn read_records<C: RecordCodec>(
    path: &Path,
    codec: &C,
) -> anyhow::Result<Vec<(C::Key, C::Value)>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = codec
            .decode(&line)
            .with_context(|| format!("{}:{}: malformed record {line:?}", path.display(), idx + 1))?;
        records.push(record);
    }
    tracing::debug!(path = %path.display(), records = records.len(), "read records");
    Ok(records)
}

pub fn write_records<C: RecordCodec>(
    path: &Path,
    codec: &C,
    records: &[(C::Key, C::Value)],
) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_records_to(&mut out, codec, records)
        .with_context(|| format!("write {}", path.display()))?;
    out.flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

pub fn write_records_to<C: RecordCodec, W: Write>(
    out: &mut W,
    codec: &C,
    records: &[(C::Key, C::Value)],
) -> std::io::Result<()> {
    for (key, value) in records {
        writeln!(out, "{}", codec.encode(key, value))?;
    }
    Ok(())
}
