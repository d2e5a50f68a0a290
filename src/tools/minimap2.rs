use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::core::record::{CanonicalRecord, Edit};
use crate::pipeline::extract::{AlignedRow, Aligner};
use crate::CaduceusError;

/// minimap2 integration: per-batch pairwise alignment against the
/// reference, parsed from PAF output with `cs` difference strings.
pub struct Minimap2Aligner {
    binary: PathBuf,
    reference: PathBuf,
    threads: usize,
    temp_dir: PathBuf,
}

fn cs_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(:[0-9]+|\*[a-z]{2}|[=\+\-][A-Za-z]+)").expect("valid cs token pattern")
    })
}

impl Minimap2Aligner {
    /// Create an aligner instance, verifying up front that the binary can
    /// be executed. A missing aligner is fatal for the run, so it is
    /// reported before any sequence is read.
    pub fn new<B, R>(binary: B, reference: R, threads: usize) -> crate::Result<Self>
    where
        B: Into<PathBuf>,
        R: Into<PathBuf>,
    {
        let binary = binary.into();
        let reference = reference.into();

        let probe = Command::new(&binary)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| {
                CaduceusError::Alignment(format!(
                    "minimap2 binary '{}' could not be executed: {}",
                    binary.display(),
                    e
                ))
            })?;
        if !probe.status.success() {
            return Err(CaduceusError::Alignment(format!(
                "minimap2 binary '{}' exited with {:?} on --version",
                binary.display(),
                probe.status.code()
            )));
        }
        debug!(
            version = %String::from_utf8_lossy(&probe.stdout).trim(),
            "minimap2 preflight ok"
        );

        let threads = if threads == 0 {
            num_cpus::get()
        } else {
            threads
        };

        let temp_dir = std::env::temp_dir().join(format!("caduceus-mm2-{}", std::process::id()));
        fs::create_dir_all(&temp_dir)?;

        Ok(Self {
            binary,
            reference,
            threads,
            temp_dir,
        })
    }

    /// Write one batch as FASTA with positional query names so output rows
    /// can be joined back to batch members regardless of header content.
    fn write_batch(&self, batch: &[CanonicalRecord]) -> crate::Result<PathBuf> {
        let path = self.temp_dir.join("batch.fa");
        let mut writer = BufWriter::new(File::create(&path)?);
        for (index, record) in batch.iter().enumerate() {
            writeln!(writer, ">{}", index)?;
            writeln!(writer, "{}", record.sequence)?;
        }
        writer.flush()?;
        Ok(path)
    }

    fn run_minimap2(&self, query: &Path) -> crate::Result<String> {
        let output = Command::new(&self.binary)
            .arg("-t")
            .arg(self.threads.to_string())
            .arg("--cs")
            .arg("--secondary=no")
            .arg(&self.reference)
            .arg(query)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                CaduceusError::Alignment(format!(
                    "Failed to invoke '{}': {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaduceusError::Alignment(format!(
                "minimap2 exited with {:?}: {}",
                output.status.code(),
                stderr.lines().last().unwrap_or("")
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| CaduceusError::Alignment("minimap2 emitted non-UTF8 output".to_string()))
    }

    pub fn cleanup(&self) -> crate::Result<()> {
        if self.temp_dir.exists() {
            fs::remove_dir_all(&self.temp_dir)?;
        }
        Ok(())
    }
}

impl Aligner for Minimap2Aligner {
    fn align(&self, batch: &[CanonicalRecord]) -> crate::Result<Vec<AlignedRow>> {
        let query = self.write_batch(batch)?;
        let paf = self.run_minimap2(&query)?;
        parse_paf(&paf)
    }
}

impl Drop for Minimap2Aligner {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Parse PAF alignment rows into per-query edits and missing intervals.
///
/// PAF columns: qname qlen qstart qend strand tname tlen tstart tend
/// nmatch alen mapq, followed by SAM-style tags including `cs:Z:`.
pub fn parse_paf(paf: &str) -> crate::Result<Vec<AlignedRow>> {
    let mut rows = Vec::new();

    for line in paf.lines() {
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            return Err(CaduceusError::Alignment(format!(
                "PAF row has {} columns, expected at least 12",
                fields.len()
            )));
        }

        let query: usize = fields[0].parse().map_err(|_| {
            CaduceusError::Alignment(format!("Unexpected query name '{}' in PAF output", fields[0]))
        })?;
        let strand = fields[4];
        if strand != "+" {
            return Err(CaduceusError::Alignment(format!(
                "Negative-strand alignment for query {}",
                query
            )));
        }
        let ref_len: usize = parse_paf_int(fields[6], "target length")?;
        let ref_start: usize = parse_paf_int(fields[7], "target start")?;
        let ref_end: usize = parse_paf_int(fields[8], "target end")?;

        let cs = fields[12..]
            .iter()
            .find_map(|tag| tag.strip_prefix("cs:Z:"))
            .ok_or_else(|| {
                CaduceusError::Alignment(format!("PAF row for query {} lacks a cs tag", query))
            })?;

        let (edits, mut missing) = decode_cs(cs, ref_start)?;

        // Reference positions outside the aligned interval are uncalled
        if ref_start > 0 {
            missing.insert(0, (0, ref_start));
        }
        if ref_end < ref_len {
            missing.push((ref_end, ref_len));
        }

        rows.push(AlignedRow {
            query,
            edits,
            missing,
        });
    }

    Ok(rows)
}

fn parse_paf_int(field: &str, what: &str) -> crate::Result<usize> {
    field
        .parse()
        .map_err(|_| CaduceusError::Alignment(format!("Bad {} field '{}' in PAF output", what, field)))
}

/// Walk a short-form `cs` difference string, emitting edits in reference
/// coordinates. Substitutions to an ambiguous base are uncalled positions,
/// not divergence.
fn decode_cs(cs: &str, ref_start: usize) -> crate::Result<(Vec<Edit>, Vec<(usize, usize)>)> {
    let mut edits = Vec::new();
    let mut missing: Vec<(usize, usize)> = Vec::new();
    let mut pos = ref_start;
    let mut consumed = 0usize;

    for token in cs_token_regex().find_iter(cs) {
        let token = token.as_str();
        consumed += token.len();
        match token.as_bytes()[0] {
            b':' => {
                let run: usize = token[1..].parse().map_err(|_| {
                    CaduceusError::Alignment(format!("Bad match run '{}' in cs string", token))
                })?;
                pos += run;
            }
            b'=' => {
                pos += token.len() - 1;
            }
            b'*' => {
                let alt = token.as_bytes()[2].to_ascii_uppercase();
                if alt == b'N' {
                    match missing.last_mut() {
                        Some(last) if last.1 == pos => last.1 = pos + 1,
                        _ => missing.push((pos, pos + 1)),
                    }
                } else {
                    edits.push(Edit::Sub {
                        pos,
                        alt: (alt as char).to_string(),
                    });
                }
                pos += 1;
            }
            b'+' => {
                edits.push(Edit::Ins {
                    pos,
                    seq: token[1..].to_ascii_uppercase(),
                });
            }
            b'-' => {
                let len = token.len() - 1;
                edits.push(Edit::Del { pos, len });
                pos += len;
            }
            _ => unreachable!("regex only yields cs tokens"),
        }
    }

    if consumed != cs.len() {
        return Err(CaduceusError::Alignment(format!(
            "Unparseable cs string '{}'",
            cs
        )));
    }

    Ok((edits, missing))
}
