use crate::core::record::RawSequenceRecord;
use crate::CaduceusError;
use flate2::read::GzDecoder;
use memmap2::Mmap;
use nom::{
    bytes::complete::tag,
    character::complete::{line_ending, not_line_ending},
    combinator::{map, opt},
    IResult,
};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Parse a FASTA header line, keeping the entire line after '>' as the
/// record identifier (archive headers embed metadata in pipe-delimited
/// fields, so splitting at whitespace would truncate them).
fn parse_header(input: &[u8]) -> IResult<&[u8], &str> {
    let (input, _) = tag(b">")(input)?;
    let (input, header) = map(not_line_ending, |s| {
        std::str::from_utf8(s).unwrap_or("").trim_end()
    })(input)?;
    let (input, _) = opt(line_ending)(input)?;
    Ok((input, header))
}

/// Parse sequence lines until next header or EOF
fn parse_sequence(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let mut sequence = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() && remaining[0] != b'>' {
        let (rest, line) = nom::bytes::complete::take_till::<_, _, nom::error::Error<_>>(
            |c: u8| c == b'\n' || c == b'\r',
        )(remaining)?;
        let (rest, _) = opt(line_ending)(rest)?;

        for &c in line {
            if !c.is_ascii_whitespace() {
                sequence.push(c.to_ascii_uppercase());
            }
        }

        remaining = rest;
    }

    Ok((remaining, sequence))
}

/// Read the single-sequence reference genome. Its length establishes the
/// alignment coordinate system. Supports plain or gzipped files.
pub fn load_reference<P: AsRef<Path>>(path: P) -> crate::Result<(String, String)> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let buffer: Vec<u8>;
    let data: &[u8] = if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let mut decoder = GzDecoder::new(BufReader::new(file));
        let mut decoded = Vec::new();
        decoder.read_to_end(&mut decoded)?;
        buffer = decoded;
        &buffer
    } else {
        let mmap = unsafe { Mmap::map(&file)? };
        buffer = mmap.to_vec();
        &buffer
    };

    let mut input = data;
    while !input.is_empty() && input[0].is_ascii_whitespace() {
        input = &input[1..];
    }

    let (input, header) = parse_header(input).map_err(|_| {
        CaduceusError::Format(format!(
            "Failed to parse reference header in {}",
            path.display()
        ))
    })?;
    let (_, sequence) = parse_sequence(input).map_err(|_| {
        CaduceusError::Format(format!(
            "Failed to parse reference sequence in {}",
            path.display()
        ))
    })?;

    if sequence.is_empty() {
        return Err(CaduceusError::Format(format!(
            "Reference genome {} has an empty sequence",
            path.display()
        )));
    }

    let name = header.split_whitespace().next().unwrap_or(header);
    Ok((
        name.to_string(),
        String::from_utf8_lossy(&sequence).into_owned(),
    ))
}

/// Lazy FASTA record iterator over a genome archive.
///
/// Holds one open handle for the duration of iteration; the handle is
/// released when the iterator is dropped. Each call to [`FastaReader::from_path`]
/// restarts from the beginning of the archive.
pub struct FastaReader {
    reader: Box<dyn BufRead>,
    /// Header of the record currently being accumulated
    pending: Option<String>,
    done: bool,
}

impl FastaReader {
    /// Open a genome archive, transparently decoding gzip.
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let reader: Box<dyn BufRead> = if path.extension().and_then(|s| s.to_str()) == Some("gz") {
            Box::new(BufReader::new(GzDecoder::new(BufReader::new(file))))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(Self {
            reader,
            pending: None,
            done: false,
        })
    }

    #[cfg(test)]
    pub fn from_reader<R: Read + 'static>(reader: R) -> Self {
        Self {
            reader: Box::new(BufReader::new(reader)),
            pending: None,
            done: false,
        }
    }

    fn read_record(&mut self) -> crate::Result<Option<RawSequenceRecord>> {
        let mut line = String::new();

        // Find the first header if we are not mid-stream
        while self.pending.is_none() {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(header) = trimmed.strip_prefix('>') {
                self.pending = Some(header.trim_end().to_string());
            } else {
                return Err(CaduceusError::Format(format!(
                    "Sequence data before first header: '{}'",
                    trimmed
                )));
            }
        }

        let header = self.pending.take().expect("pending header");
        let mut sequence = String::new();

        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }
            let trimmed = line.trim_end();
            if let Some(next) = trimmed.strip_prefix('>') {
                self.pending = Some(next.trim_end().to_string());
                break;
            }
            for c in trimmed.chars() {
                if !c.is_whitespace() {
                    sequence.push(c.to_ascii_uppercase());
                }
            }
        }

        if sequence.is_empty() {
            return Err(CaduceusError::Format(format!(
                "Record '{}' has an empty body",
                header
            )));
        }

        Ok(Some(RawSequenceRecord { header, sequence }))
    }
}

impl Iterator for FastaReader {
    type Item = crate::Result<RawSequenceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
