use crate::error::SimResult;
use crate::simulator::Simulator;
use crate::store::CorpusTable;
use crate::types::{ManifestRow, SliceRow, Status, TokenRow};
use chrono::Local;
use log::info;
use rand::Rng;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Token row joined with the status of its sentence
#[derive(Debug, Serialize)]
struct LabeledToken<'a> {
    sentence_id: &'a str,
    word_id: &'a str,
    text: &'a str,
    lemma: &'a str,
    sense: Option<&'a str>,
    #[serde(rename = "universalPOS")]
    pos: &'a str,
    status: Status,
}

impl<'a> LabeledToken<'a> {
    fn new(token: &'a TokenRow, status: Status) -> Self {
        Self {
            sentence_id: &token.sentence_id,
            word_id: &token.word_id,
            text: &token.text,
            lemma: &token.lemma,
            sense: token.sense.as_deref(),
            pos: &token.pos,
            status,
        }
    }
}

pub struct Exporter {
    output_dir: PathBuf,
    prefix: String,
}

impl Exporter {
    /// Exporter whose file names carry the current time as `YYYYMMDD-HHMM_`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let prefix = Local::now().format("%Y%m%d-%H%M_").to_string();
        Self::with_prefix(output_dir, prefix)
    }

    pub fn with_prefix(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}", self.prefix, name))
    }

    /// Write both slices, the running texts, the labeled corpus and the manifest
    ///
    /// Returns the paths written, in order.
    pub fn export<R: Rng>(&self, simulator: &Simulator<R>) -> SimResult<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir)?;
        let corpus = simulator.corpus();
        let mut written = Vec::new();

        for slice in Status::slices() {
            let path = self.path(&format!("sentences_{}.csv", slice));
            write_rows(&path, &simulator.slice_rows(slice))?;
            written.push(path);
        }
        for slice in Status::slices() {
            let path = self.path(&format!("corpus_{}.txt", slice));
            write_text(&path, corpus, Some(slice))?;
            written.push(path);
        }
        let path = self.path("all_text.txt");
        write_text(&path, corpus, None)?;
        written.push(path);

        let path = self.path("whole_corpus.csv");
        write_labeled_corpus(&path, corpus)?;
        written.push(path);

        let path = self.path("changes.csv");
        write_manifest(&path, &simulator.manifest()?)?;
        written.push(path);

        info!("Wrote {} files to {:?}", written.len(), self.output_dir);
        Ok(written)
    }
}

pub fn write_rows(path: &Path, rows: &[SliceRow]) -> SimResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(["sentence_id", "word_id", "old_lemma", "new_lemma"])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// One sentence per line, tokens joined by a single space
pub fn write_text(path: &Path, corpus: &CorpusTable, status: Option<Status>) -> SimResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for id in corpus.sentence_ids(status) {
        writeln!(out, "{}", corpus.sentence_text(&id))?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_labeled_corpus(path: &Path, corpus: &CorpusTable) -> SimResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for token in corpus.tokens() {
        let status = corpus.status_of(&token.sentence_id).unwrap_or_default();
        writer.serialize(LabeledToken::new(token, status))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_manifest(path: &Path, rows: &[ManifestRow]) -> SimResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record([
            "lemma",
            "pos",
            "change_type",
            "change_result",
            "base_sense",
            "other_sense",
            "counts_before",
            "counts_after",
        ])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
