use crate::simulator::ChangeTypeData;
use crate::types::{RawCandidate, RawTokenRow, TargetCandidate, TokenRow};
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Read a corpus table, skipping rows without a sentence id, word id or lemma
///
/// Rows that cannot be parsed at all are skipped as well. With `namespace`
/// set, sentence ids become `<namespace>:<sentence_id>`.
pub fn read_corpus<R: Read>(reader: R, namespace: Option<&str>) -> Result<Vec<TokenRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut tokens = Vec::new();
    let mut malformed = 0;
    for (row, result) in reader.deserialize::<RawTokenRow>().enumerate() {
        let token = match result {
            Ok(raw) => raw.into_token(row).map_err(anyhow::Error::from),
            Err(e) => Err(anyhow::Error::from(e).context(format!("Failed to parse corpus row {}", row))),
        };
        match token {
            Ok(mut token) => {
                if let Some(ns) = namespace {
                    token.sentence_id = format!("{}:{}", ns, token.sentence_id);
                }
                tokens.push(token);
            }
            Err(e) => {
                malformed += 1;
                warn!("Skipping corpus row: {:#}", e);
            }
        }
    }
    if malformed > 0 {
        warn!("Skipped {} malformed corpus rows", malformed);
    }
    Ok(tokens)
}

/// Read a list of candidate targets, skipping rows without lemma or senses
pub fn read_targets<R: Read>(reader: R) -> Result<Vec<TargetCandidate>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut candidates = Vec::new();
    for (row, result) in reader.deserialize::<RawCandidate>().enumerate() {
        let candidate = match result {
            Ok(raw) => raw.into_candidate(row).map_err(anyhow::Error::from),
            Err(e) => Err(anyhow::Error::from(e).context(format!("Failed to parse target row {}", row))),
        };
        match candidate {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => warn!("Skipping target row: {:#}", e),
        }
    }
    Ok(candidates)
}

pub fn load_corpus(path: &Path, namespace_sentences: bool) -> Result<Vec<TokenRow>> {
    let file = File::open(path).with_context(|| format!("Failed to open corpus {:?}", path))?;
    let namespace = namespace_sentences
        .then(|| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .flatten();
    read_corpus(file, namespace.as_deref()).with_context(|| format!("Failed to read corpus {:?}", path))
}

pub fn load_targets(path: &Path) -> Result<Vec<TargetCandidate>> {
    let file = File::open(path).with_context(|| format!("Failed to open target list {:?}", path))?;
    read_targets(file).with_context(|| format!("Failed to read target list {:?}", path))
}

/// Corpora and per-change-type candidate lists for one run
#[derive(Debug, Clone, Default)]
pub struct DataLoader {
    pub corpora: Vec<Vec<TokenRow>>,
    pub change_types: Vec<ChangeTypeData>,
}

impl DataLoader {
    /// Load every corpus and target list
    ///
    /// `target_paths[i]` is the candidate list of `change_types[i]`. A corpus
    /// that cannot be read is skipped; a target list that cannot be read skips
    /// its change type.
    pub fn load(
        change_types: &[String],
        corpus_paths: &[PathBuf],
        target_paths: &[PathBuf],
        namespace_sentences: bool,
    ) -> Result<Self> {
        if change_types.len() != target_paths.len() {
            bail!(
                "Got {} change types but {} target lists; each change type needs one target list",
                change_types.len(),
                target_paths.len()
            );
        }

        let mut loader = DataLoader::default();
        for path in corpus_paths {
            match load_corpus(path, namespace_sentences) {
                Ok(tokens) => {
                    info!("Loaded {} tokens from {:?}", tokens.len(), path);
                    loader.corpora.push(tokens);
                }
                Err(e) => warn!("{:#}. Skipping corpus.", e),
            }
        }
        for (name, path) in change_types.iter().zip(target_paths) {
            match load_targets(path) {
                Ok(candidates) => {
                    info!("Loaded {} possible targets for {} from {:?}", candidates.len(), name, path);
                    loader.change_types.push(ChangeTypeData {
                        name: name.clone(),
                        candidates,
                    });
                }
                Err(e) => warn!("{:#}. Skipping change type {}.", e, name),
            }
        }

        if loader.corpora.is_empty() {
            bail!("None of the corpus files could be loaded");
        }
        Ok(loader)
    }
}
