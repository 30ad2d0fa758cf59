use crate::simulator::ChangeTypeData;
use crate::store::CorpusTable;
use crate::types::{TargetCandidate, TokenRow};
use anyhow::Context;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

/// Change types generated by the fake corpus, in order
pub const FAKE_CHANGE_TYPES: [&str; 2] = ["metaphor", "taxonomy-hypernym"];

/// Synthetic sense-annotated corpus with matching candidate lists
#[derive(Debug, Clone)]
pub struct FakeCorpus {
    pub tokens: Vec<TokenRow>,
    pub change_types: Vec<ChangeTypeData>,
}

impl FakeCorpus {
    pub fn corpus(&self) -> CorpusTable {
        CorpusTable::new(self.tokens.clone())
    }
}

/// Sentence tokens without a sentence id yet: (text, lemma, sense, pos)
type FakeSentence = Vec<(String, String, Option<String>, &'static str)>;

/// Generate a fake sentence around one occurrence of `lemma`
pub fn generate_fake_sentence_with_rng(rng: &mut impl Rng, lemma: &str, sense: Option<&str>) -> FakeSentence {
    let determiners = ["the", "a", "this", "that"];
    let verbs = ["moves", "stands", "falls", "grows", "waits"];
    let adverbs = ["slowly", "again", "here", "today"];

    let mut sentence: FakeSentence = vec![
        {
            let det = determiners[rng.gen_range(0..determiners.len())];
            (det.to_string(), det.to_string(), None, "DET")
        },
        (lemma.to_string(), lemma.to_string(), sense.map(str::to_string), "NOUN"),
        {
            let verb = verbs[rng.gen_range(0..verbs.len())];
            (verb.to_string(), verb.trim_end_matches('s').to_string(), None, "VERB")
        },
    ];
    if rng.gen_bool(0.5) {
        let adverb = adverbs[rng.gen_range(0..adverbs.len())];
        sentence.push((adverb.to_string(), adverb.to_string(), None, "ADV"));
    }
    sentence.push((".".to_string(), ".".to_string(), None, "."));
    sentence
}

/// Generate a fake corpus from entropy
pub fn generate_fake_corpus(candidates_per_type: usize, filler_sentences: usize) -> FakeCorpus {
    generate_fake_corpus_with_seed(candidates_per_type, filler_sentences, None)
}

/// Generate a fake corpus with a seed for deterministic generation
///
/// Every candidate gets 40-70 base sense and 15-35 other sense sentences plus
/// a few sentences with an unrelated third sense. Candidates of the hypernym
/// type realize their other sense with a separate hyponym lemma.
pub fn generate_fake_corpus_with_seed(candidates_per_type: usize, filler_sentences: usize, seed: Option<u64>) -> FakeCorpus {
    let mut rng = if let Some(s) = seed {
        StdRng::seed_from_u64(s)
    } else {
        StdRng::from_entropy()
    };

    let mut sentences: Vec<FakeSentence> = Vec::new();
    let mut change_types = Vec::new();

    for change_type in FAKE_CHANGE_TYPES {
        let prefix = if change_type == "metaphor" { "meta" } else { "hyper" };
        let mut candidates = Vec::new();
        for k in 0..candidates_per_type {
            let lemma = format!("{}{}", prefix, k);
            let base_sense = format!("{}.n.01", lemma);
            let (other_lemma, other_sense) = if change_type == "metaphor" {
                (lemma.clone(), format!("{}.n.02", lemma))
            } else {
                let hyponym = format!("{}kind", lemma);
                let sense = format!("{}.n.01", hyponym);
                (hyponym, sense)
            };

            let base_count = rng.gen_range(40..=70);
            let other_count = rng.gen_range(15..=35);
            let third_count = rng.gen_range(0..=3);
            for _ in 0..base_count {
                sentences.push(generate_fake_sentence_with_rng(&mut rng, &lemma, Some(&base_sense)));
            }
            for _ in 0..other_count {
                sentences.push(generate_fake_sentence_with_rng(&mut rng, &other_lemma, Some(&other_sense)));
            }
            let third_sense = format!("{}.n.03", lemma);
            for _ in 0..third_count {
                sentences.push(generate_fake_sentence_with_rng(&mut rng, &lemma, Some(&third_sense)));
            }

            let mut candidate = TargetCandidate::new(&lemma, Some("NOUN"), &base_sense, &other_sense);
            candidate.base_count = Some(base_count);
            candidate.other_count = Some(other_count);
            candidates.push(candidate);
        }
        change_types.push(ChangeTypeData {
            name: change_type.to_string(),
            candidates,
        });
    }

    for _ in 0..filler_sentences {
        sentences.push(generate_fake_sentence_with_rng(&mut rng, "river", None));
    }
    sentences.shuffle(&mut rng);

    let tokens = sentences
        .into_iter()
        .enumerate()
        .flat_map(|(s, sentence)| {
            sentence
                .into_iter()
                .enumerate()
                .map(move |(w, (text, lemma, sense, pos))| TokenRow {
                    sentence_id: format!("fake_{}", s),
                    word_id: w.to_string(),
                    text,
                    lemma,
                    sense,
                    pos: pos.to_string(),
                })
        })
        .collect();

    FakeCorpus { tokens, change_types }
}

/// Write a fake corpus as csv files that the data loader reads back
///
/// Returns the corpus path and one target list path per change type.
pub fn write_fake_corpus(fake: &FakeCorpus, dir: &Path) -> anyhow::Result<(PathBuf, Vec<PathBuf>)> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;

    let corpus_path = dir.join("fake_corpus.csv");
    let mut writer = csv::Writer::from_path(&corpus_path)?;
    for token in &fake.tokens {
        writer.serialize(token)?;
    }
    writer.flush()?;

    let mut target_paths = Vec::new();
    for change_type in &fake.change_types {
        let path = dir.join(format!("fake_targets_{}.csv", change_type.name));
        let mut writer = csv::Writer::from_path(&path)?;
        for candidate in &change_type.candidates {
            writer.serialize(candidate)?;
        }
        writer.flush()?;
        target_paths.push(path);
    }
    Ok((corpus_path, target_paths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load_corpus, load_targets};

    #[test]
    fn test_generate_fake_corpus() {
        let fake = generate_fake_corpus(4, 10);
        assert_eq!(fake.change_types.len(), 2);
        assert!(fake.change_types.iter().all(|t| t.candidates.len() == 4));
        assert!(fake.tokens.iter().any(|t| t.lemma == "river"));
    }

    #[test]
    fn test_seed_is_deterministic() {
        let a = generate_fake_corpus_with_seed(3, 5, Some(9));
        let b = generate_fake_corpus_with_seed(3, 5, Some(9));
        assert_eq!(a.tokens, b.tokens);
        assert_eq!(a.change_types, b.change_types);
    }

    #[test]
    fn test_hypernym_other_sense_uses_hyponym_lemma() {
        let fake = generate_fake_corpus_with_seed(2, 0, Some(1));
        let hyper = &fake.change_types[1].candidates[0];
        let other_tokens: Vec<&TokenRow> = fake
            .tokens
            .iter()
            .filter(|t| t.sense.as_deref() == Some(hyper.other_sense.as_str()))
            .collect();
        assert!(!other_tokens.is_empty());
        assert!(other_tokens.iter().all(|t| t.lemma != hyper.lemma));
    }

    #[test]
    fn test_write_fake_corpus_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let fake = generate_fake_corpus_with_seed(2, 3, Some(4));
        let (corpus_path, target_paths) = write_fake_corpus(&fake, dir.path()).unwrap();
        let tokens = load_corpus(&corpus_path, false).unwrap();
        assert_eq!(tokens, fake.tokens);
        let targets = load_targets(&target_paths[1]).unwrap();
        assert_eq!(targets, fake.change_types[1].candidates);
    }
}
