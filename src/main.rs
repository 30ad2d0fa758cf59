use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use semshift::test_utils::{generate_fake_corpus_with_seed, write_fake_corpus};
use semshift::{Config, CorpusTable, DataLoader, Exporter, SimError, Simulator};

/// Fake corpora get a fixed amount of unannotated background sentences
const FAKE_FILLER_SENTENCES: usize = 500;

fn main() -> Result<()> {
    let config = Config::parse();

    // Initialize logger
    let mut logger_builder = env_logger::Builder::from_default_env();
    logger_builder.filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info));

    // Configure file logging (default to semshift.log if not specified)
    let log_file_path = config
        .log_file
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from("semshift.log"));

    use std::fs::OpenOptions;
    use std::io::Write;

    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&log_file_path)
        .map_err(|e| anyhow::anyhow!("Failed to open log file {:?}: {}", log_file_path, e))?;

    // Create a writer that writes to both stdout and file
    struct DualWriter {
        file: std::fs::File,
    }

    impl Write for DualWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            std::io::stdout().write_all(buf)?;
            self.file.write_all(buf)?;
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            std::io::stdout().flush()?;
            self.file.flush()
        }
    }

    logger_builder.target(env_logger::Target::Pipe(Box::new(DualWriter { file })));
    println!("Logging to file: {:?}", log_file_path);

    logger_builder.init();

    info!("Starting change simulation");
    info!("Configuration: {:?}", config);

    // Invalid settings abort before anything is loaded or sampled
    let sim_config = match config.simulation_config() {
        Ok(c) => c,
        Err(e @ SimError::InvalidConfig(_)) => {
            error!("{}", e);
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    let (change_types, corpus_paths, target_paths) = if let Some(count) = config.generate_fake_corpus {
        info!("Generating fake corpus with {} candidates per change type", count);
        let fake = generate_fake_corpus_with_seed(count, FAKE_FILLER_SENTENCES, config.seed);
        let input_dir = config.output.join("fake_input");
        let (corpus_path, target_paths) =
            write_fake_corpus(&fake, &input_dir).context("Failed to write fake corpus")?;
        info!("Wrote fake corpus ({} tokens) to {:?}", fake.tokens.len(), input_dir);
        let names = fake.change_types.iter().map(|t| t.name.clone()).collect();
        (names, vec![corpus_path], target_paths)
    } else {
        (config.change_types.clone(), config.corpora.clone(), config.targets.clone())
    };

    let loader = DataLoader::load(&change_types, &corpus_paths, &target_paths, config.namespace_sentences)?;
    if loader.change_types.is_empty() {
        warn!("No target lists could be loaded; every sentence goes to the background");
    }

    let corpus = CorpusTable::concat(loader.corpora);
    info!("Corpus has {} sentences", corpus.sentence_count());

    let mut simulator = Simulator::new(sim_config, corpus, loader.change_types)?;
    for change in simulator.changes() {
        info!("Selected {}", change);
    }

    let report = simulator.split_corpora();
    info!(
        "Partitioned corpus: {} realized changes, {} skipped, {} contaminated, {} residual, {} background sentences",
        report.realized,
        report.skipped.len(),
        report.contaminated,
        report.residual,
        report.background
    );
    for (status, count) in simulator.status_summary() {
        info!("{}: {} sentences", status, count);
    }

    let exporter = Exporter::new(&config.output);
    let written = exporter.export(&simulator)?;
    for path in &written {
        info!("Wrote {:?}", path);
    }

    info!("Simulation complete");
    Ok(())
}
