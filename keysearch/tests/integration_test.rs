use anyhow::Result;
use keysearch::search::search;
use keysearch::{
    Backend, ConcurrencyModel, Coordinator, EncodingMode, LogTelemetry, PatternMatcher,
    SearchConfig, SearchError,
};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tempfile::tempdir;

const WORDS: [&str; 6] = ["kitchen", "career", "subject", "future", "table", "window"];

fn create_test_files(dir: &tempfile::TempDir, file_count: usize) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(file_count);
    for i in 0..file_count {
        let file_path = dir.path().join(format!("file_{}.txt", i));
        let mut file = File::create(&file_path)?;
        writeln!(file, "line one mentions {}", WORDS[i % WORDS.len()])?;
        writeln!(file, "line two mentions {}", WORDS[(i * 7 + 3) % WORDS.len()])?;
        paths.push(file_path);
    }
    Ok(paths)
}

fn base_config(dir: &tempfile::TempDir, keywords: &[&str]) -> SearchConfig {
    SearchConfig {
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        root_path: dir.path().to_path_buf(),
        worker_count: 4,
        log_level: "warn".to_string(),
        ..SearchConfig::default()
    }
}

#[test]
fn test_three_file_example() -> Result<()> {
    let dir = tempdir()?;
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    let c = dir.path().join("c.txt");
    fs::write(&a, "career future")?;
    fs::write(&b, "kitchen table")?;

    let matcher = PatternMatcher::new(vec![
        "career".to_string(),
        "kitchen".to_string(),
        "miss".to_string(),
    ])?;
    let report = Coordinator::new(2, Backend::Threads)?.run(
        &[a.clone(), b.clone(), c],
        &matcher,
        &LogTelemetry::new(),
    )?;

    assert_eq!(report.results.get("career"), Some(&[a][..]));
    assert_eq!(report.results.get("kitchen"), Some(&[b][..]));
    assert_eq!(report.results.get("miss"), Some(&[][..]));
    assert_eq!(report.run.files_scanned, 2);
    assert_eq!(report.run.files_failed, 1);
    Ok(())
}

#[test]
fn test_case_insensitive_keywords() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("upper.txt"), "THE KITCHEN IS CLOSED")?;
    fs::write(dir.path().join("lower.txt"), "a career in cooking")?;

    let report = search(&base_config(&dir, &["Kitchen", "CAREER"]))?;
    assert_eq!(report.results.get("Kitchen").map(|p| p.len()), Some(1));
    assert_eq!(report.results.get("CAREER").map(|p| p.len()), Some(1));
    Ok(())
}

#[test]
fn test_every_keyword_is_present() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, 5)?;

    let report = search(&base_config(&dir, &["kitchen", "nowhere"]))?;
    let keys: Vec<&str> = report.results.keywords().collect();
    assert_eq!(keys, vec!["kitchen", "nowhere"]);
    assert!(report.results.get("nowhere").map_or(false, |p| p.is_empty()));
    Ok(())
}

#[test]
fn test_worker_counts_give_same_matches() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, 53)?;

    let mut config = base_config(&dir, &WORDS);
    config.worker_count = 1;
    let reference = search(&config)?;
    assert!(reference.results.total_matches() > 0);

    for workers in [2, 4, 8, 64] {
        config.worker_count = workers;
        let report = search(&config)?;
        assert!(
            report.results.same_matches(&reference.results),
            "{} workers disagreed with one worker",
            workers
        );
        assert_eq!(report.run.workers, workers);
    }
    Ok(())
}

#[test]
fn test_file_matched_at_most_once_per_keyword() -> Result<()> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join("repeat.txt"),
        "kitchen kitchen kitchen\nkitchen again",
    )?;

    let report = search(&base_config(&dir, &["kitchen"]))?;
    assert_eq!(report.results.get("kitchen").map(|p| p.len()), Some(1));
    Ok(())
}

#[test]
fn test_extension_filter() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("keep.txt"), "career")?;
    fs::write(dir.path().join("skip.md"), "career")?;
    fs::write(dir.path().join("SHOUT.TXT"), "career")?;

    let report = search(&base_config(&dir, &["career"]))?;
    let found = report.results.get("career").unwrap_or_default();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|p| !p.ends_with("skip.md")));
    Ok(())
}

#[test]
fn test_recursive_listing() -> Result<()> {
    let dir = tempdir()?;
    fs::create_dir(dir.path().join("nested"))?;
    fs::write(dir.path().join("top.txt"), "career")?;
    fs::write(dir.path().join("nested").join("deep.txt"), "career")?;

    let mut config = base_config(&dir, &["career"]);
    assert_eq!(search(&config)?.results.total_matches(), 1);

    config.recursive = true;
    assert_eq!(search(&config)?.results.total_matches(), 2);
    Ok(())
}

#[test]
fn test_regex_keyword() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.txt"), "order 1234 shipped")?;
    fs::write(dir.path().join("b.txt"), "no numbers here")?;

    let report = search(&base_config(&dir, &[r"order \d+"]))?;
    assert_eq!(
        report.results.get(r"order \d+"),
        Some(&[dir.path().join("a.txt")][..])
    );
    Ok(())
}

#[test]
fn test_invalid_regex_fails_fast() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, 2)?;

    let err = search(&base_config(&dir, &["(unclosed"])).unwrap_err();
    assert!(matches!(err, SearchError::InvalidPattern(_)));
    Ok(())
}

#[test]
fn test_zero_workers_is_configuration_error() -> Result<()> {
    let dir = tempdir()?;
    let mut config = base_config(&dir, &["career"]);
    config.worker_count = 0;

    let err = search(&config).unwrap_err();
    assert!(matches!(err, SearchError::InvalidConfiguration(_)));
    Ok(())
}

#[test]
fn test_empty_directory() -> Result<()> {
    let dir = tempdir()?;
    let report = search(&base_config(&dir, &["career", "kitchen"]))?;
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results.total_matches(), 0);
    assert_eq!(report.run.files_scanned, 0);
    Ok(())
}

#[test]
fn test_invalid_utf8_modes() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("bad.txt"), [b'c', b'a', b'r', 0xff, b'e', b'e', b'r'])?;
    fs::write(dir.path().join("good.txt"), "career")?;

    let mut config = base_config(&dir, &["career", "car"]);
    let report = search(&config)?;
    assert_eq!(report.run.files_failed, 1);
    assert_eq!(report.results.get("car").map(|p| p.len()), Some(1));

    config.encoding_mode = EncodingMode::Lossy;
    let report = search(&config)?;
    assert_eq!(report.run.files_failed, 0);
    assert_eq!(report.results.get("car").map(|p| p.len()), Some(2));
    Ok(())
}

#[test]
fn test_report_serializes_to_json() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.txt"), "career")?;

    let report = search(&base_config(&dir, &["career"]))?;
    let json = serde_json::to_value(&report)?;
    assert_eq!(json["run"]["model"], "threads");
    assert_eq!(json["run"]["workers"], 4);
    assert!(json["results"]["career"].is_array());
    assert_eq!(report.run.model, ConcurrencyModel::Threads);
    Ok(())
}
