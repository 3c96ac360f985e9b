use std::fs;
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rstest::*;
use sha2::{Digest, Sha256};

use ext_line_sort::{LineGenerator, LineSorter, LineSorterBuilder, SortError};

#[fixture]
fn tmp_dir() -> tempfile::TempDir {
    tempfile::tempdir_in("./").unwrap()
}

fn build_sorter(tmp_dir: &Path, segment_size: Option<u64>, threads: Option<usize>) -> LineSorter {
    let mut builder = LineSorterBuilder::new().with_tmp_dir(tmp_dir);
    if let Some(segment_size) = segment_size {
        builder = builder.with_segment_size(segment_size);
    }
    if let Some(threads) = threads {
        builder = builder.with_threads_number(threads);
    }
    builder.build().unwrap()
}

fn generate(dir: &Path, name: &str, seed: u64, num_lines: u64, min_length: usize, max_line_len: usize) -> PathBuf {
    let path = dir.join(name);
    LineGenerator::with_rng(StdRng::seed_from_u64(seed))
        .with_min_length(min_length)
        .generate(&path, num_lines, max_line_len)
        .unwrap();
    path
}

fn read_lines(path: &Path) -> Vec<Vec<u8>> {
    let reader = io::BufReader::new(fs::File::open(path).unwrap());
    let lines: io::Result<Vec<Vec<u8>>> = reader.split(b'\n').collect();
    lines.unwrap()
}

/// XOR of per-line digests, independent of the line order.
fn checksum(path: &Path) -> [u8; 32] {
    let mut sum = [0u8; 32];
    for line in read_lines(path) {
        let digest = Sha256::digest(&line);
        for (acc, byte) in sum.iter_mut().zip(digest.iter()) {
            *acc ^= byte;
        }
    }
    sum
}

fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[rstest]
#[case(1, 1000, Some(1))]
#[case(1, 1000, Some(4))]
#[case(16, 3000, None)]
#[case(1, 30000, Some(3))]
#[case(1, 10 * 1024 * 1024, Some(2))]
fn test_output_is_sorted_permutation(
    tmp_dir: tempfile::TempDir,
    #[case] min_length: usize,
    #[case] segment_size: u64,
    #[case] threads: Option<usize>,
) {
    let input = generate(tmp_dir.path(), "input.txt", 42, 1000, min_length, 300);
    let output = tmp_dir.path().join("output.txt");

    build_sorter(tmp_dir.path(), Some(segment_size), threads)
        .sort(&input, &output)
        .unwrap();

    let actual = read_lines(&output);
    assert!(actual.windows(2).all(|pair| pair[0] <= pair[1]));

    let mut expected = read_lines(&input);
    expected.sort();
    assert_eq!(actual, expected);

    assert_eq!(dir_names(tmp_dir.path()), vec!["input.txt", "output.txt"]);
}

#[rstest]
fn test_duplicates_are_preserved(tmp_dir: tempfile::TempDir) {
    let input = tmp_dir.path().join("input.txt");
    let output = tmp_dir.path().join("output.txt");
    let content = "b\na\nb\n\na\nb\n".repeat(50);
    fs::write(&input, &content).unwrap();

    build_sorter(tmp_dir.path(), Some(7), Some(3)).sort(&input, &output).unwrap();

    let expected = format!("{}{}{}", "\n".repeat(50), "a\n".repeat(100), "b\n".repeat(150));
    assert_eq!(fs::read_to_string(&output).unwrap(), expected);
}

#[rstest]
fn test_sorting_is_idempotent(tmp_dir: tempfile::TempDir) {
    let input = generate(tmp_dir.path(), "input.txt", 7, 2000, 1, 100);
    let sorted = tmp_dir.path().join("sorted.txt");
    let resorted = tmp_dir.path().join("resorted.txt");
    let sorter = build_sorter(tmp_dir.path(), Some(2000), Some(2));

    sorter.sort(&input, &sorted).unwrap();
    sorter.sort(&sorted, &resorted).unwrap();

    assert_eq!(fs::read(&sorted).unwrap(), fs::read(&resorted).unwrap());
}

#[rstest]
fn test_empty_file(tmp_dir: tempfile::TempDir) {
    let input = tmp_dir.path().join("empty.txt");
    let output = tmp_dir.path().join("output.txt");
    fs::write(&input, b"").unwrap();

    build_sorter(tmp_dir.path(), None, None).sort(&input, &output).unwrap();

    assert_eq!(fs::read(&output).unwrap(), b"");
}

#[rstest]
fn test_single_segment(tmp_dir: tempfile::TempDir) {
    let input = tmp_dir.path().join("input.txt");
    let output = tmp_dir.path().join("output.txt");
    fs::write(&input, "adsfsdadfdsafdsaf\nzz\nabc\n\nq\nabc\nABC\n").unwrap();

    build_sorter(tmp_dir.path(), Some(1024), Some(2))
        .sort(&input, &output)
        .unwrap();

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "\nABC\nabc\nabc\nadsfsdadfdsafdsaf\nq\nzz\n"
    );
    assert_eq!(dir_names(tmp_dir.path()), vec!["input.txt", "output.txt"]);
}

#[rstest]
fn test_missing_trailing_newline(tmp_dir: tempfile::TempDir) {
    let input = tmp_dir.path().join("input.txt");
    let output = tmp_dir.path().join("output.txt");
    fs::write(&input, b"zeta\r\nbeta\n\xff\xfe\nalpha").unwrap();

    build_sorter(tmp_dir.path(), Some(6), Some(2)).sort(&input, &output).unwrap();

    assert_eq!(fs::read(&output).unwrap(), b"alpha\nbeta\nzeta\r\n\xff\xfe\n".to_vec());
}

#[rstest]
fn test_line_too_large(tmp_dir: tempfile::TempDir) {
    let input = generate(tmp_dir.path(), "input.txt", 3, 120, 101, 3000);
    let output = tmp_dir.path().join("output.txt");

    let result = build_sorter(tmp_dir.path(), Some(100), None).sort(&input, &output);

    assert!(matches!(result, Err(SortError::LineTooLarge { limit: 100, .. })));
    assert!(!output.exists());
    assert_eq!(dir_names(tmp_dir.path()), vec!["input.txt"]);
}

#[rstest]
fn test_input_not_found(tmp_dir: tempfile::TempDir) {
    let input = tmp_dir.path().join("missing.txt");
    let output = tmp_dir.path().join("output.txt");
    fs::write(&output, b"pre-created\n").unwrap();

    let result = build_sorter(tmp_dir.path(), None, None).sort(&input, &output);

    assert!(matches!(result, Err(SortError::InputNotFound(_, _))));
    assert_eq!(fs::read(&output).unwrap(), b"pre-created\n");
    assert_eq!(dir_names(tmp_dir.path()), vec!["output.txt"]);
}

#[rstest]
fn test_directory_input(tmp_dir: tempfile::TempDir) {
    let input = tmp_dir.path().join("adir");
    let output = tmp_dir.path().join("output.txt");
    fs::create_dir(&input).unwrap();

    let result = build_sorter(tmp_dir.path(), None, None).sort(&input, &output);

    assert!(matches!(result, Err(SortError::InputNotFound(path, _)) if path == input));
    assert!(!output.exists());
    assert_eq!(dir_names(tmp_dir.path()), vec!["adir"]);
}

#[rstest]
fn test_existing_output_is_replaced(tmp_dir: tempfile::TempDir) {
    let input = tmp_dir.path().join("input.txt");
    let output = tmp_dir.path().join("output.txt");
    fs::write(&input, b"2\n1\n").unwrap();
    fs::write(&output, b"previous result\nwith more lines\n").unwrap();

    build_sorter(tmp_dir.path(), None, None).sort(&input, &output).unwrap();

    assert_eq!(fs::read(&output).unwrap(), b"1\n2\n");
}

#[rstest]
fn test_result_consistency(tmp_dir: tempfile::TempDir) {
    let input = generate(tmp_dir.path(), "input.txt", 2018, 10_000, 16, 300);
    let output = tmp_dir.path().join("output.txt");

    build_sorter(tmp_dir.path(), Some(64 * 1024), Some(4))
        .sort(&input, &output)
        .unwrap();

    assert_eq!(checksum(&output), checksum(&input));
    assert_eq!(fs::metadata(&output).unwrap().len(), fs::metadata(&input).unwrap().len());
}

#[rstest]
fn test_reversed_input(tmp_dir: tempfile::TempDir) {
    let input = tmp_dir.path().join("input.txt");
    let output = tmp_dir.path().join("output.txt");
    {
        let mut writer = io::BufWriter::new(fs::File::create(&input).unwrap());
        for item in (0..500).rev() {
            writeln!(writer, "{:05}", item).unwrap();
        }
        writer.flush().unwrap();
    }

    build_sorter(tmp_dir.path(), Some(600), Some(2)).sort(&input, &output).unwrap();

    let expected: Vec<Vec<u8>> = (0..500).map(|item| format!("{:05}", item).into_bytes()).collect();
    assert_eq!(read_lines(&output), expected);
}
