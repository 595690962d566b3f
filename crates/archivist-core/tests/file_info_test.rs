use archivist_core::{
    Archiver, DefaultHashEngine, Error, FileHash, FileInfo, FileInfoRetriever, HashAlgorithm,
    HashEngine,
};
use archivist_testing::fixtures::{
    create_sample_files, create_sample_tree, jpeg_payload, write_7z, write_zip, ZipFixtureEntry,
    JPEG_CRC32, JPEG_CRC32_SIGNED,
};
use archivist_testing::{init_test_logging, TestDir};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts calls and delegates to the default engine
struct CountingEngine {
    calls: Arc<AtomicUsize>,
}

impl HashEngine for CountingEngine {
    fn compute(&self, algorithm: HashAlgorithm, reader: &mut dyn Read) -> io::Result<FileHash> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        DefaultHashEngine::new().compute(algorithm, reader)
    }
}

fn packed(test_dir: &TestDir, sources: &[PathBuf], name: &str) -> PathBuf {
    let archive = test_dir.join(name);
    Archiver::new().pack(sources, &archive).unwrap();
    archive
}

fn names(infos: &[FileInfo]) -> Vec<&str> {
    infos.iter().map(|info| info.name.as_str()).collect()
}

#[test]
fn test_jpeg_crc32_zip() {
    init_test_logging();
    let test_dir = TestDir::new().unwrap();
    let jpeg = test_dir.create_file("jpeg.jpg", &jpeg_payload().unwrap()).unwrap();
    let archive = packed(&test_dir, &[jpeg], "jpeg.zip");

    let infos = FileInfoRetriever::new(&archive)
        .get_file_info(&[HashAlgorithm::Crc32])
        .unwrap();

    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].name, "jpeg.jpg");
    assert_eq!(infos[0].hashes.len(), 1);
    assert_eq!(infos[0].hashes[0].to_signed(), JPEG_CRC32_SIGNED.to_vec());
    assert_eq!(infos[0].hashes[0], FileHash::from_crc32(JPEG_CRC32));
}

#[test]
fn test_jpeg_crc32_7z() {
    let test_dir = TestDir::new().unwrap();
    let jpeg = test_dir.create_file("jpeg.jpg", &jpeg_payload().unwrap()).unwrap();
    let archive = packed(&test_dir, &[jpeg], "jpeg.7z");

    let infos = FileInfoRetriever::new(&archive)
        .get_file_info(&[HashAlgorithm::Crc32])
        .unwrap();

    assert_eq!(names(&infos), vec!["jpeg.jpg"]);
    assert_eq!(infos[0].hashes[0].to_signed(), JPEG_CRC32_SIGNED.to_vec());
}

#[test]
fn test_directory_entries_are_skipped() {
    let test_dir = TestDir::new().unwrap();
    let archive = test_dir.join("photos.zip");
    let payload = jpeg_payload().unwrap();
    write_zip(
        &archive,
        &[
            ZipFixtureEntry::Dir("photos/"),
            ZipFixtureEntry::File("photos/jpeg.jpg", &payload),
            ZipFixtureEntry::Dir("photos/empty/"),
            ZipFixtureEntry::File("notes.txt", b"notes"),
        ],
    )
    .unwrap();

    let infos = FileInfoRetriever::new(&archive)
        .get_file_info(&[HashAlgorithm::Crc32])
        .unwrap();
    assert_eq!(names(&infos), vec!["photos/jpeg.jpg", "notes.txt"]);
    assert_eq!(infos[0].hashes[0].to_signed(), JPEG_CRC32_SIGNED.to_vec());
}

#[test]
fn test_directory_entries_are_skipped_7z() {
    let test_dir = TestDir::new().unwrap();
    let tree = create_sample_tree(&test_dir, "tree").unwrap();
    let archive = packed(&test_dir, &[tree], "tree.7z");

    let infos = FileInfoRetriever::new(&archive)
        .get_file_info(&[HashAlgorithm::Md5, HashAlgorithm::Sha256])
        .unwrap();
    let mut listed = names(&infos);
    listed.sort();
    assert_eq!(
        listed,
        vec!["tree/docs/guide.txt", "tree/docs/img/pixel.raw", "tree/readme.md"]
    );
    assert!(infos.iter().all(|info| info.hashes.len() == 2));
}

#[test]
fn test_no_algorithms_never_hashes() {
    let test_dir = TestDir::new().unwrap();
    let sources = create_sample_files(&test_dir).unwrap();

    for name in ["samples.zip", "samples.7z"] {
        let archive = packed(&test_dir, &sources, name);
        let calls = Arc::new(AtomicUsize::new(0));
        let retriever = FileInfoRetriever::with_engine(
            &archive,
            CountingEngine {
                calls: Arc::clone(&calls),
            },
        );

        let infos = retriever.get_file_info(&[]).unwrap();
        assert_eq!(names(&infos), vec!["alpha.txt", "beta.txt", "gamma.bin"]);
        assert!(infos.iter().all(|info| info.hashes.is_empty()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

#[test]
fn test_every_algorithm_matches_direct_hash() {
    let test_dir = TestDir::new().unwrap();
    let sources = create_sample_files(&test_dir).unwrap();
    let engine = DefaultHashEngine::new();

    for name in ["samples.zip", "samples.7z"] {
        let archive = packed(&test_dir, &sources, name);
        let calls = Arc::new(AtomicUsize::new(0));
        let infos = FileInfoRetriever::with_engine(
            &archive,
            CountingEngine {
                calls: Arc::clone(&calls),
            },
        )
        .get_file_info(&HashAlgorithm::ALL)
        .unwrap();

        assert_eq!(infos.len(), sources.len());
        assert_eq!(calls.load(Ordering::SeqCst), sources.len() * HashAlgorithm::ALL.len());

        for (info, source) in infos.iter().zip(&sources) {
            let data = std::fs::read(source).unwrap();
            assert_eq!(info.hashes.len(), HashAlgorithm::ALL.len());
            for (hash, &algorithm) in info.hashes.iter().zip(HashAlgorithm::ALL.iter()) {
                let expected = engine.compute(algorithm, &mut data.as_slice()).unwrap();
                assert_eq!(hash, &expected, "{} of {} in {}", algorithm, info.name, name);
                assert_eq!(hash.as_bytes().len(), algorithm.digest_len());
            }
        }
    }
}

#[test]
fn test_zip_and_7z_agree() {
    let test_dir = TestDir::new().unwrap();
    let sources = create_sample_files(&test_dir).unwrap();
    let zip = packed(&test_dir, &sources, "samples.zip");
    let sevenz = packed(&test_dir, &sources, "samples.7z");
    let algorithms = [HashAlgorithm::Sha512, HashAlgorithm::Crc32, HashAlgorithm::Xxh3];

    let from_zip = FileInfoRetriever::new(&zip).get_file_info(&algorithms).unwrap();
    let from_7z = FileInfoRetriever::new(&sevenz).get_file_info(&algorithms).unwrap();
    assert_eq!(from_zip, from_7z);
}

#[test]
fn test_duplicated_algorithms() {
    let test_dir = TestDir::new().unwrap();
    let sources = create_sample_files(&test_dir).unwrap();
    let algorithms = [HashAlgorithm::Md5, HashAlgorithm::Crc32, HashAlgorithm::Md5];

    for name in ["samples.zip", "samples.7z"] {
        let archive = packed(&test_dir, &sources, name);
        let infos = FileInfoRetriever::new(&archive)
            .get_file_info(&algorithms)
            .unwrap();

        for info in &infos {
            assert_eq!(info.hashes.len(), 3);
            assert_eq!(info.hashes[0], info.hashes[2]);
            assert_eq!(info.hashes[1].algorithm, HashAlgorithm::Crc32);
        }
    }
}

#[test]
fn test_repeated_entry_name_7z() {
    let test_dir = TestDir::new().unwrap();
    let first = test_dir.create_file("x/same.txt", b"first").unwrap();
    let second = test_dir
        .create_file("y/same.txt", b"second, different")
        .unwrap();
    let archive = test_dir.join("repeated.7z");
    write_7z(
        &archive,
        &[("same.txt", first.as_path()), ("same.txt", second.as_path())],
    )
    .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let retriever = FileInfoRetriever::with_engine(
        &archive,
        CountingEngine {
            calls: Arc::clone(&calls),
        },
    );

    for algorithms in [&[][..], &[HashAlgorithm::Crc32][..], &HashAlgorithm::ALL[..]] {
        match retriever.get_file_info(algorithms).unwrap_err() {
            Error::DuplicateEntry { name, .. } => assert_eq!(name, "same.txt"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
    // Each failed walk stops at the second entry, before hashing it
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_missing_archive() {
    let test_dir = TestDir::new().unwrap();

    for name in ["absent.zip", "absent.7z"] {
        let err = FileInfoRetriever::new(test_dir.join(name))
            .get_file_info(&[HashAlgorithm::Crc32])
            .unwrap_err();
        assert!(matches!(err, Error::ArchiveFileNotFound(_)));
    }
}

#[test]
fn test_corrupt_archive() {
    let test_dir = TestDir::new().unwrap();

    for name in ["corrupt.zip", "corrupt.7z"] {
        let archive = test_dir.create_file(name, b"definitely not an archive").unwrap();
        let err = FileInfoRetriever::new(&archive)
            .get_file_info(&[HashAlgorithm::Crc32])
            .unwrap_err();
        assert!(matches!(err, Error::ArchiveReadFailure { .. }), "{:?}", err);
    }
}

#[test]
fn test_unsupported_suffix() {
    let err = FileInfoRetriever::new(Path::new("photos.rar"))
        .get_file_info(&[HashAlgorithm::Crc32])
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
}

#[test]
fn test_file_info_json() {
    let test_dir = TestDir::new().unwrap();
    let jpeg = test_dir.create_file("jpeg.jpg", &jpeg_payload().unwrap()).unwrap();
    let archive = packed(&test_dir, &[jpeg], "jpeg.zip");

    let infos = FileInfoRetriever::new(&archive)
        .get_file_info(&[HashAlgorithm::Crc32, HashAlgorithm::Blake3])
        .unwrap();
    let json = serde_json::to_string(&infos).unwrap();
    assert!(json.contains("\"name\":\"jpeg.jpg\""));
    assert!(json.contains("\"algorithm\":\"blake3\""));

    let parsed: Vec<FileInfo> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, infos);
}
