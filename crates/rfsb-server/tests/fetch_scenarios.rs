//! Full fetches through the coordinator over an in-memory stream.

use std::collections::BTreeMap;

use md5::{Digest, Md5};

use rfsb_core::config::FetchConfig;
use rfsb_core::protocol::{Chunk, FetchRequest, FetchSummary, Message};
use rfsb_server::FetchCoordinator;
use rfsb_server::fetch::SkipReason;
use rfsb_test_utils::{TestTree, mock_stream_pair_with_capacity, patterned_bytes};

/// Run one fetch and collect everything the client would see.
async fn fetch(
    tree: &TestTree,
    request: FetchRequest,
    config: FetchConfig,
) -> (rfsb_server::FetchOutcome, Vec<Message>) {
    let coordinator = FetchCoordinator::new(tree.path(), config);
    let (mut server, mut client) = mock_stream_pair_with_capacity(4096);

    let outcome = coordinator.run(request, &mut server).await.unwrap();
    drop(server);
    (outcome, client.drain().await)
}

/// Group chunks by name, keeping arrival order within each file.
fn by_file(messages: &[Message]) -> BTreeMap<String, Vec<Chunk>> {
    let mut files: BTreeMap<String, Vec<Chunk>> = BTreeMap::new();
    for msg in messages {
        if let Message::Chunk(chunk) = msg {
            files.entry(chunk.name.clone()).or_default().push(chunk.clone());
        }
    }
    files
}

fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

fn assert_well_formed(chunks: &[Chunk], content: &[u8]) {
    let parts = chunks.len() as u64;
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.part, i as u64 + 1);
        assert_eq!(chunk.parts, parts);
        assert_eq!(chunk.size, content.len() as u64);
        assert_eq!(chunk.digest.is_some(), chunk.is_last());
    }
    let joined: Vec<u8> = chunks.iter().flat_map(|c| c.data.iter().copied()).collect();
    assert_eq!(joined, content);
    assert_eq!(
        chunks.last().and_then(|c| c.digest.clone()),
        Some(md5_hex(content))
    );
}

#[tokio::test]
async fn scenario_a_single_file_three_chunks() {
    let tree = TestTree::new();
    let content = patterned_bytes(150_000, 7);
    tree.file("a.txt", &content);

    let (outcome, messages) = fetch(
        &tree,
        FetchRequest::new(Vec::<String>::new(), ["a.txt"]),
        FetchConfig::default(),
    )
    .await;

    let files = by_file(&messages);
    let chunks = &files["a.txt"];
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks.iter().map(|c| c.data.len()).collect::<Vec<_>>(), vec![65536, 65536, 18928]);
    assert_well_formed(chunks, &content);

    assert_eq!(
        messages.last(),
        Some(&Message::FetchEnd(FetchSummary {
            files: 1,
            chunks: 3,
            bytes: 150_000
        }))
    );
    assert_eq!(outcome.report.streamed, 1);
}

#[tokio::test]
async fn scenario_b_empty_directory() {
    let tree = TestTree::new();
    tree.dir("empty_dir");

    let (outcome, messages) = fetch(
        &tree,
        FetchRequest::new(["empty_dir"], Vec::<String>::new()),
        FetchConfig::default(),
    )
    .await;

    assert_eq!(messages, vec![Message::FetchEnd(FetchSummary::default())]);
    assert_eq!(outcome.summary, FetchSummary::default());
    assert!(outcome.report.skipped.is_empty());
}

#[tokio::test]
async fn scenario_c_missing_file() {
    let tree = TestTree::new();

    let (outcome, messages) = fetch(
        &tree,
        FetchRequest::new(Vec::<String>::new(), ["missing.txt"]),
        FetchConfig::default(),
    )
    .await;

    assert_eq!(messages, vec![Message::FetchEnd(FetchSummary::default())]);
    assert_eq!(outcome.report.skipped.len(), 1);
    assert_eq!(outcome.report.skipped[0].name, "missing.txt");
    assert_eq!(outcome.report.skipped[0].reason, SkipReason::NotFound);
}

#[tokio::test]
async fn scenario_d_nested_file_only() {
    rfsb_core::logging::init_test_logging();
    let tree = TestTree::new();
    let content = patterned_bytes(200_000, 3);
    tree.file("d/sub/deep.bin", &content);

    let (outcome, messages) = fetch(
        &tree,
        FetchRequest::new(["d"], Vec::<String>::new()),
        FetchConfig::default(),
    )
    .await;

    // Every chunk of the nested file precedes the end marker
    assert!(matches!(messages.last(), Some(Message::FetchEnd(_))));
    let files = by_file(&messages);
    assert_eq!(files.keys().collect::<Vec<_>>(), vec!["d/sub/deep.bin"]);
    assert_well_formed(&files["d/sub/deep.bin"], &content);
    assert_eq!(outcome.summary.files, 1);
    assert_eq!(outcome.summary.chunks, 4);
}

#[tokio::test]
async fn zero_byte_file_gets_one_empty_chunk() {
    let tree = TestTree::new();
    tree.file("empty.txt", b"");

    let (_, messages) = fetch(
        &tree,
        FetchRequest::new(Vec::<String>::new(), ["empty.txt"]),
        FetchConfig::default(),
    )
    .await;

    let files = by_file(&messages);
    let chunks = &files["empty.txt"];
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].data.is_empty());
    assert_eq!((chunks[0].part, chunks[0].parts), (1, 1));
    assert_eq!(chunks[0].digest.as_deref(), Some("d41d8cd98f00b204e9800998ecf8427e"));
}

#[tokio::test]
async fn many_files_interleave_but_stay_ordered() {
    let tree = TestTree::new();
    let mut expected = BTreeMap::new();
    for i in 0..12 {
        let name = format!("tree/level{}/file{}.bin", i % 3, i);
        let content = patterned_bytes(1000 + i * 517, i as u8);
        tree.file(&name, &content);
        expected.insert(name, content);
    }
    let config = FetchConfig::default()
        .with_chunk_size(256)
        .with_channel_capacity(4)
        .with_max_open_files(5)
        .with_max_dir_listings(2);

    let (outcome, messages) =
        fetch(&tree, FetchRequest::new(["tree"], Vec::<String>::new()), config).await;

    let files = by_file(&messages);
    assert_eq!(files.len(), expected.len());
    for (name, content) in &expected {
        assert_well_formed(&files[name], content);
    }
    assert_eq!(outcome.summary.files, 12);
    assert_eq!(
        outcome.summary.bytes,
        expected.values().map(|c| c.len() as u64).sum::<u64>()
    );
}

#[tokio::test]
async fn refetch_produces_identical_digests() {
    let tree = TestTree::new();
    tree.file("d/x.bin", &patterned_bytes(70_000, 1))
        .file("d/y.bin", &patterned_bytes(10, 2));
    let request = FetchRequest::new(["d"], Vec::<String>::new());

    let (_, first) = fetch(&tree, request.clone(), FetchConfig::default()).await;
    let (_, second) = fetch(&tree, request, FetchConfig::default()).await;

    let digests = |messages: &[Message]| -> BTreeMap<String, Option<String>> {
        by_file(messages)
            .into_iter()
            .map(|(name, chunks)| (name, chunks.last().and_then(|c| c.digest.clone())))
            .collect()
    };
    assert_eq!(digests(&first), digests(&second));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_request_items_stream_each_file_once() {
    let tree = TestTree::new();
    let big = patterned_bytes(300_000, 5);
    let nested = patterned_bytes(5_000, 6);
    tree.file("d/a.bin", &big).file("d/sub/n.bin", &nested);

    let config = FetchConfig::default()
        .with_chunk_size(1024)
        .with_channel_capacity(4);
    let request = FetchRequest::new(["d", "d/sub"], ["d/a.bin", "./d/a.bin", "d/sub/n.bin"]);

    let (outcome, messages) = fetch(&tree, request, config).await;

    let files = by_file(&messages);
    assert_eq!(files.len(), 2);
    assert_well_formed(&files["d/a.bin"], &big);
    assert_well_formed(&files["d/sub/n.bin"], &nested);
    assert_eq!(outcome.summary.files, 2);
    assert_eq!(outcome.summary.chunks, 293 + 5);

    let duplicates = outcome
        .report
        .skipped
        .iter()
        .filter(|s| s.reason == SkipReason::Duplicate)
        .count();
    assert_eq!(duplicates, 1);
}
