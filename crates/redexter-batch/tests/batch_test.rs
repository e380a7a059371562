//! End-to-end batch scenarios over real crypt files in a temp dir.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crypto_secretbox::{
    aead::{Aead, KeyInit},
    Nonce, XSalsa20Poly1305,
};
use redexter_batch::{spawn, BatchEvent, BatchOutcome, DecryptionJob, EventFn, Orchestrator};
use redexter_core::BatchState;
use redexter_crypto::{DataKey, FileNonce, BLOCK_DATA_SIZE, FILE_MAGIC, KEY_SIZE};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const KEY: [u8; KEY_SIZE] = [0x5Cu8; KEY_SIZE];

fn seal_file(plaintext: &[u8]) -> Vec<u8> {
    let initial = [0x07u8; 24];
    let cipher = XSalsa20Poly1305::new((&KEY).into());
    let mut nonce = FileNonce::from_bytes(initial);

    let mut out = FILE_MAGIC.to_vec();
    out.extend_from_slice(&initial);
    for chunk in plaintext.chunks(BLOCK_DATA_SIZE) {
        out.extend_from_slice(
            &cipher
                .encrypt(Nonce::from_slice(nonce.as_bytes()), chunk)
                .expect("seal"),
        );
        nonce.increment();
    }
    out
}

fn write_encrypted(dir: &Path, name: &str, plaintext: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, seal_file(plaintext)).expect("write fixture");
    path
}

fn recorder() -> (EventFn, Arc<Mutex<Vec<BatchEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let cb: EventFn = Box::new(move |e: &BatchEvent| sink.lock().unwrap().push(e.clone()));
    (cb, events)
}

fn progress_of(events: &[BatchEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            BatchEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect()
}

#[test]
fn all_files_succeed() {
    let tmp = TempDir::new().unwrap();
    let files = vec![
        write_encrypted(tmp.path(), "a.txt.bin", b"alpha"),
        write_encrypted(tmp.path(), "b.txt.bin", b"bravo"),
        write_encrypted(tmp.path(), "c.txt.bin", b"charlie"),
    ];
    let dest = tmp.path().join("out");
    let job = DecryptionJob::new(files, DataKey::from_bytes(KEY), Some(dest.clone())).unwrap();
    let orchestrator = Orchestrator::new(job);
    let status = orchestrator.status();
    let (cb, events) = recorder();

    let outcome = orchestrator.run(&CancellationToken::new(), Some(&cb));

    assert_eq!(outcome, BatchOutcome::Completed { files: 3 });
    assert_eq!(status.state(), BatchState::Completed);
    assert_eq!(status.progress(), 100);

    let events = events.lock().unwrap();
    assert_eq!(progress_of(&events), vec![33, 67, 100]);
    assert!(matches!(
        events.last(),
        Some(BatchEvent::Finished(BatchOutcome::Completed { files: 3 }))
    ));
    assert_eq!(std::fs::read(dest.join("b.txt")).unwrap(), b"bravo");
    assert_eq!(std::fs::read(dest.join("c.txt")).unwrap(), b"charlie");
}

#[test]
fn failure_stops_the_batch() {
    let tmp = TempDir::new().unwrap();
    let first = write_encrypted(tmp.path(), "one.bin", b"first file");
    let broken = tmp.path().join("two.bin");
    let mut sealed = seal_file(b"tampered on disk");
    // first ciphertext byte after magic, nonce and tag
    sealed[8 + 24 + 16] ^= 0x01;
    std::fs::write(&broken, sealed).unwrap();
    let third = write_encrypted(tmp.path(), "three.bin", b"never reached");

    let job = DecryptionJob::new(
        vec![first, broken.clone(), third],
        DataKey::from_bytes(KEY),
        None,
    )
    .unwrap();
    let (cb, events) = recorder();

    let outcome = Orchestrator::new(job).run(&CancellationToken::new(), Some(&cb));

    match &outcome {
        BatchOutcome::Failed { file, reason } => {
            assert_eq!(file, &broken);
            assert!(reason.contains("decryption failed"), "reason: {reason}");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(progress_of(&events.lock().unwrap()), vec![33]);
    assert_eq!(std::fs::read(tmp.path().join("one")).unwrap(), b"first file");
    assert!(!tmp.path().join("three").exists());
}

#[test]
fn non_crypt_file_fails_with_header_reason() {
    let tmp = TempDir::new().unwrap();
    let plain = tmp.path().join("plain.bin");
    std::fs::write(&plain, b"this is not a crypt file at all").unwrap();

    let job = DecryptionJob::new(vec![plain.clone()], DataKey::from_bytes(KEY), None).unwrap();
    let outcome = Orchestrator::new(job).run(&CancellationToken::new(), None);

    match outcome {
        BatchOutcome::Failed { file, reason } => {
            assert_eq!(file, plain);
            assert!(reason.contains("invalid file header"), "reason: {reason}");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[test]
fn cancel_between_files() {
    let tmp = TempDir::new().unwrap();
    let files = vec![
        write_encrypted(tmp.path(), "x.bin", b"x"),
        write_encrypted(tmp.path(), "y.bin", b"y"),
    ];
    let job = DecryptionJob::new(files, DataKey::from_bytes(KEY), None).unwrap();
    let orchestrator = Orchestrator::new(job);
    let status = orchestrator.status();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let cb: EventFn = Box::new(move |e: &BatchEvent| {
        if matches!(e, BatchEvent::Progress { completed: 1, .. }) {
            trigger.cancel();
        }
    });

    let outcome = orchestrator.run(&cancel, Some(&cb));

    assert_eq!(outcome, BatchOutcome::Cancelled { completed: 1 });
    assert_eq!(status.state(), BatchState::Cancelled);
    assert_eq!(status.progress(), 50);
    assert!(tmp.path().join("x").exists());
    assert!(!tmp.path().join("y").exists());
}

#[test]
fn cancelled_before_start_touches_nothing() {
    let tmp = TempDir::new().unwrap();
    let files = vec![write_encrypted(tmp.path(), "x.bin", b"x")];
    let job = DecryptionJob::new(files, DataKey::from_bytes(KEY), None).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = Orchestrator::new(job).run(&cancel, None);

    assert_eq!(outcome, BatchOutcome::Cancelled { completed: 0 });
    assert!(!tmp.path().join("x").exists());
}

#[tokio::test]
async fn spawned_batch_streams_events() {
    let tmp = TempDir::new().unwrap();
    let big = vec![0xA5u8; 2 * BLOCK_DATA_SIZE + 10];
    let files = vec![
        write_encrypted(tmp.path(), "big.iso.bin", &big),
        write_encrypted(tmp.path(), "small.txt.bin", b"small"),
    ];
    let job = DecryptionJob::new(files, DataKey::from_bytes(KEY), None).unwrap();

    let mut handle = spawn(job, None).expect("spawn worker");
    let mut received = Vec::new();
    while let Some(event) = handle.events.recv().await {
        received.push(event);
    }

    assert_eq!(progress_of(&received), vec![50, 100]);
    let done: Vec<_> = received
        .iter()
        .filter_map(|e| match e {
            BatchEvent::FileDone(s) => Some(s.output.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        done,
        vec![tmp.path().join("big.iso"), tmp.path().join("small.txt")]
    );
    assert_eq!(handle.progress(), 100);
    assert_eq!(handle.state(), BatchState::Completed);

    let outcome = tokio::task::spawn_blocking(move || handle.join())
        .await
        .expect("blocking join task")
        .expect("join");
    assert_eq!(outcome, BatchOutcome::Completed { files: 2 });
    assert_eq!(std::fs::read(tmp.path().join("big.iso")).unwrap(), big);
}

#[test]
fn spawned_batch_runs_callback_on_worker() {
    let tmp = TempDir::new().unwrap();
    let files = vec![write_encrypted(tmp.path(), "only.bin", b"payload")];
    let job = DecryptionJob::new(files, DataKey::from_bytes(KEY), None).unwrap();
    let (cb, events) = recorder();

    let handle = spawn(job, Some(cb)).unwrap();
    let outcome = handle.join().unwrap();

    assert!(outcome.is_success());
    let events = events.lock().unwrap();
    assert!(matches!(events.last(), Some(BatchEvent::Finished(_))));
    assert_eq!(progress_of(&events), vec![100]);
}
