//! Subprocess runner tests, using `sh` in place of the deploy tool

#![cfg(unix)]

use std::time::Duration;

use edgecheck_e2e::{CommandOptions, CommandRunner, E2eError};

fn sh() -> CommandRunner {
    CommandRunner::new("sh", "https://registry.example/graphql", "secret-token")
}

fn script(body: &str) -> CommandOptions {
    CommandOptions::new(["-c", body])
}

#[tokio::test]
async fn captures_both_streams() {
    let out = sh()
        .run(script("printf 'to stdout\\n'; printf 'to stderr\\n' >&2"))
        .await
        .unwrap();

    assert_eq!(out.code, 0);
    assert!(out.success());
    assert_eq!(out.stdout, "to stdout\n");
    assert_eq!(out.stderr, "to stderr\n");
}

#[tokio::test]
async fn large_output_on_both_streams_does_not_deadlock() {
    // Well past a pipe buffer on each stream, interleaved.
    let body = "head -c 300000 /dev/zero | tr '\\0' e >&2; \
                head -c 300000 /dev/zero | tr '\\0' o; \
                head -c 300000 /dev/zero | tr '\\0' e >&2";

    let out = tokio::time::timeout(Duration::from_secs(30), sh().run(script(body)))
        .await
        .expect("runner deadlocked")
        .unwrap();

    assert_eq!(out.stdout.len(), 300_000);
    assert!(out.stdout.bytes().all(|b| b == b'o'));
    assert_eq!(out.stderr.len(), 600_000);
    assert!(out.stderr.bytes().all(|b| b == b'e'));
}

#[tokio::test]
async fn non_zero_exit_fails_with_captured_output() {
    let err = sh()
        .run(script("echo partial; echo broken >&2; exit 3"))
        .await
        .unwrap_err();

    match err {
        E2eError::CommandFailed {
            args,
            code,
            stdout,
            stderr,
        } => {
            assert_eq!(code, 3);
            assert_eq!(args[0], "-c");
            assert_eq!(stdout, "partial\n");
            assert_eq!(stderr, "broken\n");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn allow_failure_returns_output() {
    let out = sh()
        .run(script("echo nope >&2; exit 7").allow_failure())
        .await
        .unwrap();

    assert_eq!(out.code, 7);
    assert!(!out.success());
    assert_eq!(out.stderr, "nope\n");
}

#[tokio::test]
async fn stdin_is_written_and_closed() {
    let out = sh()
        .run(script("cat").stdin("line one\nline two\n"))
        .await
        .unwrap();

    assert_eq!(out.stdout, "line one\nline two\n");
}

#[tokio::test]
async fn unread_stdin_does_not_fail_the_command() {
    let out = tokio::time::timeout(
        Duration::from_secs(30),
        sh().run(script("echo done; exit 0").stdin("x".repeat(1 << 20))),
    )
    .await
    .expect("runner hung")
    .unwrap();

    assert_eq!(out.code, 0);
    assert_eq!(out.stdout, "done\n");
}

#[tokio::test]
async fn unread_stdin_still_reports_exit_code() {
    let err = sh()
        .run(script("echo oops >&2; exit 4").stdin("y".repeat(1 << 20)))
        .await
        .unwrap_err();

    match err {
        E2eError::CommandFailed { code, stderr, .. } => {
            assert_eq!(code, 4);
            assert_eq!(stderr, "oops\n");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn runs_in_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "here").unwrap();

    let out = sh().run(script("cat marker.txt").cwd(dir.path())).await.unwrap();

    assert_eq!(out.stdout, "here");
}

#[tokio::test]
async fn injects_registry_credentials() {
    let out = sh()
        .run(script("printf '%s|%s' \"$WASMER_REGISTRY\" \"$WASMER_TOKEN\""))
        .await
        .unwrap();

    assert_eq!(out.stdout, "https://registry.example/graphql|secret-token");
}

#[tokio::test]
async fn caller_environment_wins() {
    let out = sh()
        .run(
            script("printf '%s|%s' \"$WASMER_TOKEN\" \"$EXTRA\"")
                .env("WASMER_TOKEN", "override")
                .env("EXTRA", "value"),
        )
        .await
        .unwrap();

    assert_eq!(out.stdout, "override|value");
}

#[tokio::test]
async fn missing_binary_is_a_spawn_error() {
    let runner = CommandRunner::new("/nonexistent/wasmer-binary", "r", "t");
    let err = runner.run(CommandOptions::new(["deploy"])).await.unwrap_err();

    assert!(matches!(err, E2eError::CommandSpawn { .. }), "{err:?}");
}

#[tokio::test]
async fn invalid_utf8_is_replaced() {
    let out = sh().run(script("printf 'ok\\377'")).await.unwrap();
    assert_eq!(out.stdout, "ok\u{FFFD}");
}
