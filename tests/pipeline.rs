//! End-to-end: `docker save` archive on disk → inventory → local feed → report.

use std::io::Write;

use apkscan::feed::FeedFetcher;
use apkscan::pipeline::Pipeline;
use apkscan::source::{ArchiveSource, LayerSource};
use apkscan::{Package, ScanError};
use tempfile::NamedTempFile;

#[allow(dead_code)]
#[path = "../src/test_support.rs"]
mod test_support;

use test_support::{gzip_layer, serve_once, tar_bytes, TarEntry};

fn image_archive(layers: &[(&str, Vec<u8>)]) -> NamedTempFile {
    let listed: Vec<&str> = layers.iter().map(|(p, _)| *p).collect();
    image_archive_listing(&listed, layers)
}

/// Writes an archive whose manifest lists `listed`, containing only `blobs`.
fn image_archive_listing(listed: &[&str], blobs: &[(&str, Vec<u8>)]) -> NamedTempFile {
    let layer_paths: Vec<String> = listed.iter().map(|p| format!("\"{}\"", p)).collect();
    let manifest = format!(
        r#"[{{"Config":"config.json","RepoTags":["alpine:3.18"],"Layers":[{}]}}]"#,
        layer_paths.join(",")
    );

    let mut entries: Vec<TarEntry<'_>> =
        blobs.iter().map(|(p, b)| TarEntry::file(p, b)).collect();
    entries.push(TarEntry::file("manifest.json", manifest.as_bytes()));

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&tar_bytes(&entries)).unwrap();
    file.flush().unwrap();
    file
}

/// Serves one canned feed response and returns the base URL.
async fn feed_server(status: &'static str, body: &'static str) -> String {
    serve_once(status, body).await.0
}

fn pipeline_for(base_url: &str) -> Pipeline {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let fetcher = FeedFetcher::with_client(client, base_url, "main");
    Pipeline::new(Box::new(fetcher), true)
}

const FEED: &str = r#"{"packages":[
    {"pkg":{"name":"musl","secfixes":{"1.2.3-r0":["CVE-2023-0001"],"1.1.24-r3":["CVE-2020-28928"]}}},
    {"pkg":{"name":"busybox","secfixes":{"1.36.1-r0":["CVE-2022-48174"]}}}
]}"#;

#[tokio::test]
async fn single_layer_image_reports_musl() {
    let layer = gzip_layer(&[
        TarEntry::file("bin/busybox", b"\x7fELF"),
        TarEntry::file("etc/os-release", b"NAME=\"Alpine Linux\"\nVERSION_ID=\"3.18.0\"\n"),
        TarEntry::file(
            "lib/apk/db/installed",
            b"P:musl\nV:1.2.3-r0\nA:x86_64\n\nP:busybox\nV:1.35.0-r1\nA:x86_64\n",
        ),
    ]);
    let archive = image_archive(&[("blobs/sha256/aaa", layer)]);
    let pipeline = pipeline_for(&feed_server("200 OK", FEED).await);

    let mut source = ArchiveSource::open(archive.path()).unwrap();
    assert_eq!(source.image(), "alpine:3.18");

    let scan = pipeline.scan(&mut source).await.unwrap();
    assert_eq!(
        scan.inventory.packages,
        vec![Package::new("musl", "1.2.3-r0"), Package::new("busybox", "1.35.0-r1")]
    );
    assert_eq!(scan.inventory.os_version, "3.18.0");

    let report = pipeline.assess(&scan.inventory).await.unwrap();
    assert_eq!(report.vulnerabilities.len(), 1);
    assert_eq!(report.vulnerabilities[0].package_name, "musl");
    assert_eq!(report.vulnerabilities[0].installed_version, "1.2.3-r0");
    assert_eq!(report.vulnerabilities[0].cve_identifiers, vec!["CVE-2023-0001"]);
}

#[tokio::test]
async fn multi_layer_image_skips_missing_layer() {
    let base = gzip_layer(&[TarEntry::file("lib/apk/db/installed", b"P:musl\nV:1.2.3-r0\n")]);
    let upgrade = gzip_layer(&[TarEntry::file(
        "lib/apk/db/installed",
        b"P:musl\nV:1.2.3-r0\n\nP:zlib\nV:1.3-r2\n",
    )]);
    let release = tar_bytes(&[TarEntry::file("etc/os-release", b"VERSION_ID=3.18.4\n")]);
    let archive = image_archive_listing(
        &["blobs/sha256/base", "blobs/sha256/gone", "blobs/sha256/upgrade", "blobs/sha256/release"],
        &[
            ("blobs/sha256/release", release),
            ("blobs/sha256/base", base),
            ("blobs/sha256/upgrade", upgrade),
        ],
    );
    let pipeline = pipeline_for(&feed_server("200 OK", FEED).await);

    let mut source = ArchiveSource::open(archive.path()).unwrap();
    let scan = pipeline.scan(&mut source).await.unwrap();

    assert_eq!(
        scan.inventory.packages,
        vec![
            Package::new("musl", "1.2.3-r0"),
            Package::new("musl", "1.2.3-r0"),
            Package::new("zlib", "1.3-r2"),
        ]
    );
    assert_eq!(scan.inventory.os_version, "3.18.4");
    assert_eq!(scan.skipped.len(), 1);
    assert_eq!(scan.skipped[0].digest, "sha256:gone");

    // Each copy of musl is reported.
    let report = pipeline.assess(&scan.inventory).await.unwrap();
    assert_eq!(report.vulnerabilities.len(), 2);
    assert_eq!(report.feed_version, "3.18");
}

#[tokio::test]
async fn missing_feed_is_a_typed_error() {
    let layer = gzip_layer(&[TarEntry::file("etc/os-release", b"VERSION_ID=3.99.0\n")]);
    let archive = image_archive(&[("blobs/sha256/only", layer)]);
    let pipeline = pipeline_for(&feed_server("404 Not Found", "").await);

    let mut source = ArchiveSource::open(archive.path()).unwrap();
    let scan = pipeline.scan(&mut source).await.unwrap();
    let result = pipeline.assess(&scan.inventory).await;

    match result {
        Err(ScanError::FeedUnavailable { url, .. }) => assert!(url.ends_with("/v3.99/main.json")),
        other => panic!("expected FeedUnavailable, got {:?}", other),
    }
}
