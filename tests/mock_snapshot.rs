//! Integration tests using wiremock to serve range snapshots.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cloud_info::{
    CloudInfo, CloudInfoError, CloudInfoResult, CloudProvider, Config, LoadState, SnapshotSource,
};

const SNAPSHOT: &str = include_str!("fixtures/cidrs.json");

const EMPTY_SNAPSHOT: &str = r#"{
  "aws": {"v4": [], "v6": []},
  "gcp": {"v4": [], "v6": []},
  "azure": {"v4": [], "v6": []}
}"#;

const SNAPSHOT_PATH: &str = "/cidrs.json";

fn snapshot_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(SNAPSHOT)
}

async fn setup_snapshot_mock(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(SNAPSHOT_PATH))
        .respond_with(snapshot_response())
        .mount(server)
        .await;
}

fn config_for(server: &MockServer) -> Config {
    Config::default().with_snapshot_url(format!("{}{}", server.uri(), SNAPSHOT_PATH))
}

fn cloud_info_for(server: &MockServer) -> CloudInfo {
    CloudInfo::from_config(&config_for(server)).unwrap()
}

fn only(provider: CloudProvider) -> CloudInfoResult {
    CloudInfoResult {
        is_aws: provider == CloudProvider::Aws,
        is_gcp: provider == CloudProvider::Gcp,
        is_azure: provider == CloudProvider::Azure,
    }
}

// =============================================================================
// Query Scenarios
// =============================================================================

mod query {
    use super::*;

    #[tokio::test]
    async fn test_absent_host_is_all_false_without_fetching() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(snapshot_response())
            .expect(0)
            .mount(&server)
            .await;

        let cloud_info = cloud_info_for(&server);
        assert_eq!(cloud_info.query(None).await.unwrap(), CloudInfoResult::default());
        assert_eq!(cloud_info.query(Some("")).await.unwrap(), CloudInfoResult::default());
    }

    #[tokio::test]
    async fn test_localhost() {
        let server = MockServer::start().await;
        setup_snapshot_mock(&server).await;

        let cloud_info = cloud_info_for(&server);
        let result = cloud_info.query(Some("localhost")).await.unwrap();

        assert_eq!(result, CloudInfoResult::default());
    }

    #[tokio::test]
    async fn test_loopback_addresses() {
        let server = MockServer::start().await;
        setup_snapshot_mock(&server).await;

        let cloud_info = cloud_info_for(&server);
        for host in ["127.0.0.1", "::1"] {
            let result = cloud_info.query(Some(host)).await.unwrap();
            assert_eq!(result, CloudInfoResult::default(), "{host}");
        }
    }

    #[tokio::test]
    async fn test_aws_address() {
        let server = MockServer::start().await;
        setup_snapshot_mock(&server).await;

        let cloud_info = cloud_info_for(&server);
        let result = cloud_info.query(Some("13.248.118.1")).await.unwrap();

        assert_eq!(result, only(CloudProvider::Aws));
    }

    #[tokio::test]
    async fn test_gcp_address() {
        let server = MockServer::start().await;
        setup_snapshot_mock(&server).await;

        let cloud_info = cloud_info_for(&server);
        let result = cloud_info.query(Some("8.34.208.1")).await.unwrap();

        assert_eq!(result, only(CloudProvider::Gcp));
    }

    #[tokio::test]
    async fn test_azure_address() {
        let server = MockServer::start().await;
        setup_snapshot_mock(&server).await;

        let cloud_info = cloud_info_for(&server);
        let result = cloud_info.query(Some("13.64.151.161")).await.unwrap();

        assert_eq!(result, only(CloudProvider::Azure));
    }

    #[tokio::test]
    async fn test_ipv6_addresses() {
        let server = MockServer::start().await;
        setup_snapshot_mock(&server).await;

        let cloud_info = cloud_info_for(&server);
        let cases = [
            ("2600:1f18::1", only(CloudProvider::Aws)),
            ("2600:1900::1", only(CloudProvider::Gcp)),
            ("2603:1000::1", only(CloudProvider::Azure)),
            ("2001:db8::1", CloudInfoResult::default()),
        ];
        for (host, expected) in cases {
            assert_eq!(cloud_info.query(Some(host)).await.unwrap(), expected, "{host}");
        }
    }

    #[tokio::test]
    async fn test_snapshot_fetched_once_for_many_queries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SNAPSHOT_PATH))
            .respond_with(snapshot_response())
            .expect(1)
            .mount(&server)
            .await;

        let cloud_info = cloud_info_for(&server);
        for host in ["13.248.118.1", "8.34.208.1", "13.64.151.161", "127.0.0.1"] {
            cloud_info.query(Some(host)).await.unwrap();
        }
    }
}

// =============================================================================
// Single-Flight Loading
// =============================================================================

mod single_flight {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_queries_share_one_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SNAPSHOT_PATH))
            .respond_with(snapshot_response().set_delay(Duration::from_millis(200)))
            .expect(1)
            .mount(&server)
            .await;

        let cloud_info = cloud_info_for(&server);
        let queries = (0..16).map(|_| cloud_info.query(Some("13.248.118.1")));
        let results = join_all(queries).await;

        for result in results {
            assert_eq!(result.unwrap(), only(CloudProvider::Aws));
        }
        assert_eq!(cloud_info.load_state(), LoadState::Ready);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_queries_share_one_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SNAPSHOT_PATH))
            .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(200)))
            .expect(1)
            .mount(&server)
            .await;

        let cloud_info = cloud_info_for(&server);
        let queries = (0..8).map(|_| cloud_info.query(Some("13.248.118.1")));
        let results = join_all(queries).await;

        for result in results {
            match result {
                Err(CloudInfoError::SnapshotUnavailable(source)) => {
                    assert!(matches!(*source, CloudInfoError::Http(503)))
                }
                other => panic!("expected unavailable snapshot, got {other:?}"),
            }
        }
        assert_eq!(cloud_info.load_state(), LoadState::Uninitialized);
    }

    #[tokio::test]
    async fn test_failure_then_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SNAPSHOT_PATH))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        setup_snapshot_mock(&server).await;

        let cloud_info = cloud_info_for(&server);

        let result = cloud_info.query(Some("8.34.208.1")).await;
        assert!(matches!(result, Err(CloudInfoError::SnapshotUnavailable(_))));
        assert_eq!(cloud_info.load_state(), LoadState::Uninitialized);

        let result = cloud_info.query(Some("8.34.208.1")).await.unwrap();
        assert_eq!(result, only(CloudProvider::Gcp));
        assert_eq!(cloud_info.load_state(), LoadState::Ready);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abandoned_query_does_not_cancel_load() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SNAPSHOT_PATH))
            .respond_with(snapshot_response().set_delay(Duration::from_millis(300)))
            .expect(1)
            .mount(&server)
            .await;

        let cloud_info = cloud_info_for(&server);

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            cloud_info.query(Some("13.64.151.161")),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(cloud_info.load_state(), LoadState::Loading);

        let result = cloud_info.query(Some("13.64.151.161")).await.unwrap();
        assert_eq!(result, only(CloudProvider::Azure));
    }
}

// =============================================================================
// Snapshot Sources
// =============================================================================

mod sources {
    use super::*;

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SNAPSHOT_PATH))
            .respond_with(snapshot_response().set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let config = config_for(&server).with_fetch_timeout(Duration::from_millis(100));
        let cloud_info = CloudInfo::from_config(&config).unwrap();
        let result = cloud_info.query(Some("13.248.118.1")).await;

        match result {
            Err(CloudInfoError::SnapshotUnavailable(source)) => {
                assert!(matches!(*source, CloudInfoError::Timeout))
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_snapshot_too_large() {
        let server = MockServer::start().await;
        setup_snapshot_mock(&server).await;

        let config = config_for(&server).with_max_snapshot_size(16);
        let cloud_info = CloudInfo::from_config(&config).unwrap();
        let result = cloud_info.query(Some("13.248.118.1")).await;

        match result {
            Err(CloudInfoError::SnapshotUnavailable(source)) => {
                assert!(matches!(*source, CloudInfoError::TooLarge(_, 16)))
            }
            other => panic!("expected too large, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SNAPSHOT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let cloud_info = cloud_info_for(&server);
        let result = cloud_info.query(Some("13.248.118.1")).await;

        match result {
            Err(CloudInfoError::SnapshotUnavailable(source)) => {
                assert!(matches!(*source, CloudInfoError::Json(_)))
            }
            other => panic!("expected json error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SNAPSHOT_PATH))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let fixture = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("cidrs.json");
        let config = config_for(&server).with_snapshot_file(fixture);
        let cloud_info = CloudInfo::from_config(&config).unwrap();

        let result = cloud_info.query(Some("13.64.151.161")).await.unwrap();
        assert_eq!(result, only(CloudProvider::Azure));
    }

    #[tokio::test]
    async fn test_falls_back_to_bundled_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SNAPSHOT_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let loader = cloud_info::SnapshotLoader::from_config(&config_for(&server))
            .unwrap()
            .with_fallback(SnapshotSource::Static(SNAPSHOT.as_bytes()));
        let cloud_info = CloudInfo::new(loader, cloud_info::DnsResolver::default());

        let result = cloud_info.query(Some("8.34.208.1")).await.unwrap();
        assert_eq!(result, only(CloudProvider::Gcp));
    }

    #[tokio::test]
    async fn test_reload_swaps_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SNAPSHOT_PATH))
            .respond_with(snapshot_response())
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(SNAPSHOT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_SNAPSHOT))
            .mount(&server)
            .await;

        let cloud_info = cloud_info_for(&server);
        let before = cloud_info.store().await.unwrap();
        assert!(cloud_info.query(Some("13.248.118.1")).await.unwrap().is_aws);

        let after = cloud_info.reload().await.unwrap();
        assert!(after.is_empty());
        assert!(!cloud_info.query(Some("13.248.118.1")).await.unwrap().is_aws);

        // Holders of the old store keep a complete view
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(before.contains(CloudProvider::Aws, &"13.248.118.1".parse().unwrap()));
    }
}
