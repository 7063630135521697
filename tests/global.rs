//! The process-wide lookup, configured through the environment.
//!
//! Kept to a single test so the shared instance is created once, after the
//! environment points at the mock server.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cloud_info::{get_cloud_info, CloudInfoResult, LoadState};

const SNAPSHOT: &str = include_str!("fixtures/cidrs.json");

#[tokio::test]
async fn test_get_cloud_info_scenarios() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cidrs.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SNAPSHOT))
        .expect(1)
        .mount(&server)
        .await;
    std::env::set_var(
        "CLOUD_INFO_SNAPSHOT_URL",
        format!("{}/cidrs.json", server.uri()),
    );

    assert_eq!(get_cloud_info(None).await.unwrap(), CloudInfoResult::default());

    let cases = [
        ("localhost", (false, false, false)),
        ("127.0.0.1", (false, false, false)),
        ("::1", (false, false, false)),
        ("13.248.118.1", (true, false, false)),
        ("8.34.208.1", (false, true, false)),
        ("13.64.151.161", (false, false, true)),
    ];
    for (host, (is_aws, is_gcp, is_azure)) in cases {
        let result = get_cloud_info(Some(host)).await.unwrap();
        assert_eq!(
            result,
            CloudInfoResult {
                is_aws,
                is_gcp,
                is_azure
            },
            "{host}"
        );
    }

    let shared = cloud_info::default_cloud_info().unwrap();
    assert_eq!(shared.load_state(), LoadState::Ready);
}
