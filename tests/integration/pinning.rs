use std::sync::Mutex;

use axum::http::header::{HOST, LOCATION};
use axum::http::HeaderMap;

use netflood_engine::{ByteCounter, FetchError, Fetcher};

use crate::*;

const BODY_LEN: usize = 4096;

/// A mirror that remembers the Host header of every `/blob` request and
/// redirects from `/redir` (to another name) and `/redir-ip` (to another IP).
#[derive(Clone)]
struct EchoState {
    port: u16,
    hosts: Arc<Mutex<Vec<String>>>,
}

async fn start_echo_mirror() -> Result<EchoState> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let state = EchoState {
        port: listener.local_addr()?.port(),
        hosts: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/blob", get(blob))
        .route("/redir", get(redirect_to_name))
        .route("/redir-ip", get(redirect_to_ip))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(state)
}

async fn blob(State(state): State<EchoState>, headers: HeaderMap) -> Bytes {
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.hosts.lock().unwrap().push(host);
    Bytes::from(vec![0u8; BODY_LEN])
}

async fn redirect_to_name(State(state): State<EchoState>) -> Response {
    let location = format!("http://other-cdn.test:{}/blob", state.port);
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

async fn redirect_to_ip(State(state): State<EchoState>) -> Response {
    let location = format!("http://10.255.255.1:{}/blob", state.port);
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

fn seen_hosts(state: &EchoState) -> Vec<String> {
    state.hosts.lock().unwrap().clone()
}

#[tokio::test]
async fn redirect_to_another_name_stays_on_the_pinned_ip() {
    let mirror = start_echo_mirror().await.unwrap();
    let fetcher = Fetcher::new(ByteCounter::new());
    let task = DownloadTask::new(
        "127.0.0.1",
        format!("http://mirror.test:{}/redir", mirror.port),
    );

    let bytes = fetcher.fetch(&task).await.unwrap();
    assert_eq!(bytes, BODY_LEN as u64);
    assert_eq!(fetcher.counter().get(), BODY_LEN as u64);
    assert_eq!(
        seen_hosts(&mirror),
        vec![format!("other-cdn.test:{}", mirror.port)]
    );
}

#[tokio::test]
async fn redirect_to_a_foreign_ip_is_not_followed() {
    let mirror = start_echo_mirror().await.unwrap();
    let fetcher = Fetcher::new(ByteCounter::new());
    let task = DownloadTask::new(
        "127.0.0.1",
        format!("http://mirror.test:{}/redir-ip", mirror.port),
    );

    let err = fetcher.fetch(&task).await.unwrap_err();
    assert!(
        matches!(err, FetchError::Status(status) if status.as_u16() == 302),
        "{err}"
    );
    assert_eq!(fetcher.counter().get(), 0);
    assert!(seen_hosts(&mirror).is_empty());
}

#[tokio::test]
async fn host_header_comes_from_the_url() {
    let mirror = start_echo_mirror().await.unwrap();
    let fetcher = Fetcher::new(ByteCounter::new());

    let named = DownloadTask::new(
        "127.0.0.1",
        format!("http://named.test:{}/blob", mirror.port),
    );
    let literal = DownloadTask::new(
        "127.0.0.1",
        format!("http://10.9.9.9:{}/blob", mirror.port),
    );
    fetcher.fetch(&named).await.unwrap();
    fetcher.fetch(&literal).await.unwrap();

    assert_eq!(
        seen_hosts(&mirror),
        vec![
            format!("named.test:{}", mirror.port),
            format!("10.9.9.9:{}", mirror.port),
        ]
    );
}
