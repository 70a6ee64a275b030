use std::net::TcpListener;
use std::sync::Mutex;
use std::time::Duration;

use httpmock::Method::{GET, POST, PUT};
use httpmock::MockServer;
use tempfile::tempdir;
use todus_fetch::{Error, HttpConfig, ServiceClient, part_path};

fn can_bind_localhost() -> bool { TcpListener::bind("127.0.0.1:0").is_ok() }

fn client(server: &MockServer) -> ServiceClient {
    ServiceClient::new(HttpConfig {
        auth_url: server.base_url(),
        stall_backoff: Duration::from_millis(10),
        ..HttpConfig::default()
    })
    .unwrap()
}

const PAYLOAD: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[tokio::test]
async fn test_login_returns_printable_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v2/auth/token")
                .header("content-type", "application/x-protobuf")
                .header("user-agent", "ToDus 0.40.29 Auth");
            then.status(200).body(b"\x0a\xc4\x02eyJh.eyJ1.sig\x10\x01".as_slice());
        })
        .await;

    let token = client(&server).login("5355555555", "secret").await.unwrap();
    assert_eq!(token, "eyJh.eyJ1.sig");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_login_forbidden_is_unauthorized() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/auth/token");
            then.status(403);
        })
        .await;

    let err = client(&server).login("5355555555", "stale").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized));
}

#[tokio::test]
async fn test_validate_code_extracts_password() {
    if !can_bind_localhost() {
        return;
    }
    let password = "P".repeat(96);
    let mut reply = b"\x0a\x0a5355555555\x12`".to_vec();
    reply.extend_from_slice(password.as_bytes());

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/auth/users.register");
            then.status(200).body(reply.clone());
        })
        .await;

    let got = client(&server).validate_code("5355555555", "123456").await.unwrap();
    assert_eq!(got, password);
}

#[tokio::test]
async fn test_request_code_reports_status() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/auth/users.reserve");
            then.status(500);
        })
        .await;

    let err = client(&server).request_code("5355555555").await.unwrap_err();
    assert!(matches!(err, Error::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_upload_puts_with_bearer() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/todus/voice/part")
                .header("authorization", "Bearer tok")
                .header("user-agent", "ToDus 0.40.29 HTTP-Upload")
                .body("hello part");
            then.status(201);
        })
        .await;

    client(&server)
        .upload("tok", &server.url("/todus/voice/part"), b"hello part".to_vec())
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_download_fresh_file() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/f")
                .header("authorization", "Bearer tok")
                .header("user-agent", "ToDus 0.40.29 HTTP-Download");
            then.status(200).body(PAYLOAD);
        })
        .await;

    let dir = tempdir().unwrap();
    let target = dir.path().join("file.bin");
    let seen = Mutex::new(Vec::new());
    let size = client(&server)
        .download("tok", &server.url("/f"), &target, |pos, total| seen.lock().unwrap().push((pos, total)))
        .await
        .unwrap();

    assert_eq!(size, PAYLOAD.len() as u64);
    assert_eq!(std::fs::read(&target).unwrap(), PAYLOAD);
    assert!(!part_path(&target).exists());
    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.last(), Some(&(PAYLOAD.len() as u64, PAYLOAD.len() as u64)));
}

#[tokio::test]
async fn test_download_resumes_from_part_file() {
    if !can_bind_localhost() {
        return;
    }
    let split = 10;
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/f").header("range", format!("bytes={split}-"));
            then.status(206).body(&PAYLOAD[split..]);
        })
        .await;

    let dir = tempdir().unwrap();
    let target = dir.path().join("file.bin");
    std::fs::write(part_path(&target), &PAYLOAD[..split]).unwrap();

    let size = client(&server).download("tok", &server.url("/f"), &target, |_, _| {}).await.unwrap();

    mock.assert_async().await;
    assert_eq!(size, PAYLOAD.len() as u64);
    assert_eq!(std::fs::read(&target).unwrap(), PAYLOAD);
}

#[tokio::test]
async fn test_download_restarts_when_range_ignored() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/f");
            then.status(200).body(PAYLOAD);
        })
        .await;

    let dir = tempdir().unwrap();
    let target = dir.path().join("file.bin");
    std::fs::write(part_path(&target), b"stale bytes").unwrap();

    let size = client(&server).download("tok", &server.url("/f"), &target, |_, _| {}).await.unwrap();
    assert_eq!(size, PAYLOAD.len() as u64);
    assert_eq!(std::fs::read(&target).unwrap(), PAYLOAD);
}

#[tokio::test]
async fn test_download_error_status_keeps_part() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/f");
            then.status(404);
        })
        .await;

    let dir = tempdir().unwrap();
    let target = dir.path().join("file.bin");
    std::fs::write(part_path(&target), b"half").unwrap();

    let err = client(&server).download("tok", &server.url("/f"), &target, |_, _| {}).await.unwrap_err();
    assert!(matches!(err, Error::Status { status: 404, .. }));
    assert_eq!(std::fs::read(part_path(&target)).unwrap(), b"half");
    assert!(!target.exists());
}

/// Reads one request head and returns its `range` header line, if any.
async fn read_head(socket: &mut tokio::net::TcpStream) -> Option<String> {
    use tokio::io::AsyncReadExt;

    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }
    String::from_utf8_lossy(&head)
        .lines()
        .map(str::to_ascii_lowercase)
        .find(|line| line.starts_with("range:"))
}

#[tokio::test]
async fn test_download_recovers_from_broken_body() {
    use tokio::io::AsyncWriteExt;

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        return;
    };
    let addr = listener.local_addr().unwrap();
    let ranges = std::sync::Arc::new(Mutex::new(Vec::new()));

    let seen = ranges.clone();
    let server = tokio::spawn(async move {
        // Announce the whole payload, send a third of it, hang up.
        let (mut socket, _) = listener.accept().await.unwrap();
        let head = read_head(&mut socket).await;
        seen.lock().unwrap().push(head);
        let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n", PAYLOAD.len());
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&PAYLOAD[..12]).await.unwrap();
        socket.shutdown().await.unwrap();
        drop(socket);

        let (mut socket, _) = listener.accept().await.unwrap();
        let head = read_head(&mut socket).await;
        seen.lock().unwrap().push(head);
        let rest = &PAYLOAD[12..];
        let head = format!(
            "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\nContent-Range: bytes 12-{}/{}\r\nConnection: close\r\n\r\n",
            rest.len(),
            PAYLOAD.len() - 1,
            PAYLOAD.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(rest).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    let dir = tempdir().unwrap();
    let target = dir.path().join("song.mp3");
    let http = ServiceClient::new(HttpConfig { stall_backoff: Duration::from_millis(10), ..HttpConfig::default() }).unwrap();

    let size = http.download("tok", &format!("http://{addr}/get/1"), &target, |_, _| {}).await.unwrap();
    server.await.unwrap();

    assert_eq!(size, PAYLOAD.len() as u64);
    assert_eq!(*ranges.lock().unwrap(), vec![None, Some("range: bytes=12-".to_string())]);
    assert_eq!(std::fs::read(&target).unwrap(), PAYLOAD);
    assert!(!part_path(&target).exists());
}
