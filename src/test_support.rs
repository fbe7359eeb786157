// Test Support - In-process HTTP stub for the NEO backend
// Serves canned JSON per route and records every request target.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::api_client::NeoApiClient;

#[derive(Debug, Clone)]
pub struct Route {
    pub path: &'static str,
    /// Route only matches when the query string contains this key.
    pub query_key: Option<&'static str>,
    pub status: u16,
    pub body: String,
}

impl Route {
    pub fn ok(path: &'static str, query_key: Option<&'static str>, body: &str) -> Self {
        Self::status(path, query_key, 200, body)
    }

    pub fn status(path: &'static str, query_key: Option<&'static str>, status: u16, body: &str) -> Self {
        Self {
            path,
            query_key,
            status,
            body: body.to_string(),
        }
    }

    fn matches(&self, target: &str) -> bool {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        path == self.path
            && self.query_key.map_or(true, |key| {
                query.split('&').any(|pair| pair.split('=').next() == Some(key))
            })
    }
}

pub struct StubServer {
    pub base_url: String,
    hits: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn spawn(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let server_hits = hits.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let routes = routes.clone();
                let hits = server_hits.clone();
                tokio::spawn(async move {
                    serve(socket, &routes, &hits).await;
                });
            }
        });

        Self { base_url, hits }
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().clone()
    }

    pub fn hit_count(&self) -> usize {
        self.hits.lock().len()
    }

    pub fn hits_matching(&self, needle: &str) -> usize {
        self.hits.lock().iter().filter(|h| h.contains(needle)).count()
    }
}

async fn serve(mut socket: TcpStream, routes: &[Route], hits: &Mutex<Vec<String>>) {
    let mut buf = vec![0u8; 16 * 1024];
    let mut read = 0;
    loop {
        let n = match socket.read(&mut buf[read..]).await {
            Ok(n) => n,
            Err(_) => return,
        };
        if n == 0 {
            break;
        }
        read += n;
        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") || read == buf.len() {
            break;
        }
    }

    let request = String::from_utf8_lossy(&buf[..read]);
    let target = request.split_whitespace().nth(1).unwrap_or("/").to_string();
    hits.lock().push(target.clone());

    let (status, body) = routes
        .iter()
        .find(|route| route.matches(&target))
        .map(|route| (route.status, route.body.clone()))
        .unwrap_or((404, r#"{"error": "not found"}"#.to_string()));

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        if status < 400 { "OK" } else { "Error" },
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Client pointed at `server`, bypassing any system proxy.
pub fn stub_client(server: &StubServer) -> NeoApiClient {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    NeoApiClient::with_client(server.base_url.clone(), client)
}
