//! Shared fixtures for integration tests: a scripted in-memory registry and
//! a throwaway HTTP server for exercising the real transport.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use npmscout::sources::{Api, FetchError, Fetched, RegistryClient};
use serde_json::{Value, json};

/// In-memory registry: scripted JSON bodies or statuses per `api:path` key.
#[derive(Debug, Default)]
pub struct ScriptedRegistry {
    bodies: Mutex<HashMap<String, Result<Value, u16>>>,
    calls: Mutex<Vec<String>>,
}

fn key(api: Api, path: &str) -> String {
    format!("{}:{path}", api.label())
}

impl ScriptedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(self, api: Api, path: &str, body: Value) -> Self {
        self.bodies.lock().unwrap().insert(key(api, path), Ok(body));
        self
    }

    pub fn status(self, api: Api, path: &str, status: u16) -> Self {
        self.bodies.lock().unwrap().insert(key(api, path), Err(status));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl RegistryClient for ScriptedRegistry {
    async fn get_json(&self, api: Api, path: &str) -> Result<Fetched<Value>, FetchError> {
        let key = key(api, path);
        self.calls.lock().unwrap().push(key.clone());
        match self.bodies.lock().unwrap().get(&key).cloned() {
            Some(Ok(body)) => Ok(Fetched::fresh(body)),
            Some(Err(status)) => Err(FetchError::Status { status, url: key }),
            None => Err(FetchError::Status { status: 404, url: key }),
        }
    }
}

/// A search endpoint page with the given names.
pub fn search_page(names: &[&str], total: usize) -> Value {
    let objects: Vec<Value> = names
        .iter()
        .map(|n| {
            json!({
                "package": { "name": n, "version": "1.0.0", "description": format!("{n} package") },
                "score": { "final": 0.5, "detail": { "quality": 0.5, "popularity": 0.5, "maintenance": 0.5 } },
                "searchScore": 1.0
            })
        })
        .collect();
    json!({ "objects": objects, "total": total, "time": "2024-01-01T00:00:00.000Z" })
}

/// Minimal packument with a `latest` dist-tag.
pub fn packument(name: &str, version: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{name} package"),
        "dist-tags": { "latest": version },
        "time": { "modified": "2024-02-01T00:00:00.000Z", version: "2024-01-15T00:00:00.000Z" },
        "maintainers": [{ "name": "alice", "email": "alice@example.com" }]
    })
}

/// Scripted HTTP responses keyed by request target (path plus query).
pub type Routes = HashMap<String, (u16, String)>;

/// What: Serve `routes` over plain HTTP on a loopback port.
///
/// Output:
/// - Base URL (`http://127.0.0.1:<port>`) and the shared list of request targets seen.
///
/// Details:
/// - One response per connection (`Connection: close`); unknown targets get 404.
/// - The server thread lives until the test process exits.
pub fn serve(routes: Routes) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            let mut header = String::new();
            while reader.read_line(&mut header).is_ok_and(|n| n > 2) {
                header.clear();
            }
            let target = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
            log.lock().unwrap().push(target.clone());
            let (status, body) = routes
                .get(&target)
                .cloned()
                .unwrap_or((404, "{\"error\":\"Not found\"}".to_string()));
            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });
    (base, seen)
}
