/// Endpoint checks against a running server.
///
/// Covers the routes that need no session: health, landing data, the OpenAPI
/// document, registration validation and the 401 guard on every role area.
/// Point `API_BASE_URL` at the server; defaults to a local instance.

use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

pub struct ApiTestClient {
    client: Client,
    base_url: String,
}

impl ApiTestClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: std::env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        }
    }

    pub async fn get(&self, path: &str) -> Result<Response, reqwest::Error> {
        self.client.get(format!("{}{}", self.base_url, path)).send().await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Response, reqwest::Error> {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
    }
}

#[derive(Debug, Default)]
pub struct TestResults {
    pub passed: u32,
    pub failed: u32,
    pub failures: Vec<String>,
}

impl TestResults {
    pub fn pass(&mut self, test_name: &str) {
        self.passed += 1;
        println!("✅ {}", test_name);
    }

    pub fn fail(&mut self, test_name: &str, error: &str) {
        self.failed += 1;
        self.failures.push(format!("{}: {}", test_name, error));
        println!("❌ {}: {}", test_name, error);
    }

    /// Records a pass when the response has `expected` status.
    pub fn expect_status(&mut self, test_name: &str, response: Result<Response, reqwest::Error>, expected: StatusCode) {
        match response {
            Ok(r) if r.status() == expected => self.pass(test_name),
            Ok(r) => self.fail(test_name, &format!("Status: {}", r.status())),
            Err(e) => self.fail(test_name, &e.to_string()),
        }
    }

    pub fn summary(&self) {
        println!("\n📊 Test Summary:");
        println!("✅ Passed: {}", self.passed);
        println!("❌ Failed: {}", self.failed);

        if !self.failures.is_empty() {
            println!("\n🔍 Failures:");
            for failure in &self.failures {
                println!("  - {}", failure);
            }
        }
    }
}

fn registration(pesel: &str) -> Value {
    json!({
        "email": format!("pacjent-{}@example.com", Uuid::new_v4()),
        "name": "Anna",
        "surname": "Nowak",
        "pesel": pesel,
        "phone": "+48123456789",
        "password": "Haslo!2024x",
        "address": "ul. Polna 1, Warszawa"
    })
}

pub async fn run_endpoint_tests() -> TestResults {
    let client = ApiTestClient::new();
    let mut results = TestResults::default();

    println!("🚀 Starting endpoint checks against {}", client.base_url);

    // PUBLIC
    println!("\n🌐 Public");

    match client.get("/health").await {
        Ok(response) if response.status() == StatusCode::OK => {
            match response.json::<Value>().await {
                Ok(body) if body["status"] == "healthy" => results.pass("Health probe"),
                Ok(body) => results.fail("Health probe", &format!("Body: {}", body)),
                Err(e) => results.fail("Health probe", &e.to_string()),
            }
        }
        Ok(response) => results.fail("Health probe", &format!("Status: {}", response.status())),
        Err(e) => results.fail("Health probe", &e.to_string()),
    }

    match client.get("/api/public/landing").await {
        Ok(response) if response.status() == StatusCode::OK => match response.json::<Value>().await {
            Ok(body) if body["specializations"].is_array() && body["patientsCount"].is_number() => {
                results.pass("Landing data")
            }
            Ok(body) => results.fail("Landing data", &format!("Body: {}", body)),
            Err(e) => results.fail("Landing data", &e.to_string()),
        },
        Ok(response) => results.fail("Landing data", &format!("Status: {}", response.status())),
        Err(e) => results.fail("Landing data", &e.to_string()),
    }

    results.expect_status("OpenAPI document", client.get("/api/openapi.json").await, StatusCode::OK);

    // AUTH
    println!("\n🔐 Registration");

    match client.post("/api/auth/register", registration("1234567890a")).await {
        Ok(response) if response.status() == StatusCode::BAD_REQUEST => match response.json::<Value>().await {
            Ok(body) if body["error"] == "PESEL musi składać się tylko z cyfr" => {
                results.pass("Registration rejects malformed PESEL")
            }
            Ok(body) => results.fail("Registration rejects malformed PESEL", &format!("Body: {}", body)),
            Err(e) => results.fail("Registration rejects malformed PESEL", &e.to_string()),
        },
        Ok(response) => results.fail(
            "Registration rejects malformed PESEL",
            &format!("Status: {}", response.status()),
        ),
        Err(e) => results.fail("Registration rejects malformed PESEL", &e.to_string()),
    }

    results.expect_status(
        "Verification needs a token",
        client.get("/api/auth/verify-email").await,
        StatusCode::BAD_REQUEST,
    );

    // ROLE AREAS
    println!("\n🔒 Session guard");

    for path in [
        "/api/admin/statistics",
        "/api/admin/rooms",
        "/api/doctor/visits/today",
        "/api/patient/dashboard",
        "/api/receptionist/visits/today",
    ] {
        results.expect_status(&format!("{} without session", path), client.get(path).await, StatusCode::UNAUTHORIZED);
    }

    results
}

#[tokio::main]
async fn main() {
    let results = run_endpoint_tests().await;
    results.summary();

    if results.failed > 0 {
        std::process::exit(1);
    }
}
