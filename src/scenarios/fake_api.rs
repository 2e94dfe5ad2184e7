//! In-process stand-in for the booking API, served by wiremock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use crate::data::BookingId;

pub const FAKE_TOKEN: &str = "abc123";

#[derive(Default)]
struct FakeState {
    next_id: u64,
    bookings: HashMap<u64, Value>,
    requests: usize,
    created_first_names: Vec<String>,
    fail_create: Option<u16>,
    corrupt_echo: bool,
    numeric_token: bool,
}

#[derive(Clone)]
struct FakeResponder {
    state: Arc<Mutex<FakeState>>,
}

pub struct FakeBookerApi {
    server: MockServer,
    state: Arc<Mutex<FakeState>>,
}

impl FakeBookerApi {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(Mutex::new(FakeState {
            next_id: 1,
            ..Default::default()
        }));
        Mock::given(any())
            .respond_with(FakeResponder {
                state: Arc::clone(&state),
            })
            .mount(&server)
            .await;
        Self { server, state }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn stored(&self, id: BookingId) -> Option<Value> {
        self.state.lock().unwrap().bookings.get(&id.0).cloned()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests
    }

    pub fn created_first_names(&self) -> Vec<String> {
        self.state.lock().unwrap().created_first_names.clone()
    }

    pub fn fail_create_with(&self, status: u16) {
        self.state.lock().unwrap().fail_create = Some(status);
    }

    /// Echo a different first name from `POST /booking` than was sent.
    pub fn corrupt_echo(&self) {
        self.state.lock().unwrap().corrupt_echo = true;
    }

    /// Hand out the token as a number instead of a string.
    pub fn numeric_token(&self) {
        self.state.lock().unwrap().numeric_token = true;
    }
}

impl Respond for FakeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap();
        state.requests += 1;

        let method = request.method.as_str().to_string();
        let path = request.url.path().to_string();
        let body: Option<Value> = serde_json::from_slice(&request.body).ok();
        let authorized = request
            .headers
            .get("cookie")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|cookie| cookie == format!("token={FAKE_TOKEN}"));

        match (method.as_str(), path.as_str()) {
            ("POST", "/auth") => {
                let body = body.unwrap_or(Value::Null);
                if body["username"] == "admin" && body["password"] == "password123" {
                    let token = if state.numeric_token {
                        json!(123)
                    } else {
                        json!(FAKE_TOKEN)
                    };
                    ResponseTemplate::new(200).set_body_json(json!({ "token": token }))
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({ "reason": "Bad credentials" }))
                }
            }
            ("POST", "/booking") => {
                if let Some(status) = state.fail_create {
                    return ResponseTemplate::new(status).set_body_string("Internal Server Error");
                }
                let Some(booking) = body else {
                    return ResponseTemplate::new(400).set_body_string("Bad Request");
                };
                let id = state.next_id;
                state.next_id += 1;
                if let Some(name) = booking["firstname"].as_str() {
                    state.created_first_names.push(name.to_string());
                }
                state.bookings.insert(id, booking.clone());

                let mut echo = booking;
                if state.corrupt_echo {
                    echo["firstname"] = json!("Mallory");
                }
                ResponseTemplate::new(200).set_body_json(json!({ "bookingid": id, "booking": echo }))
            }
            (method, path) if path.starts_with("/booking/") => {
                let Ok(id) = path["/booking/".len()..].parse::<u64>() else {
                    return ResponseTemplate::new(404).set_body_string("Not Found");
                };
                let exists = state.bookings.contains_key(&id);

                match method {
                    "GET" => match state.bookings.get(&id) {
                        Some(booking) => ResponseTemplate::new(200).set_body_json(booking.clone()),
                        None => ResponseTemplate::new(404).set_body_string("Not Found"),
                    },
                    "PUT" | "PATCH" | "DELETE" if !authorized => {
                        ResponseTemplate::new(403).set_body_string("Forbidden")
                    }
                    _ if !exists => ResponseTemplate::new(405).set_body_string("Method Not Allowed"),
                    "PUT" => match body {
                        Some(booking) => {
                            state.bookings.insert(id, booking.clone());
                            ResponseTemplate::new(200).set_body_json(booking)
                        }
                        None => ResponseTemplate::new(400).set_body_string("Bad Request"),
                    },
                    "PATCH" => {
                        let Some(Value::Object(changes)) = body else {
                            return ResponseTemplate::new(400).set_body_string("Bad Request");
                        };
                        let Some(Value::Object(stored)) = state.bookings.get_mut(&id) else {
                            return ResponseTemplate::new(500).set_body_string("Internal Server Error");
                        };
                        for (key, value) in changes {
                            stored.insert(key, value);
                        }
                        ResponseTemplate::new(200).set_body_json(Value::Object(stored.clone()))
                    }
                    "DELETE" => {
                        state.bookings.remove(&id);
                        ResponseTemplate::new(201).set_body_string("Created")
                    }
                    _ => ResponseTemplate::new(405).set_body_string("Method Not Allowed"),
                }
            }
            _ => ResponseTemplate::new(404).set_body_string("Not Found"),
        }
    }
}
