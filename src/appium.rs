use reqwest::blocking::Client;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::cell::Cell;
use std::path::PathBuf;

use crate::config::{SessionSettings, NEW_COMMAND_TIMEOUT_SECS};
use crate::error::{BotError, Result};
use crate::selector::By;
use crate::session::{DeviceSession, ElementHandle};
use crate::utils::{log_info, log_warn, save_base64_png};

const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52f-4a6f6d6f4e45";
const LEGACY_NO_SUCH_ELEMENT: u64 = 7;

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

/// A live UiAutomator2 session on an Appium server.
pub struct AppiumSession {
    client: Client,
    base: String,
    session_id: String,
    screenshot_dir: PathBuf,
    closed: Cell<bool>,
}

/// New-session payload for the Instagram app on Android.
pub fn capabilities(settings: &SessionSettings) -> Value {
    json!({
        "capabilities": {
            "alwaysMatch": {
                "platformName": "Android",
                "appium:automationName": "UiAutomator2",
                "appium:deviceName": settings.device_name,
                "appium:platformVersion": settings.platform_version,
                "appium:appPackage": settings.app_package,
                "appium:appActivity": settings.app_activity,
                "appium:noReset": false,
                "appium:autoGrantPermissions": true,
                "appium:newCommandTimeout": NEW_COMMAND_TIMEOUT_SECS,
            },
            "firstMatch": [{}],
        }
    })
}

impl AppiumSession {
    pub fn connect(settings: &SessionSettings) -> Result<Self> {
        let base = settings.server_url.trim_end_matches('/').to_string();
        let connect_err = |reason: String| BotError::SessionConnect { url: base.clone(), reason };

        let client = Client::builder()
            .timeout(settings.command_timeout)
            .build()
            .map_err(|e| connect_err(e.to_string()))?;

        log_info(&format!("Opening session on {} ({})...", base, settings.device_name));
        let url = format!("{}/session", base);
        let (status, body) = send(&client, Method::POST, &url, Some(capabilities(settings)))
            .map_err(|e| connect_err(e.to_string()))?;
        if !status.is_success() {
            return Err(connect_err(error_message(&body)));
        }
        let session_id = parse_session_id(&body)
            .ok_or_else(|| connect_err("response carried no session id".to_string()))?;

        log_info(&format!("Session {} ready.", session_id));
        Ok(Self {
            client,
            base,
            session_id,
            screenshot_dir: settings.screenshot_dir.clone(),
            closed: Cell::new(false),
        })
    }

    fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        name: &str,
    ) -> Result<Value> {
        let (status, reply) = self.raw(method, path, body)?;
        if status.is_success() {
            Ok(reply.get("value").cloned().unwrap_or(Value::Null))
        } else {
            Err(BotError::Protocol { command: name.to_string(), message: error_message(&reply) })
        }
    }

    fn raw(&self, method: Method, path: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let url = format!("{}/session/{}{}", self.base, self.session_id, path);
        send(&self.client, method, &url, body)
    }
}

impl DeviceSession for AppiumSession {
    fn find_by(&self, by: By, query: &str) -> Result<Option<ElementHandle>> {
        let payload = json!({ "using": by.strategy(), "value": query });
        let (status, reply) = self.raw(Method::POST, "/element", Some(payload))?;
        if is_no_such_element(&reply) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(BotError::Protocol {
                command: "find element".to_string(),
                message: error_message(&reply),
            });
        }
        let value = reply.get("value").cloned().unwrap_or(Value::Null);
        parse_element(&value).map(Some).ok_or_else(|| BotError::Protocol {
            command: "find element".to_string(),
            message: format!("no element id in {}", value),
        })
    }

    fn click(&self, element: &ElementHandle) -> bool {
        let path = format!("/element/{}/click", element.id());
        match self.command(Method::POST, &path, Some(json!({})), "click") {
            Ok(_) => true,
            Err(e) => {
                log_warn(&format!("Click failed: {}", e));
                false
            }
        }
    }

    fn send_text(&self, element: &ElementHandle, text: &str) -> bool {
        let clear = format!("/element/{}/clear", element.id());
        if let Err(e) = self.command(Method::POST, &clear, Some(json!({})), "clear") {
            log_warn(&format!("Clear failed: {}", e));
            return false;
        }
        let value = format!("/element/{}/value", element.id());
        match self.command(Method::POST, &value, Some(json!({ "text": text })), "send keys") {
            Ok(_) => true,
            Err(e) => {
                log_warn(&format!("Typing failed: {}", e));
                false
            }
        }
    }

    fn element_text(&self, element: &ElementHandle) -> Option<String> {
        let path = format!("/element/{}/text", element.id());
        self.command(Method::GET, &path, None, "get text")
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
    }

    fn screenshot(&self, label: &str) -> Result<PathBuf> {
        let value = self.command(Method::GET, "/screenshot", None, "screenshot")?;
        let data = value.as_str().ok_or_else(|| BotError::Protocol {
            command: "screenshot".to_string(),
            message: "payload was not a string".to_string(),
        })?;
        save_base64_png(data, &self.screenshot_dir, label)
    }

    fn quit(&self) {
        if !first_release(&self.closed) {
            return;
        }
        match self.command(Method::DELETE, "", None, "delete session") {
            Ok(_) => log_info("Session closed."),
            Err(e) => log_warn(&format!("Session close failed: {}", e)),
        }
    }
}

impl Drop for AppiumSession {
    fn drop(&mut self) {
        self.quit();
    }
}

fn send(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send()?;
    let status = response.status();
    let text = response.text()?;
    let reply = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    Ok((status, reply))
}

/// Flips the closed flag; only the first caller gets `true`.
fn first_release(closed: &Cell<bool>) -> bool {
    !closed.replace(true)
}

fn parse_session_id(reply: &Value) -> Option<String> {
    reply
        .pointer("/value/sessionId")
        .or_else(|| reply.get("sessionId"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn parse_element(value: &Value) -> Option<ElementHandle> {
    value
        .get(W3C_ELEMENT_KEY)
        .or_else(|| value.get("ELEMENT"))
        .and_then(Value::as_str)
        .map(ElementHandle::new)
}

fn is_no_such_element(reply: &Value) -> bool {
    let w3c = reply.pointer("/value/error").and_then(Value::as_str) == Some("no such element");
    let legacy = reply.get("status").and_then(Value::as_u64) == Some(LEGACY_NO_SUCH_ELEMENT);
    w3c || legacy
}

fn error_message(reply: &Value) -> String {
    match reply.get("value").cloned().map(serde_json::from_value::<WireError>) {
        Some(Ok(err)) if err.message.is_empty() => err.error,
        Some(Ok(err)) => format!("{}: {}", err.error, err.message),
        _ => reply.to_string(),
    }
}
