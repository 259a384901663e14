//! Playwright browser automation
//!
//! A single Node process runs an embedded bridge script that owns the
//! browser, context and page. Commands go in on stdin and replies come back
//! on stdout, one JSON object per line, so page state (focus, typed input,
//! local storage) survives from one step to the next.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::driver::BrowserDriver;
use crate::error::{E2eError, E2eResult};
use crate::storage::StorageSnapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::InvalidConfig(format!("unknown browser '{}'", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub browser: Browser,
    pub headless: bool,
    /// Directory holding the `node_modules` that provides `playwright`
    pub project_dir: PathBuf,
    /// Playwright's own per-action timeout inside the browser
    pub action_timeout_ms: u64,
    /// Upper bound for one bridge round trip
    pub command_timeout_ms: u64,
    pub launch_timeout_ms: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5173".to_string(),
            viewport_width: 1280,
            viewport_height: 720,
            browser: Browser::Chromium,
            headless: true,
            project_dir: PathBuf::from("."),
            action_timeout_ms: 10_000,
            command_timeout_ms: 30_000,
            launch_timeout_ms: 60_000,
        }
    }
}

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    op: &'a str,
    args: Value,
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ready: Option<bool>,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

impl BridgeReply {
    fn into_result(self) -> E2eResult<Value> {
        if self.ok {
            return Ok(self.value);
        }
        let message = self.error.unwrap_or_else(|| "unknown bridge error".to_string());
        match self.kind.as_deref() {
            Some("not_found") => Err(E2eError::ElementNotFound(message)),
            _ => Err(E2eError::Playwright(message)),
        }
    }
}

struct Bridge {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    closed: bool,
}

impl Bridge {
    /// Spawn the bridge process with piped stdin and stdout
    fn spawn(mut cmd: TokioCommand) -> E2eResult<Self> {
        let program = cmd.as_std().get_program().to_string_lossy().to_string();
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Playwright(format!("failed to spawn {}: {}", program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".to_string()))?;

        Ok(Bridge {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            closed: false,
        })
    }

    async fn read_reply(&mut self) -> E2eResult<BridgeReply> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::Playwright("bridge process exited".to_string()))?;

            match serde_json::from_str::<BridgeReply>(&line) {
                Ok(reply) => return Ok(reply),
                // Anything the page or Playwright prints that is not ours.
                Err(_) => debug!("[bridge] {}", line),
            }
        }
    }

    async fn reply_to(&mut self, id: u64) -> E2eResult<Value> {
        loop {
            let reply = self.read_reply().await?;
            match reply.id {
                Some(reply_id) if reply_id == id => return reply.into_result(),
                other => warn!("Discarding stale bridge reply {:?} while waiting for #{}", other, id),
            }
        }
    }

    /// Send one command and wait for its reply; a reply that arrives after
    /// its timeout is skipped by the next request.
    async fn request(&mut self, op: &str, args: Value, timeout: Duration) -> E2eResult<Value> {
        if self.closed {
            return Err(E2eError::Playwright("browser already closed".to_string()));
        }

        self.next_id += 1;
        let id = self.next_id;
        let mut line = serde_json::to_string(&BridgeRequest { id, op, args })?;
        line.push('\n');

        debug!("bridge <- #{} {}", id, op);
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        tokio::time::timeout(timeout, self.reply_to(id))
            .await
            .map_err(|_| E2eError::Timeout(format!("Playwright '{}'", op)))?
    }
}

/// What the bridge reports after clearing local storage
#[derive(Debug, Deserialize)]
struct ClearStorageOutcome {
    cleared: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// Playwright browser handle
pub struct PlaywrightDriver {
    config: PlaywrightConfig,
    bridge: Mutex<Bridge>,
    // Keeps the bridge script on disk for the lifetime of the process.
    _script_dir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Launch the browser behind a fresh bridge process
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config)?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_JS)?;

        let bridge_config = json!({
            "browser": config.browser.as_str(),
            "headless": config.headless,
            "width": config.viewport_width,
            "height": config.viewport_height,
            "baseUrl": config.base_url,
            "actionTimeoutMs": config.action_timeout_ms,
        });

        info!(
            "Launching {} via Playwright (headless: {})",
            config.browser.as_str(),
            config.headless
        );

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path)
            .current_dir(&config.project_dir)
            .env("NODE_PATH", config.project_dir.join("node_modules"))
            .env("IMGREG_BRIDGE_CONFIG", bridge_config.to_string())
            .stderr(Stdio::inherit());
        let mut bridge = Bridge::spawn(cmd)?;

        let launch_timeout = Duration::from_millis(config.launch_timeout_ms);
        let ready = tokio::time::timeout(launch_timeout, bridge.read_reply())
            .await
            .map_err(|_| E2eError::Timeout("Playwright browser launch".to_string()))??;

        if ready.ready != Some(true) {
            return Err(E2eError::Playwright(format!(
                "browser failed to launch: {}",
                ready.error.unwrap_or_else(|| "no reason given".to_string())
            )));
        }

        Ok(Self {
            config,
            bridge: Mutex::new(bridge),
            _script_dir: script_dir,
        })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed(config: &PlaywrightConfig) -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["--no-install", "playwright", "--version"])
            .current_dir(&config.project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    async fn call(&self, op: &str, args: Value) -> E2eResult<Value> {
        let timeout = Duration::from_millis(self.config.command_timeout_ms);
        self.bridge.lock().await.request(op, args, timeout).await
    }

    async fn call_string(&self, op: &str, args: Value) -> E2eResult<String> {
        match self.call(op, args).await? {
            Value::String(s) => Ok(s),
            Value::Null => Ok(String::new()),
            other => Err(E2eError::Playwright(format!("'{}' returned {}, expected a string", op, other))),
        }
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    async fn visit(&self, path: &str) -> E2eResult<()> {
        self.call("visit", json!({ "path": path })).await.map(|_| ())
    }

    async fn reload(&self) -> E2eResult<()> {
        self.call("reload", Value::Null).await.map(|_| ())
    }

    async fn origin(&self) -> E2eResult<String> {
        self.call_string("origin", Value::Null).await
    }

    async fn type_text(&self, selector: &str, text: &str) -> E2eResult<()> {
        self.call("type", json!({ "selector": selector, "text": text }))
            .await
            .map(|_| ())
    }

    async fn click(&self, selector: &str) -> E2eResult<()> {
        self.call("click", json!({ "selector": selector })).await.map(|_| ())
    }

    async fn press_focused(&self, key: &str) -> E2eResult<()> {
        self.call("press", json!({ "key": key })).await.map(|_| ())
    }

    async fn text_content(&self, selector: &str) -> E2eResult<String> {
        self.call_string("text", json!({ "selector": selector })).await
    }

    async fn input_value(&self, selector: &str) -> E2eResult<String> {
        self.call_string("value", json!({ "selector": selector })).await
    }

    async fn computed_style(&self, selector: &str, property: &str) -> E2eResult<String> {
        self.call_string("style", json!({ "selector": selector, "property": property }))
            .await
    }

    async fn attribute_all(&self, selector: &str, name: &str) -> E2eResult<Vec<Option<String>>> {
        let value = self
            .call("attributes", json!({ "selector": selector, "name": name }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn local_storage(&self) -> E2eResult<StorageSnapshot> {
        let value = self.call("storage", Value::Null).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn clear_local_storage(&self) -> E2eResult<()> {
        let value = self.call("clearStorage", Value::Null).await?;
        let outcome: ClearStorageOutcome = serde_json::from_value(value)?;
        if !outcome.cleared {
            // Opaque origins (about:blank, error pages) have no storage to clear.
            debug!(
                "Local storage not cleared: {}",
                outcome.reason.as_deref().unwrap_or("no reason given")
            );
        }
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        let result = self.call("close", Value::Null).await.map(|_| ());

        let mut bridge = self.bridge.lock().await;
        bridge.closed = true;
        if let Err(e) = bridge.child.wait().await {
            warn!("Bridge process did not exit cleanly: {}", e);
        }
        result
    }
}

const BRIDGE_JS: &str = r#"
const readline = require('readline');
const playwright = require('playwright');

const cfg = JSON.parse(process.env.IMGREG_BRIDGE_CONFIG);

function reply(message) {
  process.stdout.write(JSON.stringify(message) + '\n');
}

function notFound(selector) {
  const err = new Error(`no element matches '${selector}'`);
  err.kind = 'not_found';
  return err;
}

(async () => {
  const browser = await playwright[cfg.browser].launch({ headless: cfg.headless });
  const context = await browser.newContext({
    viewport: { width: cfg.width, height: cfg.height },
  });
  context.setDefaultTimeout(cfg.actionTimeoutMs);
  const page = await context.newPage();

  async function first(selector) {
    const locator = page.locator(selector);
    if ((await locator.count()) === 0) {
      throw notFound(selector);
    }
    return locator.first();
  }

  const ops = {
    visit: async ({ path }) => { await page.goto(new URL(path, cfg.baseUrl).toString()); return null; },
    reload: async () => { await page.reload(); return null; },
    origin: async () => new URL(page.url()).origin,
    type: async ({ selector, text }) => { await (await first(selector)).pressSequentially(text); return null; },
    click: async ({ selector }) => { await (await first(selector)).click(); return null; },
    press: async ({ key }) => { await page.keyboard.press(key); return null; },
    text: async ({ selector }) => (await (await first(selector)).textContent()) || '',
    value: async ({ selector }) => (await first(selector)).inputValue(),
    style: async ({ selector, property }) =>
      (await first(selector)).evaluate((el, p) => getComputedStyle(el).getPropertyValue(p), property),
    attributes: async ({ selector, name }) =>
      page.locator(selector).evaluateAll((els, n) => els.map((el) => el.getAttribute(n)), name),
    storage: async () => {
      const origin = new URL(page.url()).origin;
      let entries = {};
      try {
        entries = await page.evaluate(() => {
          const out = {};
          for (let i = 0; i < localStorage.length; i++) {
            const key = localStorage.key(i);
            out[key] = localStorage.getItem(key);
          }
          return out;
        });
      } catch (_) {
        // about:blank and error pages have no storage
      }
      return Object.keys(entries).length ? { [origin]: entries } : {};
    },
    clearStorage: async () => {
      try {
        await page.evaluate(() => localStorage.clear());
      } catch (err) {
        if (/SecurityError/.test(err.message)) {
          return { cleared: false, reason: err.message };
        }
        throw err;
      }
      return { cleared: true };
    },
    close: async () => { await browser.close(); return null; },
  };

  reply({ ready: true });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    let req;
    try { req = JSON.parse(line); } catch (_) { continue; }
    const op = ops[req.op];
    if (!op) {
      reply({ id: req.id, ok: false, error: `unknown op '${req.op}'` });
      continue;
    }
    try {
      const value = await op(req.args || {});
      reply({ id: req.id, ok: true, value: value === undefined ? null : value });
    } catch (err) {
      reply({ id: req.id, ok: false, error: err.message, kind: err.kind || 'error' });
    }
    if (req.op === 'close') break;
  }
  process.exit(0);
})().catch((err) => {
  reply({ ready: false, error: err.message });
  process.exit(1);
});
"#;
