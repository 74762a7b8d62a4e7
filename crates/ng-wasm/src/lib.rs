//! WebAssembly bindings for NavGate
//!
//! The extension's background script loads settings with [`load_settings`]
//! whenever storage changes and calls [`decide`] from its navigation hooks.

use std::sync::OnceLock;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use ng_compiler::{explain_pattern as explain_raw_pattern, CompileStats, Settings, SettingsError};
use ng_core::{is_internal_url, DecideOptions, Decision, Diagnostic, Engine};

static ENGINE: OnceLock<Engine> = OnceLock::new();

fn engine() -> &'static Engine {
    ENGINE.get_or_init(Engine::default)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadReport {
    generation: u64,
    mode: &'static str,
    #[serde(flatten)]
    stats: CompileStats,
    diagnostics: Vec<Diagnostic>,
}

fn apply_settings(engine: &Engine, json: &str) -> Result<LoadReport, SettingsError> {
    let compiled = Settings::from_json(json)?.compile()?;
    let mode = compiled.snapshot.mode.as_str();
    let diagnostics = compiled.snapshot.index.diagnostics().to_vec();
    let generation = engine.update(compiled.snapshot);
    Ok(LoadReport {
        generation,
        mode,
        stats: compiled.stats,
        diagnostics,
    })
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))?;
    js_sys::JSON::parse(&json)
}

fn temp_allow_predicate(callback: Option<js_sys::Function>) -> impl Fn(&str) -> bool {
    move |host: &str| match &callback {
        Some(f) => f
            .call1(&JsValue::NULL, &JsValue::from_str(host))
            .map(|v| v.is_truthy())
            .unwrap_or(false),
        None => false,
    }
}

fn run_decide(url: &str, temp_allow: Option<js_sys::Function>, options: DecideOptions) -> Decision {
    let predicate = temp_allow_predicate(temp_allow);
    engine().decide_with(url, &predicate, options)
}

/// Compile a settings JSON document and publish it.
///
/// Returns `{ generation, mode, before, after, deduped, invalid, diagnostics }`.
#[wasm_bindgen]
pub fn load_settings(settings_json: &str) -> Result<JsValue, JsValue> {
    let report = apply_settings(engine(), settings_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&report)
}

#[wasm_bindgen]
pub fn generation() -> f64 {
    engine().generation() as f64
}

/// Decide a navigation. `temp_allow` receives the host and returns truthy
/// when the user has temporarily unlocked it.
#[wasm_bindgen]
pub fn decide(url: &str, temp_allow: Option<js_sys::Function>) -> Result<JsValue, JsValue> {
    to_js(&run_decide(url, temp_allow, DecideOptions::default()))
}

#[wasm_bindgen]
pub fn should_block(url: &str, temp_allow: Option<js_sys::Function>) -> bool {
    run_decide(url, temp_allow, DecideOptions::default()).blocked
}

/// Like [`decide`], with the full evaluation trace attached.
#[wasm_bindgen]
pub fn explain(url: &str, temp_allow: Option<js_sys::Function>) -> Result<JsValue, JsValue> {
    to_js(&run_decide(url, temp_allow, DecideOptions { trace: true }))
}

#[wasm_bindgen]
pub fn explain_pattern(pattern: &str) -> Result<JsValue, JsValue> {
    to_js(&explain_raw_pattern(pattern))
}

#[wasm_bindgen]
pub fn is_internal_url_js(url: &str) -> bool {
    is_internal_url(url)
}

// =============================================================================
// Logging
// =============================================================================

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[navgate] {}", record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&line),
            log::Level::Warn => web_sys::console::warn_1(&line),
            log::Level::Info => web_sys::console::info_1(&line),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Route `log` output to the browser console. Level defaults to `warn`.
#[wasm_bindgen]
pub fn init_logging(level: Option<String>) {
    // a second call only changes the level
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(parse_level(level.as_deref()));
}

fn parse_level(level: Option<&str>) -> log::LevelFilter {
    level
        .and_then(|l| l.parse().ok())
        .unwrap_or(log::LevelFilter::Warn)
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn decide_through_bindings() {
        load_settings(r#"{"denyRules":["*.example.com"]}"#).unwrap();
        assert!(should_block("https://www.example.com/", None));
        assert!(!should_block("https://example.com/", None));
        assert!(is_internal_url_js("about:blank"));
    }
}
