use std::fs;
use std::path::Path;
use std::time::Instant;

use ng_compiler::{parse_rule_list, CompiledSettings, Settings};

/// Where the policy comes from on the command line.
#[derive(Debug, Clone, Default)]
pub struct PolicySource {
    pub settings: Option<String>,
    pub allow_files: Vec<String>,
    pub deny_files: Vec<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoadStats {
    pub allow_rules: usize,
    pub deny_rules: usize,
    pub total_ms: f64,
}

/// Read the settings file and any text rule lists, merged in that order.
pub fn read_settings(source: &PolicySource, verbose: bool) -> Result<Settings, String> {
    let mut settings = match &source.settings {
        Some(path) => Settings::load(Path::new(path)).map_err(|e| e.to_string())?,
        None => Settings::default(),
    };

    for path in &source.allow_files {
        let rules = read_rule_list(path, verbose)?;
        settings.allow_rules.extend(rules);
    }
    for path in &source.deny_files {
        let rules = read_rule_list(path, verbose)?;
        settings.deny_rules.extend(rules);
    }
    if let Some(mode) = &source.mode {
        settings.mode = Some(mode.clone());
    }

    Ok(settings)
}

pub fn load_policy(source: &PolicySource, verbose: bool) -> Result<(CompiledSettings, LoadStats), String> {
    let start = Instant::now();
    let settings = read_settings(source, verbose)?;
    let compiled = settings.compile().map_err(|e| e.to_string())?;

    let stats = LoadStats {
        allow_rules: settings.allow_rules.len(),
        deny_rules: settings.deny_rules.len(),
        total_ms: start.elapsed().as_secs_f64() * 1000.0,
    };

    log::debug!(
        "loaded policy: {} allow, {} deny rules, {} invalid, {} deduped in {:.1}ms",
        stats.allow_rules,
        stats.deny_rules,
        compiled.stats.invalid,
        compiled.stats.deduped,
        stats.total_ms
    );

    Ok((compiled, stats))
}

fn read_rule_list(path: &str, verbose: bool) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    let rules = parse_rule_list(&content);

    if verbose {
        println!(
            "  {} - {} lines, {} rules",
            Path::new(path).file_name().unwrap_or_default().to_string_lossy(),
            content.lines().count(),
            rules.len()
        );
    }

    Ok(rules)
}

pub fn write_text(path: &Path, text: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
        }
    }
    fs::write(path, text).map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    Ok(())
}

/// Read URLs one per line, skipping blanks and `#` comments.
pub fn read_url_list(path: &str) -> Result<Vec<String>, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    let urls: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    if urls.is_empty() {
        return Err(format!("No URLs in '{}'", path));
    }
    Ok(urls)
}
