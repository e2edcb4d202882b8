//! System prompt templating helpers.
//!
//! The built-in prompt text lives in one template file and is rendered from a
//! single code path with runtime parameters (host OS and date). An operator
//! suffix is appended after the rendered template.

use std::collections::BTreeMap;

const SYSTEM_PROMPT_TEMPLATE: &str = include_str!("templates/system_prompt.template");

/// Parameters used to compile the system prompt template.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SystemPromptParams<'a> {
    pub os_name: &'a str,
    /// Pre-formatted, e.g. "Monday, March 03, 2025".
    pub current_date: String,
    pub suffix: &'a str,
}

/// Render the system prompt for this host and today's date.
pub fn render_system_prompt(suffix: &str) -> String {
    let os_name = host_os_name();
    render_system_prompt_with(SystemPromptParams {
        os_name: &os_name,
        current_date: chrono::Local::now().format("%A, %B %d, %Y").to_string(),
        suffix,
    })
}

/// Render the template with explicit parameters.
pub fn render_system_prompt_with(params: SystemPromptParams<'_>) -> String {
    let mut vars = BTreeMap::<&str, String>::new();
    vars.insert("OS_NAME", params.os_name.to_string());
    vars.insert("CURRENT_DATE", params.current_date);

    let mut prompt = normalize_blank_lines(&render_template(SYSTEM_PROMPT_TEMPLATE, &vars));
    let suffix = params.suffix.trim();
    if !suffix.is_empty() {
        prompt.push(' ');
        prompt.push_str(suffix);
    }
    prompt
}

fn host_os_name() -> String {
    match std::env::consts::OS {
        "windows" => "Windows".to_string(),
        "macos" => "macOS".to_string(),
        "linux" => "Linux".to_string(),
        other => other.to_string(),
    }
}

fn render_template(template: &str, vars: &BTreeMap<&str, String>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("{{{{{key}}}}}");
        rendered = rendered.replace(&placeholder, value);
    }
    rendered
}

fn normalize_blank_lines(text: &str) -> String {
    let mut out = String::new();
    let mut previous_blank = false;

    for line in text.lines() {
        let is_blank = line.trim().is_empty();
        if is_blank && previous_blank {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line.trim_end());
        previous_blank = is_blank;
    }

    out.trim().to_string()
}
