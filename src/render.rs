//! HTML pages: the task form, login, and the stub template generator.
//!
//! Templates are plain HTML with `${column}` placeholders, the same syntax
//! Mechanical Turk uses. Two extra placeholders are available: `${ALL_JSON}`
//! (the task as pretty-printed, escaped JSON) and `${ALL_JSON_RAW}`.

use std::collections::HashMap;

use regex::{Captures, Regex};

use crate::record::Record;
use crate::selector::TaskStats;

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Replace `${key}` placeholders with values from `fields`.
///
/// Placeholders with no matching field are left untouched.
pub fn render_template(template: &str, fields: &HashMap<String, String>) -> String {
    let Ok(placeholder) = Regex::new(r"\$\{([^}]*)\}") else {
        return template.to_string();
    };
    placeholder
        .replace_all(template, |caps: &Captures| match fields.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn template_fields(task: &Record) -> HashMap<String, String> {
    let mut fields: HashMap<String, String> = task
        .iter()
        .map(|(k, v)| (k.to_string(), escape_html(v)))
        .collect();
    let pretty = serde_json::to_string_pretty(task).unwrap_or_default();
    fields.insert("ALL_JSON".to_string(), escape_html(&pretty));
    fields.insert(
        "ALL_JSON_RAW".to_string(),
        serde_json::to_string(task).unwrap_or_default(),
    );
    fields
}

const SHORTCUT_SCRIPT: &str = r#"<script>
// Keyboard shortcuts: <button data-key="1"> is clicked by pressing "1".
window.addEventListener("keydown", function(e) {
  if (document.activeElement !== document.body) return;
  const el = document.querySelector('[data-key="' + e.key + '"]');
  if (el) {
    e.preventDefault();
    el.click();
  }
});
</script>"#;

/// Full page for one task: progress bar, flash banner, the user's template,
/// hidden inputs echoing every task field, and the worker id.
pub fn task_page(template: &str, stats: &TaskStats, uid: &str, flash: Option<&str>) -> String {
    let empty = Record::new();
    let task = stats.task.as_ref().unwrap_or(&empty);
    let user_html = render_template(template, &template_fields(task));
    let progress = format!("{} / {}", stats.num_completed, stats.num_total);
    let uid = escape_html(uid);

    let source_inputs = task
        .iter()
        .map(|(k, v)| {
            format!(
                "<input type=hidden name=\"{}\" value=\"{}\">",
                escape_html(k),
                escape_html(v)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    // Flash text is produced internally and may contain entities already.
    let flash = flash
        .map(|msg| format!("<p><span style=\"background: yellow\">{}</span></p>", msg))
        .unwrap_or_default();

    format!(
        r#"<!doctype html>
<html>
<title>{progress} - localturk</title>
<body><form action=/submit method=post>
<nav>
  <span class="brand-logo center">{progress}</span>
  <ul class="right">
    <li>{uid}</li>
    <li><a href="/">logout</a></li>
  </ul>
</nav>
<div class="container">{flash}</div>
{source_inputs}
{user_html}
<hr/>
<input type="hidden" name="uid" value="{uid}"/>
<div class="container"><input type=submit value="submit" /></div>
</form>
<form action=/delete-last method=post><input type=submit value="undo last submission" /></form>
{SHORTCUT_SCRIPT}
</body>
</html>
"#
    )
}

/// Login form. `message` is shown above the form when present.
pub fn login_page(message: Option<&str>) -> String {
    let message = message
        .map(|m| format!("<p class=\"error\">{}</p>", escape_html(m)))
        .unwrap_or_default();
    format!(
        r#"<!doctype html>
<html>
<title>localturk</title>
<body>
{message}
<form action=/login-form method=post>
  <label>Worker ID <input type=text name=uid autofocus></label>
  <input type=submit value="start">
</form>
</body>
</html>
"#
    )
}

pub fn done_page() -> String {
    "DONE".to_string()
}

/// Page for a `/task` request with no worker id.
pub fn missing_uid_page() -> String {
    r#"No User ID <a href="/">Go to login screen</a>"#.to_string()
}

/// Starter template listing every task column, for `--write-template`.
pub fn sample_template(columns: &[String]) -> String {
    let rows = columns
        .iter()
        .map(|c| format!("    <tr><th>{}</th><td>${{{}}}</td></tr>", escape_html(c), c))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"<!-- Edit this template, then run: localturk template.html tasks.csv outputs.csv -->
<table>
{rows}
</table>

<!-- Every answer input needs a name attribute or nothing new is recorded. -->
<p>
  <label><input type=radio name=answer value=yes> <button type=button data-key="1">Yes (1)</button></label>
  <label><input type=radio name=answer value=no> <button type=button data-key="2">No (2)</button></label>
</p>
<p><textarea name=notes placeholder="Notes"></textarea></p>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn template_substitutes_known_keys_only() {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), "Ada".to_string());
        assert_eq!(
            render_template("Hi ${name}, ${missing} ${name}!", &fields),
            "Hi Ada, ${missing} Ada!"
        );
        assert_eq!(render_template("open ${name", &fields), "open ${name");
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let mut fields = HashMap::new();
        fields.insert("price".to_string(), "$1 ${name}".to_string());
        fields.insert("name".to_string(), "Ada".to_string());
        assert_eq!(render_template("${price}", &fields), "$1 ${name}");
    }

    #[test]
    fn task_page_includes_fields_progress_and_flash() {
        let stats = TaskStats {
            task: Some(rec(&[("img", "<cat>.png")])),
            num_completed: 3,
            num_total: 10,
        };
        let page = task_page(
            "<img src=\"${img}\"> ${ALL_JSON_RAW}",
            &stats,
            "bob",
            Some("careful"),
        );

        assert!(page.contains("3 / 10"));
        assert!(page.contains("<img src=\"&lt;cat&gt;.png\">"));
        assert!(page.contains(r#"{"img":"<cat>.png"}"#));
        assert!(page.contains("<input type=hidden name=\"img\" value=\"&lt;cat&gt;.png\">"));
        assert!(page.contains("name=\"uid\" value=\"bob\""));
        assert!(page.contains("careful"));
    }

    #[test]
    fn task_page_without_flash_has_no_banner() {
        let stats = TaskStats {
            task: Some(rec(&[("a", "1")])),
            num_completed: 0,
            num_total: 1,
        };
        assert!(!task_page("${a}", &stats, "u", None).contains("background: yellow"));
    }

    #[test]
    fn sample_template_mentions_every_column() {
        let template = sample_template(&["image_url".to_string(), "caption".to_string()]);
        assert!(template.contains("${image_url}"));
        assert!(template.contains("${caption}"));
        assert!(template.contains("name=answer"));
    }

    #[test]
    fn login_page_shows_message() {
        assert!(login_page(Some("Invalid id, try again!")).contains("Invalid id, try again!"));
        assert!(!login_page(None).contains("class=\"error\""));
    }
}
