//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Models like to wrap JSON in markdown fences; drop them before decoding.
pub fn strip_code_fences(s: &str) -> String {
  s.replace("```json", "").replace("```", "").trim().to_string()
}

/// Case-insensitive "contains any" over a keyword list.
pub fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
  let h = haystack.to_lowercase();
  keywords.iter().any(|k| h.contains(&k.to_lowercase()))
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) { cut -= 1; }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_all_occurrences() {
    let out = fill_template("{a} and {a} then {b}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x and x then y");
  }

  #[test]
  fn strips_markdown_fences() {
    assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fences("  {}  "), "{}");
  }

  #[test]
  fn contains_any_ignores_case() {
    assert!(contains_any("Pune International AIRPORT", &["airport"]));
    assert!(!contains_any("Shaniwar Wada", &["airport", "station"]));
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    let s = "पुणे शहर";
    let out = trunc_for_log(s, 4);
    assert!(out.contains("bytes total"));
    assert_eq!(trunc_for_log("short", 10), "short");
  }
}
