use regex::Regex;
use std::sync::LazyLock;

// A fence, plus its language tag. Known SQL tags go even on the same line
// as the query; any other tag only when a line break (or the end) follows.
// "```SELECT 1```" keeps its SELECT.
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)```[ \t]*(?:(?:sql|mysql|postgresql|duckdb|sqlite)\b|[A-Za-z][A-Za-z0-9_+.-]*[ \t]*(?:\r?\n|$))?",
    )
    .expect("valid fence regex")
});

/// Strips markdown code fences, collapses whitespace and leaves exactly one
/// trailing statement separator. Purely textual; SQL is not parsed.
pub fn clean_sql(raw: &str) -> String {
    let unfenced = CODE_FENCE.replace_all(raw, " ");
    let collapsed = unfenced.split_whitespace().collect::<Vec<_>>().join(" ");
    let body = collapsed.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    format!("{};", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sql_fence() {
        assert_eq!(clean_sql("```sql\nSELECT 1;\n```"), "SELECT 1;");
    }

    #[test]
    fn strips_fences_without_language_tag() {
        assert_eq!(clean_sql("```\nSELECT * FROM users\n```"), "SELECT * FROM users;");
        assert_eq!(clean_sql("```SELECT 1```"), "SELECT 1;");
    }

    #[test]
    fn strips_fences_with_other_tags_anywhere() {
        let raw = "Here you go:\n```mysql\nSELECT id\nFROM orders\n```\nEnjoy";
        let cleaned = clean_sql(raw);
        assert!(!cleaned.contains("```"));
        assert_eq!(cleaned, "Here you go: SELECT id FROM orders Enjoy;");

        assert_eq!(clean_sql("```sql SELECT 1;```"), "SELECT 1;");
        assert_eq!(clean_sql("```SQL SELECT * FROM t```"), "SELECT * FROM t;");
        assert_eq!(clean_sql("```duckdb\r\nSELECT 1;\r\n```"), "SELECT 1;");
        assert_eq!(clean_sql("```sqlite SELECT 2```"), "SELECT 2;");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(
            clean_sql("  SELECT  name,\n\t email\r\n FROM   users  "),
            "SELECT name, email FROM users;"
        );
    }

    #[test]
    fn ends_with_exactly_one_terminator() {
        assert_eq!(clean_sql("SELECT 1"), "SELECT 1;");
        assert_eq!(clean_sql("SELECT 1;"), "SELECT 1;");
        assert_eq!(clean_sql("SELECT 1 ; ;"), "SELECT 1;");
        assert_eq!(clean_sql("```sql\nSELECT 1;;\n```\n"), "SELECT 1;");
    }

    #[test]
    fn fence_only_output_cleans_to_bare_terminator() {
        assert_eq!(clean_sql("```sql\n```"), ";");
        assert_eq!(clean_sql(""), ";");
    }
}
