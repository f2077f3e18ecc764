//! Database settings extraction from `wp-config.php`.
//!
//! The config is PHP, but only two settings matter here and both follow
//! WordPress' stock layout closely enough for line-oriented matching:
//!
//! ```php
//! define( 'DB_NAME', 'alice_blog' );
//! $table_prefix = 'wp_';
//! ```
//!
//! On shared hosting every database name starts with the customer login,
//! which anchors the `DB_NAME` match.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Database name and table prefix of one WordPress installation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WpDbSettings {
    /// `None` when no `DB_NAME` line carrying the customer login was found.
    pub database: Option<String>,
    pub table_prefix: String,
}

impl WpDbSettings {
    /// Name of the options table, `<prefix>options`.
    pub fn options_table(&self) -> String {
        format!("{}options", self.table_prefix)
    }
}

fn prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Quote styles seen in the wild include backticks and typographic quotes
    RE.get_or_init(|| Regex::new(r#"^['"`’](.*)['"`’];"#).expect("valid prefix regex"))
}

/// Extract the database name and table prefix from config text.
///
/// Lines are trimmed and scanned independently; a later match overrides an
/// earlier one.
pub fn parse_wp_config(content: &str, customer: &str) -> WpDbSettings {
    let mut settings = WpDbSettings::default();
    let db_regex = if customer.is_empty() {
        None
    } else {
        Regex::new(&format!("{}[_a-zA-Z0-9]+", regex::escape(customer))).ok()
    };

    for line in content.lines() {
        let line = line.trim();

        if let Some(ref re) = db_regex {
            if line.contains("DB_NAME") && line.contains(customer) {
                if let Some(value) = line.split(',').nth(1) {
                    if let Some(m) = re.find(value) {
                        settings.database = Some(m.as_str().to_string());
                    }
                }
            }
        }

        if line.contains("$table_prefix") && line.contains('=') {
            if let Some(value) = line.split('=').nth(1) {
                if let Some(caps) = prefix_regex().captures(value.trim()) {
                    settings.table_prefix = caps[1].to_string();
                }
            }
        }
    }

    settings
}

/// Read and parse a `wp-config.php` file; invalid UTF-8 is replaced.
pub fn read_wp_config(
    path: &std::path::Path,
    customer: &str,
) -> Result<WpDbSettings, crate::HdbError> {
    let bytes = std::fs::read(path)
        .map_err(|e| crate::HdbError::Io(format!("Cannot read {}: {}", path.display(), e)))?;
    Ok(parse_wp_config(&String::from_utf8_lossy(&bytes), customer))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOCK_CONFIG: &str = "\
<?php
/** The name of the database for WordPress */
define( 'DB_NAME', 'alice_blog' );

/** MySQL database username */
define( 'DB_USER', 'alice_blog' );
define( 'DB_PASSWORD', 'hunter2' );
define( 'DB_HOST', 'localhost' );

$table_prefix = 'wp_';
";

    #[test]
    fn test_stock_config() {
        let settings = parse_wp_config(STOCK_CONFIG, "alice");
        assert_eq!(settings.database.as_deref(), Some("alice_blog"));
        assert_eq!(settings.table_prefix, "wp_");
        assert_eq!(settings.options_table(), "wp_options");
    }

    #[test]
    fn test_database_must_start_with_customer() {
        let settings = parse_wp_config("define('DB_NAME', 'shared_db');\n", "alice");
        assert_eq!(settings.database, None);

        // Customer appears only in a comment on a non-DB_NAME line
        let settings = parse_wp_config("// alice\ndefine('DB_NAME', 'other');\n", "alice");
        assert_eq!(settings.database, None);
    }

    #[test]
    fn test_database_without_comma() {
        let settings = parse_wp_config("define('DB_NAME' 'alice_x');\n", "alice");
        assert_eq!(settings.database, None);
    }

    #[test]
    fn test_database_stops_at_non_word_char() {
        let settings = parse_wp_config("define(\"DB_NAME\", \"alice_shop-2\");\n", "alice");
        assert_eq!(settings.database.as_deref(), Some("alice_shop"));
    }

    #[test]
    fn test_customer_is_literal() {
        // A '.' in the login must not match arbitrary characters
        let settings = parse_wp_config("define('DB_NAME', 'aXb_db');\n", "a.b");
        assert_eq!(settings.database, None);
        let settings = parse_wp_config("define('DB_NAME', 'a.b_db');\n", "a.b");
        assert_eq!(settings.database.as_deref(), Some("a.b_db"));
    }

    #[test]
    fn test_empty_customer_never_matches() {
        let settings = parse_wp_config(STOCK_CONFIG, "");
        assert_eq!(settings.database, None);
        assert_eq!(settings.table_prefix, "wp_");
    }

    #[test]
    fn test_prefix_quote_styles() {
        for (line, expected) in [
            ("$table_prefix = 'wp_';", "wp_"),
            ("$table_prefix  = \"wpw_wpw_w_\";", "wpw_wpw_w_"),
            ("$table_prefix=`bk_`;", "bk_"),
            ("$table_prefix = ’x1_’;", "x1_"),
            ("$table_prefix = '';", ""),
            ("$table_prefix = '_';", "_"),
        ] {
            let settings = parse_wp_config(line, "alice");
            assert_eq!(settings.table_prefix, expected, "line: {}", line);
        }
    }

    #[test]
    fn test_prefix_defaults_to_empty() {
        let settings = parse_wp_config("$table_prefix = get_prefix();\n", "alice");
        assert_eq!(settings.table_prefix, "");
        assert_eq!(settings.options_table(), "options");
    }

    #[test]
    fn test_later_match_wins() {
        let config = "\
define('DB_NAME', 'alice_old');
$table_prefix = 'old_';
define('DB_NAME', 'alice_new');
$table_prefix = 'new_';
";
        let settings = parse_wp_config(config, "alice");
        assert_eq!(settings.database.as_deref(), Some("alice_new"));
        assert_eq!(settings.table_prefix, "new_");
    }

    #[test]
    fn test_read_lossy_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wp-config.php");
        let mut bytes = b"/* \xff\xfe */\n".to_vec();
        bytes.extend_from_slice(STOCK_CONFIG.as_bytes());
        std::fs::write(&path, bytes).unwrap();

        let settings = read_wp_config(&path, "alice").unwrap();
        assert_eq!(settings.database.as_deref(), Some("alice_blog"));
    }
}
