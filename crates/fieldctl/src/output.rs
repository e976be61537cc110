//! Output formatting: table, JSON, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, Write};

use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render rows of `data` in the chosen format.
///
/// - `table`: one `to_row` per item
/// - `json` / `json-compact`: `whole` serialized as-is, so JSON output keeps
///   the API's own shape
/// - `plain`: one `id_fn` per item
pub fn render_list<T, R, W>(
    format: OutputFormat,
    whole: &W,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    R: Tabled,
    W: serde::Serialize + ?Sized,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => serde_json::to_string_pretty(whole)?,
        OutputFormat::JsonCompact => serde_json::to_string(whole)?,
        OutputFormat::Plain => data.iter().map(id_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Render a single item. Table and plain share `text_fn`.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    text_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
{
    Ok(match format {
        OutputFormat::Table | OutputFormat::Plain => text_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Team")]
        team: u32,
    }

    #[test]
    fn plain_lists_one_id_per_line() {
        let data = [7_u32, 12];
        let out = render_list(
            OutputFormat::Plain,
            &data,
            &data,
            |t| Row { team: *t },
            ToString::to_string,
        )
        .unwrap();
        assert_eq!(out, "7\n12");
    }

    #[test]
    fn table_has_headers() {
        let data = [7_u32];
        let out = render_list(
            OutputFormat::Table,
            &data,
            &data,
            |t| Row { team: *t },
            ToString::to_string,
        )
        .unwrap();
        assert!(out.contains("Team"));
        assert!(out.contains('7'));
    }

    #[test]
    fn json_uses_the_whole_value() {
        let whole = serde_json::json!({"7": "field1:red"});
        let out = render_list(
            OutputFormat::JsonCompact,
            &whole,
            &[7_u32],
            |t| Row { team: *t },
            ToString::to_string,
        )
        .unwrap();
        assert_eq!(out, r#"{"7":"field1:red"}"#);
    }
}
