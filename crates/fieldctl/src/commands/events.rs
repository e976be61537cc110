//! Tail the event stream until interrupted, the server goes away, or
//! `--count` events have been printed.

use fieldctl_api::FieldClient;
use fieldctl_core::Event;

use crate::cli::{EventsArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

fn render_event(format: OutputFormat, event: &Event) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(event)?,
        OutputFormat::Table | OutputFormat::Plain => {
            format!("{:<16} {}", event.kind().as_str(), event.summary())
        }
    })
}

pub async fn handle(
    client: &FieldClient,
    args: EventsArgs,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let mut stream = client.events().await?;
    let mut seen = 0usize;

    loop {
        if args.count.is_some_and(|limit| seen >= limit) {
            break;
        }
        let next = tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            next = stream.next_event() => next?,
        };
        let Some(event) = next else {
            tracing::info!("event stream ended");
            return Ok(());
        };
        output::print_output(&render_event(format, &event)?, quiet);
        seen += 1;
    }

    stream.close().await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn json_lines_use_wire_form() {
        let event = Event::LogLine {
            message: "field 2 ready".into(),
        };
        assert_eq!(
            render_event(OutputFormat::Json, &event).unwrap(),
            r#"{"Type":2,"Message":"field 2 ready"}"#
        );
    }

    #[test]
    fn text_lines_lead_with_kind() {
        let event = Event::ActionComplete {
            action: "remap".into(),
        };
        let line = render_event(OutputFormat::Table, &event).unwrap();
        assert!(line.starts_with("action-complete"));
        assert!(line.ends_with("completed remap"));
    }
}
