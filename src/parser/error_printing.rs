use crate::parser::types::Span;
use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use chumsky::error::{Simple, SimpleReason};

fn describe(err: &Simple<String>) -> (String, String) {
    let found = err
        .found()
        .cloned()
        .unwrap_or_else(|| "end of value".to_string());

    match err.reason() {
        SimpleReason::Unclosed { delimiter, .. } => (
            format!("Unclosed delimiter {}", delimiter),
            format!("Must be closed before this {}", found),
        ),
        SimpleReason::Unexpected => (
            format!(
                "{} (expecting: [{}])",
                match err.found() {
                    Some(_) => "Unexpected character in value",
                    None => "Unexpected end of value",
                },
                err.expected()
                    .map(|expected| match expected {
                        Some(s) => s.as_str(),
                        None => "<end>",
                    })
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            format!("Unexpected {}", found),
        ),
        SimpleReason::Custom(msg) => (msg.clone(), msg.clone()),
    }
}

/// Renders parse errors of the attribute `key` against its raw `src` value.
pub fn render_errors(key: &str, src: &str, errs: Vec<Simple<char>>) -> String {
    let mut out = Vec::new();

    errs.into_iter()
        .map(|err| err.map(|c| c.to_string()))
        .for_each(|err| {
            let span: Span = err.span();
            let (message, label) = describe(&err);

            Report::build(ReportKind::Error, &key, span.start)
                .with_config(Config::default().with_color(false))
                .with_message(message)
                .with_label(
                    Label::new((&key, span))
                        .with_message(label)
                        .with_color(Color::Red),
                )
                .finish()
                .write((&key, Source::from(&src)), &mut out)
                .expect("writing a report into memory cannot fail");
        });

    String::from_utf8_lossy(&out).into_owned()
}
